//! 链路指标模块
//!
//! 原子计数器，接收线程和请求线程都可以无锁更新，任意线程可读取快照。

use std::sync::atomic::{AtomicU64, Ordering};

/// uArm 链路实时指标
///
/// # 使用示例
///
/// ```rust
/// use uarm_driver::UarmMetrics;
/// use std::sync::atomic::Ordering;
///
/// let metrics = UarmMetrics::new();
/// metrics.rx_frames.fetch_add(1, Ordering::Relaxed);
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.rx_frames, 1);
/// ```
#[derive(Debug, Default)]
pub struct UarmMetrics {
    /// 接收的原始字节数
    pub rx_bytes: AtomicU64,

    /// 完整响应帧数（包括未知响应码）
    pub rx_frames: AtomicU64,

    /// 因非法响应码/长度被丢弃的帧数
    pub rx_discarded: AtomicU64,

    /// 帧外调试输出字节数
    pub rx_chatter_bytes: AtomicU64,

    /// 读超时次数（正常现象，无数据时会超时）
    pub rx_timeouts: AtomicU64,

    /// 读错误次数
    pub device_errors: AtomicU64,

    /// 成功发送的命令帧数
    pub tx_frames: AtomicU64,

    /// 发送失败次数（短写、链路关闭）
    pub tx_errors: AtomicU64,
}

impl UarmMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            rx_frames: self.rx_frames.load(Ordering::Relaxed),
            rx_discarded: self.rx_discarded.load(Ordering::Relaxed),
            rx_chatter_bytes: self.rx_chatter_bytes.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            tx_frames: self.tx_frames.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
        }
    }

    /// 重置所有计数器
    pub fn reset(&self) {
        self.rx_bytes.store(0, Ordering::Relaxed);
        self.rx_frames.store(0, Ordering::Relaxed);
        self.rx_discarded.store(0, Ordering::Relaxed);
        self.rx_chatter_bytes.store(0, Ordering::Relaxed);
        self.rx_timeouts.store(0, Ordering::Relaxed);
        self.device_errors.store(0, Ordering::Relaxed);
        self.tx_frames.store(0, Ordering::Relaxed);
        self.tx_errors.store(0, Ordering::Relaxed);
    }
}

/// 指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_bytes: u64,
    pub rx_frames: u64,
    pub rx_discarded: u64,
    pub rx_chatter_bytes: u64,
    pub rx_timeouts: u64,
    pub device_errors: u64,
    pub tx_frames: u64,
    pub tx_errors: u64,
}

impl MetricsSnapshot {
    /// 帧外字节占比（百分比）
    ///
    /// `rx_bytes` 为 0 时返回 0.0。
    pub fn chatter_rate(&self) -> f64 {
        if self.rx_bytes == 0 {
            return 0.0;
        }
        (self.rx_chatter_bytes as f64 / self.rx_bytes as f64) * 100.0
    }
}
