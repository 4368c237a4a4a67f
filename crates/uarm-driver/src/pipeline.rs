//! Pipeline 接收循环模块
//!
//! 负责后台接收线程的字节读取、分帧和状态更新。

use crate::metrics::UarmMetrics;
use crate::state::DeviceContext;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace};
use uarm_link::RxAdapter;
use uarm_protocol::{FRAME_CAPACITY, FrameParser, ParseEvent};

/// 设备调试输出使用的日志 target
pub const DEVICE_LOG_TARGET: &str = "uarm_driver::device";

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use uarm_driver::PipelineConfig;
///
/// // 默认配置（20ms 读超时，调试输出每行最多 128 字节）
/// let config = PipelineConfig::default();
///
/// let config = PipelineConfig {
///     read_timeout_ms: 50,
///     chatter_line_limit: 80,
/// };
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// 串口读超时（毫秒）
    ///
    /// 接收线程每次超时后检查一次退出标志，因此它也决定了 `close()` 的最长等待时间。
    pub read_timeout_ms: u64,
    /// 调试输出行缓冲上限（字节），满后即使没有换行也输出
    pub chatter_line_limit: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: 20,
            chatter_line_limit: 128,
        }
    }
}

impl PipelineConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// 设备调试输出的行缓冲
struct ChatterLine {
    buf: Vec<u8>,
    limit: usize,
}

impl ChatterLine {
    fn new(limit: usize) -> Self {
        Self {
            buf: Vec::with_capacity(limit),
            limit: limit.max(1),
        }
    }

    fn push(&mut self, byte: u8) {
        if byte == b'\n' {
            self.flush();
            return;
        }
        self.buf.push(byte);
        if self.buf.len() >= self.limit {
            self.flush();
        }
    }

    fn flush(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end_matches('\r');
        if !line.trim().is_empty() {
            info!(target: DEVICE_LOG_TARGET, "{}", line);
        }
        self.buf.clear();
    }
}

/// 接收线程主循环
///
/// 每次迭代检查一次 `is_running`；读超时属于正常情况。致命错误（见
/// [`LinkError::is_fatal`](uarm_link::LinkError::is_fatal)，如串口被拔出）使循环把
/// `is_running` 置为 false 后退出；其它读错误记录后继续。
///
/// # 参数
/// - `rx`: 接收半部
/// - `ctx`: 共享设备状态
/// - `config`: Pipeline 配置
/// - `is_running`: 运行标志
/// - `metrics`: 链路指标
pub fn rx_loop(
    mut rx: impl RxAdapter,
    ctx: Arc<DeviceContext>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<UarmMetrics>,
) {
    if let Err(e) = rx.set_read_timeout(config.read_timeout()) {
        debug!("RX thread: failed to set read timeout: {}", e);
    }

    let mut parser = FrameParser::for_responses();
    let mut chatter = ChatterLine::new(config.chatter_line_limit);
    let mut buf = [0u8; FRAME_CAPACITY];

    loop {
        // Acquire: If we see false, we must see all cleanup writes from other threads
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        // 帧头阶段逐字节读取，负载阶段读取剩余长度
        let wanted = parser.wanted();
        let n = match rx.read(&mut buf[..wanted]) {
            Ok(n) => n,
            Err(e) if e.is_timeout() => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Err(e) => {
                error!("RX thread: serial read error: {}", e);
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);

                // 设备断开、链路关闭：不再重试
                if e.is_fatal() {
                    error!("RX thread: fatal link error, setting is_running = false");
                    // Release: All writes before this are visible to threads that see the false value
                    is_running.store(false, Ordering::Release);
                    break;
                }
                continue;
            },
        };
        metrics.rx_bytes.fetch_add(n as u64, Ordering::Relaxed);

        for event in parser.feed(&buf[..n]) {
            match event {
                ParseEvent::Frame(frame) => {
                    metrics.rx_frames.fetch_add(1, Ordering::Relaxed);
                    ctx.apply(&frame);
                },
                ParseEvent::Chatter(byte) => {
                    metrics.rx_chatter_bytes.fetch_add(1, Ordering::Relaxed);
                    chatter.push(byte);
                },
                ParseEvent::Discarded(reason) => {
                    metrics.rx_discarded.fetch_add(1, Ordering::Relaxed);
                    debug!("RX thread: discarded frame ({:?}), resynchronizing", reason);
                },
            }
        }
    }

    chatter.flush();
    trace!("RX thread: exited");
}
