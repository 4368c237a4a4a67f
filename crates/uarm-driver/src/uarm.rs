//! uArm 驱动句柄
//!
//! 打开时拆分链路：接收半部交给后台线程，发送半部留在句柄内，由互斥锁保护，
//! 允许多个线程同时调用。

use crate::error::DriverError;
use crate::metrics::{MetricsSnapshot, UarmMetrics};
use crate::pipeline::{PipelineConfig, rx_loop};
use crate::state::{ANGLE_SENTINEL, ATTACHED_SENTINEL, DeviceContext, DeviceState, POSITION_SENTINEL};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, warn};
use uarm_link::{SplittableAdapter, TxAdapter};
use uarm_protocol::{
    AttachDetachCommand, IsAttachedCommand, MoveToCommand, PickCommand, Position, PumpCommand,
    ReadAngleCommand, ServoId, ServoTarget, UarmFrame, WriteAngleCommand, get_position_frame,
    stop_frame,
};

/// 等待接收线程退出的上限
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// 带超时的线程 join
///
/// 超时后接收线程仍在运行（它会在下一次读超时时看到退出标志），这里只是不再等待。
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> Result<(), &'static str> {
    let (done_tx, done_rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let _ = done_tx.send(handle.join().is_ok());
    });
    match done_rx.recv_timeout(timeout) {
        Ok(true) => Ok(()),
        Ok(false) => Err("RX thread panicked"),
        Err(_) => Err("RX thread did not exit in time"),
    }
}

/// 查询超时配置
///
/// 位置响应明显慢于其它响应，默认超时更长。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RequestTimeouts {
    /// 锁定状态查询超时（毫秒）
    pub attached_ms: u64,
    /// 角度查询超时（毫秒）
    pub angle_ms: u64,
    /// 位置查询超时（毫秒）
    pub position_ms: u64,
}

impl Default for RequestTimeouts {
    fn default() -> Self {
        Self {
            attached_ms: 500,
            angle_ms: 500,
            position_ms: 2000,
        }
    }
}

/// uArm 驱动（对外 API）
///
/// # 两类操作
///
/// - **发送即返回**：`attach_detach`、`write_angle`、`move_to`、`pick`、`pump`、`stop`。
///   只保证命令帧完整写出，不等待设备确认。
/// - **发送后等待**：`is_attached`、`read_angle`、`get_position`。先把对应字段重置为
///   哨兵值，再发送查询，然后等待下一帧响应或超时，最后返回字段当前值。
///   调用方无法区分 "设备回答了哨兵值"、"设备没有回答" 与 "设备回答了别的查询"。
///
/// # 链路关闭后
///
/// `close()` 之后两类操作都立即返回 `Err(DriverError::NotConnected)`，查询不会等待超时，
/// 也不返回哨兵值。哨兵值只表示链路打开但设备没有给出可用的应答。
///
/// # Example
///
/// ```no_run
/// use uarm_driver::{UarmBuilder, Position};
///
/// let arm = UarmBuilder::new().port("/dev/ttyUSB0").build().unwrap();
/// arm.attach_detach_all(true).unwrap();
/// arm.move_to(Position::new(0, 150, 100), 40).unwrap();
/// let position = arm.get_position().unwrap();
/// println!("now at {}", position);
/// ```
pub struct Uarm {
    /// 共享设备状态
    ctx: Arc<DeviceContext>,
    /// 发送半部（`close()` 后为 None）
    tx: Mutex<Option<Box<dyn TxAdapter + Send>>>,
    /// 接收线程句柄
    rx_thread: Mutex<Option<JoinHandle<()>>>,
    /// 运行标志（用于线程生命周期联动）
    is_running: Arc<AtomicBool>,
    /// 链路指标
    metrics: Arc<UarmMetrics>,
    timeouts: RequestTimeouts,
}

impl Uarm {
    /// 创建驱动并启动接收线程
    ///
    /// # 错误
    /// - `DriverError::Link`: 拆分适配器失败
    /// - `DriverError::IoThread`: 无法启动接收线程
    pub fn new<A>(adapter: A, config: Option<PipelineConfig>) -> Result<Self, DriverError>
    where
        A: SplittableAdapter,
    {
        let (rx, tx) = adapter.split()?;

        let ctx = Arc::new(DeviceContext::new());
        let is_running = Arc::new(AtomicBool::new(true));
        let metrics = Arc::new(UarmMetrics::new());

        let rx_thread = {
            let ctx = ctx.clone();
            let is_running = is_running.clone();
            let metrics = metrics.clone();
            let config = config.unwrap_or_default();
            std::thread::Builder::new()
                .name("uarm-rx".into())
                .spawn(move || rx_loop(rx, ctx, config, is_running, metrics))
                .map_err(|e| DriverError::IoThread(e.to_string()))?
        };

        Ok(Self {
            ctx,
            tx: Mutex::new(Some(Box::new(tx))),
            rx_thread: Mutex::new(Some(rx_thread)),
            is_running,
            metrics,
            timeouts: RequestTimeouts::default(),
        })
    }

    /// 设置查询超时
    pub fn with_timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn timeouts(&self) -> &RequestTimeouts {
        &self.timeouts
    }

    /// 链路是否打开（`close()` 前且接收线程未因链路断开而退出）
    pub fn is_open(&self) -> bool {
        self.is_running.load(Ordering::Acquire) && self.tx.lock().is_some()
    }

    /// 共享状态快照（不发送查询）
    pub fn state(&self) -> DeviceState {
        self.ctx.snapshot()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 关闭链路
    ///
    /// 通知接收线程退出、释放发送半部、等待接收线程结束。可重复调用。
    /// 正在等待中的查询不会被提前唤醒，它们按自己的超时返回。
    pub fn close(&self) {
        self.is_running.store(false, Ordering::Release);
        drop(self.tx.lock().take());

        if let Some(handle) = self.rx_thread.lock().take()
            && let Err(e) = join_with_timeout(handle, JOIN_TIMEOUT)
        {
            error!("{} (waited {:?})", e, JOIN_TIMEOUT);
        }
    }

    fn send(&self, frame: &UarmFrame) -> Result<(), DriverError> {
        let mut tx = self.tx.lock();
        let Some(tx) = tx.as_mut() else {
            return Err(DriverError::NotConnected);
        };
        match tx.send(frame) {
            Ok(()) => {
                self.metrics.tx_frames.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(e) => {
                self.metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Failed to send {:02X?}: {}", frame.as_bytes(), e);
                Err(e.into())
            },
        }
    }

    /// 发送查询并等待下一帧响应
    fn ask<T>(
        &self,
        frame: UarmFrame,
        timeout: Duration,
        reset: impl FnOnce(&mut DeviceState),
        read: impl FnOnce(&DeviceState) -> T,
    ) -> Result<T, DriverError> {
        let _request = self.ctx.lock_request();
        let since = self.ctx.arm(reset);
        self.send(&frame)?;
        let state = self.ctx.wait_for_update(since, timeout);
        Ok(read(&state))
    }

    // ========================================================================
    // 发送即返回
    // ========================================================================

    /// 锁定 / 释放单个舵机
    pub fn attach_detach(&self, servo: ServoId, attach: bool) -> Result<(), DriverError> {
        self.send(&AttachDetachCommand::new(servo, attach).to_frame())
    }

    /// 锁定 / 释放全部舵机
    pub fn attach_detach_all(&self, attach: bool) -> Result<(), DriverError> {
        self.send(&AttachDetachCommand::new(ServoTarget::All, attach).to_frame())
    }

    /// 写舵机角度（0.1°）
    pub fn write_angle(&self, servo: ServoId, angle: i16, speed: u8) -> Result<(), DriverError> {
        self.send(&WriteAngleCommand::new(servo, angle, speed).to_frame())
    }

    /// 移动到笛卡尔坐标（不等待到位）
    pub fn move_to(&self, target: Position, speed: u8) -> Result<(), DriverError> {
        debug!("Move to {}", target);
        self.send(&MoveToCommand::new(target, speed).to_frame())
    }

    /// 向下探测抓取
    pub fn pick(&self, distance: u16) -> Result<(), DriverError> {
        self.send(&PickCommand::new(distance).to_frame())
    }

    /// 气泵开关
    pub fn pump(&self, on: bool) -> Result<(), DriverError> {
        self.send(&PumpCommand::new(on).to_frame())
    }

    pub fn stop(&self) -> Result<(), DriverError> {
        self.send(&stop_frame())
    }

    // ========================================================================
    // 发送后等待
    // ========================================================================

    /// 查询舵机锁定状态（超时返回 `false`）
    pub fn is_attached(&self, servo: ServoId) -> Result<bool, DriverError> {
        self.ask(
            IsAttachedCommand::new(servo).to_frame(),
            Duration::from_millis(self.timeouts.attached_ms),
            |s| s.attached = ATTACHED_SENTINEL,
            |s| s.attached,
        )
    }

    /// 读舵机角度（0.1°，超时返回 -1800）
    pub fn read_angle(&self, servo: ServoId) -> Result<i16, DriverError> {
        self.ask(
            ReadAngleCommand::new(servo).to_frame(),
            Duration::from_millis(self.timeouts.angle_ms),
            |s| s.angle = ANGLE_SENTINEL,
            |s| s.angle,
        )
    }

    /// 查询当前位置（超时返回原点）
    pub fn get_position(&self) -> Result<Position, DriverError> {
        self.ask(
            get_position_frame(),
            Duration::from_millis(self.timeouts.position_ms),
            |s| s.position = POSITION_SENTINEL,
            |s| s.position,
        )
    }
}

impl Drop for Uarm {
    fn drop(&mut self) {
        self.close();
    }
}
