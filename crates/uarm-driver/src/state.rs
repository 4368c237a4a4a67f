//! 共享设备状态
//!
//! 接收线程是设备状态的唯一写者。每处理完一帧（包括无法识别的帧），都会递增
//! `generation` 并广播唤醒所有等待者；等待者只检查 `generation` 是否变化，
//! 不检查这一帧是否是自己请求的那一帧。协议没有请求 ID，
//! 因此查询可能被任何一个响应提前结束，此时返回的是当时字段里的值（可能仍是哨兵值）。
//!
//! 查询之间由 `request` 锁串行化，避免两个查询互相把对方的字段重置为哨兵值。

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, trace};
use uarm_protocol::{DeviceResponse, Position, ProtocolError, UarmFrame};

/// 锁定状态查询的哨兵值
pub const ATTACHED_SENTINEL: bool = false;

/// 角度查询的哨兵值（0.1°）
pub const ANGLE_SENTINEL: i16 = -1800;

/// 位置查询的哨兵值
pub const POSITION_SENTINEL: Position = Position::ORIGIN;

/// 设备状态快照
#[derive(Debug, Clone, Copy)]
pub struct DeviceState {
    /// 最近一次上报的锁定状态
    pub attached: bool,
    /// 最近一次上报的舵机角度（0.1°）
    pub angle: i16,
    /// 最近一次上报的末端位置
    pub position: Position,
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            attached: ATTACHED_SENTINEL,
            angle: ANGLE_SENTINEL,
            position: POSITION_SENTINEL,
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    device: DeviceState,
    /// 已处理的帧数（每帧 +1）
    generation: u64,
}

/// 接收线程与请求线程之间共享的上下文
#[derive(Debug, Default)]
pub struct DeviceContext {
    shared: Mutex<Shared>,
    updated: Condvar,
    request: Mutex<()>,
}

impl DeviceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态快照
    pub fn snapshot(&self) -> DeviceState {
        self.shared.lock().device
    }

    /// 已处理的帧数
    pub fn generation(&self) -> u64 {
        self.shared.lock().generation
    }

    /// 应用一帧响应，并唤醒所有等待者
    ///
    /// 无法识别或负载过短的帧不修改状态，但同样唤醒等待者。
    pub fn apply(&self, frame: &UarmFrame) -> Option<DeviceResponse> {
        let decoded = DeviceResponse::try_from(frame);

        let mut shared = self.shared.lock();
        let applied = match decoded {
            Ok(response) => {
                match response {
                    DeviceResponse::AttachedState { attached, .. } => {
                        shared.device.attached = attached;
                    },
                    DeviceResponse::ServoAngle { angle, .. } => shared.device.angle = angle,
                    DeviceResponse::Position(p) => shared.device.position = p,
                }
                trace!("Applied {:?}", response);
                Some(response)
            },
            Err(ProtocolError::UnknownResponse { code }) => {
                trace!("Ignoring response code 0x{:02X}", code);
                None
            },
            Err(e) => {
                debug!("Ignoring malformed frame {:02X?}: {}", frame.as_bytes(), e);
                None
            },
        };
        shared.generation = shared.generation.wrapping_add(1);
        drop(shared);

        self.updated.notify_all();
        applied
    }

    /// 串行化查询
    pub(crate) fn lock_request(&self) -> MutexGuard<'_, ()> {
        self.request.lock()
    }

    /// 把某个字段重置为哨兵值，返回当前 generation
    pub(crate) fn arm(&self, reset: impl FnOnce(&mut DeviceState)) -> u64 {
        let mut shared = self.shared.lock();
        reset(&mut shared.device);
        shared.generation
    }

    /// 等待 generation 变化或超时，返回当时的状态
    pub(crate) fn wait_for_update(&self, since: u64, timeout: Duration) -> DeviceState {
        let deadline = Instant::now() + timeout;
        let mut shared = self.shared.lock();
        while shared.generation == since {
            if self.updated.wait_until(&mut shared, deadline).timed_out() {
                break;
            }
        }
        shared.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use uarm_protocol::HEADER_RESPONSE_BYTE;

    fn frame(code: u8, payload: &[u8]) -> UarmFrame {
        UarmFrame::new(HEADER_RESPONSE_BYTE, code, payload).unwrap()
    }

    #[test]
    fn test_default_is_sentinel() {
        let state = DeviceState::default();
        assert!(!state.attached);
        assert_eq!(state.angle, -1800);
        assert!(state.position.is_origin());
    }

    #[test]
    fn test_apply_updates_fields() {
        let ctx = DeviceContext::new();
        ctx.apply(&frame(0x01, &[0xFF, 0x01]));
        ctx.apply(&frame(0x02, &[0x00, 14, 8]));
        ctx.apply(&frame(0x03, &[0, 50, 1, 22, 0, 60]));

        let state = ctx.snapshot();
        assert!(state.attached);
        assert_eq!(state.angle, 1800);
        assert!(state.position.exact_eq(&Position::new(50, 150, 60)));
        assert_eq!(ctx.generation(), 3);
    }

    /// 未知响应码：状态不变，但 generation 前进
    #[test]
    fn test_unknown_code_still_counts() {
        let ctx = DeviceContext::new();
        assert!(ctx.apply(&frame(0x42, &[1, 2])).is_none());
        assert_eq!(ctx.generation(), 1);
        assert_eq!(ctx.snapshot().angle, ANGLE_SENTINEL);
    }

    #[test]
    fn test_short_angle_frame_ignored() {
        let ctx = DeviceContext::new();
        ctx.apply(&frame(0x02, &[0x00, 0x01]));
        assert_eq!(ctx.snapshot().angle, ANGLE_SENTINEL);
        assert_eq!(ctx.generation(), 1);
    }

    #[test]
    fn test_wait_times_out_with_sentinel() {
        let ctx = DeviceContext::new();
        ctx.apply(&frame(0x02, &[0x00, 0, 90]));
        let since = ctx.arm(|s| s.angle = ANGLE_SENTINEL);

        let start = Instant::now();
        let state = ctx.wait_for_update(since, Duration::from_millis(50));
        assert!(start.elapsed() >= Duration::from_millis(50));
        assert_eq!(state.angle, ANGLE_SENTINEL);
    }

    /// 任意一帧都会结束等待（包括与请求无关的帧）
    #[test]
    fn test_any_frame_wakes_all_waiters() {
        let ctx = Arc::new(DeviceContext::new());
        let since = ctx.generation();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let ctx = ctx.clone();
                thread::spawn(move || {
                    let start = Instant::now();
                    let state = ctx.wait_for_update(since, Duration::from_secs(5));
                    (start.elapsed(), state)
                })
            })
            .collect();

        thread::sleep(Duration::from_millis(50));
        ctx.apply(&frame(0x01, &[0x00, 0x01]));

        for waiter in waiters {
            let (elapsed, state) = waiter.join().unwrap();
            assert!(elapsed < Duration::from_secs(5));
            assert!(state.attached);
            assert!(state.position.is_origin());
        }
    }
}
