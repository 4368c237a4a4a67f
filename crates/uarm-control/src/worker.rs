//! 机械臂工作线程
//!
//! 前端（CLI、网络服务等）不直接调用控制器：动作通过通道发给一个长期运行的
//! 工作线程，线程按收到的顺序逐个执行。运动可能持续数秒，前端只需要非阻塞地
//! 读取连接状态。
//!
//! ```text
//! front end ──RobotAction──► [uarm-worker] ──► RobotController ──► Uarm
//!     ▲                            │
//!     └──────── is_connected ◄─────┘ (AtomicBool)
//! ```

use crate::error::ControlError;
use crate::game::{MAX_MOVES, TurnTracker};
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{error, info, warn};
use uarm_client::{ClientError, MoveReport, NamedPosition, RobotController};

type ClientResult<T> = Result<T, ClientError>;

/// 工作线程需要的控制器操作
pub trait RobotOps: Send {
    fn connect(&mut self, port: &str) -> ClientResult<()>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
    fn move_to_named(&mut self, slot: NamedPosition) -> ClientResult<MoveReport>;
    fn pick(&mut self) -> ClientResult<MoveReport>;
    fn place(&mut self) -> ClientResult<MoveReport>;
}

impl RobotOps for RobotController {
    fn connect(&mut self, port: &str) -> ClientResult<()> {
        RobotController::connect(self, port)
    }

    fn disconnect(&mut self) {
        RobotController::disconnect(self)
    }

    fn is_connected(&self) -> bool {
        RobotController::is_connected(self)
    }

    fn move_to_named(&mut self, slot: NamedPosition) -> ClientResult<MoveReport> {
        RobotController::move_to_named(self, slot)
    }

    fn pick(&mut self) -> ClientResult<MoveReport> {
        RobotController::pick(self)
    }

    fn place(&mut self) -> ClientResult<MoveReport> {
        RobotController::place(self)
    }
}

/// 发给工作线程的动作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RobotAction {
    Connect,
    /// 标记已占用的格子，然后走一步
    Move { occupied: Vec<String> },
    Disconnect,
    /// 重置棋局
    Reset,
    /// 断开并退出线程
    Shutdown,
}

/// 走一步棋
///
/// 取下一个空格；有空格且步数不超过 [`MAX_MOVES`] 时，从第 n 个存放位（`R<n>`）
/// 取子，放到该格，最后回到 P1。返回落子的格子。
pub fn play_turn<R: RobotOps + ?Sized>(
    robot: &mut R,
    game: &mut TurnTracker,
) -> ClientResult<Option<NamedPosition>> {
    let next = game.next_field();
    let moves = game.moves();
    info!(
        "Move {} to field {}",
        moves,
        next.map_or("-", NamedPosition::label)
    );

    let Some(field) = next else {
        return Ok(None);
    };
    if moves > MAX_MOVES {
        return Ok(None);
    }
    let Some(store) = NamedPosition::storage(moves) else {
        warn!("No storage slot for move {}", moves);
        return Ok(None);
    };

    robot.move_to_named(store)?;
    robot.pick()?;
    robot.move_to_named(field)?;
    robot.place()?;
    robot.move_to_named(NamedPosition::P1)?;
    game.mark(field);
    Ok(Some(field))
}

/// 后台工作线程句柄
///
/// `Drop` 时发送 `Shutdown` 并等待线程结束（线程退出前会断开机械臂）。
pub struct RobotWorker {
    tx: Sender<RobotAction>,
    is_connected: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl RobotWorker {
    /// 启动工作线程，`port` 用于 `Connect` 动作
    pub fn spawn<R>(robot: R, port: impl Into<String>) -> Result<Self, ControlError>
    where
        R: RobotOps + 'static,
    {
        let (tx, rx) = unbounded();
        let is_connected = Arc::new(AtomicBool::new(robot.is_connected()));
        let port = port.into();

        let flag = is_connected.clone();
        let handle = std::thread::Builder::new()
            .name("uarm-worker".into())
            .spawn(move || worker_loop(robot, port, rx, flag))?;

        Ok(Self {
            tx,
            is_connected,
            handle: Some(handle),
        })
    }

    /// 投递动作（不等待执行）
    pub fn send(&self, action: RobotAction) -> Result<(), ControlError> {
        self.tx
            .send(action)
            .map_err(|_| ControlError::WorkerStopped)
    }

    pub fn connect(&self) -> Result<(), ControlError> {
        self.send(RobotAction::Connect)
    }

    pub fn play(&self, occupied: Vec<String>) -> Result<(), ControlError> {
        self.send(RobotAction::Move { occupied })
    }

    pub fn disconnect(&self) -> Result<(), ControlError> {
        self.send(RobotAction::Disconnect)
    }

    pub fn reset(&self) -> Result<(), ControlError> {
        self.send(RobotAction::Reset)
    }

    /// 最近一次动作执行后的连接状态
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::Acquire)
    }

    /// 执行完队列中已有的动作后退出
    pub fn shutdown(mut self) -> Result<(), ControlError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), ControlError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.tx.send(RobotAction::Shutdown);
        handle
            .join()
            .map_err(|_| ControlError::WorkerStopped)
    }
}

impl Drop for RobotWorker {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Robot worker did not stop cleanly: {}", e);
        }
    }
}

fn worker_loop<R: RobotOps>(
    mut robot: R,
    port: String,
    rx: Receiver<RobotAction>,
    is_connected: Arc<AtomicBool>,
) {
    let mut game = TurnTracker::new();

    for action in rx.iter() {
        match action {
            RobotAction::Connect => match robot.connect(&port) {
                Ok(()) => info!("Connected to {}", port),
                Err(e) => error!("Connecting to {} failed: {}", port, e),
            },
            RobotAction::Move { occupied } => {
                for label in &occupied {
                    game.set_field(label);
                }
                info!("Occupied fields: {}", occupied.join(", "));
                if let Err(e) = play_turn(&mut robot, &mut game) {
                    error!("Move failed: {}", e);
                }
            },
            RobotAction::Disconnect => {
                robot.disconnect();
                info!("Disconnected from {}", port);
            },
            RobotAction::Reset => game.reset(),
            RobotAction::Shutdown => break,
        }
        is_connected.store(robot.is_connected(), Ordering::Release);
    }

    robot.disconnect();
    is_connected.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Connect(String),
        Disconnect,
        Move(NamedPosition),
        Pick,
        Place,
    }

    #[derive(Clone, Default)]
    struct FakeRobot {
        calls: Arc<Mutex<Vec<Call>>>,
        connected: bool,
        fail_connect: bool,
    }

    impl RobotOps for FakeRobot {
        fn connect(&mut self, port: &str) -> ClientResult<()> {
            self.calls.lock().push(Call::Connect(port.to_string()));
            if self.fail_connect {
                return Err(ClientError::NotConnected);
            }
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            if self.connected {
                self.calls.lock().push(Call::Disconnect);
            }
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn move_to_named(&mut self, slot: NamedPosition) -> ClientResult<MoveReport> {
            if !self.connected {
                return Err(ClientError::NotConnected);
            }
            self.calls.lock().push(Call::Move(slot));
            Ok(report())
        }

        fn pick(&mut self) -> ClientResult<MoveReport> {
            self.calls.lock().push(Call::Pick);
            Ok(report())
        }

        fn place(&mut self) -> ClientResult<MoveReport> {
            self.calls.lock().push(Call::Place);
            Ok(report())
        }
    }

    fn connected_robot() -> FakeRobot {
        FakeRobot {
            connected: true,
            ..FakeRobot::default()
        }
    }

    fn report() -> MoveReport {
        MoveReport {
            target: uarm_client::Position::ORIGIN,
            polls: 1,
            converged: true,
            observed: uarm_client::Position::ORIGIN,
        }
    }

    #[test]
    fn test_play_turn_sequence() {
        let mut robot = connected_robot();
        let mut game = TurnTracker::new();
        game.set_field("A1");

        let field = play_turn(&mut robot, &mut game).unwrap();
        assert_eq!(field, Some(NamedPosition::A2));
        assert!(game.is_occupied(NamedPosition::A2));
        assert_eq!(
            *robot.calls.lock(),
            vec![
                Call::Move(NamedPosition::R1),
                Call::Pick,
                Call::Move(NamedPosition::A2),
                Call::Place,
                Call::Move(NamedPosition::P1),
            ]
        );
    }

    #[test]
    fn test_play_turn_uses_next_storage_slot() {
        let mut robot = connected_robot();
        let mut game = TurnTracker::new();
        play_turn(&mut robot, &mut game).unwrap();
        play_turn(&mut robot, &mut game).unwrap();

        let stores: Vec<_> = robot
            .calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                Call::Move(p) if !p.is_field() && !p.is_parking() => Some(*p),
                _ => None,
            })
            .collect();
        assert_eq!(stores, vec![NamedPosition::R1, NamedPosition::R2]);
    }

    #[test]
    fn test_play_turn_after_limit_does_nothing() {
        let mut robot = connected_robot();
        let mut game = TurnTracker::new();
        for _ in 0..MAX_MOVES {
            play_turn(&mut robot, &mut game).unwrap();
        }
        let before = robot.calls.lock().len();
        assert_eq!(play_turn(&mut robot, &mut game).unwrap(), None);
        assert_eq!(robot.calls.lock().len(), before);
    }

    #[test]
    fn test_worker_runs_actions_in_order() {
        let robot = FakeRobot::default();
        let calls = robot.calls.clone();
        let worker = RobotWorker::spawn(robot, "/dev/ttyUSB0").unwrap();

        worker.connect().unwrap();
        worker.play(vec!["A1".into(), "B2".into()]).unwrap();
        worker.disconnect().unwrap();
        worker.shutdown().unwrap();

        let calls = calls.lock().clone();
        assert_eq!(calls.first(), Some(&Call::Connect("/dev/ttyUSB0".into())));
        assert!(calls.contains(&Call::Move(NamedPosition::A2)));
        assert_eq!(calls.last(), Some(&Call::Disconnect));
        assert_eq!(calls.iter().filter(|c| **c == Call::Disconnect).count(), 1);
    }

    #[test]
    fn test_worker_publishes_connection_state() {
        let worker = RobotWorker::spawn(FakeRobot::default(), "sim").unwrap();
        assert!(!worker.is_connected());

        worker.connect().unwrap();
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(1);
        while !worker.is_connected() && std::time::Instant::now() < deadline {
            std::thread::sleep(std::time::Duration::from_millis(2));
        }
        assert!(worker.is_connected());
    }

    #[test]
    fn test_failed_connect_stays_disconnected() {
        let robot = FakeRobot {
            fail_connect: true,
            ..FakeRobot::default()
        };
        let calls = robot.calls.clone();
        let worker = RobotWorker::spawn(robot, "sim").unwrap();
        worker.connect().unwrap();
        worker.play(Vec::new()).unwrap();
        worker.shutdown().unwrap();

        // 未连接时走子在第一次移动就失败
        assert_eq!(*calls.lock(), vec![Call::Connect("sim".into())]);
    }

    #[test]
    fn test_reset_restarts_storage_slots() {
        let robot = FakeRobot::default();
        let calls = robot.calls.clone();
        let worker = RobotWorker::spawn(robot, "sim").unwrap();
        worker.connect().unwrap();
        worker.play(Vec::new()).unwrap();
        worker.reset().unwrap();
        worker.play(Vec::new()).unwrap();
        worker.shutdown().unwrap();

        let stores = calls
            .lock()
            .iter()
            .filter(|c| **c == Call::Move(NamedPosition::R1))
            .count();
        assert_eq!(stores, 2);
    }
}
