//! Mock 链路与模拟设备（无硬件依赖）
//!
//! [`mock_link`] 创建一对互联的端点：
//! - [`MockAdapter`]：主机侧，实现 [`SplittableAdapter`]，交给驱动使用
//! - [`MockDevice`]：设备侧，测试代码用它注入响应字节、读取主机发出的命令帧
//!
//! [`SimulatedArm`] 在 `MockDevice` 之上运行一个后台线程，按命令语义应答，
//! 用于端到端测试。

use crate::{LinkError, RxAdapter, SplittableAdapter, TxAdapter, UarmFrame};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use uarm_protocol::{Command, DeviceResponse, FrameParser, Position, ServoTarget};

/// 发送故障注入
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteFault {
    #[default]
    None,
    /// 只写出前 n 个字节
    Short(usize),
    /// 写入失败（链路关闭）
    Closed,
}

/// 创建互联的主机端与设备端
pub fn mock_link() -> (MockAdapter, MockDevice) {
    let (to_host_tx, to_host_rx) = crossbeam_channel::unbounded();
    let (to_device_tx, to_device_rx) = crossbeam_channel::unbounded();
    let fault = Arc::new(Mutex::new(WriteFault::None));

    (
        MockAdapter {
            rx: MockRxAdapter {
                chunks: to_host_rx,
                pending: VecDeque::new(),
                timeout: crate::serial::DEFAULT_READ_TIMEOUT,
            },
            tx: MockTxAdapter {
                bytes: to_device_tx,
                fault: fault.clone(),
            },
        },
        MockDevice {
            to_host: to_host_tx,
            from_host: to_device_rx,
            parser: FrameParser::for_commands(),
            frames: VecDeque::new(),
            fault,
        },
    )
}

/// 主机侧 Mock 适配器
pub struct MockAdapter {
    rx: MockRxAdapter,
    tx: MockTxAdapter,
}

impl SplittableAdapter for MockAdapter {
    type RxAdapter = MockRxAdapter;
    type TxAdapter = MockTxAdapter;

    fn split(self) -> Result<(MockRxAdapter, MockTxAdapter), LinkError> {
        Ok((self.rx, self.tx))
    }
}

pub struct MockRxAdapter {
    chunks: Receiver<Vec<u8>>,
    pending: VecDeque<u8>,
    timeout: Duration,
}

impl RxAdapter for MockRxAdapter {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if self.pending.is_empty() {
            match self.chunks.recv_timeout(self.timeout) {
                Ok(chunk) => self.pending.extend(chunk),
                Err(RecvTimeoutError::Timeout) => return Err(LinkError::Timeout),
                Err(RecvTimeoutError::Disconnected) => return Err(LinkError::Closed),
            }
        }

        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.timeout = timeout;
        Ok(())
    }
}

pub struct MockTxAdapter {
    bytes: Sender<Vec<u8>>,
    fault: Arc<Mutex<WriteFault>>,
}

impl TxAdapter for MockTxAdapter {
    fn send(&mut self, frame: &UarmFrame) -> Result<(), LinkError> {
        let bytes = frame.as_bytes();
        match *self.fault.lock() {
            WriteFault::None => {},
            WriteFault::Short(n) => {
                let written = n.min(bytes.len());
                let _ = self.bytes.send(bytes[..written].to_vec());
                return Err(LinkError::ShortWrite {
                    expected: bytes.len(),
                    written,
                });
            },
            WriteFault::Closed => return Err(LinkError::Closed),
        }
        self.bytes.send(bytes.to_vec()).map_err(|_| LinkError::Closed)
    }
}

/// 设备侧端点
pub struct MockDevice {
    to_host: Sender<Vec<u8>>,
    from_host: Receiver<Vec<u8>>,
    parser: FrameParser,
    frames: VecDeque<UarmFrame>,
    fault: Arc<Mutex<WriteFault>>,
}

impl MockDevice {
    /// 注入原始字节（可以是不完整帧或调试文本）
    pub fn inject(&self, bytes: &[u8]) {
        let _ = self.to_host.send(bytes.to_vec());
    }

    /// 发送一个响应帧
    pub fn respond(&self, response: DeviceResponse) {
        self.inject(response.to_frame().as_bytes());
    }

    /// 设置主机发送故障
    pub fn set_write_fault(&self, fault: WriteFault) {
        *self.fault.lock() = fault;
    }

    fn absorb(&mut self, chunk: &[u8]) {
        let frames: Vec<UarmFrame> = self.parser.feed(chunk).frames().collect();
        self.frames.extend(frames);
    }

    /// 等待主机发来的下一帧
    pub fn recv_frame_timeout(&mut self, timeout: Duration) -> Option<UarmFrame> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = self.frames.pop_front() {
                return Some(frame);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.from_host.recv_timeout(remaining) {
                Ok(chunk) => self.absorb(&chunk),
                Err(_) => return None,
            }
        }
    }

    /// 取出已经到达的全部帧（不阻塞）
    pub fn drain_frames(&mut self) -> Vec<UarmFrame> {
        loop {
            match self.from_host.try_recv() {
                Ok(chunk) => self.absorb(&chunk),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.frames.drain(..).collect()
    }
}

// ============================================================================
// 模拟机械臂
// ============================================================================

/// 模拟机械臂的内部状态
#[derive(Debug, Clone)]
pub struct SimState {
    pub position: Position,
    pub attached: [bool; 4],
    pub angles: [i16; 4],
    pub pump_on: bool,
    /// 是否应答查询（false 时模拟设备静默）
    pub responsive: bool,
    /// 移动命令之后，需要多少次位置查询才到达目标
    pub travel_polls: u32,
    /// 每个应答之前附加的调试文本
    pub chatter: Vec<u8>,
    /// 收到的全部命令（按顺序）
    pub commands: Vec<Command>,
    target: Option<(Position, u32)>,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            position: Position::new(0, 150, 100),
            attached: [false; 4],
            angles: [900; 4],
            pump_on: false,
            responsive: true,
            travel_polls: 0,
            chatter: Vec::new(),
            commands: Vec::new(),
            target: None,
        }
    }
}

impl SimState {
    fn handle(&mut self, command: Command) -> Option<DeviceResponse> {
        self.commands.push(command);
        match command {
            Command::AttachDetach(cmd) => {
                match cmd.target {
                    ServoTarget::All => self.attached = [cmd.attach; 4],
                    ServoTarget::One(id) => self.attached[u8::from(id) as usize] = cmd.attach,
                }
                None
            },
            Command::IsAttached(cmd) => {
                let servo = u8::from(cmd.servo);
                Some(DeviceResponse::AttachedState {
                    servo,
                    attached: self.attached[servo as usize],
                })
            },
            Command::WriteAngle(cmd) => {
                self.angles[u8::from(cmd.servo) as usize] = cmd.angle;
                None
            },
            Command::ReadAngle(cmd) => {
                let servo = u8::from(cmd.servo);
                Some(DeviceResponse::ServoAngle {
                    servo,
                    angle: self.angles[servo as usize],
                })
            },
            Command::MoveTo(cmd) => {
                if self.travel_polls == 0 {
                    self.position = cmd.target;
                    self.target = None;
                } else {
                    self.target = Some((cmd.target, self.travel_polls));
                }
                None
            },
            Command::GetPosition => {
                if let Some((target, remaining)) = self.target.take() {
                    if remaining <= 1 {
                        self.position = target;
                    } else {
                        self.target = Some((target, remaining - 1));
                    }
                }
                Some(DeviceResponse::Position(self.position))
            },
            Command::Pick(_) => None,
            Command::Pump(cmd) => {
                self.pump_on = cmd.on;
                None
            },
            Command::Stop => {
                self.target = None;
                None
            },
        }
    }
}

/// 在后台线程运行的模拟机械臂
///
/// 线程在 `Drop` 时停止。
pub struct SimulatedArm {
    state: Arc<Mutex<SimState>>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimulatedArm {
    /// 创建 Mock 链路并启动模拟设备，返回主机侧适配器
    pub fn spawn() -> (MockAdapter, SimulatedArm) {
        Self::spawn_with(SimState::default())
    }

    pub fn spawn_with(initial: SimState) -> (MockAdapter, SimulatedArm) {
        let (adapter, device) = mock_link();
        let state = Arc::new(Mutex::new(initial));
        let running = Arc::new(AtomicBool::new(true));

        let thread_state = state.clone();
        let thread_running = running.clone();
        let handle = std::thread::Builder::new()
            .name("uarm-sim".into())
            .spawn(move || simulate(device, thread_state, thread_running))
            .ok();

        (
            adapter,
            SimulatedArm {
                state,
                running,
                handle,
            },
        )
    }

    /// 修改模拟状态
    pub fn with_state<R>(&self, f: impl FnOnce(&mut SimState) -> R) -> R {
        f(&mut self.state.lock())
    }

    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().commands.clone()
    }

    /// 等待至少收到 `count` 条命令
    pub fn wait_for_commands(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if self.state.lock().commands.len() >= count {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        self.state.lock().commands.len() >= count
    }
}

impl Drop for SimulatedArm {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn simulate(mut device: MockDevice, state: Arc<Mutex<SimState>>, running: Arc<AtomicBool>) {
    while running.load(Ordering::Acquire) {
        let Some(frame) = device.recv_frame_timeout(Duration::from_millis(10)) else {
            continue;
        };
        let Ok(command) = Command::try_from(&frame) else {
            continue;
        };

        let (reply, chatter) = {
            let mut state = state.lock();
            let reply = state.handle(command);
            if state.responsive {
                (reply, state.chatter.clone())
            } else {
                (None, Vec::new())
            }
        };

        if let Some(reply) = reply {
            if !chatter.is_empty() {
                device.inject(&chatter);
            }
            device.respond(reply);
        }
    }
}
