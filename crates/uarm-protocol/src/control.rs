//! 命令帧结构体定义（主机 → 设备）
//!
//! 所有命令帧以 [`HEADER_ALERT_BYTE`] 开头。多字节数值使用 [`split_i16`] /
//! [`split_u16`] 编码。

use crate::{
    CommandCode, HEADER_ALERT_BYTE, Position, ProtocolError, ServoId, ServoTarget, UarmFrame,
    join_i16, split_i16, split_u16,
};

/// 构建命令帧（负载长度由各命令固定，不会超过上限）
fn command_frame(code: CommandCode, payload: &[u8]) -> UarmFrame {
    let mut data = [0u8; crate::FRAME_CAPACITY];
    let len = payload.len().min(crate::MAX_MESSAGE_SIZE);
    data[0] = HEADER_ALERT_BYTE;
    data[1] = code.into();
    data[2] = len as u8;
    data[crate::HEADER_SIZE..crate::HEADER_SIZE + len].copy_from_slice(&payload[..len]);
    UarmFrame::from_buffer(data, crate::HEADER_SIZE + len)
}

fn expect_payload(frame: &UarmFrame, expected: usize) -> Result<&[u8], ProtocolError> {
    let payload = frame.payload();
    if payload.len() < expected {
        return Err(ProtocolError::InvalidLength {
            expected,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

// ============================================================================
// 舵机锁定
// ============================================================================

/// 舵机上电锁定 / 释放指令 (code 1)
///
/// 负载：`[servo | 0xFF, attach]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachDetachCommand {
    pub target: ServoTarget,
    pub attach: bool,
}

impl AttachDetachCommand {
    pub fn new(target: impl Into<ServoTarget>, attach: bool) -> Self {
        Self {
            target: target.into(),
            attach,
        }
    }

    /// 全部舵机
    pub fn all(attach: bool) -> Self {
        Self {
            target: ServoTarget::All,
            attach,
        }
    }

    pub fn to_frame(self) -> UarmFrame {
        command_frame(
            CommandCode::AttachDetach,
            &[self.target.as_byte(), self.attach as u8],
        )
    }
}

/// 查询舵机锁定状态 (code 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsAttachedCommand {
    pub servo: ServoId,
}

impl IsAttachedCommand {
    pub fn new(servo: ServoId) -> Self {
        Self { servo }
    }

    pub fn to_frame(self) -> UarmFrame {
        command_frame(CommandCode::IsAttached, &[self.servo.into()])
    }
}

// ============================================================================
// 舵机角度
// ============================================================================

/// 写舵机角度 (code 3)
///
/// 负载：`[servo, angle_hi, angle_lo, speed]`，角度单位为 0.1°
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteAngleCommand {
    pub servo: ServoId,
    pub angle: i16,
    pub speed: u8,
}

impl WriteAngleCommand {
    pub fn new(servo: ServoId, angle: i16, speed: u8) -> Self {
        Self {
            servo,
            angle,
            speed,
        }
    }

    pub fn to_frame(self) -> UarmFrame {
        let [hi, lo] = split_i16(self.angle);
        command_frame(
            CommandCode::WriteServoAngle,
            &[self.servo.into(), hi, lo, self.speed],
        )
    }
}

/// 读舵机角度 (code 4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadAngleCommand {
    pub servo: ServoId,
}

impl ReadAngleCommand {
    pub fn new(servo: ServoId) -> Self {
        Self { servo }
    }

    pub fn to_frame(self) -> UarmFrame {
        command_frame(CommandCode::ReadServoAngle, &[self.servo.into()])
    }
}

// ============================================================================
// 运动
// ============================================================================

/// 移动到笛卡尔坐标 (code 5)
///
/// 负载：`[x_hi, x_lo, y_hi, y_lo, z_hi, z_lo, speed]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveToCommand {
    pub target: Position,
    pub speed: u8,
}

impl MoveToCommand {
    pub fn new(target: Position, speed: u8) -> Self {
        Self { target, speed }
    }

    pub fn to_frame(self) -> UarmFrame {
        let [xh, xl] = split_i16(self.target.x);
        let [yh, yl] = split_i16(self.target.y);
        let [zh, zl] = split_i16(self.target.z);
        command_frame(CommandCode::MoveTo, &[xh, xl, yh, yl, zh, zl, self.speed])
    }
}

/// 向下探测抓取 (code 7)
///
/// 负载：`[distance_hi, distance_lo]`（无符号）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PickCommand {
    pub distance: u16,
}

impl PickCommand {
    pub fn new(distance: u16) -> Self {
        Self { distance }
    }

    pub fn to_frame(self) -> UarmFrame {
        command_frame(CommandCode::Pick, &split_u16(self.distance))
    }
}

/// 气泵开关 (code 8)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PumpCommand {
    pub on: bool,
}

impl PumpCommand {
    pub fn new(on: bool) -> Self {
        Self { on }
    }

    pub fn to_frame(self) -> UarmFrame {
        command_frame(CommandCode::PumpOnOff, &[self.on as u8])
    }
}

/// 无负载命令帧：位置查询 (code 6) / 停止 (code 9)
pub fn get_position_frame() -> UarmFrame {
    command_frame(CommandCode::GetPosition, &[])
}

pub fn stop_frame() -> UarmFrame {
    command_frame(CommandCode::Stop, &[])
}

// ============================================================================
// 命令解码（设备侧视角，用于模拟器和抓包分析）
// ============================================================================

/// 已解码的命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    AttachDetach(AttachDetachCommand),
    IsAttached(IsAttachedCommand),
    WriteAngle(WriteAngleCommand),
    ReadAngle(ReadAngleCommand),
    MoveTo(MoveToCommand),
    GetPosition,
    Pick(PickCommand),
    Pump(PumpCommand),
    Stop,
}

impl Command {
    pub fn code(&self) -> CommandCode {
        match self {
            Command::AttachDetach(_) => CommandCode::AttachDetach,
            Command::IsAttached(_) => CommandCode::IsAttached,
            Command::WriteAngle(_) => CommandCode::WriteServoAngle,
            Command::ReadAngle(_) => CommandCode::ReadServoAngle,
            Command::MoveTo(_) => CommandCode::MoveTo,
            Command::GetPosition => CommandCode::GetPosition,
            Command::Pick(_) => CommandCode::Pick,
            Command::Pump(_) => CommandCode::PumpOnOff,
            Command::Stop => CommandCode::Stop,
        }
    }

    pub fn to_frame(&self) -> UarmFrame {
        match *self {
            Command::AttachDetach(cmd) => cmd.to_frame(),
            Command::IsAttached(cmd) => cmd.to_frame(),
            Command::WriteAngle(cmd) => cmd.to_frame(),
            Command::ReadAngle(cmd) => cmd.to_frame(),
            Command::MoveTo(cmd) => cmd.to_frame(),
            Command::GetPosition => get_position_frame(),
            Command::Pick(cmd) => cmd.to_frame(),
            Command::Pump(cmd) => cmd.to_frame(),
            Command::Stop => stop_frame(),
        }
    }
}

fn servo_at(payload: &[u8], index: usize) -> Result<ServoId, ProtocolError> {
    let value = payload[index];
    ServoId::try_from(value).map_err(|_| ProtocolError::InvalidValue {
        field: "ServoId".to_string(),
        value,
    })
}

impl TryFrom<&UarmFrame> for Command {
    type Error = ProtocolError;

    fn try_from(frame: &UarmFrame) -> Result<Self, Self::Error> {
        if frame.marker() != HEADER_ALERT_BYTE {
            return Err(ProtocolError::InvalidMarker {
                byte: frame.marker(),
            });
        }

        let code = frame.code();
        let code = CommandCode::try_from(code).map_err(|_| ProtocolError::UnknownCommand { code })?;

        let command = match code {
            CommandCode::AttachDetach => {
                let p = expect_payload(frame, 2)?;
                Command::AttachDetach(AttachDetachCommand {
                    target: ServoTarget::try_from(p[0])?,
                    attach: p[1] != 0,
                })
            },
            CommandCode::IsAttached => {
                let p = expect_payload(frame, 1)?;
                Command::IsAttached(IsAttachedCommand::new(servo_at(p, 0)?))
            },
            CommandCode::WriteServoAngle => {
                let p = expect_payload(frame, 4)?;
                Command::WriteAngle(WriteAngleCommand::new(
                    servo_at(p, 0)?,
                    join_i16(p[1], p[2]),
                    p[3],
                ))
            },
            CommandCode::ReadServoAngle => {
                let p = expect_payload(frame, 1)?;
                Command::ReadAngle(ReadAngleCommand::new(servo_at(p, 0)?))
            },
            CommandCode::MoveTo => {
                let p = expect_payload(frame, 7)?;
                Command::MoveTo(MoveToCommand::new(
                    Position::new(
                        join_i16(p[0], p[1]),
                        join_i16(p[2], p[3]),
                        join_i16(p[4], p[5]),
                    ),
                    p[6],
                ))
            },
            CommandCode::GetPosition => Command::GetPosition,
            CommandCode::Pick => {
                let p = expect_payload(frame, 2)?;
                let distance = u16::from(p[0]) * 128 + u16::from(p[1]);
                Command::Pick(PickCommand::new(distance))
            },
            CommandCode::PumpOnOff => {
                let p = expect_payload(frame, 1)?;
                Command::Pump(PumpCommand::new(p[0] != 0))
            },
            CommandCode::Stop => Command::Stop,
        };

        Ok(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FrameParser;

    #[test]
    fn test_attach_all_frame() {
        let frame = AttachDetachCommand::all(true).to_frame();
        assert_eq!(frame.as_bytes(), &[0xAA, 0x01, 0x02, 0xFF, 0x01]);

        let frame = AttachDetachCommand::new(ServoId::Left, false).to_frame();
        assert_eq!(frame.as_bytes(), &[0xAA, 0x01, 0x02, 0x01, 0x00]);
    }

    #[test]
    fn test_is_attached_frame() {
        let frame = IsAttachedCommand::new(ServoId::Right).to_frame();
        assert_eq!(frame.as_bytes(), &[0xAA, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_write_angle_frame() {
        let frame = WriteAngleCommand::new(ServoId::Hand, 900, 40).to_frame();
        // 900 = 7 * 128 + 4
        assert_eq!(frame.as_bytes(), &[0xAA, 0x03, 0x04, 0x03, 7, 4, 40]);
    }

    #[test]
    fn test_read_angle_frame() {
        let frame = ReadAngleCommand::new(ServoId::Rot).to_frame();
        assert_eq!(frame.as_bytes(), &[0xAA, 0x04, 0x01, 0x00]);
    }

    #[test]
    fn test_move_to_frame() {
        let frame = MoveToCommand::new(Position::new(300, -131, 60), 40).to_frame();
        assert_eq!(
            frame.as_bytes(),
            &[0xAA, 0x05, 0x07, 2, 44, 0xFF, 0xFD, 0, 60, 40]
        );
    }

    #[test]
    fn test_payloadless_frames() {
        assert_eq!(get_position_frame().as_bytes(), &[0xAA, 0x06, 0x00]);
        assert_eq!(stop_frame().as_bytes(), &[0xAA, 0x09, 0x00]);
    }

    #[test]
    fn test_pick_and_pump_frames() {
        assert_eq!(
            PickCommand::new(40).to_frame().as_bytes(),
            &[0xAA, 0x07, 0x02, 0, 40]
        );
        assert_eq!(
            PumpCommand::new(true).to_frame().as_bytes(),
            &[0xAA, 0x08, 0x01, 0x01]
        );
        assert_eq!(
            PumpCommand::new(false).to_frame().as_bytes(),
            &[0xAA, 0x08, 0x01, 0x00]
        );
    }

    /// 每条命令经过分帧器重新解码后与原命令一致
    #[test]
    fn test_commands_survive_parser() {
        let commands = [
            Command::AttachDetach(AttachDetachCommand::all(false)),
            Command::IsAttached(IsAttachedCommand::new(ServoId::Left)),
            Command::WriteAngle(WriteAngleCommand::new(ServoId::Rot, -450, 10)),
            Command::ReadAngle(ReadAngleCommand::new(ServoId::Hand)),
            Command::MoveTo(MoveToCommand::new(Position::new(-131, 158, 103), 40)),
            Command::GetPosition,
            Command::Pick(PickCommand::new(40)),
            Command::Pump(PumpCommand::new(true)),
            Command::Stop,
        ];

        let mut parser = FrameParser::for_commands();
        for command in commands {
            let frame = command.to_frame();
            let decoded: Vec<UarmFrame> = parser.feed(frame.as_bytes()).frames().collect();
            assert_eq!(decoded.len(), 1, "{:?}", command);
            assert_eq!(decoded[0], frame);

            let back = Command::try_from(&decoded[0]).unwrap();
            assert_eq!(back.code(), command.code());
            assert_eq!(back.to_frame(), frame);
        }
    }

    #[test]
    fn test_decode_rejects_response_marker() {
        let frame = UarmFrame::new(crate::HEADER_RESPONSE_BYTE, 0x06, &[]).unwrap();
        assert!(matches!(
            Command::try_from(&frame),
            Err(ProtocolError::InvalidMarker { byte: 0xBB })
        ));
    }

    #[test]
    fn test_decode_short_payload() {
        let frame = UarmFrame::new(HEADER_ALERT_BYTE, 0x05, &[0, 1, 0, 2]).unwrap();
        assert!(matches!(
            Command::try_from(&frame),
            Err(ProtocolError::InvalidLength {
                expected: 7,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_decode_unknown_code() {
        let frame = UarmFrame::new(HEADER_ALERT_BYTE, 0x20, &[]).unwrap();
        assert!(matches!(
            Command::try_from(&frame),
            Err(ProtocolError::UnknownCommand { code: 0x20 })
        ));
    }
}
