//! 命令码、响应码与舵机编号

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 命令码（主机 → 设备，位于 0xAA 帧的第 2 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CommandCode {
    /// 舵机上电锁定 / 释放
    AttachDetach = 1,
    /// 查询舵机锁定状态
    IsAttached = 2,
    /// 写舵机角度
    WriteServoAngle = 3,
    /// 读舵机角度
    ReadServoAngle = 4,
    /// 移动到笛卡尔坐标
    MoveTo = 5,
    /// 查询当前位置
    GetPosition = 6,
    /// 向下探测抓取
    Pick = 7,
    /// 气泵开关
    PumpOnOff = 8,
    /// 停止运动
    Stop = 9,
}

/// 响应码（设备 → 主机，位于 0xBB 帧的第 2 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ResponseCode {
    AttachedState = 1,
    ServoAngle = 2,
    Position = 3,
}

/// 舵机编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ServoId {
    /// 底座旋转
    Rot = 0,
    /// 左臂
    Left = 1,
    /// 右臂
    Right = 2,
    /// 末端手腕
    Hand = 3,
}

impl ServoId {
    /// 全部舵机（按编号顺序）
    pub const ALL: [ServoId; 4] = [ServoId::Rot, ServoId::Left, ServoId::Right, ServoId::Hand];

    /// 小写名称（用于 CLI 与日志）
    pub fn name(self) -> &'static str {
        match self {
            ServoId::Rot => "rot",
            ServoId::Left => "left",
            ServoId::Right => "right",
            ServoId::Hand => "hand",
        }
    }
}

impl std::str::FromStr for ServoId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rot" | "0" => Ok(ServoId::Rot),
            "left" | "1" => Ok(ServoId::Left),
            "right" | "2" => Ok(ServoId::Right),
            "hand" | "3" => Ok(ServoId::Hand),
            other => Err(format!("unknown servo '{}' (expected rot/left/right/hand)", other)),
        }
    }
}

/// "全部舵机" 的线上编号
pub const ALL_SERVOS: u8 = 0xFF;

/// 锁定/释放指令的目标：单个舵机或全部舵机
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServoTarget {
    One(ServoId),
    All,
}

impl ServoTarget {
    /// 线上字节
    pub fn as_byte(self) -> u8 {
        match self {
            ServoTarget::One(id) => id.into(),
            ServoTarget::All => ALL_SERVOS,
        }
    }
}

impl From<ServoId> for ServoTarget {
    fn from(id: ServoId) -> Self {
        ServoTarget::One(id)
    }
}

impl TryFrom<u8> for ServoTarget {
    type Error = crate::ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == ALL_SERVOS {
            return Ok(ServoTarget::All);
        }
        ServoId::try_from(value)
            .map(ServoTarget::One)
            .map_err(|_| crate::ProtocolError::InvalidValue {
                field: "ServoTarget".to_string(),
                value,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_values() {
        assert_eq!(u8::from(CommandCode::AttachDetach), 1);
        assert_eq!(u8::from(CommandCode::Stop), 9);
        assert_eq!(CommandCode::try_from(5).unwrap(), CommandCode::MoveTo);
        assert!(CommandCode::try_from(0).is_err());
        assert!(CommandCode::try_from(10).is_err());
    }

    #[test]
    fn test_response_code_values() {
        assert_eq!(ResponseCode::try_from(3).unwrap(), ResponseCode::Position);
        assert!(ResponseCode::try_from(4).is_err());
    }

    #[test]
    fn test_servo_target_bytes() {
        assert_eq!(ServoTarget::All.as_byte(), 0xFF);
        assert_eq!(ServoTarget::One(ServoId::Hand).as_byte(), 3);
        assert_eq!(ServoTarget::try_from(0xFF).unwrap(), ServoTarget::All);
        assert_eq!(
            ServoTarget::try_from(1).unwrap(),
            ServoTarget::One(ServoId::Left)
        );
        assert!(ServoTarget::try_from(4).is_err());
    }

    #[test]
    fn test_servo_from_str() {
        assert_eq!("ROT".parse::<ServoId>().unwrap(), ServoId::Rot);
        assert_eq!("2".parse::<ServoId>().unwrap(), ServoId::Right);
        assert!("elbow".parse::<ServoId>().is_err());
    }
}
