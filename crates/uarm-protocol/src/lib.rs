//! # uArm Protocol
//!
//! uArm Metal 串口帧协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `codes`: 命令码、响应码、舵机编号
//! - `control`: 命令帧构建（主机 → 设备）
//! - `feedback`: 响应帧解析（设备 → 主机）
//! - `parser`: 字节流分帧状态机
//! - `position`: 笛卡尔坐标（毫米，容差相等）
//!
//! ## 帧格式
//!
//! ```text
//! [marker, code, length, payload[0..length]]
//!   marker = 0xAA（命令）/ 0xBB（响应）
//!   0 <= length <= MAX_MESSAGE_SIZE (10)
//! ```
//!
//! ## 数值编码
//!
//! 多字节数值按 `v / 128`、`v % 128` 拆分（截断除法），解码为 `hi * 128 + lo`
//! （两个字节按有符号解释）。这不是真正的 7-bit 安全编码：负数会产生最高位为 1
//! 的字节，绝对值超过 16383 的数值会被截断。见 [`split_i16`] / [`join_i16`]。

pub mod codes;
pub mod control;
pub mod feedback;
pub mod parser;
pub mod position;

// 重新导出常用类型
pub use codes::*;
pub use control::*;
pub use feedback::*;
pub use parser::*;
pub use position::*;

use thiserror::Error;

/// 帧头长度（marker + code + length）
pub const HEADER_SIZE: usize = 3;

/// 最大负载长度
pub const MAX_MESSAGE_SIZE: usize = 10;

/// 帧缓冲区容量（帧头 + 最大负载）
pub const FRAME_CAPACITY: usize = HEADER_SIZE + MAX_MESSAGE_SIZE;

/// 命令帧起始字节（主机 → 设备）
pub const HEADER_ALERT_BYTE: u8 = 0xAA;

/// 响应帧起始字节（设备 → 主机）
pub const HEADER_RESPONSE_BYTE: u8 = 0xBB;

/// 协议帧的统一抽象
///
/// 命令帧和响应帧共用同一类型，区别只在于 `marker()`。
///
/// # 设计特性
///
/// - **Copy trait**：固定 13 字节缓冲区，无堆分配
/// - **长度上限**：负载最多 [`MAX_MESSAGE_SIZE`] 字节，这是协议不变量，不是实现限制
///
/// ```rust
/// use uarm_protocol::{UarmFrame, HEADER_ALERT_BYTE};
///
/// let frame = UarmFrame::new(HEADER_ALERT_BYTE, 0x06, &[]).unwrap();
/// assert_eq!(frame.as_bytes(), &[0xAA, 0x06, 0x00]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UarmFrame {
    /// 帧数据（帧头 + 负载，未使用部分为 0）
    pub data: [u8; FRAME_CAPACITY],

    /// 有效字节数（包含帧头）
    pub len: u8,
}

impl UarmFrame {
    /// 创建帧
    ///
    /// # 错误
    /// - `ProtocolError::PayloadTooLong`: 负载超过 [`MAX_MESSAGE_SIZE`]
    pub fn new(marker: u8, code: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        if payload.len() > MAX_MESSAGE_SIZE {
            return Err(ProtocolError::PayloadTooLong { len: payload.len() });
        }

        let mut data = [0u8; FRAME_CAPACITY];
        data[0] = marker;
        data[1] = code;
        data[2] = payload.len() as u8;
        data[HEADER_SIZE..HEADER_SIZE + payload.len()].copy_from_slice(payload);

        Ok(Self {
            data,
            len: (HEADER_SIZE + payload.len()) as u8,
        })
    }

    /// 从已校验的缓冲区构建（分帧状态机内部使用）
    pub(crate) fn from_buffer(data: [u8; FRAME_CAPACITY], len: usize) -> Self {
        Self {
            data,
            len: len as u8,
        }
    }

    /// 起始字节
    pub fn marker(&self) -> u8 {
        self.data[0]
    }

    /// 命令码 / 响应码
    pub fn code(&self) -> u8 {
        self.data[1]
    }

    /// 负载切片（只包含有效数据）
    pub fn payload(&self) -> &[u8] {
        &self.data[HEADER_SIZE..self.len as usize]
    }

    /// 线上字节序列
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 是否为响应帧
    pub fn is_response(&self) -> bool {
        self.marker() == HEADER_RESPONSE_BYTE
    }
}

/// 协议解析错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Payload too long: {len} bytes (max {max})", max = MAX_MESSAGE_SIZE)]
    PayloadTooLong { len: usize },

    #[error("Invalid marker byte: 0x{byte:02X}")]
    InvalidMarker { byte: u8 },

    #[error("Unknown command code: 0x{code:02X}")]
    UnknownCommand { code: u8 },

    #[error("Unknown response code: 0x{code:02X}")]
    UnknownResponse { code: u8 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },
}

/// 有符号数值拆分为两个字节（`v / 128`, `v % 128`，截断除法）
///
/// 每个结果按低 8 位截断写入字节。负数的商和余数都为负，因此线上字节最高位为 1：
///
/// ```rust
/// use uarm_protocol::split_i16;
///
/// assert_eq!(split_i16(300), [2, 44]);
/// assert_eq!(split_i16(-131), [0xFF, 0xFD]); // -1, -3
/// ```
pub fn split_i16(value: i16) -> [u8; 2] {
    [(value / 128) as u8, (value % 128) as u8]
}

/// 无符号数值拆分为两个字节（用于抓取距离）
pub fn split_u16(value: u16) -> [u8; 2] {
    [(value / 128) as u8, (value % 128) as u8]
}

/// 两个字节合并为有符号数值（`hi * 128 + lo`，字节按 i8 解释）
///
/// 对 `-16383..=16383` 内的数值与 [`split_i16`] 互逆；超出范围时商被截断：
///
/// ```rust
/// use uarm_protocol::{join_i16, split_i16};
///
/// let [hi, lo] = split_i16(-300);
/// assert_eq!(join_i16(hi, lo), -300);
///
/// let [hi, lo] = split_i16(20000);
/// assert_eq!(join_i16(hi, lo), -12768);
/// ```
pub fn join_i16(hi: u8, lo: u8) -> i16 {
    (i32::from(hi as i8) * 128 + i32::from(lo as i8)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new() {
        let frame = UarmFrame::new(HEADER_ALERT_BYTE, 0x08, &[0x01]).unwrap();
        assert_eq!(frame.marker(), 0xAA);
        assert_eq!(frame.code(), 0x08);
        assert_eq!(frame.payload(), &[0x01]);
        assert_eq!(frame.as_bytes(), &[0xAA, 0x08, 0x01, 0x01]);
        assert!(!frame.is_response());
    }

    #[test]
    fn test_frame_empty_payload() {
        let frame = UarmFrame::new(HEADER_RESPONSE_BYTE, 0x01, &[]).unwrap();
        assert_eq!(frame.len as usize, HEADER_SIZE);
        assert!(frame.payload().is_empty());
        assert!(frame.is_response());
    }

    #[test]
    fn test_frame_max_payload() {
        let frame = UarmFrame::new(HEADER_RESPONSE_BYTE, 0x03, &[7; MAX_MESSAGE_SIZE]).unwrap();
        assert_eq!(frame.as_bytes().len(), FRAME_CAPACITY);
    }

    #[test]
    fn test_frame_payload_too_long() {
        let result = UarmFrame::new(HEADER_ALERT_BYTE, 0x05, &[0; MAX_MESSAGE_SIZE + 1]);
        assert!(matches!(
            result,
            Err(ProtocolError::PayloadTooLong { len: 11 })
        ));
    }

    #[test]
    fn test_split_positive() {
        assert_eq!(split_i16(0), [0, 0]);
        assert_eq!(split_i16(127), [0, 127]);
        assert_eq!(split_i16(128), [1, 0]);
        assert_eq!(split_i16(1800), [14, 8]);
    }

    /// 负数：商和余数均为负，按低 8 位截断
    #[test]
    fn test_split_negative_truncation() {
        assert_eq!(split_i16(-1), [0x00, 0xFF]);
        assert_eq!(split_i16(-128), [0xFF, 0x00]);
        assert_eq!(split_i16(-1800), [0xF2, 0xF8]); // -14, -8
    }

    #[test]
    fn test_join_reads_bytes_as_signed() {
        assert_eq!(join_i16(14, 8), 1800);
        assert_eq!(join_i16(0xF2, 0xF8), -1800);
        // 最高位为 1 的字节不会被当作 128..=255
        assert_eq!(join_i16(0x00, 0x80), -128);
    }

    /// 超出 ±16383 时商溢出 i8，解码结果不再等于原值
    #[test]
    fn test_roundtrip_out_of_range_truncates() {
        let [hi, lo] = split_i16(16384);
        assert_eq!(join_i16(hi, lo), -16384);

        let [hi, lo] = split_i16(i16::MAX);
        assert_eq!(join_i16(hi, lo), -1);
    }

    #[test]
    fn test_split_u16() {
        assert_eq!(split_u16(40), [0, 40]);
        assert_eq!(split_u16(300), [2, 44]);
    }

    #[test]
    fn test_error_display() {
        let err = ProtocolError::PayloadTooLong { len: 12 };
        assert_eq!(err.to_string(), "Payload too long: 12 bytes (max 10)");

        let err = ProtocolError::UnknownResponse { code: 0x09 };
        assert_eq!(err.to_string(), "Unknown response code: 0x09");
    }
}
