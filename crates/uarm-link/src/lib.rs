//! # uArm Link Layer
//!
//! 串口硬件抽象层：把字节流读写包装成统一的收发接口，供驱动层的后台接收线程和
//! 请求线程分别持有。
//!
//! - `serial`: 基于 `serialport` 的真实串口适配器（9600 8N1，无流控）
//! - `mock`（feature = "mock"）: 内存通道适配器与模拟设备，用于测试

use std::time::Duration;
use thiserror::Error;

pub use uarm_protocol::UarmFrame;

pub mod serial;

pub use serial::{SerialAdapter, SerialRxAdapter, SerialTxAdapter, available_ports};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

/// 串口链路统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Short write: expected {expected} bytes, wrote {written}")]
    ShortWrite { expected: usize, written: usize },
    #[error("Link closed")]
    Closed,
}

impl LinkError {
    /// 是否为可忽略的读超时
    pub fn is_timeout(&self) -> bool {
        match self {
            LinkError::Timeout => true,
            LinkError::Io(e) => e.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        }
    }

    /// 是否为致命错误（设备断开、链路关闭），接收线程遇到后应退出
    pub fn is_fatal(&self) -> bool {
        match self {
            LinkError::Closed => true,
            LinkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::UnexpectedEof
                    | std::io::ErrorKind::PermissionDenied
            ),
            LinkError::Serial(e) => e.kind() == serialport::ErrorKind::NoDevice,
            _ => false,
        }
    }
}

/// 接收半部
pub trait RxAdapter {
    /// 读取最多 `buf.len()` 字节
    ///
    /// # 错误
    /// - `LinkError::Timeout`: 读超时内没有数据（正常情况，调用方应继续轮询）
    /// - `LinkError::Closed`: 对端已关闭
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// 设置读超时
    fn set_read_timeout(&mut self, _timeout: Duration) -> Result<(), LinkError> {
        Ok(())
    }
}

/// 发送半部
pub trait TxAdapter {
    /// 发送一帧（全部字节写出，否则返回 `ShortWrite`）
    fn send(&mut self, frame: &UarmFrame) -> Result<(), LinkError>;
}

/// 可拆分为独立收发半部的适配器
///
/// 接收半部交给后台线程，发送半部留在请求方。
pub trait SplittableAdapter {
    type RxAdapter: RxAdapter + Send + 'static;
    type TxAdapter: TxAdapter + Send + 'static;

    fn split(self) -> Result<(Self::RxAdapter, Self::TxAdapter), LinkError>;
}
