//! 客户端错误类型定义

use std::path::PathBuf;
use thiserror::Error;
use uarm_driver::DriverError;
use uarm_protocol::Position;

/// 客户端错误类型
#[derive(Error, Debug)]
pub enum ClientError {
    /// 驱动层错误（串口打开失败、短写等）
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// 未连接
    #[error("Robot not connected")]
    NotConnected,

    /// 重试耗尽仍未观察到目标位置（仅 `ConvergencePolicy::Fail`）
    #[error("Motion did not converge to {target} (last observed {last})")]
    MotionTimeout { target: Position, last: Position },

    /// 位置文件读写失败
    #[error("Position file {}: {source}", .path.display())]
    PositionFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 位置文件中无法解析的行
    #[error("Invalid position line {line}: {reason}")]
    InvalidPositionLine { line: usize, reason: String },
}

/// 客户端 Result 别名
pub type Result<T> = std::result::Result<T, ClientError>;
