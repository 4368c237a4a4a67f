//! 驱动层错误类型定义

use thiserror::Error;
use uarm_link::LinkError;
use uarm_protocol::ProtocolError;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口链路错误
    #[error("Serial link error: {0}")]
    Link(#[from] LinkError),

    /// 协议解析错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 链路已关闭（`close()` 之后的调用）
    #[error("Not connected")]
    NotConnected,

    /// 接收线程错误
    #[error("IO thread error: {0}")]
    IoThread(String),
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use uarm_link::LinkError;
    use uarm_protocol::ProtocolError;

    /// 测试 DriverError 的 Display 实现
    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Link(LinkError::ShortWrite {
            expected: 10,
            written: 3,
        });
        let msg = format!("{}", driver_error);
        assert!(msg.contains("Short write"), "Link error message: {}", msg);

        let driver_error = DriverError::Protocol(ProtocolError::InvalidLength {
            expected: 6,
            actual: 2,
        });
        let msg = format!("{}", driver_error);
        assert!(
            msg.contains("Invalid frame length"),
            "Protocol error message: {}",
            msg
        );

        assert_eq!(DriverError::NotConnected.to_string(), "Not connected");

        let driver_error = DriverError::IoThread("spawn failed".to_string());
        assert_eq!(driver_error.to_string(), "IO thread error: spawn failed");
    }

    /// 测试 From 转换
    #[test]
    fn test_from_link_error() {
        let driver_error: DriverError = LinkError::Closed.into();
        assert!(matches!(driver_error, DriverError::Link(LinkError::Closed)));
    }
}
