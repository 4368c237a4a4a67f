use std::path::PathBuf;
use thiserror::Error;
use uarm_client::ClientError;

/// 高层流程错误
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("Robot error: {0}")]
    Client(#[from] ClientError),

    /// 配置文件读取或解析失败
    #[error("Config {}: {reason}", .path.display())]
    Config { path: PathBuf, reason: String },

    /// 工作线程已退出，无法再接收动作
    #[error("Robot worker has stopped")]
    WorkerStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
