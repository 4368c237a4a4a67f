//! 驱动层模块
//!
//! 本模块提供 uArm 机械臂的设备驱动功能，包括：
//! - 后台接收线程（字节流分帧、调试输出转发到日志）
//! - 共享设备状态（锁 + 条件变量，广播唤醒）
//! - 同步请求接口：发送即返回的命令，以及 "发送后等待" 的查询
//!
//! # 使用场景
//!
//! 适用于需要直接发送协议命令的场景。需要 "移动到位" 保证的调用方应使用
//! `uarm-client` 提供的运动控制接口。

mod builder;
mod error;
pub mod metrics;
pub mod pipeline;
pub mod state;
mod uarm;

pub use builder::{DEFAULT_BAUD_RATE, DEFAULT_PORT, UarmBuilder};
pub use error::DriverError;
pub use metrics::{MetricsSnapshot, UarmMetrics};
pub use pipeline::{PipelineConfig, rx_loop};
pub use state::{
    ANGLE_SENTINEL, ATTACHED_SENTINEL, DeviceContext, DeviceState, POSITION_SENTINEL,
};
pub use uarm::{RequestTimeouts, Uarm};

pub use uarm_protocol::{Position, ServoId, ServoTarget};
