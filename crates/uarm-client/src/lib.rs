//! 客户端接口模块
//!
//! 本模块在驱动之上提供 "移动到位" 语义和机械臂的整体生命周期：
//! - [`MotionController`]：发送一次移动命令，然后轮询位置直到容差内到达或重试耗尽
//! - [`PositionTable`]：21 个命名位置（停车位、两侧存放位、3×3 棋盘格）
//! - [`store`]：命名位置的文本文件持久化
//! - [`RobotController`]：连接 / 断开流程，以及面向上层调度器的操作集合
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。需要直接发送协议命令时可以使用
//! `uarm-driver` 的 `Uarm` 句柄。

mod arm;
mod controller;
mod error;
pub mod motion;
pub mod positions;
pub mod store;

// 重新导出常用类型
pub use arm::ArmInterface;
pub use controller::{ControllerConfig, RobotController};
pub use error::{ClientError, Result};
pub use motion::{ConvergencePolicy, MotionConfig, MotionController, MoveReport};
pub use positions::{NamedPosition, PositionTable};

pub use uarm_driver::{
    DEFAULT_BAUD_RATE, DEFAULT_PORT, PipelineConfig, Position, RequestTimeouts, ServoId,
};
