//! # uarm-control
//!
//! 面向应用的高层流程：
//! - [`TurnTracker`]：井字棋回合记录（已占用格子、已走步数）
//! - [`RobotWorker`]：拥有机械臂控制器的后台线程，按顺序执行连接 / 走子 / 断开
//! - [`ControlConfig`]：TOML 配置文件

pub mod config;
pub mod error;
pub mod game;
pub mod worker;

pub use config::ControlConfig;
pub use error::ControlError;
pub use game::{MAX_MOVES, TurnTracker};
pub use worker::{RobotAction, RobotOps, RobotWorker, play_turn};
