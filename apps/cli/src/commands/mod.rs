//! 命令参数与执行

pub mod motion;
pub mod positions;

pub use motion::{MoveXyzCommand, PlayCommand, ServoArgs};
pub use positions::PositionsCommand;
