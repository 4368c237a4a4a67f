//! 运动与查询命令参数

use anyhow::Result;
use clap::Args;
use uarm_client::{Position, RobotController, ServoId};
use uarm_control::{TurnTracker, play_turn};

/// 舵机选择
#[derive(Args, Debug)]
pub struct ServoArgs {
    /// 舵机（rot / left / right / hand 或 0-3）
    #[arg(short, long)]
    pub servo: ServoId,
}

/// 坐标移动参数
#[derive(Args, Debug)]
pub struct MoveXyzCommand {
    /// X（mm）
    #[arg(allow_negative_numbers = true)]
    pub x: i16,
    /// Y（mm）
    #[arg(allow_negative_numbers = true)]
    pub y: i16,
    /// Z（mm）
    #[arg(allow_negative_numbers = true)]
    pub z: i16,
}

impl MoveXyzCommand {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }
}

/// 走子参数
#[derive(Args, Debug)]
pub struct PlayCommand {
    /// 已占用的格子，逗号分隔（如 A1,B2）
    #[arg(long, value_delimiter = ',')]
    pub occupied: Vec<String>,
}

impl PlayCommand {
    pub fn execute(&self, robot: &mut RobotController) -> Result<()> {
        let mut game = TurnTracker::new();
        for label in &self.occupied {
            game.set_field(label);
        }

        match play_turn(robot, &mut game)? {
            Some(field) => println!("♟️  已落子: {}", field),
            None => println!("⚠️  没有可用的格子"),
        }
        Ok(())
    }
}
