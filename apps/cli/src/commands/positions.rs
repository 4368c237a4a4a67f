//! 命名位置表命令

use crate::oneshot::OneShotMode;
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use uarm_client::RobotController;
use uarm_client::store;

/// 位置表参数
#[derive(Args, Debug)]
pub struct PositionsCommand {
    /// 导出到文件（位置文件格式）
    #[arg(short, long)]
    pub write: Option<PathBuf>,
}

impl PositionsCommand {
    /// 加载位置表（默认值 + 位置文件），打印或导出；不连接机械臂
    pub fn execute(&self, mode: &OneShotMode) -> Result<()> {
        let mut robot = RobotController::new(mode.config().controller());
        robot.load_positions().context("加载位置文件失败")?;

        match &self.write {
            Some(path) => {
                store::write(path, robot.positions())?;
                println!("💾 已写入 {}", path.display());
            },
            None => {
                for (name, position) in robot.positions().iter() {
                    println!("{:>3}: {:>5} {:>5} {:>5}", name, position.x, position.y, position.z);
                }
            },
        }
        Ok(())
    }
}
