//! # uArm CLI
//!
//! Command-line interface for uArm Metal robot arm control.
//!
//! 每个命令独立执行（One-shot）：读取配置 -> 连接 -> 执行 -> 断开。
//!
//! ```bash
//! # 查询
//! uarm-cli --port /dev/ttyUSB0 position
//! uarm-cli angle --servo left
//!
//! # 命名位置与抓放
//! uarm-cli move R1
//! uarm-cli play --occupied A1,B2
//!
//! # 位置表
//! uarm-cli positions --write Positions.txt
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod oneshot;

use commands::{MoveXyzCommand, PlayCommand, PositionsCommand, ServoArgs};
use oneshot::OneShotMode;
use uarm_client::NamedPosition;

/// uArm CLI - 机械臂命令行工具
#[derive(Parser, Debug)]
#[command(name = "uarm-cli")]
#[command(about = "Command-line interface for uArm Metal robot arm control", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口设备（覆盖配置文件）
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// TOML 配置文件
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 查询当前笛卡尔位置
    Position,

    /// 查询舵机角度
    Angle {
        #[command(flatten)]
        args: ServoArgs,
    },

    /// 查询舵机锁定状态
    Attached {
        #[command(flatten)]
        args: ServoArgs,
    },

    /// 移动到命名位置（P1、R3、B2 ...）
    Move {
        /// 位置标签
        slot: NamedPosition,
    },

    /// 移动到任意坐标（mm）
    MoveXyz {
        #[command(flatten)]
        args: MoveXyzCommand,
    },

    /// 在 P1 下方抓取
    Pick,

    /// 在 P1 下方放置
    Place,

    /// 抬高
    Lift,

    /// 降低
    Lower,

    /// 停止运动
    Stop,

    /// 走一步井字棋
    Play {
        #[command(flatten)]
        args: PlayCommand,
    },

    /// 显示（或导出）命名位置表
    Positions {
        #[command(flatten)]
        args: PositionsCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("uarm_cli=info,uarm_driver=info,uarm_client=info")
            }),
        )
        .init();

    let cli = Cli::parse();
    let mode = OneShotMode::new(cli.port, cli.config.as_deref())?;

    match cli.command {
        Commands::Position => mode.position(),
        Commands::Angle { args } => mode.angle(args.servo),
        Commands::Attached { args } => mode.attached(args.servo),
        Commands::Stop => mode.stop(),
        Commands::Move { slot } => mode.with_robot(|robot| {
            robot.move_to_named(slot)?;
            Ok(())
        }),
        Commands::MoveXyz { args } => mode.with_robot(|robot| {
            robot.move_to(args.position())?;
            Ok(())
        }),
        Commands::Pick => mode.with_robot(|robot| {
            robot.pick()?;
            Ok(())
        }),
        Commands::Place => mode.with_robot(|robot| {
            robot.place()?;
            Ok(())
        }),
        Commands::Lift => mode.with_robot(|robot| {
            robot.lift_up()?;
            Ok(())
        }),
        Commands::Lower => mode.with_robot(|robot| {
            robot.put_down()?;
            Ok(())
        }),
        Commands::Play { args } => mode.with_robot(|robot| args.execute(robot)),
        Commands::Positions { args } => args.execute(&mode),
    }
}
