//! 机械臂控制器
//!
//! 组合驱动、运动控制器和命名位置表，提供上层调度器使用的操作：
//! 连接、断开、移动到命名位置、抓取、放置。

use crate::arm::ArmInterface;
use crate::error::{ClientError, Result};
use crate::motion::{MotionConfig, MotionController, MoveReport};
use crate::positions::{NamedPosition, PositionTable};
use crate::store::{self, LoadOutcome};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};
use uarm_driver::{DEFAULT_BAUD_RATE, PipelineConfig, RequestTimeouts, UarmBuilder};
use uarm_protocol::Position;

type BoxedArm = Box<dyn ArmInterface + Send>;

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ControllerConfig {
    /// 串口波特率
    pub baud_rate: u32,
    /// 命名位置文件（`None` 表示只使用内置默认值）
    pub positions_file: Option<PathBuf>,
    pub motion: MotionConfig,
    pub timeouts: RequestTimeouts,
    pub pipeline: PipelineConfig,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            positions_file: Some(PathBuf::from(store::DEFAULT_POSITIONS_FILE)),
            motion: MotionConfig::default(),
            timeouts: RequestTimeouts::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

/// 机械臂控制器
///
/// 未连接时所有运动操作返回 `ClientError::NotConnected`。`Drop` 时如果仍处于
/// 连接状态会执行 `disconnect()`（回到 P1 并释放舵机）。
///
/// # Example
///
/// ```no_run
/// use uarm_client::{ControllerConfig, NamedPosition, RobotController};
///
/// # fn main() -> uarm_client::Result<()> {
/// let mut robot = RobotController::new(ControllerConfig::default());
/// robot.connect("/dev/ttyUSB0")?;
/// robot.move_to_named(NamedPosition::R1)?;
/// robot.pick()?;
/// robot.move_to_named(NamedPosition::B2)?;
/// robot.place()?;
/// robot.disconnect();
/// # Ok(())
/// # }
/// ```
pub struct RobotController {
    config: ControllerConfig,
    positions: PositionTable,
    motion: Option<MotionController<BoxedArm>>,
}

impl RobotController {
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            positions: PositionTable::default(),
            motion: None,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// 已连接且链路仍然可用（设备被拔出后返回 false）
    pub fn is_connected(&self) -> bool {
        self.motion.as_ref().is_some_and(|m| m.arm().is_open())
    }

    /// 命名位置表
    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    /// 当前位置缓存（未连接时为 `None`）
    pub fn current_position(&self) -> Option<Position> {
        self.motion.as_ref().map(MotionController::current_position)
    }

    /// 重新加载命名位置：先恢复默认值，再读取位置文件（不存在则创建）
    pub fn load_positions(&mut self) -> Result<Option<LoadOutcome>> {
        self.positions = PositionTable::default();
        match &self.config.positions_file {
            Some(path) => store::load_or_init(path, &mut self.positions).map(Some),
            None => Ok(None),
        }
    }

    /// 打开串口并执行连接流程
    ///
    /// 打开失败时位置表仍会初始化，错误返回给调用方，控制器保持未连接。
    pub fn connect(&mut self, port: &str) -> Result<()> {
        if self.is_connected() {
            warn!("Already connected, ignoring connect to {}", port);
            return Ok(());
        }
        // 释放已断开的旧链路
        self.disconnect();

        let built = UarmBuilder::new()
            .port(port)
            .baud_rate(self.config.baud_rate)
            .pipeline_config(self.config.pipeline.clone())
            .timeouts(self.config.timeouts.clone())
            .build();

        match built {
            Ok(arm) => self.connect_with(arm),
            Err(e) => {
                warn!("Failed to open {}: {}", port, e);
                self.load_positions_or_warn();
                Err(e.into())
            },
        }
    }

    /// 使用已打开的链路执行连接流程
    ///
    /// 读取真实位置、锁定全部舵机、加载位置表、移动到 P1。任一步失败时
    /// 关闭链路并返回错误。
    pub fn connect_with<A>(&mut self, arm: A) -> Result<()>
    where
        A: ArmInterface + Send + 'static,
    {
        if self.is_connected() {
            warn!("Already connected, ignoring new link");
            return Ok(());
        }
        self.disconnect();

        let mut motion = MotionController::new(Box::new(arm) as BoxedArm, self.config.motion.clone());
        if let Err(e) = self.bring_up(&mut motion) {
            motion.arm().close();
            return Err(e);
        }

        info!("Robot connected at {}", motion.current_position());
        self.motion = Some(motion);
        Ok(())
    }

    fn bring_up(&mut self, motion: &mut MotionController<BoxedArm>) -> Result<()> {
        motion.sync_position()?;
        motion.arm().attach_detach_all(true)?;
        thread::sleep(Duration::from_millis(self.config.motion.attach_settle_ms));
        self.load_positions_or_warn();
        motion.move_to_position(self.positions.get(NamedPosition::P1))?;
        Ok(())
    }

    fn load_positions_or_warn(&mut self) {
        if let Err(e) = self.load_positions() {
            warn!("Using default positions: {}", e);
        }
    }

    /// 回到 P1、释放舵机并关闭链路；未连接时无操作
    pub fn disconnect(&mut self) {
        let Some(mut motion) = self.motion.take() else {
            return;
        };

        if !motion.arm().is_open() {
            warn!("Link already lost, closing without parking");
            motion.arm().close();
            return;
        }

        if let Err(e) = motion.move_to_position(self.positions.get(NamedPosition::P1)) {
            warn!("Failed to park before disconnect: {}", e);
        }
        if let Err(e) = motion.arm().attach_detach_all(false) {
            warn!("Failed to detach servos: {}", e);
        }
        motion.arm().close();
        info!("Robot disconnected");
    }

    fn motion_mut(&mut self) -> Result<&mut MotionController<BoxedArm>> {
        self.motion.as_mut().ok_or(ClientError::NotConnected)
    }

    /// 移动到命名位置
    pub fn move_to_named(&mut self, slot: NamedPosition) -> Result<MoveReport> {
        let target = self.positions.get(slot);
        info!("Moving to {} ({})", slot, target);
        self.motion_mut()?.move_to_position(target)
    }

    /// 移动到任意坐标
    pub fn move_to(&mut self, target: Position) -> Result<MoveReport> {
        self.motion_mut()?.move_to_position(target)
    }

    pub fn pick(&mut self) -> Result<MoveReport> {
        self.motion_mut()?.pick()
    }

    pub fn place(&mut self) -> Result<MoveReport> {
        self.motion_mut()?.place()
    }

    pub fn lift_up(&mut self) -> Result<MoveReport> {
        self.motion_mut()?.lift_up()
    }

    pub fn put_down(&mut self) -> Result<MoveReport> {
        self.motion_mut()?.put_down()
    }

    /// 停止当前运动
    pub fn stop(&mut self) -> Result<()> {
        self.motion_mut()?.arm().stop()?;
        Ok(())
    }
}

impl Drop for RobotController {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.positions_file, Some(PathBuf::from("Positions.txt")));
        assert_eq!(config.timeouts.position_ms, 2000);
    }

    #[test]
    fn test_operations_require_connection() {
        let mut robot = RobotController::new(ControllerConfig {
            positions_file: None,
            ..ControllerConfig::default()
        });
        assert!(!robot.is_connected());
        assert!(robot.current_position().is_none());
        assert!(matches!(
            robot.move_to_named(NamedPosition::A1),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(robot.pick(), Err(ClientError::NotConnected)));
        assert!(matches!(robot.place(), Err(ClientError::NotConnected)));
        assert!(matches!(robot.stop(), Err(ClientError::NotConnected)));
        // 未连接时断开是无操作
        robot.disconnect();
        robot.disconnect();
    }

    #[test]
    fn test_connect_failure_still_loads_positions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Positions.txt");
        std::fs::write(&path, "Field positions\nB2: 5 250\n").unwrap();

        let mut robot = RobotController::new(ControllerConfig {
            positions_file: Some(path),
            ..ControllerConfig::default()
        });
        let err = robot.connect("/dev/this-port-does-not-exist-uarm").unwrap_err();
        assert!(matches!(err, ClientError::Driver(_)));
        assert!(!robot.is_connected());
        assert!(robot.positions().get(NamedPosition::B2).exact_eq(&Position::new(5, 250, 60)));
    }
}
