//! One-shot 模式
//!
//! 每个命令独立执行：
//! 1. 读取配置（命令行 `--port` 优先）
//! 2. 连接机械臂
//! 3. 执行操作
//! 4. 断开连接

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;
use uarm_client::{RobotController, ServoId};
use uarm_control::ControlConfig;
use uarm_driver::{Uarm, UarmBuilder};

/// One-shot 模式
pub struct OneShotMode {
    config: ControlConfig,
}

impl OneShotMode {
    pub fn new(port: Option<String>, config_path: Option<&Path>) -> Result<Self> {
        let mut config = ControlConfig::load_or_default(config_path).context("加载配置失败")?;
        if let Some(port) = port {
            config.port = port;
        }
        debug!("配置: {:?}", config);
        Ok(Self { config })
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    /// 只打开驱动，不执行连接流程（不移动机械臂）
    fn open_driver(&self) -> Result<Uarm> {
        println!("⏳ 打开串口 {}...", self.config.port);
        UarmBuilder::new()
            .port(self.config.port.clone())
            .baud_rate(self.config.baud_rate)
            .pipeline_config(self.config.pipeline.clone())
            .timeouts(self.config.timeouts.clone())
            .build()
            .with_context(|| format!("无法打开 {}", self.config.port))
    }

    /// 连接、执行、断开
    pub fn with_robot<F>(&self, action: F) -> Result<()>
    where
        F: FnOnce(&mut RobotController) -> Result<()>,
    {
        let mut robot = RobotController::new(self.config.controller());
        println!("⏳ 连接到机械臂 {}...", self.config.port);
        robot
            .connect(&self.config.port)
            .with_context(|| format!("连接 {} 失败", self.config.port))?;
        println!("✅ 已连接");

        let result = action(&mut robot);
        if let Some(position) = robot.current_position() {
            println!("📍 当前位置: {}", position);
        }
        robot.disconnect();
        println!("🔌 已断开");
        result
    }

    /// 位置查询
    pub fn position(&self) -> Result<()> {
        let arm = self.open_driver()?;
        let position = arm.get_position()?;
        if position.is_origin() {
            println!("⚠️  设备未应答（返回原点）");
        }
        println!("📍 位置: x={} y={} z={} mm", position.x, position.y, position.z);
        Ok(())
    }

    /// 角度查询（0.1°）
    pub fn angle(&self, servo: ServoId) -> Result<()> {
        let arm = self.open_driver()?;
        let angle = arm.read_angle(servo)?;
        println!("📐 {}: {:.1}°", servo.name(), f64::from(angle) / 10.0);
        Ok(())
    }

    /// 锁定状态查询
    pub fn attached(&self, servo: ServoId) -> Result<()> {
        let arm = self.open_driver()?;
        let attached = arm.is_attached(servo)?;
        println!(
            "🔒 {}: {}",
            servo.name(),
            if attached { "attached" } else { "detached" }
        );
        Ok(())
    }

    /// 停止运动
    pub fn stop(&self) -> Result<()> {
        let arm = self.open_driver()?;
        arm.stop()?;
        println!("🛑 已发送停止命令");
        Ok(())
    }
}
