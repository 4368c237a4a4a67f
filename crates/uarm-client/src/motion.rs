//! 运动收敛控制器
//!
//! 协议没有 "到位" 确认。控制器发送一次移动命令，然后按固定间隔轮询位置，
//! 直到读回的位置在容差（每轴 < 10mm）内等于目标，或重试次数用尽。
//!
//! 控制器维护一个 "当前位置" 缓存：连接时从设备读取，每次移动后更新，
//! 作为 pick / place / 升降等相对移动的起点。
//!
//! # 使用示例
//!
//! ```rust,no_run
//! use uarm_client::{MotionConfig, MotionController, Position};
//! use uarm_driver::UarmBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let arm = UarmBuilder::new().port("/dev/ttyUSB0").build()?;
//! let mut motion = MotionController::new(arm, MotionConfig::default());
//! motion.sync_position()?;
//!
//! let report = motion.move_to_position(Position::new(0, 240, 60))?;
//! println!("{} polls, converged: {}", report.polls, report.converged);
//! motion.pick()?;
//! # Ok(())
//! # }
//! ```

use crate::arm::ArmInterface;
use crate::error::{ClientError, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use uarm_protocol::Position;

/// 重试耗尽时的处理策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConvergencePolicy {
    /// 假定已经到位：采用目标作为当前位置并返回成功
    #[default]
    AssumeReached,
    /// 返回 `ClientError::MotionTimeout`，当前位置取最后一次读回的值
    Fail,
}

/// 运动控制配置
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    /// 移动速度（协议速度单位）
    pub speed: u8,
    /// 两次位置轮询之间的等待（毫秒）
    pub settle_interval_ms: u64,
    /// 最多轮询次数
    pub max_tries: u32,
    /// pick / place 时下降的高度（mm）
    pub lower_mm: i16,
    /// pick 命令的探测距离（mm）
    pub pick_distance_mm: u16,
    /// 升降的高度（mm）
    pub lift_mm: i16,
    /// 发送 pick 后等待吸盘接触的时间（毫秒）
    pub pick_settle_ms: u64,
    /// place 下降后关气泵前的等待（毫秒）
    pub place_settle_ms: u64,
    /// 锁定舵机后的等待（毫秒）
    pub attach_settle_ms: u64,
    /// 重试耗尽时的策略
    pub on_exhausted: ConvergencePolicy,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            speed: 40,
            settle_interval_ms: 200,
            max_tries: 10,
            lower_mm: 30,
            pick_distance_mm: 40,
            lift_mm: 60,
            pick_settle_ms: 1000,
            place_settle_ms: 500,
            attach_settle_ms: 100,
            on_exhausted: ConvergencePolicy::AssumeReached,
        }
    }
}

impl MotionConfig {
    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }

    /// 升降使用的偏移量（仅 z 轴）
    pub fn lift_offset(&self) -> Position {
        Position::new(0, 0, self.lift_mm)
    }

    /// pick / place 下降使用的偏移量（仅 z 轴）
    pub fn lower_offset(&self) -> Position {
        Position::new(0, 0, self.lower_mm)
    }
}

/// 一次移动的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveReport {
    /// 目标位置
    pub target: Position,
    /// 实际轮询次数
    pub polls: u32,
    /// 是否在容差内观察到目标
    pub converged: bool,
    /// 最后一次读回的位置（未轮询时为移动前的缓存值）
    pub observed: Position,
}

/// 运动收敛控制器
pub struct MotionController<A> {
    arm: A,
    config: MotionConfig,
    current: Position,
}

impl<A: ArmInterface> MotionController<A> {
    /// 创建控制器，当前位置缓存初始为原点
    pub fn new(arm: A, config: MotionConfig) -> Self {
        Self {
            arm,
            config,
            current: Position::ORIGIN,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn arm(&self) -> &A {
        &self.arm
    }

    pub fn into_arm(self) -> A {
        self.arm
    }

    /// 当前位置缓存
    pub fn current_position(&self) -> Position {
        self.current
    }

    /// 从设备读取真实位置并写入缓存
    pub fn sync_position(&mut self) -> Result<Position> {
        let position = self.arm.get_position()?;
        debug!("Synchronized current position: {}", position);
        self.current = position;
        Ok(position)
    }

    /// 以默认速度移动到目标
    pub fn move_to_position(&mut self, target: Position) -> Result<MoveReport> {
        self.move_to_position_with_speed(target, self.config.speed)
    }

    /// 移动到目标并等待收敛
    ///
    /// 只发送一次移动命令，之后每隔 `settle_interval_ms` 轮询一次位置，
    /// 最多 `max_tries` 次。收敛后当前位置缓存设为目标；重试耗尽时按
    /// `on_exhausted` 处理。
    pub fn move_to_position_with_speed(
        &mut self,
        target: Position,
        speed: u8,
    ) -> Result<MoveReport> {
        debug!("Moving from {} to {} at speed {}", self.current, target, speed);
        self.arm.move_to(target, speed)?;

        let mut report = MoveReport {
            target,
            polls: 0,
            converged: false,
            observed: self.current,
        };

        while report.polls < self.config.max_tries {
            thread::sleep(self.config.settle_interval());
            report.polls += 1;
            report.observed = self.arm.get_position()?;
            if report.observed == target {
                report.converged = true;
                break;
            }
        }

        if report.converged {
            debug!("Reached {} after {} polls", target, report.polls);
            self.current = target;
            return Ok(report);
        }

        match self.config.on_exhausted {
            ConvergencePolicy::AssumeReached => {
                warn!(
                    "Position {} not observed after {} polls (last {}), assuming reached",
                    target, report.polls, report.observed
                );
                self.current = target;
                Ok(report)
            },
            ConvergencePolicy::Fail => {
                self.current = report.observed;
                Err(ClientError::MotionTimeout {
                    target,
                    last: report.observed,
                })
            },
        }
    }

    /// 抓取：下降、探测、开气泵、回到原高度
    pub fn pick(&mut self) -> Result<MoveReport> {
        let origin = self.current;
        self.move_to_position(origin - self.config.lower_offset())?;
        self.arm.pick(self.config.pick_distance_mm)?;
        thread::sleep(Duration::from_millis(self.config.pick_settle_ms));
        self.arm.pump(true)?;
        self.move_to_position(origin)
    }

    /// 放置：下降、关气泵、回到原高度
    pub fn place(&mut self) -> Result<MoveReport> {
        let origin = self.current;
        self.move_to_position(origin - self.config.lower_offset())?;
        thread::sleep(Duration::from_millis(self.config.place_settle_ms));
        self.arm.pump(false)?;
        self.move_to_position(origin)
    }

    /// 从当前位置抬高 `lift_mm`
    pub fn lift_up(&mut self) -> Result<MoveReport> {
        self.move_to_position(self.current + self.config.lift_offset())
    }

    /// 从当前位置降低 `lift_mm`
    pub fn put_down(&mut self) -> Result<MoveReport> {
        self.move_to_position(self.current - self.config.lift_offset())
    }
}
