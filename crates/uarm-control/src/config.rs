//! TOML 配置
//!
//! 所有字段都有默认值，只写需要修改的项即可：
//!
//! ```toml
//! port = "/dev/ttyACM0"
//! positions_file = "/etc/uarm/Positions.txt"
//!
//! [motion]
//! speed = 30
//! on_exhausted = "fail"
//!
//! [timeouts]
//! position_ms = 3000
//! ```

use crate::error::ControlError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use uarm_client::store::DEFAULT_POSITIONS_FILE;
use uarm_client::{
    ControllerConfig, DEFAULT_BAUD_RATE, DEFAULT_PORT, MotionConfig, PipelineConfig,
    RequestTimeouts,
};

/// 应用配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// 串口设备
    pub port: String,
    pub baud_rate: u32,
    /// 命名位置文件
    pub positions_file: Option<PathBuf>,
    pub motion: MotionConfig,
    pub timeouts: RequestTimeouts,
    pub pipeline: PipelineConfig,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            positions_file: Some(PathBuf::from(DEFAULT_POSITIONS_FILE)),
            motion: MotionConfig::default(),
            timeouts: RequestTimeouts::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl ControlConfig {
    /// 解析 TOML 文本
    pub fn from_toml_str(text: &str) -> Result<Self, ControlError> {
        toml::from_str(text).map_err(|e| ControlError::Config {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })
    }

    /// 读取配置文件
    pub fn load(path: &Path) -> Result<Self, ControlError> {
        let config_error = |reason: String| ControlError::Config {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        toml::from_str(&text).map_err(|e| config_error(e.to_string()))
    }

    /// 有路径时读取，否则使用默认配置
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ControlError> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn to_toml_string(&self) -> Result<String, ControlError> {
        toml::to_string(self).map_err(|e| ControlError::Config {
            path: PathBuf::from("<inline>"),
            reason: e.to_string(),
        })
    }

    /// 控制器部分
    pub fn controller(&self) -> ControllerConfig {
        ControllerConfig {
            baud_rate: self.baud_rate,
            positions_file: self.positions_file.clone(),
            motion: self.motion.clone(),
            timeouts: self.timeouts.clone(),
            pipeline: self.pipeline.clone(),
        }
    }
}
