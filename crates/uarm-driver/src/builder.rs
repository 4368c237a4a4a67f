//! Builder 模式实现
//!
//! 提供链式构造 `Uarm` 实例的便捷方式。

use crate::error::DriverError;
use crate::pipeline::PipelineConfig;
use crate::uarm::{RequestTimeouts, Uarm};
use tracing::info;
use uarm_link::SerialAdapter;

/// 默认串口设备
pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";

/// 默认波特率（uArm 固件固定使用 9600）
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Uarm Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use uarm_driver::{PipelineConfig, RequestTimeouts, UarmBuilder};
///
/// // 使用默认配置（/dev/ttyUSB0, 9600）
/// let arm = UarmBuilder::new().build().unwrap();
///
/// // 自定义串口与超时
/// let arm = UarmBuilder::new()
///     .port("/dev/ttyACM0")
///     .baud_rate(9600)
///     .pipeline_config(PipelineConfig::default())
///     .timeouts(RequestTimeouts { position_ms: 3000, ..Default::default() })
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct UarmBuilder {
    port: Option<String>,
    baud_rate: Option<u32>,
    pipeline_config: Option<PipelineConfig>,
    timeouts: Option<RequestTimeouts>,
}

impl UarmBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置串口设备路径
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.port = Some(port.into());
        self
    }

    /// 设置波特率
    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = Some(baud_rate);
        self
    }

    /// 设置 Pipeline 配置
    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// 设置查询超时
    pub fn timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.timeouts = Some(timeouts);
        self
    }

    /// 打开串口并启动接收线程
    ///
    /// # 错误
    /// - `DriverError::Link`: 串口打开失败
    /// - `DriverError::IoThread`: 接收线程启动失败
    pub fn build(self) -> Result<Uarm, DriverError> {
        let port = self.port.as_deref().unwrap_or(DEFAULT_PORT);
        let baud_rate = self.baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
        let config = self.pipeline_config.unwrap_or_default();

        let adapter = SerialAdapter::open_with_timeout(port, baud_rate, config.read_timeout())?;
        let arm = Uarm::new(adapter, Some(config))?
            .with_timeouts(self.timeouts.unwrap_or_default());

        info!("Connected to uArm on {} ({} baud)", port, baud_rate);
        Ok(arm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_missing_port_fails() {
        let result = UarmBuilder::new()
            .port("/dev/uarm-driver-missing")
            .baud_rate(9600)
            .build();
        assert!(matches!(result, Err(DriverError::Link(_))));
    }
}
