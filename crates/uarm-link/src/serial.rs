//! 串口适配器实现
//!
//! ## 线路参数
//!
//! - 8 数据位，无校验，1 停止位，无流控
//! - 波特率由调用方指定（uArm 固件默认 9600）
//! - 打开后清空收发缓冲区
//!
//! ## 限制
//!
//! - **权限要求**：Linux 下通常需要 `dialout` 组权限

use crate::{LinkError, RxAdapter, SplittableAdapter, TxAdapter, UarmFrame};
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// 默认读超时（接收线程借此周期性检查退出标志）
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// 串口适配器
///
/// ```no_run
/// use uarm_link::{SerialAdapter, SplittableAdapter};
///
/// let adapter = SerialAdapter::open("/dev/ttyUSB0", 9600).unwrap();
/// let (rx, tx) = adapter.split().unwrap();
/// ```
pub struct SerialAdapter {
    port: Box<dyn SerialPort>,
    path: String,
}

impl std::fmt::Debug for SerialAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialAdapter")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SerialAdapter {
    /// 打开串口（8N1，无流控）
    ///
    /// # 错误
    /// - `LinkError::Serial`: 设备不存在、无权限或参数不被支持
    pub fn open(path: &str, baud_rate: u32) -> Result<Self, LinkError> {
        Self::open_with_timeout(path, baud_rate, DEFAULT_READ_TIMEOUT)
    }

    pub fn open_with_timeout(
        path: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, LinkError> {
        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(read_timeout)
            .open()?;

        // 丢弃打开前残留的数据
        port.clear(ClearBuffer::All)?;

        debug!("Opened serial port {} at {} baud", path, baud_rate);
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SplittableAdapter for SerialAdapter {
    type RxAdapter = SerialRxAdapter;
    type TxAdapter = SerialTxAdapter;

    fn split(self) -> Result<(SerialRxAdapter, SerialTxAdapter), LinkError> {
        let tx_port = self.port.try_clone()?;
        Ok((
            SerialRxAdapter { port: self.port },
            SerialTxAdapter {
                port: tx_port,
                path: self.path,
            },
        ))
    }
}

/// 串口接收半部
pub struct SerialRxAdapter {
    port: Box<dyn SerialPort>,
}

impl RxAdapter for SerialRxAdapter {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        match self.port.read(buf) {
            // 0 字节：暂无数据，不是 EOF
            Ok(0) => Err(LinkError::Timeout),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Err(LinkError::Timeout)
            },
            Err(e) => Err(LinkError::Io(e)),
        }
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), LinkError> {
        self.port.set_timeout(timeout)?;
        Ok(())
    }
}

/// 串口发送半部
pub struct SerialTxAdapter {
    port: Box<dyn SerialPort>,
    path: String,
}

impl TxAdapter for SerialTxAdapter {
    fn send(&mut self, frame: &UarmFrame) -> Result<(), LinkError> {
        let bytes = frame.as_bytes();
        let written = self.port.write(bytes)?;
        if written != bytes.len() {
            return Err(LinkError::ShortWrite {
                expected: bytes.len(),
                written,
            });
        }
        self.port.flush()?;
        trace!("{}: sent {:02X?}", self.path, bytes);
        Ok(())
    }
}

/// 列出系统中的串口设备名
pub fn available_ports() -> Result<Vec<String>, LinkError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|info| info.port_name)
        .collect())
}
