//! 命名位置的文本文件持久化
//!
//! 文件格式每行一个槽位：`<标签>: <x> <y>`，高度固定为 60mm。不含冒号的行
//! （标题和分组行）会被忽略。读取时只覆盖文件中出现的槽位；无法识别的标签
//! 或数字会跳过并记录 `warn!`。
//!
//! ```text
//! This file contains the x/y coordinates in mm of the TicTacToe playground.
//! Parking positions
//! P1: -131 39
//! ...
//! ```

use crate::error::{ClientError, Result};
use crate::positions::{DEFAULT_HEIGHT, NamedPosition, PositionTable};
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{info, warn};
use uarm_protocol::Position;

/// 默认位置文件名
pub const DEFAULT_POSITIONS_FILE: &str = "Positions.txt";

const TITLE: &str = "This file contains the x/y coordinates in mm of the TicTacToe playground.";

/// 读取或初始化的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// 从已有文件覆盖了这么多个槽位
    Loaded(usize),
    /// 文件不存在，已写入当前位置表
    Created,
}

/// 解析单行
///
/// 不含冒号的行返回 `Ok(None)`。`line_no` 从 1 开始，仅用于错误信息。
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<(NamedPosition, Position)>> {
    let Some((label, coords)) = line.split_once(':') else {
        return Ok(None);
    };
    let invalid = |reason: String| ClientError::InvalidPositionLine {
        line: line_no,
        reason,
    };

    let name: NamedPosition = label.parse().map_err(invalid)?;
    let mut numbers = coords.split_whitespace().map(str::parse::<i16>);
    let (Some(Ok(x)), Some(Ok(y)), None) = (numbers.next(), numbers.next(), numbers.next())
    else {
        return Err(invalid(format!(
            "expected `{}: <x> <y>`, got `{}`",
            name,
            line.trim()
        )));
    };
    Ok(Some((name, Position::new(x, y, DEFAULT_HEIGHT))))
}

/// 把文本中的槽位写入位置表，返回覆盖的槽位数
pub fn apply(table: &mut PositionTable, text: &str) -> usize {
    let mut applied = 0;
    for (i, line) in text.lines().enumerate() {
        match parse_line(i + 1, line) {
            Ok(Some((name, position))) => {
                table.set(name, position);
                applied += 1;
            },
            Ok(None) => {},
            Err(e) => warn!("Skipping position entry: {}", e),
        }
    }
    applied
}

/// 按文件格式输出位置表
pub fn render(table: &PositionTable) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{TITLE}");
    for (name, position) in table.iter() {
        let header = match name {
            NamedPosition::P1 => Some("Parking positions"),
            NamedPosition::L1 => Some("Store positions"),
            NamedPosition::A1 => Some("Field positions"),
            _ => None,
        };
        if let Some(header) = header {
            let _ = writeln!(out, "{header}");
        }
        let _ = writeln!(out, "{}: {} {}", name, position.x, position.y);
    }
    out
}

/// 从文件读取并覆盖位置表
pub fn load(path: &Path, table: &mut PositionTable) -> Result<usize> {
    let text = fs::read_to_string(path).map_err(|source| ClientError::PositionFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(apply(table, &text))
}

/// 写出位置表
pub fn write(path: &Path, table: &PositionTable) -> Result<()> {
    fs::write(path, render(table)).map_err(|source| ClientError::PositionFile {
        path: path.to_path_buf(),
        source,
    })
}

/// 文件存在时读取，不存在时用当前位置表创建
pub fn load_or_init(path: &Path, table: &mut PositionTable) -> Result<LoadOutcome> {
    match fs::read_to_string(path) {
        Ok(text) => {
            let applied = apply(table, &text);
            info!("Loaded {} positions from {}", applied, path.display());
            Ok(LoadOutcome::Loaded(applied))
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            write(path, table)?;
            info!("Wrote default positions to {}", path.display());
            Ok(LoadOutcome::Created)
        },
        Err(source) => Err(ClientError::PositionFile {
            path: path.to_path_buf(),
            source,
        }),
    }
}
