//! 井字棋回合记录
//!
//! 只记录哪些格子被占用和机械臂已经走了几步；不做任何策略，
//! 下一步总是按字典序取第一个空格。

use tracing::warn;
use uarm_client::NamedPosition;

/// 一局中机械臂最多走的步数（存放位 R1-R5）
pub const MAX_MOVES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnTracker {
    occupied: [bool; 9],
    moves: usize,
}

fn slot(field: NamedPosition) -> Option<usize> {
    field
        .is_field()
        .then(|| field.index() - NamedPosition::A1.index())
}

impl TurnTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按标签标记格子为已占用；未知标签只记录警告
    pub fn set_field(&mut self, label: &str) -> bool {
        match label.parse::<NamedPosition>() {
            Ok(field) => self.mark(field),
            Err(_) => {
                warn!("Unknown field name: {}", label);
                false
            },
        }
    }

    /// 标记格子为已占用
    pub fn mark(&mut self, field: NamedPosition) -> bool {
        match slot(field) {
            Some(i) => {
                self.occupied[i] = true;
                true
            },
            None => {
                warn!("{} is not a field", field);
                false
            },
        }
    }

    pub fn is_occupied(&self, field: NamedPosition) -> bool {
        slot(field).is_some_and(|i| self.occupied[i])
    }

    /// 取下一个空格并计一步
    ///
    /// 已走满 [`MAX_MOVES`] 步时返回 `None` 且不计步；棋盘已满时返回 `None`
    /// 但仍计一步。
    pub fn next_field(&mut self) -> Option<NamedPosition> {
        if self.moves >= MAX_MOVES {
            warn!("Maximum number of moves reached, reset the game");
            return None;
        }
        let next = NamedPosition::FIELDS
            .iter()
            .copied()
            .find(|f| !self.is_occupied(*f));
        self.moves += 1;
        next
    }

    pub fn moves(&self) -> usize {
        self.moves
    }

    /// 清空棋盘和步数
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
