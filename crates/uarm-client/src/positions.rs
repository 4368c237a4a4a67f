//! 命名位置表
//!
//! 21 个槽位：2 个停车位（P1、P2），左右各 5 个棋子存放位（L1-L5、R1-R5），
//! 以及 3×3 棋盘格（A1-C3）。默认坐标来自标定过的工作台，高度统一为 60mm。

use std::fmt;
use std::str::FromStr;
use uarm_protocol::Position;

/// 命名位置的默认高度（mm）
pub const DEFAULT_HEIGHT: i16 = 60;

/// 命名位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NamedPosition {
    P1,
    P2,
    L1,
    L2,
    L3,
    L4,
    L5,
    R1,
    R2,
    R3,
    R4,
    R5,
    A1,
    A2,
    A3,
    B1,
    B2,
    B3,
    C1,
    C2,
    C3,
}

impl NamedPosition {
    /// 按位置表顺序排列的全部槽位
    pub const ALL: [NamedPosition; 21] = [
        Self::P1,
        Self::P2,
        Self::L1,
        Self::L2,
        Self::L3,
        Self::L4,
        Self::L5,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::A1,
        Self::A2,
        Self::A3,
        Self::B1,
        Self::B2,
        Self::B3,
        Self::C1,
        Self::C2,
        Self::C3,
    ];

    /// 棋盘格（按字典序）
    pub const FIELDS: [NamedPosition; 9] = [
        Self::A1,
        Self::A2,
        Self::A3,
        Self::B1,
        Self::B2,
        Self::B3,
        Self::C1,
        Self::C2,
        Self::C3,
    ];

    pub const COUNT: usize = 21;

    /// 位置表中的下标
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::P2 => "P2",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
            Self::L5 => "L5",
            Self::R1 => "R1",
            Self::R2 => "R2",
            Self::R3 => "R3",
            Self::R4 => "R4",
            Self::R5 => "R5",
            Self::A1 => "A1",
            Self::A2 => "A2",
            Self::A3 => "A3",
            Self::B1 => "B1",
            Self::B2 => "B2",
            Self::B3 => "B3",
            Self::C1 => "C1",
            Self::C2 => "C2",
            Self::C3 => "C3",
        }
    }

    /// 第 `n` 个存放位（`R<n>`，n 从 1 开始）
    pub fn storage(n: usize) -> Option<Self> {
        match n {
            1..=5 => Self::from_index(Self::R1.index() + n - 1),
            _ => None,
        }
    }

    pub fn is_field(self) -> bool {
        self >= Self::A1
    }

    pub fn is_parking(self) -> bool {
        matches!(self, Self::P1 | Self::P2)
    }

    /// 出厂标定的默认坐标
    pub fn default_position(self) -> Position {
        let (x, y) = match self {
            Self::P1 => (-131, 39),
            Self::P2 => (131, 41),
            Self::L1 => (136, 112),
            Self::L2 => (120, 160),
            Self::L3 => (120, 212),
            Self::L4 => (122, 257),
            Self::L5 => (117, 305),
            Self::R1 => (-118, 110),
            Self::R2 => (-122, 158),
            Self::R3 => (-126, 205),
            Self::R4 => (-124, 254),
            Self::R5 => (-121, 300),
            Self::A1 => (57, 180),
            Self::A2 => (60, 240),
            Self::A3 => (58, 296),
            Self::B1 => (0, 181),
            Self::B2 => (0, 241),
            Self::B3 => (0, 296),
            Self::C1 => (-53, 179),
            Self::C2 => (-56, 239),
            Self::C3 => (-58, 294),
        };
        Position::new(x, y, DEFAULT_HEIGHT)
    }
}

impl fmt::Display for NamedPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

impl FromStr for NamedPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.label().eq_ignore_ascii_case(label))
            .ok_or_else(|| format!("Unknown position label: {s}"))
    }
}

/// 命名位置坐标表
#[derive(Debug, Clone, Copy)]
pub struct PositionTable {
    slots: [Position; NamedPosition::COUNT],
}

impl Default for PositionTable {
    fn default() -> Self {
        Self {
            slots: NamedPosition::ALL.map(NamedPosition::default_position),
        }
    }
}

impl PositionTable {
    /// 默认坐标表
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: NamedPosition) -> Position {
        self.slots[name.index()]
    }

    pub fn set(&mut self, name: NamedPosition, position: Position) {
        self.slots[name.index()] = position;
    }

    pub fn iter(&self) -> impl Iterator<Item = (NamedPosition, Position)> + '_ {
        NamedPosition::ALL.iter().map(|&n| (n, self.get(n)))
    }
}
