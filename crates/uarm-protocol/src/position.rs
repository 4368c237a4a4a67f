//! 笛卡尔坐标（毫米）

use std::fmt;
use std::ops::{Add, Sub};

/// 位置比较容差（毫米，严格小于）
pub const POSITION_TOLERANCE_MM: i32 = 10;

/// 机械臂末端笛卡尔坐标（毫米）
///
/// # 相等语义
///
/// `==` 是**容差比较**：三个轴的差的绝对值都小于 [`POSITION_TOLERANCE_MM`] 时相等。
/// 该关系对称、自反，但**不传递**，因此本类型只实现 `PartialEq`，不实现 `Eq` / `Hash`。
/// 需要逐字段精确比较时使用 [`Position::exact_eq`]。
///
/// ```rust
/// use uarm_protocol::Position;
///
/// assert_eq!(Position::new(100, 100, 100), Position::new(109, 91, 100));
/// assert_ne!(Position::new(100, 100, 100), Position::new(110, 100, 100));
/// ```
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Position {
    /// 原点，同时也是 "位置查询超时" 的哨兵值
    pub const ORIGIN: Position = Position { x: 0, y: 0, z: 0 };

    pub const fn new(x: i16, y: i16, z: i16) -> Self {
        Self { x, y, z }
    }

    /// 逐字段精确比较
    pub fn exact_eq(&self, other: &Position) -> bool {
        self.x == other.x && self.y == other.y && self.z == other.z
    }

    /// 是否为原点哨兵（精确比较）
    pub fn is_origin(&self) -> bool {
        self.exact_eq(&Self::ORIGIN)
    }

    /// 各轴差值的最大绝对值（i32 计算，不会溢出）
    pub fn max_axis_distance(&self, other: &Position) -> i32 {
        let dx = (i32::from(self.x) - i32::from(other.x)).abs();
        let dy = (i32::from(self.y) - i32::from(other.y)).abs();
        let dz = (i32::from(self.z) - i32::from(other.z)).abs();
        dx.max(dy).max(dz)
    }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool {
        self.max_axis_distance(other) < POSITION_TOLERANCE_MM
    }
}

/// 分量相加（i16 回绕）
impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position {
            x: self.x.wrapping_add(rhs.x),
            y: self.y.wrapping_add(rhs.y),
            z: self.z.wrapping_add(rhs.z),
        }
    }
}

/// 分量相减（i16 回绕）
impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position {
            x: self.x.wrapping_sub(rhs.x),
            y: self.y.wrapping_sub(rhs.y),
            z: self.z.wrapping_sub(rhs.z),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.x, self.y, self.z)
    }
}
