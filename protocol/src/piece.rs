//! 棋子定义

use serde::{Deserialize, Serialize};

use crate::constants::BOARD_SIZE;

/// 阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// 白方（先手，在下方，第 5-7 行）
    White,
    /// 黑方（后手，在上方，第 0-2 行）
    Black,
}

impl Color {
    /// 获取对方阵营
    pub fn opponent(&self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// 兵前进方向的行增量（白方向行号减小方向走）
    pub fn forward(&self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    /// 升变行（对方底线）
    pub fn promotion_row(&self) -> u8 {
        match self {
            Color::White => 0,
            Color::Black => (BOARD_SIZE - 1) as u8,
        }
    }

    /// 显示名称
    pub fn name(&self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 棋子等级
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rank {
    /// 兵
    Man,
    /// 王（升变后，不会降级）
    King,
}

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub color: Color,
    pub rank: Rank,
}

impl Piece {
    /// 创建新棋子
    pub fn new(color: Color, rank: Rank) -> Self {
        Self { color, rank }
    }

    /// 创建兵
    pub fn man(color: Color) -> Self {
        Self::new(color, Rank::Man)
    }

    /// 创建王
    pub fn king(color: Color) -> Self {
        Self::new(color, Rank::King)
    }

    pub fn is_king(&self) -> bool {
        self.rank == Rank::King
    }

    /// 升变后的棋子
    pub fn promoted(self) -> Self {
        Self::king(self.color)
    }

    /// 获取棋子显示字符（白方小写 w/W，黑方 b/B，王为大写）
    pub fn display_char(&self) -> char {
        match (self.color, self.rank) {
            (Color::White, Rank::Man) => 'w',
            (Color::White, Rank::King) => 'W',
            (Color::Black, Rank::Man) => 'b',
            (Color::Black, Rank::King) => 'B',
        }
    }
}

/// 棋盘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    /// 行 (0-7)，第 0 行是黑方底线
    pub row: u8,
    /// 列 (0-7)
    pub col: u8,
}

impl Position {
    /// 创建新位置
    pub fn new(row: u8, col: u8) -> Option<Self> {
        if (row as usize) < BOARD_SIZE && (col as usize) < BOARD_SIZE {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// 创建新位置（不检查边界，内部使用）
    pub const fn new_unchecked(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// 检查位置是否在棋盘内
    pub fn is_valid(&self) -> bool {
        (self.row as usize) < BOARD_SIZE && (self.col as usize) < BOARD_SIZE
    }

    /// 是否为深色格（只有深色格上会有棋子）
    pub fn is_dark(&self) -> bool {
        (self.row + self.col) % 2 == 1
    }

    /// 获取偏移后的位置
    pub fn offset(&self, dr: i8, dc: i8) -> Option<Position> {
        let row = self.row as i8 + dr;
        let col = self.col as i8 + dc;
        if row >= 0 && (row as usize) < BOARD_SIZE && col >= 0 && (col as usize) < BOARD_SIZE {
            Some(Position {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// 转换为数组索引
    pub fn to_index(&self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    /// 从数组索引转换
    pub fn from_index(index: usize) -> Option<Self> {
        if index < BOARD_SIZE * BOARD_SIZE {
            Some(Position {
                row: (index / BOARD_SIZE) as u8,
                col: (index % BOARD_SIZE) as u8,
            })
        } else {
            None
        }
    }

    /// 与另一位置之间严格位于斜线上的格子（不含两端）
    ///
    /// 两点不在同一斜线上时返回 `None`。
    pub fn diagonal_between(&self, other: Position) -> Option<Vec<Position>> {
        let dr = other.row as i8 - self.row as i8;
        let dc = other.col as i8 - self.col as i8;
        if dr == 0 || dr.abs() != dc.abs() {
            return None;
        }

        let (step_r, step_c) = (dr.signum(), dc.signum());
        let path = (1..dr.abs())
            .filter_map(|i| self.offset(i * step_r, i * step_c))
            .collect();
        Some(path)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piece_display_char() {
        assert_eq!(Piece::man(Color::White).display_char(), 'w');
        assert_eq!(Piece::king(Color::White).display_char(), 'W');
        assert_eq!(Piece::man(Color::Black).display_char(), 'b');
        assert_eq!(Piece::king(Color::Black).display_char(), 'B');
    }

    #[test]
    fn test_promotion_keeps_color() {
        let king = Piece::man(Color::Black).promoted();
        assert_eq!(king, Piece::king(Color::Black));
        // 王升变仍然是王
        assert_eq!(king.promoted(), king);
    }

    #[test]
    fn test_position_valid() {
        assert!(Position::new(0, 0).is_some());
        assert!(Position::new(7, 7).is_some());
        assert!(Position::new(8, 0).is_none());
        assert!(Position::new(0, 8).is_none());
    }

    #[test]
    fn test_dark_squares() {
        assert!(Position::new_unchecked(0, 1).is_dark());
        assert!(Position::new_unchecked(7, 0).is_dark());
        assert!(!Position::new_unchecked(0, 0).is_dark());
    }

    #[test]
    fn test_diagonal_between() {
        let from = Position::new_unchecked(5, 0);
        let path = from.diagonal_between(Position::new_unchecked(2, 3)).unwrap();
        assert_eq!(
            path,
            vec![Position::new_unchecked(4, 1), Position::new_unchecked(3, 2)]
        );

        // 相邻格之间没有格子
        let adjacent = from.diagonal_between(Position::new_unchecked(4, 1)).unwrap();
        assert!(adjacent.is_empty());

        // 非斜线
        assert!(from.diagonal_between(Position::new_unchecked(5, 3)).is_none());
        assert!(from.diagonal_between(from).is_none());
    }

    #[test]
    fn test_color_direction() {
        assert_eq!(Color::White.forward(), -1);
        assert_eq!(Color::Black.forward(), 1);
        assert_eq!(Color::White.promotion_row(), 0);
        assert_eq!(Color::Black.promotion_row(), 7);
        assert_eq!(Color::White.opponent(), Color::Black);
    }
}
