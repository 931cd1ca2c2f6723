//! 棋盘状态

use serde::{Deserialize, Serialize};

use crate::constants::{BOARD_SIZE, HOME_ROWS};
use crate::piece::{Color, Piece, Position};

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 8x8 棋盘，索引为 row * 8 + col，使用 Vec 以支持 serde
    squares: Vec<Option<Piece>>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty() -> Self {
        Self {
            squares: vec![None; BOARD_SIZE * BOARD_SIZE],
        }
    }

    /// 创建初始棋盘
    ///
    /// 黑方占据第 0-2 行的深色格，白方占据第 5-7 行的深色格，中间两行为空。
    pub fn initial() -> Self {
        let mut board = Self::empty();

        for index in 0..BOARD_SIZE * BOARD_SIZE {
            let Some(pos) = Position::from_index(index) else {
                continue;
            };
            if !pos.is_dark() {
                continue;
            }

            let row = pos.row as usize;
            if row < HOME_ROWS {
                board.set(pos, Some(Piece::man(Color::Black)));
            } else if row >= BOARD_SIZE - HOME_ROWS {
                board.set(pos, Some(Piece::man(Color::White)));
            }
        }

        board
    }

    /// 获取指定位置的棋子
    pub fn get(&self, pos: Position) -> Option<Piece> {
        if pos.is_valid() {
            self.squares[pos.to_index()]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子
    pub fn set(&mut self, pos: Position, piece: Option<Piece>) {
        if pos.is_valid() {
            self.squares[pos.to_index()] = piece;
        }
    }

    pub fn is_empty_at(&self, pos: Position) -> bool {
        self.get(pos).is_none()
    }

    /// 移动棋子（不检查规则），到达对方底线的兵升变为王
    ///
    /// 返回是否发生了升变。
    pub fn relocate(&mut self, from: Position, to: Position) -> bool {
        let Some(piece) = self.get(from) else {
            return false;
        };
        self.set(from, None);

        let promote = !piece.is_king() && to.row == piece.color.promotion_row();
        let piece = if promote { piece.promoted() } else { piece };
        self.set(to, Some(piece));
        promote
    }

    /// 在本地镜像一个已被服务端接受的走法
    ///
    /// 客户端不知道走法是否吃子，路径上的棋子一律移除。
    pub fn mirror_move(&mut self, from: Position, to: Position) {
        if let Some(path) = from.diagonal_between(to) {
            for pos in path {
                self.set(pos, None);
            }
        }
        self.relocate(from, to);
    }

    /// 获取指定阵营的所有棋子位置
    pub fn pieces(&self, color: Color) -> Vec<(Position, Piece)> {
        self.all_pieces()
            .into_iter()
            .filter(|(_, piece)| piece.color == color)
            .collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Position, Piece)> {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(index, cell)| {
                let piece = (*cell)?;
                Position::from_index(index).map(|pos| (pos, piece))
            })
            .collect()
    }

    /// 指定阵营剩余棋子数
    pub fn count(&self, color: Color) -> usize {
        self.squares
            .iter()
            .flatten()
            .filter(|piece| piece.color == color)
            .count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "   ")?;
        for col in 0..BOARD_SIZE {
            write!(f, " {}", col)?;
        }
        writeln!(f)?;

        for row in 0..BOARD_SIZE {
            write!(f, " {} ", row)?;
            for col in 0..BOARD_SIZE {
                let pos = Position::new_unchecked(row as u8, col as u8);
                let c = match self.get(pos) {
                    Some(piece) => piece.display_char(),
                    None if pos.is_dark() => '.',
                    None => ' ',
                };
                write!(f, " {}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
