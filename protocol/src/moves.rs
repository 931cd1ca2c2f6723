//! 走法生成

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{Color, Piece, Position};

/// 四个斜线方向
const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self { from, to }
    }

    /// 从原始坐标创建，任一坐标越界时返回 `None`
    pub fn from_coords(from_row: u8, from_col: u8, to_row: u8, to_col: u8) -> Option<Self> {
        Some(Self {
            from: Position::new(from_row, from_col)?,
            to: Position::new(to_row, to_col)?,
        })
    }

    /// 行位移
    pub fn row_delta(&self) -> i8 {
        self.to.row as i8 - self.from.row as i8
    }

    /// 列位移
    pub fn col_delta(&self) -> i8 {
        self.to.col as i8 - self.from.col as i8
    }

    /// 行列位移绝对值相等且非零
    pub fn is_diagonal(&self) -> bool {
        let dr = self.row_delta();
        dr != 0 && dr.abs() == self.col_delta().abs()
    }

    /// 斜线距离
    pub fn distance(&self) -> u8 {
        self.row_delta().unsigned_abs()
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// 一次吃子：落点和被吃棋子的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capture {
    pub landing: Position,
    pub captured: Position,
}

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 指定格子上棋子的所有吃子
    ///
    /// 兵向四个方向跳过相邻的一枚敌子；王沿斜线跳过路径上唯一的一枚敌子，
    /// 可落在其后任意一个连续空格上。
    pub fn captures_from(board: &Board, from: Position) -> Vec<Capture> {
        let Some(piece) = board.get(from) else {
            return Vec::new();
        };

        let mut captures = Vec::new();
        for (dr, dc) in DIAGONALS {
            if piece.is_king() {
                Self::king_captures(board, from, piece, dr, dc, &mut captures);
            } else {
                Self::man_capture(board, from, piece, dr, dc, &mut captures);
            }
        }
        captures
    }

    fn man_capture(
        board: &Board,
        from: Position,
        piece: Piece,
        dr: i8,
        dc: i8,
        captures: &mut Vec<Capture>,
    ) {
        let (Some(middle), Some(landing)) = (from.offset(dr, dc), from.offset(2 * dr, 2 * dc)) else {
            return;
        };

        let has_enemy = board
            .get(middle)
            .is_some_and(|target| target.color != piece.color);
        if has_enemy && board.is_empty_at(landing) {
            captures.push(Capture { landing, captured: middle });
        }
    }

    fn king_captures(
        board: &Board,
        from: Position,
        piece: Piece,
        dr: i8,
        dc: i8,
        captures: &mut Vec<Capture>,
    ) {
        let mut enemy: Option<Position> = None;
        let mut current = from;

        while let Some(next) = current.offset(dr, dc) {
            match (board.get(next), enemy) {
                (Some(target), None) if target.color != piece.color => enemy = Some(next),
                // 己方棋子或第二枚棋子挡住去路
                (Some(_), _) => break,
                (None, Some(captured)) => captures.push(Capture { landing: next, captured }),
                (None, None) => {}
            }
            current = next;
        }
    }

    /// 指定阵营在整个棋盘上的所有吃子走法
    pub fn captures_for(board: &Board, color: Color) -> Vec<Move> {
        board
            .pieces(color)
            .into_iter()
            .flat_map(|(from, _)| {
                Self::captures_from(board, from)
                    .into_iter()
                    .map(move |capture| Move::new(from, capture.landing))
            })
            .collect()
    }

    /// 指定格子上棋子的所有非吃子走法
    pub fn simple_moves_from(board: &Board, from: Position) -> Vec<Position> {
        let Some(piece) = board.get(from) else {
            return Vec::new();
        };

        let mut targets = Vec::new();
        if piece.is_king() {
            for (dr, dc) in DIAGONALS {
                let mut current = from;
                while let Some(next) = current.offset(dr, dc) {
                    if !board.is_empty_at(next) {
                        break;
                    }
                    targets.push(next);
                    current = next;
                }
            }
        } else {
            let dr = piece.color.forward();
            for dc in [-1, 1] {
                if let Some(to) = from.offset(dr, dc) {
                    if board.is_empty_at(to) {
                        targets.push(to);
                    }
                }
            }
        }
        targets
    }

    /// 指定阵营是否还有任何可走的棋（吃子或普通走法）
    pub fn has_any_move(board: &Board, color: Color) -> bool {
        board.pieces(color).into_iter().any(|(pos, _)| {
            !Self::simple_moves_from(board, pos).is_empty()
                || !Self::captures_from(board, pos).is_empty()
        })
    }

    /// 指定阵营的所有合法走法：有吃子时只返回吃子
    pub fn legal_moves(board: &Board, color: Color) -> Vec<Move> {
        let captures = Self::captures_for(board, color);
        if !captures.is_empty() {
            return captures;
        }

        board
            .pieces(color)
            .into_iter()
            .flat_map(|(from, _)| {
                Self::simple_moves_from(board, from)
                    .into_iter()
                    .map(move |to| Move::new(from, to))
            })
            .collect()
    }
}
