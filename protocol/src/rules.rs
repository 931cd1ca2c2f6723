//! 规则引擎
//!
//! `GameState` 持有棋盘和走子方，负责校验并执行单步走法：
//! 强制吃子（对整个棋盘生效，而非单个棋子）、连吃、升变和终局判定。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::Board;
use crate::error::MoveError;
use crate::moves::{Move, MoveGenerator};
use crate::piece::{Color, Piece, Position, Rank};

/// 胜利原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    /// 对方棋子被吃光
    Elimination,
    /// 轮到对方走棋时无子可动
    NoLegalMoves,
}

/// 终局结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub winner: Color,
    pub reason: WinReason,
}

impl std::fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loser = self.winner.opponent();
        match self.reason {
            WinReason::Elimination => {
                write!(f, "{} wins: {} has no pieces left", self.winner, loser)
            }
            WinReason::NoLegalMoves => {
                write!(f, "{} wins: {} has no legal moves", self.winner, loser)
            }
        }
    }
}

/// 单步走法的执行结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveOutcome {
    pub mv: Move,
    /// 被吃棋子的位置
    pub captured: Option<Position>,
    /// 本步是否升变
    pub promoted: bool,
    /// 连吃未结束，走子方保持不变
    pub chain_continues: bool,
    pub game_over: Option<GameOutcome>,
}

impl MoveOutcome {
    /// 本步之后回合是否交给对方
    pub fn turn_passed(&self) -> bool {
        !self.chain_continues && self.game_over.is_none()
    }
}

/// 对局状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    board: Board,
    /// 当前走子方
    turn: Color,
    /// 正在连吃的棋子位置
    chain: Option<Position>,
    outcome: Option<GameOutcome>,
}

impl GameState {
    /// 创建初始状态，白方先走
    pub fn new() -> Self {
        Self::from_board(Board::initial(), Color::White)
    }

    /// 从棋盘创建状态
    pub fn from_board(board: Board, turn: Color) -> Self {
        Self {
            board,
            turn,
            chain: None,
            outcome: None,
        }
    }

    /// 重新摆放初始棋子
    pub fn initialize_board(&mut self) {
        *self = Self::new();
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    /// 连吃进行中的棋子
    pub fn chain_piece(&self) -> Option<Position> {
        self.chain
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.outcome
    }

    /// 校验并执行一步走法
    ///
    /// 被拒绝的走法不会修改棋盘和走子方。
    pub fn execute_move(&mut self, mv: Move, acting: Color) -> Result<MoveOutcome, MoveError> {
        let result = self.try_move(mv, acting);
        if let Err(err) = &result {
            debug!(%mv, ?acting, ?err, "走法被拒绝");
        }
        result
    }

    fn try_move(&mut self, mv: Move, acting: Color) -> Result<MoveOutcome, MoveError> {
        if self.outcome.is_some() {
            return Err(MoveError::GameOver);
        }
        if acting != self.turn {
            return Err(MoveError::NotYourTurn);
        }
        if !mv.from.is_valid() || !mv.to.is_valid() {
            return Err(MoveError::OutOfBounds);
        }

        let piece = self.board.get(mv.from).ok_or(MoveError::EmptySource)?;
        if piece.color != acting {
            return Err(MoveError::WrongColor);
        }

        let path = mv.from.diagonal_between(mv.to).ok_or(MoveError::NotDiagonal)?;

        if self.chain.is_some_and(|chain| chain != mv.from) {
            return Err(MoveError::MustContinueChain);
        }

        let occupied: Vec<(Position, Piece)> = path
            .iter()
            .filter_map(|&pos| self.board.get(pos).map(|p| (pos, p)))
            .collect();

        let is_capture_attempt = match piece.rank {
            Rank::Man => mv.distance() >= 2,
            Rank::King => !occupied.is_empty(),
        };

        let outcome = if is_capture_attempt {
            self.apply_capture(mv, piece, &occupied)?
        } else {
            self.apply_simple(mv, piece)?
        };

        self.outcome = self.check_game_over();
        Ok(MoveOutcome {
            game_over: self.outcome,
            ..outcome
        })
    }

    fn apply_simple(&mut self, mv: Move, piece: Piece) -> Result<MoveOutcome, MoveError> {
        if self.chain.is_some() {
            return Err(MoveError::MustContinueChain);
        }
        // 强制吃子针对整方：任何一枚棋子能吃，所有普通走法都被拒绝
        if !MoveGenerator::captures_for(&self.board, piece.color).is_empty() {
            return Err(MoveError::MandatoryCapture);
        }
        if !self.board.is_empty_at(mv.to) {
            return Err(MoveError::DestinationOccupied);
        }
        if !piece.is_king() && mv.row_delta() != piece.color.forward() {
            return Err(MoveError::WrongDirection);
        }

        let promoted = self.board.relocate(mv.from, mv.to);
        self.turn = self.turn.opponent();

        Ok(MoveOutcome {
            mv,
            captured: None,
            promoted,
            chain_continues: false,
            game_over: None,
        })
    }

    fn apply_capture(
        &mut self,
        mv: Move,
        piece: Piece,
        occupied: &[(Position, Piece)],
    ) -> Result<MoveOutcome, MoveError> {
        if !self.board.is_empty_at(mv.to) {
            return Err(MoveError::DestinationOccupied);
        }

        let captured = match (piece.rank, occupied) {
            // 兵只能走一格或跳两格
            (Rank::Man, _) if mv.distance() != 2 => return Err(MoveError::InvalidMove),
            (Rank::Man, [(pos, target)]) if target.color != piece.color => *pos,
            (Rank::Man, _) => return Err(MoveError::NoSuchCapture),
            (Rank::King, [(pos, target)]) if target.color != piece.color => *pos,
            (Rank::King, _) => return Err(MoveError::PathBlocked),
        };

        self.board.set(captured, None);
        let promoted = self.board.relocate(mv.from, mv.to);

        // 连吃从落点重新计算，且按升变后的等级计算
        let chain_continues = !MoveGenerator::captures_from(&self.board, mv.to).is_empty();
        if chain_continues {
            self.chain = Some(mv.to);
        } else {
            self.chain = None;
            self.turn = self.turn.opponent();
        }

        Ok(MoveOutcome {
            mv,
            captured: Some(captured),
            promoted,
            chain_continues,
            game_over: None,
        })
    }

    /// 终局判定
    ///
    /// 一方无子则另一方胜；否则轮到走棋的一方无子可动时对方胜。
    pub fn check_game_over(&self) -> Option<GameOutcome> {
        for color in [Color::White, Color::Black] {
            if self.board.count(color) == 0 {
                return Some(GameOutcome {
                    winner: color.opponent(),
                    reason: WinReason::Elimination,
                });
            }
        }

        if !MoveGenerator::has_any_move(&self.board, self.turn) {
            return Some(GameOutcome {
                winner: self.turn.opponent(),
                reason: WinReason::NoLegalMoves,
            });
        }

        None
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
