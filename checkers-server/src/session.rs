//! 对局会话
//!
//! 一个会话绑定两名玩家：创建者执白先走，加入者执黑。

use tracing::{debug, info};

use protocol::{Color, GameOutcome, GameState, Move, MoveError, Position, SessionId};

use crate::player::Player;

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 等待第二名玩家
    WaitingForOpponent,
    /// 游戏进行中
    Active,
    /// 已产生终局结果
    Finished,
    /// 有玩家离开
    Closed,
}

/// 一步走法的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveReport {
    pub mv: Move,
    pub captured: Option<Position>,
    /// 连吃未结束，仍由同一玩家走
    pub chain_continues: bool,
    pub game_over: Option<GameOutcome>,
}

/// 会话
pub struct Session {
    pub id: SessionId,
    pub state: SessionState,
    /// 白方玩家
    white: Option<Player>,
    /// 黑方玩家
    black: Option<Player>,
    /// 当前走子方，与规则引擎保持一致
    turn: Color,
    game: GameState,
}

impl Session {
    /// 创建会话，创建者执白
    pub fn new(id: SessionId, creator: Player) -> Self {
        debug!(session = id, player = %creator.id, "会话已创建");
        Self {
            id,
            state: SessionState::WaitingForOpponent,
            white: Some(creator),
            black: None,
            turn: Color::White,
            game: GameState::new(),
        }
    }

    /// 第二名玩家加入（执黑），对局开始
    ///
    /// 会话不在等待状态时返回 `None`。
    pub fn join(&mut self, player: Player) -> Option<Color> {
        if self.state != SessionState::WaitingForOpponent || self.black.is_some() {
            return None;
        }

        self.black = Some(player);
        self.game.initialize_board();
        self.turn = self.game.turn();
        self.state = SessionState::Active;

        info!(
            session = self.id,
            white = self.white.as_ref().map(|p| p.name.as_str()).unwrap_or("-"),
            black = self.black.as_ref().map(|p| p.name.as_str()).unwrap_or("-"),
            "对局开始"
        );
        Some(Color::Black)
    }

    /// 检查会话是否已满
    pub fn is_full(&self) -> bool {
        self.white.is_some() && self.black.is_some()
    }

    /// 两个座位都已清空
    pub fn is_empty(&self) -> bool {
        self.white.is_none() && self.black.is_none()
    }

    /// 获取指定颜色的玩家
    pub fn player(&self, color: Color) -> Option<&Player> {
        match color {
            Color::White => self.white.as_ref(),
            Color::Black => self.black.as_ref(),
        }
    }

    /// 获取玩家的颜色
    pub fn color_of(&self, player_id: &str) -> Option<Color> {
        [Color::White, Color::Black]
            .into_iter()
            .find(|&color| self.player(color).is_some_and(|p| p.id == player_id))
    }

    /// 获取对手
    pub fn get_opponent(&self, player_id: &str) -> Option<&Player> {
        let color = self.color_of(player_id)?;
        self.player(color.opponent())
    }

    /// 获取当前应走棋的玩家
    pub fn get_current_player(&self) -> Option<&Player> {
        self.player(self.turn)
    }

    /// 所有在座玩家
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.white.iter().chain(self.black.iter())
    }

    pub fn turn(&self) -> Color {
        self.turn
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    /// 处理玩家走棋
    pub fn handle_move(&mut self, player_id: &str, mv: Move) -> Result<MoveReport, MoveError> {
        match self.state {
            SessionState::Active => {}
            SessionState::Finished => return Err(MoveError::GameOver),
            SessionState::WaitingForOpponent | SessionState::Closed => {
                return Err(MoveError::GameNotActive)
            }
        }

        let color = self.color_of(player_id).ok_or(MoveError::NotYourTurn)?;
        if color != self.turn {
            debug!(session = self.id, player = player_id, "未轮到该玩家走棋");
            return Err(MoveError::NotYourTurn);
        }

        let outcome = self.game.execute_move(mv, color)?;
        debug!(session = self.id, player = player_id, %mv, "走法已执行");

        // 连吃或终局时保持走子方不变
        if outcome.turn_passed() {
            self.turn = self.turn.opponent();
        }
        if let Some(game_over) = outcome.game_over {
            self.state = SessionState::Finished;
            info!(session = self.id, result = %game_over, "对局结束");
        }
        debug_assert!(self.state == SessionState::Finished || self.turn == self.game.turn());

        Ok(MoveReport {
            mv,
            captured: outcome.captured,
            chain_continues: outcome.chain_continues,
            game_over: outcome.game_over,
        })
    }

    /// 替换棋局（测试用）
    #[cfg(test)]
    pub(crate) fn set_game(&mut self, game: GameState) {
        self.turn = game.turn();
        self.game = game;
    }

    /// 移除玩家，返回其颜色
    pub fn remove_player(&mut self, player_id: &str) -> Option<Color> {
        let color = self.color_of(player_id)?;
        match color {
            Color::White => self.white = None,
            Color::Black => self.black = None,
        }

        if self.is_empty() || self.state != SessionState::Finished {
            self.state = SessionState::Closed;
        }
        Some(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{Board, Piece, Position, WinReason};

    fn player(id: &str) -> Player {
        Player::new(id.to_string(), format!("{}-name", id))
    }

    fn active_session() -> Session {
        let mut session = Session::new(1, player("p1"));
        session.join(player("p2"));
        session
    }

    fn mv(fr: u8, fc: u8, tr: u8, tc: u8) -> Move {
        Move::new(Position::new_unchecked(fr, fc), Position::new_unchecked(tr, tc))
    }

    #[test]
    fn test_join_assigns_colors() {
        let mut session = Session::new(1, player("p1"));
        assert_eq!(session.state, SessionState::WaitingForOpponent);
        assert!(!session.is_full());

        assert_eq!(session.join(player("p2")), Some(Color::Black));
        assert_eq!(session.state, SessionState::Active);
        assert_eq!(session.color_of("p1"), Some(Color::White));
        assert_eq!(session.color_of("p2"), Some(Color::Black));
        assert_eq!(session.get_current_player().unwrap().id, "p1");

        // 第三名玩家无法加入
        assert_eq!(session.join(player("p3")), None);
    }

    #[test]
    fn test_opponent_lookup() {
        let session = active_session();
        assert_eq!(session.get_opponent("p1").unwrap().id, "p2");
        assert_eq!(session.get_opponent("p2").unwrap().id, "p1");
        assert!(session.get_opponent("nobody").is_none());
    }

    #[test]
    fn test_turn_order_enforced() {
        let mut session = active_session();

        assert_eq!(
            session.handle_move("p2", mv(2, 1, 3, 2)),
            Err(MoveError::NotYourTurn)
        );

        let report = session.handle_move("p1", mv(5, 2, 4, 3)).unwrap();
        assert!(report.game_over.is_none());
        assert_eq!(session.turn(), Color::Black);
        assert_eq!(session.get_current_player().unwrap().id, "p2");

        assert_eq!(
            session.handle_move("p1", mv(5, 4, 4, 5)),
            Err(MoveError::NotYourTurn)
        );
        session.handle_move("p2", mv(2, 1, 3, 2)).unwrap();
        assert_eq!(session.turn(), Color::White);
    }

    #[test]
    fn test_rejected_move_keeps_turn() {
        let mut session = active_session();
        assert_eq!(
            session.handle_move("p1", mv(5, 2, 4, 2)),
            Err(MoveError::NotDiagonal)
        );
        assert_eq!(session.turn(), Color::White);
        assert_eq!(session.game().turn(), Color::White);
    }

    #[test]
    fn test_move_before_start() {
        let mut session = Session::new(1, player("p1"));
        assert_eq!(
            session.handle_move("p1", mv(5, 2, 4, 3)),
            Err(MoveError::GameNotActive)
        );
    }

    #[test]
    fn test_chain_capture_keeps_turn() {
        let mut session = active_session();
        let mut board = Board::empty();
        board.set(Position::new_unchecked(5, 0), Some(Piece::man(Color::White)));
        board.set(Position::new_unchecked(4, 1), Some(Piece::man(Color::Black)));
        board.set(Position::new_unchecked(2, 3), Some(Piece::man(Color::Black)));
        board.set(Position::new_unchecked(0, 7), Some(Piece::man(Color::Black)));
        session.set_game(GameState::from_board(board, Color::White));

        let report = session.handle_move("p1", mv(5, 0, 3, 2)).unwrap();
        assert!(report.chain_continues);
        assert_eq!(session.turn(), Color::White);
        assert_eq!(session.get_current_player().unwrap().id, "p1");

        let report = session.handle_move("p1", mv(3, 2, 1, 4)).unwrap();
        assert!(!report.chain_continues);
        assert_eq!(session.turn(), Color::Black);
    }

    #[test]
    fn test_game_over_finishes_session() {
        let mut session = active_session();
        let mut board = Board::empty();
        board.set(Position::new_unchecked(5, 2), Some(Piece::man(Color::White)));
        board.set(Position::new_unchecked(4, 3), Some(Piece::man(Color::Black)));
        session.set_game(GameState::from_board(board, Color::White));

        let report = session.handle_move("p1", mv(5, 2, 3, 4)).unwrap();
        let game_over = report.game_over.unwrap();
        assert_eq!(game_over.winner, Color::White);
        assert_eq!(game_over.reason, WinReason::Elimination);
        assert_eq!(session.state, SessionState::Finished);
        // 终局后走子方不再切换
        assert_eq!(session.turn(), Color::White);

        assert_eq!(
            session.handle_move("p2", mv(0, 1, 1, 2)),
            Err(MoveError::GameOver)
        );
    }

    #[test]
    fn test_remove_players() {
        let mut session = active_session();

        assert_eq!(session.remove_player("p1"), Some(Color::White));
        assert_eq!(session.state, SessionState::Closed);
        assert!(!session.is_empty());

        assert_eq!(session.remove_player("p1"), None);
        assert_eq!(session.remove_player("p2"), Some(Color::Black));
        assert!(session.is_empty());
    }
}
