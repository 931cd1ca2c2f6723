//! 客户端游戏状态
//!
//! 服务端是权威方，客户端只根据收到的消息镜像棋盘。

use protocol::{Board, Color, PlayerId, Position, ServerMessage, Winner};

/// 处理一条服务端消息后需要展示的内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Update {
    pub text: String,
    /// 棋盘有变化，需要重新绘制
    pub redraw: bool,
}

impl Update {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            redraw: false,
        }
    }

    fn with_board(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            redraw: true,
        }
    }
}

/// 客户端游戏状态
#[derive(Debug, Clone, Default)]
pub struct ClientGame {
    /// 服务端分配的玩家 ID
    pub player_id: Option<PlayerId>,
    /// 玩家所属阵营
    pub my_color: Option<Color>,
    pub opponent_name: Option<String>,
    pub board: Board,
    my_turn: bool,
    finished: bool,
}

impl ClientGame {
    pub fn new() -> Self {
        Self::default()
    }

    /// 是否轮到自己走棋
    pub fn is_my_turn(&self) -> bool {
        self.my_turn && !self.finished
    }

    /// 对局是否已结束
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// 应用服务端消息
    pub fn apply(&mut self, msg: ServerMessage) -> Update {
        match msg {
            ServerMessage::Connected { player_id, message } => {
                let text = format!("{} (id: {})", message, player_id);
                self.player_id = Some(player_id);
                Update::text(text)
            }
            ServerMessage::Waiting { message } => Update::text(message),
            ServerMessage::Start {
                your_color,
                opponent_name,
            } => {
                let color = Color::from(your_color);
                self.my_color = Some(color);
                self.board = Board::initial();
                self.my_turn = false;
                self.finished = false;
                let text = format!("Game started! You play {} against {}.", color, opponent_name);
                self.opponent_name = Some(opponent_name);
                Update::with_board(text)
            }
            ServerMessage::TurnNotice { message } => {
                self.my_turn = true;
                Update::text(format!(
                    "{} Enter a move as: from_row from_col to_row to_col",
                    message
                ))
            }
            ServerMessage::MoveApplied {
                from_row,
                from_col,
                to_row,
                to_col,
            } => {
                // 若仍轮到自己，服务端会在之后补发 TurnNotice
                self.my_turn = false;
                match (Position::new(from_row, from_col), Position::new(to_row, to_col)) {
                    (Some(from), Some(to)) => {
                        self.board.mirror_move(from, to);
                        Update::with_board(format!("Move: {} -> {}", from, to))
                    }
                    _ => Update::text("Server sent a move outside the board"),
                }
            }
            ServerMessage::MoveRejected { message, .. } => {
                Update::text(format!("Move rejected: {}", message))
            }
            ServerMessage::GameOver { winner, reason } => {
                self.finished = true;
                self.my_turn = false;
                let verdict = match (winner, self.my_color) {
                    (Winner::Disconnect, _) => "You win by forfeit.",
                    (Winner::White, Some(Color::White)) | (Winner::Black, Some(Color::Black)) => {
                        "You win!"
                    }
                    _ => "You lose.",
                };
                Update::text(format!("Game over: {}. {}", reason, verdict))
            }
            ServerMessage::Error { message } => Update::text(format!("Error: {}", message)),
        }
    }
}
