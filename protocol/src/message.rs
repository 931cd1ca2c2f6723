//! 消息类型定义

use serde::{Deserialize, Serialize};

use crate::moves::Move;
use crate::piece::Color;

/// 玩家 ID（不透明字符串，由外部生成器产生）
pub type PlayerId = String;

/// 对局 ID
pub type SessionId = u64;

/// 线上传输的阵营
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireColor {
    White,
    Black,
}

impl From<Color> for WireColor {
    fn from(color: Color) -> Self {
        match color {
            Color::White => WireColor::White,
            Color::Black => WireColor::Black,
        }
    }
}

impl From<WireColor> for Color {
    fn from(color: WireColor) -> Self {
        match color {
            WireColor::White => Color::White,
            WireColor::Black => Color::Black,
        }
    }
}

/// 胜者
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    White,
    Black,
    /// 对手断线
    Disconnect,
}

impl From<Color> for Winner {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Winner::White,
            Color::Black => Winner::Black,
        }
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// 握手，获取玩家 ID
    Connect { player_name: String },
    /// 进入匹配
    Join,
    /// 走棋
    Move {
        from_row: u8,
        from_col: u8,
        to_row: u8,
        to_col: u8,
    },
    /// 离开当前对局
    Leave,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    /// 握手成功
    Connected { player_id: PlayerId, message: String },
    /// 等待对手
    Waiting { message: String },
    /// 对局开始
    Start {
        your_color: WireColor,
        opponent_name: String,
    },
    /// 轮到你走
    TurnNotice { message: String },
    /// 走法已执行（双方都会收到，包括走棋方）
    MoveApplied {
        from_row: u8,
        from_col: u8,
        to_row: u8,
        to_col: u8,
    },
    /// 走法被拒绝（只发给走棋方）
    MoveRejected { valid: bool, message: String },
    /// 对局结束
    GameOver { winner: Winner, reason: String },
    /// 错误消息
    Error { message: String },
}

impl ClientMessage {
    /// 构造走棋消息
    pub fn from_move(mv: Move) -> Self {
        ClientMessage::Move {
            from_row: mv.from.row,
            from_col: mv.from.col,
            to_row: mv.to.row,
            to_col: mv.to.col,
        }
    }
}

impl ServerMessage {
    /// 构造走法已执行消息
    pub fn move_applied(mv: Move) -> Self {
        ServerMessage::MoveApplied {
            from_row: mv.from.row,
            from_col: mv.from.col,
            to_row: mv.to.row,
            to_col: mv.to.col,
        }
    }

    /// 构造走法被拒绝消息
    pub fn move_rejected(message: impl Into<String>) -> Self {
        ServerMessage::MoveRejected {
            valid: false,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }
}
