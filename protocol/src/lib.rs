//! 跳棋共享协议库
//!
//! 包含:
//! - 棋子、棋盘、位置等核心数据结构
//! - 走法生成和规则引擎（强制吃子、连吃、升变、终局判定）
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 传输层抽象 (Connector, Connection, Listener traits)
//! - 帧编解码

mod board;
mod constants;
mod error;
mod message;
mod moves;
mod piece;
mod rules;
mod transport;

pub use board::Board;
pub use constants::*;
pub use error::{MoveError, ProtocolError, Result};
pub use message::{ClientMessage, PlayerId, ServerMessage, SessionId, WireColor, Winner};
pub use moves::{Capture, Move, MoveGenerator};
pub use piece::{Color, Piece, Position, Rank};
pub use rules::{GameOutcome, GameState, MoveOutcome, WinReason};
pub use transport::{
    Connection, Connector, Listener,
    TcpConnection, TcpConnector, TcpListener,
    NetworkConfig,
    FrameReader, FrameWriter,
};
