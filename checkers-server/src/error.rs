//! 服务端错误类型

use thiserror::Error;

use protocol::ProtocolError;

/// 会话层错误，以 `Error` 消息回复给发送方，不会断开连接
#[derive(Error, Debug)]
pub enum SessionError {
    /// 尚未握手
    #[error("Send Connect before any other message")]
    NotIdentified,

    /// 重复握手
    #[error("Already connected as {0}")]
    AlreadyIdentified(String),

    /// 不在任何对局中
    #[error("Not in a game session")]
    NotInSession,

    /// 已在对局中
    #[error("Already in a game session")]
    AlreadyInSession,

    /// 对局已结束，连接即将关闭
    #[error("Game is over, connection closing")]
    GameFinished,

    /// 坐标越界
    #[error("Coordinates must be within 0..=7")]
    InvalidCoordinates,

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
