//! 错误类型定义

use thiserror::Error;

/// 走法被拒绝的原因
///
/// `Display` 文本会原样放进 `MoveRejected.message` 发给走棋方。
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    /// 坐标超出棋盘
    #[error("Coordinates out of bounds")]
    OutOfBounds,

    /// 起点没有棋子
    #[error("No piece on the source square")]
    EmptySource,

    /// 起点是对方的棋子
    #[error("That piece belongs to your opponent")]
    WrongColor,

    /// 不是斜线移动
    #[error("Moves must be diagonal")]
    NotDiagonal,

    /// 有吃子时必须吃子
    #[error("A capture is available and must be taken")]
    MandatoryCapture,

    /// 目标格已被占据
    #[error("Destination square is occupied")]
    DestinationOccupied,

    /// 王的路径上有阻挡
    #[error("Path is blocked")]
    PathBlocked,

    /// 兵只能向前走
    #[error("Men may only move forward")]
    WrongDirection,

    /// 该走法不是合法的吃子
    #[error("No capture is possible along that path")]
    NoSuchCapture,

    /// 其他非法走法
    #[error("Invalid move")]
    InvalidMove,

    /// 连吃进行中，必须用同一枚棋子继续吃
    #[error("The capturing piece must continue its capture sequence")]
    MustContinueChain,

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 游戏已结束
    #[error("Game is already over")]
    GameOver,

    /// 对局尚未开始
    #[error("Game has not started")]
    GameNotActive,
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,

    /// 玩家名过长
    #[error("Player name too long: {len} chars (max: {max})")]
    NameTooLong { len: usize, max: usize },
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
