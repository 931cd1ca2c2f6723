//! 协议常量定义

use std::time::Duration;

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 棋盘边长（8x8）
pub const BOARD_SIZE: usize = 8;

/// 每方初始棋子数
pub const PIECES_PER_SIDE: usize = 12;

/// 每方初始占据的行数
pub const HOME_ROWS: usize = 3;

/// 玩家名最大长度
pub const MAX_NAME_LEN: usize = 20;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 默认服务端口
pub const DEFAULT_PORT: u16 = 50051;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// 对局结束后关闭连接前的等待时间（毫秒）
pub const GAME_OVER_GRACE_MS: u64 = 1000;

/// 连接超时 Duration
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(CONNECT_TIMEOUT_SECS);
