//! 跳棋联机对战服务端
//!
//! 包含:
//! - 玩家管理与 ID 生成
//! - 对局会话
//! - 匹配目录
//! - 消息调度与网络层

pub mod config;
pub mod directory;
pub mod error;
pub mod net;
pub mod player;
pub mod server;
pub mod session;

pub use config::ServerConfig;
pub use directory::{JoinResult, SessionDirectory};
pub use error::SessionError;
pub use net::Server;
pub use player::{Player, PlayerIdGenerator, SequentialIdGenerator, TimestampIdGenerator};
pub use server::{dispatch, ConnectionId, ConnectionPhase, Event, MessageHandler, Outbound, ServerState};
pub use session::{MoveReport, Session, SessionState};
