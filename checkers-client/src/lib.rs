//! 跳棋终端客户端
//!
//! 连接服务端、镜像棋盘并从标准输入读取走法

pub mod game;
pub mod network;

pub use game::{parse_command, ClientGame, Command, InputError, Update, HELP};
pub use network::NetworkConnection;
