//! 游戏逻辑模块
//!
//! 镜像服务端棋局并解析玩家输入

mod input;
mod state;

pub use input::*;
pub use state::*;
