//! 玩家信息与 ID 生成

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use rand::Rng;

use protocol::{PlayerId, ProtocolError};

/// 玩家信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: PlayerId, name: String) -> Self {
        Self { id, name }
    }
}

/// 玩家 ID 生成器
pub trait PlayerIdGenerator: Send + Sync {
    fn generate(&self) -> PlayerId;
}

/// 默认生成器：`player_<毫秒时间戳>_<7 位 base36 随机串>`
#[derive(Debug, Default)]
pub struct TimestampIdGenerator;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

impl PlayerIdGenerator for TimestampIdGenerator {
    fn generate(&self) -> PlayerId {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..7)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        format!("player_{}_{}", Utc::now().timestamp_millis(), suffix)
    }
}

/// 顺序生成器：`player_1`、`player_2`……
#[derive(Debug)]
pub struct SequentialIdGenerator {
    next_id: AtomicU64,
}

impl SequentialIdGenerator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for SequentialIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerIdGenerator for SequentialIdGenerator {
    fn generate(&self) -> PlayerId {
        format!("player_{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

/// 确定玩家显示名
///
/// 空名字使用 `Player_` 加 ID 的前 6 个字符；超长名字被拒绝。
pub fn resolve_name(requested: &str, id: &str, max_len: usize) -> Result<String, ProtocolError> {
    let name = requested.trim();
    if name.is_empty() {
        let tag: String = id.trim_start_matches("player_").chars().take(6).collect();
        return Ok(format!("Player_{}", tag));
    }

    let len = name.chars().count();
    if len > max_len {
        return Err(ProtocolError::NameTooLong { len, max: max_len });
    }
    Ok(name.to_string())
}
