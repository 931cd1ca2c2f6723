//! 服务端配置
//!
//! 优先级：命令行参数 / 环境变量 > JSON 配置文件 > 默认值。

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use protocol::{NetworkConfig, GAME_OVER_GRACE_MS, MAX_NAME_LEN};

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    /// 终局后关闭连接前的等待时间（毫秒）
    pub game_over_grace_ms: u64,
    /// 每个连接的发送队列容量
    pub outbound_capacity: usize,
    /// 玩家名最大长度
    pub max_name_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            game_over_grace_ms: GAME_OVER_GRACE_MS,
            outbound_capacity: 64,
            max_name_len: MAX_NAME_LEN,
        }
    }
}

impl ServerConfig {
    /// 加载配置，未指定文件时使用默认值
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("配置文件格式无效: {}", path.display()))?;

        info!("已加载配置: {}", path.display());
        Ok(config)
    }

    /// 应用命令行覆盖项
    pub fn with_overrides(mut self, host: Option<String>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.network.host = host;
        }
        if let Some(port) = port {
            self.network.port = port;
        }
        self
    }

    pub fn game_over_grace(&self) -> Duration {
        Duration::from_millis(self.game_over_grace_ms)
    }
}
