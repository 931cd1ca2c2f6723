use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkers_server::{Server, ServerConfig};

/// 跳棋联机对战服务端
#[derive(Debug, Parser)]
#[command(name = "checkers-server", version)]
struct Args {
    /// JSON 配置文件
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 监听地址
    #[arg(long, env = "CHECKERS_HOST")]
    host: Option<String>,

    /// 监听端口
    #[arg(short, long, env = "CHECKERS_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("checkers_server=debug".parse()?))
        .init();

    let args = Args::parse();
    let config = ServerConfig::load(args.config.as_deref())?.with_overrides(args.host, args.port);

    info!("跳棋服务端启动中...");

    let server = Server::bind(config).await?;
    server.run().await
}
