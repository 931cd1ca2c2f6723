use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkers_client::{parse_command, ClientGame, Command, InputError, NetworkConnection, HELP};
use protocol::{ClientMessage, NetworkConfig, DEFAULT_PORT};

/// 跳棋终端客户端
#[derive(Debug, Parser)]
#[command(name = "checkers-client", version)]
struct Args {
    /// 服务端地址
    #[arg(long, env = "CHECKERS_HOST", default_value = "127.0.0.1")]
    host: String,

    /// 服务端端口
    #[arg(short, long, env = "CHECKERS_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// 玩家名，留空由服务端生成
    #[arg(short, long, default_value = "")]
    name: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化日志（输出到 stderr，避免与棋盘混在一起）
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("checkers_client=info".parse()?))
        .init();

    let args = Args::parse();
    let addr = NetworkConfig {
        host: args.host,
        port: args.port,
    }
    .addr();

    let mut conn = NetworkConnection::connect(&addr)
        .await
        .with_context(|| format!("无法连接服务端 {}", addr))?;
    conn.send(&ClientMessage::Connect {
        player_name: args.name,
    })
    .await?;
    conn.send(&ClientMessage::Join).await?;

    let mut game = ClientGame::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{}", HELP);

    loop {
        tokio::select! {
            msg = conn.recv() => {
                let Some(msg) = msg else {
                    println!("Connection closed by server.");
                    break;
                };
                let update = game.apply(msg);
                if update.redraw {
                    println!("\n{}", game.board);
                }
                println!("{}", update.text);
            }
            line = lines.next_line() => {
                // 标准输入结束
                let Some(line) = line? else {
                    break;
                };
                match parse_command(&line) {
                    Ok(Command::Move(mv)) => {
                        if game.is_my_turn() {
                            conn.send(&ClientMessage::from_move(mv)).await?;
                        } else {
                            println!("Wait for your turn.");
                        }
                    }
                    Ok(Command::Board) => println!("{}", game.board),
                    Ok(Command::Join) => conn.send(&ClientMessage::Join).await?,
                    Ok(Command::Leave) => conn.send(&ClientMessage::Leave).await?,
                    Ok(Command::Quit) => break,
                    Ok(Command::Help) => println!("{}", HELP),
                    Err(InputError::Empty) => {}
                    Err(e) => println!("{}", e),
                }
            }
        }
    }

    Ok(())
}
