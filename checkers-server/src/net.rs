//! 网络层
//!
//! 接受 TCP 连接，每个连接一个读任务和一个写循环，二者通过事件通道与调度任务交互。

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use protocol::{ClientMessage, Connection, Listener, ProtocolError, TcpConnection, TcpListener};

use crate::config::ServerConfig;
use crate::player::{PlayerIdGenerator, TimestampIdGenerator};
use crate::server::{dispatch, ConnectionId, Event, Outbound, ServerState};

/// 事件通道容量
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// 对战服务器
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    /// 绑定监听地址
    pub async fn bind(config: ServerConfig) -> anyhow::Result<Self> {
        let addr = config.network.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("无法监听 {}", addr))?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Option<String> {
        self.listener.local_addr()
    }

    /// 使用默认 ID 生成器运行
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_with(Box::new(TimestampIdGenerator)).await
    }

    /// 运行服务器，直到监听出错
    pub async fn run_with(mut self, id_generator: Box<dyn PlayerIdGenerator>) -> anyhow::Result<()> {
        let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let state = ServerState::new(self.config.clone(), id_generator);
        tokio::spawn(dispatch(state, events_rx));

        info!(
            "服务端已启动，监听 {}",
            self.local_addr().unwrap_or_else(|| self.config.network.addr())
        );

        let mut next_conn_id: ConnectionId = 1;
        loop {
            let conn = match self.listener.accept().await {
                Ok(conn) => conn,
                Err(e) => {
                    warn!("接受连接失败: {}", e);
                    continue;
                }
            };

            let conn_id = next_conn_id;
            next_conn_id += 1;
            info!(conn = conn_id, peer = ?conn.peer_addr(), "接受连接");

            tokio::spawn(serve_connection(
                conn_id,
                conn,
                events_tx.clone(),
                self.config.outbound_capacity,
            ));
        }
    }
}

/// 处理单个连接
async fn serve_connection(
    conn_id: ConnectionId,
    conn: TcpConnection,
    events: mpsc::Sender<Event>,
    outbound_capacity: usize,
) {
    let (mut reader, mut writer) = conn.split();
    let (tx, mut rx) = mpsc::channel(outbound_capacity);

    if events.send(Event::Opened { conn_id, tx }).await.is_err() {
        return;
    }

    let reader_events = events.clone();
    let mut reader_task = tokio::spawn(async move {
        loop {
            let event = match reader.read_frame::<ClientMessage>().await {
                Ok(msg) => Event::Inbound { conn_id, msg },
                // 消息体已完整读出，流仍可继续
                Err(ProtocolError::Bincode(e)) => Event::Malformed {
                    conn_id,
                    reason: e.to_string(),
                },
                Err(ProtocolError::ConnectionClosed) => {
                    debug!(conn = conn_id, "对端关闭连接");
                    break;
                }
                Err(e) => {
                    warn!(conn = conn_id, "读取失败: {}", e);
                    break;
                }
            };
            if reader_events.send(event).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            outbound = rx.recv() => match outbound {
                Some(Outbound::Message(msg)) => {
                    if let Err(e) = writer.write_frame(&msg).await {
                        warn!(conn = conn_id, "发送失败: {}", e);
                        break;
                    }
                }
                Some(Outbound::Close) | None => {
                    debug!(conn = conn_id, "服务端关闭连接");
                    break;
                }
            },
            _ = &mut reader_task => break,
        }
    }

    reader_task.abort();
    let _ = events.send(Event::Closed { conn_id }).await;
}
