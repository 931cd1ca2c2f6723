//! 网络连接管理
//!
//! 使用 protocol 库的传输层抽象。读端在独立任务中运行，收到的消息经通道交给主循环。

use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use protocol::{ClientMessage, Connector, FrameWriter, ProtocolError, ServerMessage, TcpConnector};

/// 接收队列容量
const INCOMING_CAPACITY: usize = 64;

/// 与服务端的连接
pub struct NetworkConnection {
    writer: FrameWriter<OwnedWriteHalf>,
    incoming: mpsc::Receiver<ServerMessage>,
    reader_task: JoinHandle<()>,
}

impl NetworkConnection {
    /// 连接到服务器
    pub async fn connect(addr: &str) -> Result<Self, ProtocolError> {
        let conn = TcpConnector.connect(addr).await?;
        let (mut reader, writer) = conn.split();
        let (tx, incoming) = mpsc::channel(INCOMING_CAPACITY);

        let reader_task = tokio::spawn(async move {
            loop {
                match reader.read_frame::<ServerMessage>().await {
                    Ok(msg) => {
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Err(ProtocolError::ConnectionClosed) => {
                        debug!("服务端关闭了连接");
                        break;
                    }
                    Err(e) => {
                        warn!("接收失败: {}", e);
                        break;
                    }
                }
            }
        });

        tracing::info!("Connected to server: {}", addr);
        Ok(Self {
            writer,
            incoming,
            reader_task,
        })
    }

    /// 发送消息
    pub async fn send(&mut self, msg: &ClientMessage) -> Result<(), ProtocolError> {
        self.writer.write_frame(msg).await
    }

    /// 接收下一条消息，连接关闭后返回 `None`
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.incoming.recv().await
    }
}

impl Drop for NetworkConnection {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
