//! 服务器主逻辑
//!
//! 单个调度任务独占 `ServerState`，逐个处理连接事件。
//! 处理过程中产生的消息先写入 `PendingMessages`，状态修改完成后再按顺序发出。

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use protocol::{ClientMessage, Color, Move, PlayerId, ServerMessage, WireColor, Winner};

use crate::config::ServerConfig;
use crate::directory::SessionDirectory;
use crate::error::SessionError;
use crate::player::{resolve_name, Player, PlayerIdGenerator};

/// 连接 ID
pub type ConnectionId = u64;

/// 发往连接写任务的指令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    Message(ServerMessage),
    /// 关闭连接
    Close,
}

/// 调度任务处理的事件
#[derive(Debug)]
pub enum Event {
    /// 新连接
    Opened {
        conn_id: ConnectionId,
        tx: mpsc::Sender<Outbound>,
    },
    /// 收到客户端消息
    Inbound {
        conn_id: ConnectionId,
        msg: ClientMessage,
    },
    /// 消息体无法解码
    Malformed {
        conn_id: ConnectionId,
        reason: String,
    },
    /// 连接断开
    Closed { conn_id: ConnectionId },
}

/// 连接所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// 尚未握手
    Unidentified,
    /// 已握手，未加入对局
    Identified,
    /// 等待对手
    Queued,
    /// 对局中
    Active,
    /// 对局结束，等待关闭
    Finished,
}

/// 单个连接的状态
struct ConnectionEntry {
    tx: mpsc::Sender<Outbound>,
    player: Option<Player>,
    phase: ConnectionPhase,
}

/// 服务器状态
pub struct ServerState {
    config: ServerConfig,
    directory: SessionDirectory,
    connections: HashMap<ConnectionId, ConnectionEntry>,
    /// 玩家 ID -> 连接 ID
    players: HashMap<PlayerId, ConnectionId>,
    id_generator: Box<dyn PlayerIdGenerator>,
}

impl ServerState {
    pub fn new(config: ServerConfig, id_generator: Box<dyn PlayerIdGenerator>) -> Self {
        Self {
            config,
            directory: SessionDirectory::new(),
            connections: HashMap::new(),
            players: HashMap::new(),
            id_generator,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn directory(&self) -> &SessionDirectory {
        &self.directory
    }

    /// 当前连接数
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 连接所处阶段
    pub fn phase(&self, conn_id: ConnectionId) -> Option<ConnectionPhase> {
        self.connections.get(&conn_id).map(|entry| entry.phase)
    }

    /// 连接对应的玩家
    fn player(&self, conn_id: ConnectionId) -> Result<&Player, SessionError> {
        self.connections
            .get(&conn_id)
            .and_then(|entry| entry.player.as_ref())
            .ok_or(SessionError::NotIdentified)
    }

    fn set_phase(&mut self, player_id: &str, phase: ConnectionPhase) {
        if let Some(entry) = self
            .players
            .get(player_id)
            .and_then(|conn_id| self.connections.get_mut(conn_id))
        {
            entry.phase = phase;
        }
    }

    fn sender(&self, target: &Target) -> Option<(ConnectionId, &mpsc::Sender<Outbound>)> {
        let conn_id = match target {
            Target::Connection(conn_id) => *conn_id,
            Target::Player(player_id) => *self.players.get(player_id)?,
        };
        self.connections.get(&conn_id).map(|entry| (conn_id, &entry.tx))
    }
}

/// 消息接收方
enum Target {
    Connection(ConnectionId),
    Player(PlayerId),
}

enum PendingAction {
    Send(Target, ServerMessage),
    /// 宽限期后关闭连接
    CloseAfterGrace(Target),
}

/// 待发送的消息，按加入顺序发出
struct PendingMessages {
    actions: Vec<PendingAction>,
}

impl PendingMessages {
    fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// 回复当前连接
    fn reply(&mut self, conn_id: ConnectionId, msg: ServerMessage) {
        self.actions
            .push(PendingAction::Send(Target::Connection(conn_id), msg));
    }

    fn send(&mut self, player_id: &str, msg: ServerMessage) {
        self.actions
            .push(PendingAction::Send(Target::Player(player_id.to_string()), msg));
    }

    fn close_after_grace(&mut self, player_id: &str) {
        self.actions
            .push(PendingAction::CloseAfterGrace(Target::Player(player_id.to_string())));
    }

    /// 按顺序投递，返回发送队列已满的连接
    ///
    /// 调度任务不等待任何单个连接的队列。
    fn flush(self, state: &ServerState) -> Vec<ConnectionId> {
        let mut stalled = Vec::new();
        for action in self.actions {
            match action {
                PendingAction::Send(target, msg) => {
                    let Some((conn_id, tx)) = state.sender(&target) else {
                        continue;
                    };
                    if stalled.contains(&conn_id) {
                        continue;
                    }
                    match tx.try_send(Outbound::Message(msg)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!(conn = conn_id, "发送队列已满，断开连接");
                            stalled.push(conn_id);
                        }
                        Err(TrySendError::Closed(_)) => debug!(conn = conn_id, "连接已关闭，丢弃消息"),
                    }
                }
                PendingAction::CloseAfterGrace(target) => {
                    if let Some((_, tx)) = state.sender(&target) {
                        let tx = tx.clone();
                        let grace = state.config.game_over_grace();
                        tokio::spawn(async move {
                            tokio::time::sleep(grace).await;
                            let _ = tx.send(Outbound::Close).await;
                        });
                    }
                }
            }
        }
        stalled
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理一个事件
    pub async fn handle(state: &mut ServerState, event: Event) {
        let mut pending = PendingMessages::new();

        match event {
            Event::Opened { conn_id, tx } => {
                debug!(conn = conn_id, "新连接");
                state.connections.insert(
                    conn_id,
                    ConnectionEntry {
                        tx,
                        player: None,
                        phase: ConnectionPhase::Unidentified,
                    },
                );
            }
            Event::Inbound { conn_id, msg } => {
                let result = match msg {
                    ClientMessage::Connect { player_name } => {
                        Self::handle_connect(state, &mut pending, conn_id, player_name)
                    }
                    ClientMessage::Join => Self::handle_join(state, &mut pending, conn_id),
                    ClientMessage::Move {
                        from_row,
                        from_col,
                        to_row,
                        to_col,
                    } => Move::from_coords(from_row, from_col, to_row, to_col)
                        .ok_or(SessionError::InvalidCoordinates)
                        .and_then(|mv| Self::handle_move(state, &mut pending, conn_id, mv)),
                    ClientMessage::Leave => Self::handle_leave(state, &mut pending, conn_id),
                };

                if let Err(err) = result {
                    debug!(conn = conn_id, %err, "请求被拒绝");
                    pending.reply(conn_id, ServerMessage::error(err.to_string()));
                }
            }
            Event::Malformed { conn_id, reason } => {
                warn!(conn = conn_id, %reason, "无法解析的消息");
                pending.reply(
                    conn_id,
                    ServerMessage::error(format!("Malformed message: {}", reason)),
                );
            }
            Event::Closed { conn_id } => {
                Self::handle_disconnect(state, &mut pending, conn_id);
            }
        }

        let mut stalled = pending.flush(state);
        while let Some(conn_id) = stalled.pop() {
            stalled.extend(Self::drop_stalled(state, conn_id));
        }
    }

    /// 断开发送队列已满的连接，按断线处理
    fn drop_stalled(state: &mut ServerState, conn_id: ConnectionId) -> Vec<ConnectionId> {
        let Some(tx) = state.connections.get(&conn_id).map(|entry| entry.tx.clone()) else {
            return Vec::new();
        };
        tokio::spawn(async move {
            let _ = tx.send(Outbound::Close).await;
        });

        let mut pending = PendingMessages::new();
        Self::handle_disconnect(state, &mut pending, conn_id);
        pending.flush(state)
    }

    /// 处理握手
    fn handle_connect(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        conn_id: ConnectionId,
        player_name: String,
    ) -> Result<(), SessionError> {
        if let Ok(player) = state.player(conn_id) {
            return Err(SessionError::AlreadyIdentified(player.name.clone()));
        }

        let player_id = state.id_generator.generate();
        let name = resolve_name(&player_name, &player_id, state.config.max_name_len)?;

        let Some(entry) = state.connections.get_mut(&conn_id) else {
            return Ok(());
        };
        entry.player = Some(Player::new(player_id.clone(), name.clone()));
        entry.phase = ConnectionPhase::Identified;
        state.players.insert(player_id.clone(), conn_id);

        info!(conn = conn_id, player = %player_id, %name, "玩家已连接");
        pending.reply(
            conn_id,
            ServerMessage::Connected {
                player_id,
                message: format!("Welcome, {}!", name),
            },
        );
        Ok(())
    }

    /// 处理加入匹配
    fn handle_join(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        conn_id: ConnectionId,
    ) -> Result<(), SessionError> {
        let player = state.player(conn_id)?.clone();
        match state.phase(conn_id) {
            Some(ConnectionPhase::Queued | ConnectionPhase::Active) => {
                return Err(SessionError::AlreadyInSession)
            }
            Some(ConnectionPhase::Finished) => return Err(SessionError::GameFinished),
            _ => {}
        }

        let join = state.directory.add_player(player.clone())?;

        if join.is_first_player {
            state.set_phase(&player.id, ConnectionPhase::Queued);
            pending.reply(
                conn_id,
                ServerMessage::Waiting {
                    message: "Waiting for opponent...".to_string(),
                },
            );
            return Ok(());
        }

        let session = state
            .directory
            .get(join.session_id)
            .ok_or(SessionError::NotInSession)?;
        let (Some(white), Some(black)) = (
            session.player(Color::White).cloned(),
            session.player(Color::Black).cloned(),
        ) else {
            return Err(SessionError::NotInSession);
        };

        pending.send(
            &white.id,
            ServerMessage::Start {
                your_color: WireColor::White,
                opponent_name: black.name.clone(),
            },
        );
        pending.send(
            &black.id,
            ServerMessage::Start {
                your_color: WireColor::Black,
                opponent_name: white.name.clone(),
            },
        );
        pending.send(&white.id, Self::turn_notice(false));

        state.set_phase(&white.id, ConnectionPhase::Active);
        state.set_phase(&black.id, ConnectionPhase::Active);
        Ok(())
    }

    /// 处理走棋
    fn handle_move(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        conn_id: ConnectionId,
        mv: Move,
    ) -> Result<(), SessionError> {
        let player_id = state.player(conn_id)?.id.clone();
        let session = state
            .directory
            .get_session_for_player_mut(&player_id)
            .ok_or(SessionError::NotInSession)?;

        let report = match session.handle_move(&player_id, mv) {
            Ok(report) => report,
            Err(err) => {
                pending.reply(conn_id, ServerMessage::move_rejected(err.to_string()));
                return Ok(());
            }
        };

        let seated: Vec<PlayerId> = session.players().map(|p| p.id.clone()).collect();
        let next_player = session.get_current_player().map(|p| p.id.clone());

        for id in &seated {
            pending.send(id, ServerMessage::move_applied(report.mv));
        }

        match report.game_over {
            Some(outcome) => {
                let game_over = ServerMessage::GameOver {
                    winner: Winner::from(outcome.winner),
                    reason: outcome.to_string(),
                };
                for id in &seated {
                    pending.send(id, game_over.clone());
                    pending.close_after_grace(id);
                }
                for id in &seated {
                    state.directory.remove_player(id);
                    state.set_phase(id, ConnectionPhase::Finished);
                }
            }
            None => {
                if let Some(next_player) = next_player {
                    pending.send(&next_player, Self::turn_notice(report.chain_continues));
                }
            }
        }
        Ok(())
    }

    /// 处理离开对局
    fn handle_leave(
        state: &mut ServerState,
        pending: &mut PendingMessages,
        conn_id: ConnectionId,
    ) -> Result<(), SessionError> {
        let player_id = state.player(conn_id)?.id.clone();
        // 对局进行中离开视为认输
        let winner = state
            .directory
            .get_session_for_player(&player_id)
            .filter(|session| session.is_full())
            .and_then(|session| session.color_of(&player_id))
            .map(|color| color.opponent());

        if !Self::leave_session(state, pending, &player_id) {
            return Err(SessionError::NotInSession);
        }
        if let Some(winner) = winner {
            pending.reply(
                conn_id,
                ServerMessage::GameOver {
                    winner: Winner::from(winner),
                    reason: "You left the game".to_string(),
                },
            );
        }
        state.set_phase(&player_id, ConnectionPhase::Identified);
        Ok(())
    }

    /// 处理连接断开
    fn handle_disconnect(state: &mut ServerState, pending: &mut PendingMessages, conn_id: ConnectionId) {
        let Some(entry) = state.connections.remove(&conn_id) else {
            return;
        };
        let Some(player) = entry.player else {
            debug!(conn = conn_id, "未握手的连接已断开");
            return;
        };

        info!(conn = conn_id, player = %player.id, name = %player.name, "玩家断开连接");
        Self::leave_session(state, pending, &player.id);
        state.players.remove(&player.id);
    }

    /// 将玩家移出对局
    ///
    /// 对局进行中时，对手收到断线消息并同样被移出，宽限期后关闭其连接。
    /// 玩家不在任何对局中时返回 `false`。
    fn leave_session(state: &mut ServerState, pending: &mut PendingMessages, player_id: &str) -> bool {
        if state.directory.get_session_for_player(player_id).is_none() {
            return false;
        }

        if let Some(opponent) = state.directory.remove_player(player_id) {
            info!(player = player_id, opponent = %opponent.id, "对局因玩家离开而结束");
            pending.send(
                &opponent.id,
                ServerMessage::GameOver {
                    winner: Winner::Disconnect,
                    reason: "Opponent disconnected".to_string(),
                },
            );
            pending.close_after_grace(&opponent.id);
            state.directory.remove_player(&opponent.id);
            state.set_phase(&opponent.id, ConnectionPhase::Finished);
        }
        true
    }

    fn turn_notice(chain_continues: bool) -> ServerMessage {
        let message = if chain_continues {
            "Your turn! Continue capturing with the same piece."
        } else {
            "Your turn!"
        };
        ServerMessage::TurnNotice {
            message: message.to_string(),
        }
    }
}

/// 调度循环，所有事件发送端关闭后退出
pub async fn dispatch(mut state: ServerState, mut events: mpsc::Receiver<Event>) {
    while let Some(event) = events.recv().await {
        MessageHandler::handle(&mut state, event).await;
    }
    debug!("调度循环结束");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use protocol::{Board, GameState, Piece, Position};

    use crate::player::SequentialIdGenerator;

    fn new_state() -> ServerState {
        ServerState::new(
            ServerConfig::default(),
            Box::new(SequentialIdGenerator::new()),
        )
    }

    async fn open(state: &mut ServerState, conn_id: ConnectionId) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(64);
        MessageHandler::handle(state, Event::Opened { conn_id, tx }).await;
        rx
    }

    async fn inbound(state: &mut ServerState, conn_id: ConnectionId, msg: ClientMessage) {
        MessageHandler::handle(state, Event::Inbound { conn_id, msg }).await;
    }

    async fn connect(state: &mut ServerState, conn_id: ConnectionId, name: &str) -> mpsc::Receiver<Outbound> {
        let mut rx = open(state, conn_id).await;
        inbound(
            state,
            conn_id,
            ClientMessage::Connect {
                player_name: name.to_string(),
            },
        )
        .await;
        drain(&mut rx);
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<Outbound>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(outbound) = rx.try_recv() {
            match outbound {
                Outbound::Message(msg) => messages.push(msg),
                Outbound::Close => panic!("unexpected close"),
            }
        }
        messages
    }

    fn move_msg(fr: u8, fc: u8, tr: u8, tc: u8) -> ClientMessage {
        ClientMessage::Move {
            from_row: fr,
            from_col: fc,
            to_row: tr,
            to_col: tc,
        }
    }

    /// 两名玩家完成匹配，返回 (白方, 黑方) 的接收端
    async fn paired(state: &mut ServerState) -> (mpsc::Receiver<Outbound>, mpsc::Receiver<Outbound>) {
        let mut white = connect(state, 1, "Alice").await;
        let mut black = connect(state, 2, "Bob").await;
        inbound(state, 1, ClientMessage::Join).await;
        inbound(state, 2, ClientMessage::Join).await;
        drain(&mut white);
        drain(&mut black);
        (white, black)
    }

    #[tokio::test]
    async fn test_connect() {
        let mut state = new_state();
        let mut rx = open(&mut state, 1).await;
        assert_eq!(state.phase(1), Some(ConnectionPhase::Unidentified));

        inbound(
            &mut state,
            1,
            ClientMessage::Connect {
                player_name: "Alice".to_string(),
            },
        )
        .await;
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::Connected {
                player_id: "player_1".to_string(),
                message: "Welcome, Alice!".to_string(),
            }]
        );
        assert_eq!(state.phase(1), Some(ConnectionPhase::Identified));

        // 重复握手
        inbound(
            &mut state,
            1,
            ClientMessage::Connect {
                player_name: "Alice".to_string(),
            },
        )
        .await;
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::Error { .. }]
        ));
    }

    #[tokio::test]
    async fn test_default_and_oversized_names() {
        let mut state = new_state();
        let mut rx = open(&mut state, 1).await;

        inbound(
            &mut state,
            1,
            ClientMessage::Connect {
                player_name: "x".repeat(50),
            },
        )
        .await;
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ServerMessage::Error { .. }]
        ));
        assert_eq!(state.phase(1), Some(ConnectionPhase::Unidentified));

        inbound(
            &mut state,
            1,
            ClientMessage::Connect {
                player_name: String::new(),
            },
        )
        .await;
        match drain(&mut rx).as_slice() {
            [ServerMessage::Connected { message, .. }] => assert!(message.contains("Player_")),
            other => panic!("unexpected messages: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_join_requires_identity() {
        let mut state = new_state();
        let mut rx = open(&mut state, 1).await;

        inbound(&mut state, 1, ClientMessage::Join).await;
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::error(SessionError::NotIdentified.to_string())]
        );
        assert_eq!(state.directory().count(), 0);
    }

    #[tokio::test]
    async fn test_matchmaking_sequence() {
        let mut state = new_state();
        let mut alice = connect(&mut state, 1, "Alice").await;
        let mut bob = connect(&mut state, 2, "Bob").await;

        inbound(&mut state, 1, ClientMessage::Join).await;
        assert_eq!(
            drain(&mut alice),
            vec![ServerMessage::Waiting {
                message: "Waiting for opponent...".to_string()
            }]
        );
        assert_eq!(state.phase(1), Some(ConnectionPhase::Queued));

        // 等待中重复加入
        inbound(&mut state, 1, ClientMessage::Join).await;
        assert!(matches!(
            drain(&mut alice).as_slice(),
            [ServerMessage::Error { .. }]
        ));

        inbound(&mut state, 2, ClientMessage::Join).await;
        assert_eq!(
            drain(&mut alice),
            vec![
                ServerMessage::Start {
                    your_color: WireColor::White,
                    opponent_name: "Bob".to_string(),
                },
                ServerMessage::TurnNotice {
                    message: "Your turn!".to_string()
                },
            ]
        );
        assert_eq!(
            drain(&mut bob),
            vec![ServerMessage::Start {
                your_color: WireColor::Black,
                opponent_name: "Alice".to_string(),
            }]
        );
        assert_eq!(state.phase(1), Some(ConnectionPhase::Active));
        assert_eq!(state.phase(2), Some(ConnectionPhase::Active));
    }

    #[tokio::test]
    async fn test_move_applied_then_turn_notice() {
        let mut state = new_state();
        let (mut white, mut black) = paired(&mut state).await;

        inbound(&mut state, 1, move_msg(5, 2, 4, 3)).await;

        let applied = ServerMessage::MoveApplied {
            from_row: 5,
            from_col: 2,
            to_row: 4,
            to_col: 3,
        };
        assert_eq!(drain(&mut white), vec![applied.clone()]);
        assert_eq!(
            drain(&mut black),
            vec![
                applied,
                ServerMessage::TurnNotice {
                    message: "Your turn!".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_rejected_move_only_reaches_mover() {
        let mut state = new_state();
        let (mut white, mut black) = paired(&mut state).await;

        inbound(&mut state, 2, move_msg(2, 1, 3, 2)).await;
        assert_eq!(
            drain(&mut black),
            vec![ServerMessage::move_rejected("Not your turn")]
        );
        assert!(drain(&mut white).is_empty());

        inbound(&mut state, 1, move_msg(5, 2, 3, 2)).await;
        assert!(matches!(
            drain(&mut white).as_slice(),
            [ServerMessage::MoveRejected { valid: false, .. }]
        ));
        assert!(drain(&mut black).is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_coordinates() {
        let mut state = new_state();
        let (mut white, _black) = paired(&mut state).await;

        inbound(&mut state, 1, move_msg(5, 2, 9, 9)).await;
        assert_eq!(
            drain(&mut white),
            vec![ServerMessage::error(SessionError::InvalidCoordinates.to_string())]
        );
    }

    #[tokio::test]
    async fn test_malformed_message() {
        let mut state = new_state();
        let mut rx = open(&mut state, 1).await;

        MessageHandler::handle(
            &mut state,
            Event::Malformed {
                conn_id: 1,
                reason: "bad frame".to_string(),
            },
        )
        .await;
        assert_eq!(
            drain(&mut rx),
            vec![ServerMessage::error("Malformed message: bad frame")]
        );
        assert_eq!(state.connection_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_game_over_closes_after_grace() {
        let mut state = new_state();
        let (mut white, mut black) = paired(&mut state).await;

        let mut board = Board::empty();
        board.set(Position::new_unchecked(5, 2), Some(Piece::man(Color::White)));
        board.set(Position::new_unchecked(4, 3), Some(Piece::man(Color::Black)));
        state
            .directory
            .get_session_for_player_mut("player_1")
            .unwrap()
            .set_game(GameState::from_board(board, Color::White));

        let started = tokio::time::Instant::now();
        inbound(&mut state, 1, move_msg(5, 2, 3, 4)).await;

        let game_over = ServerMessage::GameOver {
            winner: Winner::White,
            reason: "White wins: Black has no pieces left".to_string(),
        };
        let applied = ServerMessage::MoveApplied {
            from_row: 5,
            from_col: 2,
            to_row: 3,
            to_col: 4,
        };
        assert_eq!(drain(&mut white), vec![applied.clone(), game_over.clone()]);
        assert_eq!(drain(&mut black), vec![applied, game_over]);

        // 双方立即移出目录
        assert_eq!(state.directory().count(), 0);
        assert_eq!(state.phase(1), Some(ConnectionPhase::Finished));

        assert_eq!(white.recv().await, Some(Outbound::Close));
        assert_eq!(black.recv().await, Some(Outbound::Close));
        assert!(started.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_while_active() {
        let mut state = new_state();
        let (_white, mut black) = paired(&mut state).await;

        MessageHandler::handle(&mut state, Event::Closed { conn_id: 1 }).await;

        assert_eq!(
            drain(&mut black),
            vec![ServerMessage::GameOver {
                winner: Winner::Disconnect,
                reason: "Opponent disconnected".to_string(),
            }]
        );
        assert_eq!(state.directory().count(), 0);
        assert_eq!(state.connection_count(), 1);
        assert_eq!(black.recv().await, Some(Outbound::Close));

        MessageHandler::handle(&mut state, Event::Closed { conn_id: 2 }).await;
        assert_eq!(state.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_while_waiting() {
        let mut state = new_state();
        let _alice = connect(&mut state, 1, "Alice").await;
        inbound(&mut state, 1, ClientMessage::Join).await;
        assert!(state.directory().waiting_session().is_some());

        MessageHandler::handle(&mut state, Event::Closed { conn_id: 1 }).await;
        assert!(state.directory().waiting_session().is_none());
        assert_eq!(state.directory().count(), 0);

        // 下一名玩家重新进入等待
        let mut bob = connect(&mut state, 2, "Bob").await;
        inbound(&mut state, 2, ClientMessage::Join).await;
        assert!(matches!(
            drain(&mut bob).as_slice(),
            [ServerMessage::Waiting { .. }]
        ));
    }

    #[tokio::test]
    async fn test_leave_and_rejoin() {
        let mut state = new_state();
        let mut alice = connect(&mut state, 1, "Alice").await;

        inbound(&mut state, 1, ClientMessage::Leave).await;
        assert_eq!(
            drain(&mut alice),
            vec![ServerMessage::error(SessionError::NotInSession.to_string())]
        );

        inbound(&mut state, 1, ClientMessage::Join).await;
        inbound(&mut state, 1, ClientMessage::Leave).await;
        drain(&mut alice);
        assert_eq!(state.phase(1), Some(ConnectionPhase::Identified));
        assert_eq!(state.directory().count(), 0);

        inbound(&mut state, 1, ClientMessage::Join).await;
        assert!(matches!(
            drain(&mut alice).as_slice(),
            [ServerMessage::Waiting { .. }]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_leave_during_game() {
        let mut state = new_state();
        let (mut white, mut black) = paired(&mut state).await;

        inbound(&mut state, 2, ClientMessage::Leave).await;
        assert_eq!(
            drain(&mut black),
            vec![ServerMessage::GameOver {
                winner: Winner::White,
                reason: "You left the game".to_string(),
            }]
        );
        assert_eq!(
            drain(&mut white),
            vec![ServerMessage::GameOver {
                winner: Winner::Disconnect,
                reason: "Opponent disconnected".to_string(),
            }]
        );
        assert_eq!(state.phase(2), Some(ConnectionPhase::Identified));
        assert_eq!(state.phase(1), Some(ConnectionPhase::Finished));
        assert_eq!(state.directory().count(), 0);

        // 只有对手的连接在宽限期后关闭
        assert_eq!(white.recv().await, Some(Outbound::Close));
        assert!(black.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_outbound_queue_drops_only_that_connection() {
        let mut state = new_state();
        let mut alice = connect(&mut state, 1, "Alice").await;

        // 容量为 1 且从不读取的连接
        let (tx, mut stuck) = mpsc::channel(1);
        MessageHandler::handle(&mut state, Event::Opened { conn_id: 2, tx }).await;
        inbound(
            &mut state,
            2,
            ClientMessage::Connect {
                player_name: "Bob".to_string(),
            },
        )
        .await;

        inbound(&mut state, 1, ClientMessage::Join).await;
        drain(&mut alice);
        tokio::time::timeout(Duration::from_secs(1), inbound(&mut state, 2, ClientMessage::Join))
            .await
            .expect("dispatcher blocked on a full queue");

        assert_eq!(
            drain(&mut alice),
            vec![
                ServerMessage::Start {
                    your_color: WireColor::White,
                    opponent_name: "Bob".to_string(),
                },
                ServerMessage::TurnNotice {
                    message: "Your turn!".to_string()
                },
                ServerMessage::GameOver {
                    winner: Winner::Disconnect,
                    reason: "Opponent disconnected".to_string(),
                },
            ]
        );
        assert_eq!(state.phase(2), None);
        assert_eq!(state.connection_count(), 1);
        assert_eq!(state.directory().count(), 0);

        // 后续事件不再阻塞调度
        tokio::time::timeout(
            Duration::from_secs(1),
            MessageHandler::handle(
                &mut state,
                Event::Malformed {
                    conn_id: 2,
                    reason: "bad frame".to_string(),
                },
            ),
        )
        .await
        .expect("dispatcher blocked on a dropped connection");

        assert!(matches!(
            stuck.try_recv(),
            Ok(Outbound::Message(ServerMessage::Connected { .. }))
        ));
        assert_eq!(stuck.recv().await, Some(Outbound::Close));
    }

    #[tokio::test]
    async fn test_chain_capture_notice_goes_to_same_player() {
        let mut state = new_state();
        let (mut white, mut black) = paired(&mut state).await;

        let mut board = Board::empty();
        board.set(Position::new_unchecked(5, 0), Some(Piece::man(Color::White)));
        board.set(Position::new_unchecked(4, 1), Some(Piece::man(Color::Black)));
        board.set(Position::new_unchecked(2, 3), Some(Piece::man(Color::Black)));
        board.set(Position::new_unchecked(0, 7), Some(Piece::man(Color::Black)));
        state
            .directory
            .get_session_for_player_mut("player_1")
            .unwrap()
            .set_game(GameState::from_board(board, Color::White));

        inbound(&mut state, 1, move_msg(5, 0, 3, 2)).await;
        match drain(&mut white).as_slice() {
            [ServerMessage::MoveApplied { .. }, ServerMessage::TurnNotice { message }] => {
                assert!(message.contains("Continue"))
            }
            other => panic!("unexpected messages: {:?}", other),
        }
        assert_eq!(drain(&mut black).len(), 1);
    }
}
