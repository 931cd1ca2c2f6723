//! 会话目录
//!
//! 负责匹配等待中的玩家，并按会话 ID 和玩家 ID 索引会话。
//! 同一时刻最多只有一个等待第二名玩家的会话。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, info};

use protocol::{PlayerId, SessionId};

use crate::error::SessionError;
use crate::player::Player;
use crate::session::{Session, SessionState};

/// 加入匹配的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResult {
    pub session_id: SessionId,
    /// 是否为会话创建者（执白）
    pub is_first_player: bool,
}

/// 会话目录
pub struct SessionDirectory {
    sessions: HashMap<SessionId, Session>,
    /// 玩家 ID -> 会话 ID
    player_sessions: HashMap<PlayerId, SessionId>,
    /// 等待第二名玩家的会话
    waiting: Option<SessionId>,
    next_id: AtomicU64,
}

impl SessionDirectory {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            player_sessions: HashMap::new(),
            waiting: None,
            next_id: AtomicU64::new(1),
        }
    }

    /// 生成新的会话 ID
    fn generate_id(&self) -> SessionId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 玩家加入匹配
    ///
    /// 有等待中的会话则加入并开始对局，否则新建会话等待对手。
    /// 检查与修改在同一个 `&mut self` 调用内完成。
    pub fn add_player(&mut self, player: Player) -> Result<JoinResult, SessionError> {
        if self.player_sessions.contains_key(&player.id) {
            return Err(SessionError::AlreadyInSession);
        }

        let player_id = player.id.clone();

        if let Some(session_id) = self.waiting.take() {
            if let Some(session) = self.sessions.get_mut(&session_id) {
                if session.join(player.clone()).is_some() {
                    self.player_sessions.insert(player_id, session_id);
                    return Ok(JoinResult {
                        session_id,
                        is_first_player: false,
                    });
                }
            }
        }

        let session_id = self.generate_id();
        info!(session = session_id, player = %player.name, "等待对手");
        self.sessions.insert(session_id, Session::new(session_id, player));
        self.player_sessions.insert(player_id, session_id);
        self.waiting = Some(session_id);

        Ok(JoinResult {
            session_id,
            is_first_player: true,
        })
    }

    /// 移除玩家
    ///
    /// 返回对手（用于通知），会话清空后删除。
    pub fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let session_id = self.player_sessions.remove(player_id)?;
        let session = self.sessions.get_mut(&session_id)?;

        let opponent = session.get_opponent(player_id).cloned();
        session.remove_player(player_id);

        if session.is_empty() {
            self.sessions.remove(&session_id);
            if self.waiting == Some(session_id) {
                self.waiting = None;
            }
            info!(session = session_id, "会话已删除");
        } else {
            debug!(session = session_id, player = player_id, "玩家离开会话");
        }

        opponent
    }

    /// 查找玩家所在的会话
    pub fn get_session_for_player(&self, player_id: &str) -> Option<&Session> {
        let session_id = self.player_sessions.get(player_id)?;
        self.sessions.get(session_id)
    }

    /// 查找玩家所在的会话（可变）
    pub fn get_session_for_player_mut(&mut self, player_id: &str) -> Option<&mut Session> {
        let session_id = self.player_sessions.get(player_id)?;
        self.sessions.get_mut(session_id)
    }

    /// 获取会话
    pub fn get(&self, session_id: SessionId) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    /// 等待中的会话
    pub fn waiting_session(&self) -> Option<&Session> {
        self.waiting
            .and_then(|id| self.sessions.get(&id))
            .filter(|session| session.state == SessionState::WaitingForOpponent)
    }

    /// 获取会话数量
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for SessionDirectory {
    fn default() -> Self {
        Self::new()
    }
}
