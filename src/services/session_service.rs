use crate::error::{Error, Result};
use crate::models::quiz_session::QuizSession;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

pub type SessionHandle = Arc<Mutex<QuizSession>>;

/// Independent per-user quiz sessions, keyed by session id.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: QuizSession) -> SessionHandle {
        let id = session.id();
        let handle = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id, handle.clone());
        handle
    }

    pub async fn get(&self, id: Uuid) -> Result<SessionHandle> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("Quiz session {} not found", id)))
    }

    pub async fn remove(&self, id: Uuid) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("Quiz session {} not found", id)))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops sessions with no activity for longer than `ttl`. Sessions that
    /// are locked right now are in use and are kept.
    pub async fn purge_idle(&self, ttl: Duration) -> usize {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        let cutoff = Utc::now() - ttl;

        let stale: Vec<Uuid> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, handle)| {
                    handle
                        .try_lock()
                        .map(|session| session.is_idle_since(cutoff))
                        .unwrap_or(false)
                })
                .map(|(id, _)| *id)
                .collect()
        };

        if stale.is_empty() {
            return 0;
        }

        let mut sessions = self.sessions.write().await;
        for id in &stale {
            sessions.remove(id);
        }
        tracing::info!(removed = stale.len(), remaining = sessions.len(), "Purged idle quiz sessions");
        stale.len()
    }
}
