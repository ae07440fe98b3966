use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::info;

use crate::qa::DocumentQa;

pub type SharedSession = Arc<Mutex<DocumentQa>>;

/// In-memory Q&A sessions keyed by caller-supplied id.
///
/// Questions to one session are serialized by its mutex; different sessions
/// proceed independently.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SharedSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `qa` under `session_id`, replacing any existing session.
    pub fn create(&self, session_id: &str, qa: DocumentQa) -> SharedSession {
        let session = Arc::new(Mutex::new(qa));
        let replaced = self
            .sessions
            .insert(session_id.to_string(), session.clone())
            .is_some();
        info!(session_id, replaced, "Q&A session created");
        session
    }

    pub fn get(&self, session_id: &str) -> Option<SharedSession> {
        self.sessions.get(session_id).map(|entry| entry.value().clone())
    }

    /// Returns false when no such session existed.
    pub fn delete(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            info!(session_id, "Q&A session deleted");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
