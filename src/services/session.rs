//! Registration draft storage
//!
//! Drafts are keyed by an opaque session id and expire after a period of
//! inactivity. Nothing here reaches the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use tokio::sync::RwLock;
use tracing::debug;

use crate::models::RegistrationDraft;

#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Option<RegistrationDraft>;
    async fn put(&self, session_id: &str, draft: RegistrationDraft);
    async fn clear(&self, session_id: &str);
}

/// Generate an unguessable session id
pub fn new_session_id() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

struct DraftEntry {
    draft: RegistrationDraft,
    touched: Instant,
}

/// Process-local draft store with an idle TTL
pub struct InMemoryDraftStore {
    ttl: Duration,
    entries: RwLock<HashMap<String, DraftEntry>>,
}

impl InMemoryDraftStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop drafts idle for longer than the TTL; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.touched.elapsed() < ttl);
        before - entries.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn get(&self, session_id: &str) -> Option<RegistrationDraft> {
        let mut entries = self.entries.write().await;
        match entries.get_mut(session_id) {
            Some(entry) if entry.touched.elapsed() < self.ttl => {
                entry.touched = Instant::now();
                Some(entry.draft.clone())
            }
            Some(_) => {
                entries.remove(session_id);
                None
            }
            None => None,
        }
    }

    async fn put(&self, session_id: &str, draft: RegistrationDraft) {
        self.entries.write().await.insert(
            session_id.to_string(),
            DraftEntry {
                draft,
                touched: Instant::now(),
            },
        );
    }

    async fn clear(&self, session_id: &str) {
        self.entries.write().await.remove(session_id);
    }
}

/// Spawn a background task that periodically purges abandoned drafts
pub fn spawn_draft_cleanup(store: Arc<InMemoryDraftStore>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let removed = store.purge_expired().await;
            if removed > 0 {
                debug!(removed, "Purged abandoned registration drafts");
            }
        }
    });
}
