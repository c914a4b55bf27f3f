//! Persistent Session Store
//!
//! The store is authoritative for every session. The only write to an
//! existing session is [`SessionStore::reveal`], which must check "not yet
//! revealed" and write the reveal in a single atomic step.

use std::collections::BTreeMap;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

use super::model::{
    NewSession, RevealRecord, SessionId, SessionStats, SessionSummary, SpinSession,
    VerificationRecord,
};

/// Store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No session with this id.
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// The compare-and-set on the reveal lost.
    #[error("Session already revealed: {0}")]
    AlreadyRevealed(SessionId),

    /// Storage backend failure.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Persistent storage contract.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session and assign its id.
    async fn create(&self, session: NewSession) -> Result<SpinSession, StoreError>;

    /// Look a session up.
    async fn find_by_id(&self, id: SessionId) -> Result<Option<SpinSession>, StoreError>;

    /// Whether the session has been revealed. Unknown ids are not revealed.
    async fn is_revealed(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Write the reveal iff the session is not yet revealed.
    ///
    /// Exactly one of any number of concurrent calls for the same id
    /// succeeds; the others get [`StoreError::AlreadyRevealed`].
    async fn reveal(&self, id: SessionId, record: RevealRecord) -> Result<SpinSession, StoreError>;

    /// Delete unrevealed sessions whose deadline is before `now`.
    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Newest-first summaries.
    async fn history(&self, limit: usize, offset: usize) -> Result<Vec<SessionSummary>, StoreError>;

    /// Counters as of `now`.
    async fn stats(&self, now: DateTime<Utc>) -> Result<SessionStats, StoreError>;

    /// Append a verification audit entry.
    async fn log_verification(&self, record: VerificationRecord) -> Result<(), StoreError>;
}

/// In-process store.
///
/// A single write lock around the check and the write makes the reveal
/// atomic.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<BTreeMap<SessionId, SpinSession>>,
    verifications: RwLock<Vec<VerificationRecord>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verification log, oldest first.
    pub async fn verification_log(&self) -> Vec<VerificationRecord> {
        self.verifications.read().await.clone()
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// No sessions stored?
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: NewSession) -> Result<SpinSession, StoreError> {
        let record = SpinSession {
            id: uuid::Uuid::new_v4(),
            commitment: session.commitment,
            house_seed: session.house_seed,
            physics_state: session.physics_state,
            theta_angles: session.theta_angles,
            created_at: session.created_at,
            expires_at: session.expires_at,
            revealed_at: None,
            client_seed: None,
            nonce: None,
            result: None,
            proof: None,
        };

        let mut sessions = self.sessions.write().await;
        sessions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<SpinSession>, StoreError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn is_revealed(&self, id: SessionId) -> Result<bool, StoreError> {
        Ok(self
            .sessions
            .read()
            .await
            .get(&id)
            .map_or(false, SpinSession::is_revealed))
    }

    async fn reveal(&self, id: SessionId, record: RevealRecord) -> Result<SpinSession, StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&id).ok_or(StoreError::NotFound(id))?;

        if session.is_revealed() {
            return Err(StoreError::AlreadyRevealed(id));
        }

        session.revealed_at = Some(record.revealed_at);
        session.client_seed = Some(record.client_seed);
        session.nonce = Some(record.nonce);
        session.result = Some(record.result);
        session.proof = Some(record.proof);
        Ok(session.clone())
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| s.is_revealed() || !s.is_expired_at(now));
        Ok((before - sessions.len()) as u64)
    }

    async fn history(&self, limit: usize, offset: usize) -> Result<Vec<SessionSummary>, StoreError> {
        let sessions = self.sessions.read().await;
        let mut all: Vec<&SpinSession> = sessions.values().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));

        Ok(all
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(SpinSession::summary)
            .collect())
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<SessionStats, StoreError> {
        let sessions = self.sessions.read().await;
        let mut stats = SessionStats {
            total: sessions.len() as u64,
            verifications: self.verifications.read().await.len() as u64,
            ..Default::default()
        };

        for session in sessions.values() {
            if session.is_revealed() {
                stats.revealed += 1;
            } else if session.is_expired_at(now) {
                stats.expired_unrevealed += 1;
            } else {
                stats.pending += 1;
            }
        }

        Ok(stats)
    }

    async fn log_verification(&self, record: VerificationRecord) -> Result<(), StoreError> {
        self.verifications.write().await.push(record);
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
