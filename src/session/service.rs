//! Spin Session Lifecycle
//!
//! `Created -> Revealed`. Expiry is not a stored state: it is checked when a
//! reveal is attempted. The persistent store decides every transition; the
//! cache only saves reads and its failures are logged and ignored.

use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{FairnessConfig, SigningKey};
use crate::game::config::OutcomeConfigError;
use crate::game::outcome::OutcomeDeriver;
use crate::proof::{
    mix, sign_at, verify_proof, Commitment, GameInfo, HouseSeed, Payout, RoundData,
    SpinMode, VerificationBundle,
};
use super::cache::{CacheError, SessionCache};
use super::model::{
    CreatedSession, NewSession, RevealOutcome, RevealRecord, RevealedSession, SessionId,
    SessionStats, SessionSummary, SessionVerification, SpinResult, VerificationRecord,
};
use super::store::{SessionStore, StoreError};

/// Default reveal window.
pub const DEFAULT_SESSION_EXPIRY_SECS: i64 = 5 * 60;

/// Longest reveal window accepted from configuration.
pub const MAX_SESSION_EXPIRY_SECS: i64 = 30 * 24 * 60 * 60;

/// Session lifecycle settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Time from creation until reveal is refused. Also the cache TTL.
    pub expiry: chrono::Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry: chrono::Duration::seconds(DEFAULT_SESSION_EXPIRY_SECS),
        }
    }
}

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// No such session.
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// Reveal attempted after the deadline.
    #[error("Session expired: {0}")]
    Expired(SessionId),

    /// Reveal attempted twice.
    #[error("Session already revealed: {0}")]
    AlreadyRevealed(SessionId),

    /// Verification requested before reveal.
    #[error("Session not yet revealed: {0}")]
    NotYetRevealed(SessionId),

    /// Creation time plus the reveal window is not a representable instant.
    #[error("Session deadline out of range: {0}")]
    DeadlineOutOfRange(DateTime<Utc>),

    /// Persistent store failure.
    #[error("Session store error: {0}")]
    Store(String),
}

impl From<StoreError> for SessionError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::AlreadyRevealed(id) => Self::AlreadyRevealed(id),
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

/// What the cache holds for an unrevealed session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CachedSession {
    id: SessionId,
    commitment: Commitment,
    house_seed: String,
    expires_at: DateTime<Utc>,
}

fn cache_key(id: SessionId) -> String {
    format!("session:{}", id)
}

/// Nonce for a reveal at `now`: Unix milliseconds.
pub fn nonce_at(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp_millis()).unwrap_or(0)
}

/// Session lifecycle service.
pub struct SessionService {
    store: Arc<dyn SessionStore>,
    cache: Option<Arc<dyn SessionCache>>,
    signing_key: SigningKey,
    deriver: OutcomeDeriver,
    config: SessionConfig,
}

impl SessionService {
    /// Service with default outcome and session settings and no cache.
    pub fn new(store: Arc<dyn SessionStore>, signing_key: SigningKey) -> Self {
        Self {
            store,
            cache: None,
            signing_key,
            deriver: OutcomeDeriver::default(),
            config: SessionConfig::default(),
        }
    }

    /// Service configured from a loaded [`FairnessConfig`].
    pub fn from_config(
        store: Arc<dyn SessionStore>,
        config: &FairnessConfig,
    ) -> Result<Self, OutcomeConfigError> {
        Ok(Self {
            store,
            cache: None,
            signing_key: config.signing_key.clone(),
            deriver: OutcomeDeriver::new(config.outcome.clone())?,
            config: config.session.clone(),
        })
    }

    /// Put a cache in front of the store.
    pub fn with_cache(mut self, cache: Arc<dyn SessionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use specific session settings.
    pub fn with_session_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Outcome deriver in use.
    pub fn deriver(&self) -> &OutcomeDeriver {
        &self.deriver
    }

    // =========================================================================
    // CREATE
    // =========================================================================

    /// Generate a house seed and open a session committed to it.
    pub async fn create(&self) -> Result<CreatedSession, SessionError> {
        self.create_with_house_seed(HouseSeed::generate(), Utc::now()).await
    }

    /// Open a session for a given house seed at `now`.
    pub async fn create_with_house_seed(
        &self,
        house: HouseSeed,
        now: DateTime<Utc>,
    ) -> Result<CreatedSession, SessionError> {
        let commitment = house.commitment();
        let expires_at = now
            .checked_add_signed(self.config.expiry)
            .ok_or(SessionError::DeadlineOutOfRange(now))?;

        let session = self
            .store
            .create(NewSession {
                commitment: commitment.clone(),
                house_seed: house.seed,
                physics_state: house.physics_state,
                theta_angles: house.theta_angles,
                created_at: now,
                expires_at,
            })
            .await?;

        self.cache_put(&CachedSession {
            id: session.id,
            commitment: commitment.clone(),
            house_seed: session.house_seed.clone(),
            expires_at,
        })
        .await;

        info!("Session {} created, commitment {}", session.id, commitment);

        Ok(CreatedSession {
            session_id: session.id,
            commitment,
            expires_at,
            created_at: session.created_at,
        })
    }

    // =========================================================================
    // REVEAL
    // =========================================================================

    /// Reveal a session with the player's seed.
    pub async fn reveal(&self, id: SessionId, client_seed: &str) -> Result<RevealOutcome, SessionError> {
        self.reveal_at(id, client_seed, Utc::now()).await
    }

    /// Reveal a session as of `now`.
    ///
    /// Fails without touching the session if it is unknown, past its
    /// deadline, or already revealed. Of several concurrent reveals of one
    /// session exactly one succeeds.
    pub async fn reveal_at(
        &self,
        id: SessionId,
        client_seed: &str,
        now: DateTime<Utc>,
    ) -> Result<RevealOutcome, SessionError> {
        let snapshot = self.load_snapshot(id).await?;

        if now > snapshot.expires_at {
            info!("Reveal rejected for {}: expired at {}", id, snapshot.expires_at);
            return Err(SessionError::Expired(id));
        }

        if self.store.is_revealed(id).await? {
            info!("Reveal rejected for {}: already revealed", id);
            return Err(SessionError::AlreadyRevealed(id));
        }

        let nonce = nonce_at(now);
        let mixed = mix(&snapshot.house_seed, client_seed, nonce, &self.signing_key);
        let grid = self.deriver.derive(&mixed.entropy_hex);
        let symbols = grid.visible_symbols(self.deriver.config());
        let proof = sign_at(
            &snapshot.house_seed,
            client_seed,
            nonce,
            &mixed.entropy_hex,
            &snapshot.commitment,
            &self.signing_key,
            now.timestamp_millis(),
        );

        let record = RevealRecord {
            client_seed: client_seed.to_string(),
            nonce,
            result: SpinResult {
                grid: grid.clone(),
                symbols: symbols.clone(),
                entropy_hex: mixed.entropy_hex,
                physics_state: mixed.final_state,
                theta_angles: mixed.theta_angles,
            },
            proof: proof.clone(),
            revealed_at: now,
        };

        if let Err(e) = self.store.reveal(id, record).await {
            info!("Reveal rejected for {}: {}", id, e);
            return Err(e.into());
        }

        self.cache_delete(id).await;

        info!("Session {} revealed, nonce {}, proof {}", id, nonce, proof.proof_id);

        Ok(RevealOutcome {
            session_id: id,
            grid,
            symbols,
            house_seed: snapshot.house_seed,
            proof,
            commitment: snapshot.commitment,
        })
    }

    // =========================================================================
    // VERIFICATION
    // =========================================================================

    /// Revealed session data for verification.
    pub async fn get_for_verification(&self, id: SessionId) -> Result<RevealedSession, SessionError> {
        let session = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(SessionError::NotFound(id))?;

        if !session.is_revealed() {
            return Err(SessionError::NotYetRevealed(id));
        }

        session
            .revealed_view()
            .ok_or_else(|| SessionError::Store(format!("incomplete reveal record for {}", id)))
    }

    /// Verify a revealed session and log the request.
    pub async fn verify_session(
        &self,
        id: SessionId,
        client_ip: Option<&str>,
    ) -> Result<SessionVerification, SessionError> {
        let session = self.get_for_verification(id).await?;
        let verification = verify_proof(&session.proof, &session.commitment, &self.signing_key);

        let record = VerificationRecord {
            session_id: id,
            result: verification.clone(),
            client_ip: client_ip.map(str::to_string),
            timestamp: Utc::now(),
        };
        if let Err(e) = self.store.log_verification(record).await {
            warn!("Verification log failed for {}: {}", id, e);
        }

        info!("Session {} verified: valid={}", id, verification.valid);

        Ok(SessionVerification {
            session_id: id,
            verification,
            session,
        })
    }

    /// Publishable bundle for a revealed session.
    pub async fn export_bundle(
        &self,
        id: SessionId,
        game: GameInfo,
        mode: SpinMode,
        payout: Payout,
    ) -> Result<VerificationBundle, SessionError> {
        let session = self.get_for_verification(id).await?;

        Ok(VerificationBundle::from_round(RoundData {
            game,
            mode,
            spin_id: session.proof.proof_id.clone(),
            session_id: id.to_string(),
            revealed_at: session.revealed_at,
            commitment: session.commitment,
            committed_at: session.created_at,
            server_seed: session.house_seed,
            client_seed: session.client_seed,
            nonce: session.nonce,
            reel_count: self.deriver.config().reel_count,
            symbols: session.result.symbols,
            payout,
        }))
    }

    // =========================================================================
    // HOUSEKEEPING
    // =========================================================================

    /// Newest-first session summaries.
    pub async fn history(&self, limit: usize, offset: usize) -> Result<Vec<SessionSummary>, SessionError> {
        Ok(self.store.history(limit, offset).await?)
    }

    /// Store counters as of now.
    pub async fn stats(&self) -> Result<SessionStats, SessionError> {
        Ok(self.store.stats(Utc::now()).await?)
    }

    /// Delete unrevealed sessions past their deadline.
    pub async fn cleanup_expired(&self) -> Result<u64, SessionError> {
        let count = self.store.cleanup_expired(Utc::now()).await?;
        info!("Cleaned up {} expired sessions", count);
        Ok(count)
    }

    // =========================================================================
    // CACHE
    // =========================================================================

    async fn load_snapshot(&self, id: SessionId) -> Result<CachedSession, SessionError> {
        if let Some(cached) = self.cache_get(id).await {
            debug!("Session {} served from cache", id);
            return Ok(cached);
        }

        let session = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(SessionError::NotFound(id))?;

        Ok(CachedSession {
            id: session.id,
            commitment: session.commitment,
            house_seed: session.house_seed,
            expires_at: session.expires_at,
        })
    }

    async fn cache_get(&self, id: SessionId) -> Option<CachedSession> {
        let cache = self.cache.as_ref()?;
        let fetched = cache.get(&cache_key(id)).await.and_then(|bytes| {
            bytes
                .map(|b| bincode::deserialize(&b).map_err(|e| CacheError::Codec(e.to_string())))
                .transpose()
        });

        match fetched {
            Ok(hit) => hit,
            Err(e) => {
                warn!("Cache fetch failed for {}: {}", id, e);
                None
            }
        }
    }

    async fn cache_put(&self, snapshot: &CachedSession) {
        let Some(cache) = &self.cache else {
            return;
        };
        let ttl = self.config.expiry.to_std().unwrap_or_default();

        let result = match bincode::serialize(snapshot) {
            Ok(bytes) => cache.set_with_ttl(&cache_key(snapshot.id), bytes, ttl).await,
            Err(e) => Err(CacheError::Codec(e.to_string())),
        };
        if let Err(e) = result {
            warn!("Cache write failed for {}: {}", snapshot.id, e);
        }
    }

    async fn cache_delete(&self, id: SessionId) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.delete(&cache_key(id)).await {
                warn!("Cache delete failed for {}: {}", id, e);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
