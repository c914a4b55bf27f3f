//! Session Records
//!
//! Data owned by the session store, plus the views handed back to callers.
//! A house seed only leaves the store through a view once the session has
//! been revealed.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

use crate::game::outcome::Grid;
use crate::physics::{SimulationState, ThetaAngles, BODY_COUNT};
use crate::proof::{Commitment, Proof, VerificationResult};

/// Unique session identifier.
pub type SessionId = uuid::Uuid;

/// Outcome of a revealed spin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinResult {
    /// Full grid including buffer rows.
    pub grid: Grid,
    /// Visible symbols, row-major.
    pub symbols: Vec<String>,
    /// Mixed entropy the grid was derived from.
    pub entropy_hex: String,
    /// Final state of the mixing run.
    pub physics_state: SimulationState,
    /// Diagnostic angles of the mixing run.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
}

/// A persisted spin session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinSession {
    /// Session id.
    pub id: SessionId,
    /// Published commitment. Never changes.
    pub commitment: Commitment,
    /// House seed. Hidden until reveal.
    pub house_seed: String,
    /// Final state of the house seed run.
    pub physics_state: SimulationState,
    /// Diagnostic angles of the house seed run.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Reveal deadline.
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, on reveal.
    pub revealed_at: Option<DateTime<Utc>>,
    /// Player seed, set on reveal.
    pub client_seed: Option<String>,
    /// Nonce, set on reveal.
    pub nonce: Option<u64>,
    /// Result, set on reveal.
    pub result: Option<SpinResult>,
    /// Signed proof, set on reveal.
    pub proof: Option<Proof>,
}

impl SpinSession {
    /// Has the session been revealed?
    pub fn is_revealed(&self) -> bool {
        self.revealed_at.is_some()
    }

    /// Is the reveal deadline strictly in the past at `now`?
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Public summary, without the house seed.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            commitment: self.commitment.clone(),
            created_at: self.created_at,
            expires_at: self.expires_at,
            revealed_at: self.revealed_at,
            client_seed: self.client_seed.clone(),
        }
    }

    /// Verification view. `None` until revealed.
    pub fn revealed_view(&self) -> Option<RevealedSession> {
        let revealed_at = self.revealed_at?;
        Some(RevealedSession {
            session_id: self.id,
            commitment: self.commitment.clone(),
            house_seed: self.house_seed.clone(),
            client_seed: self.client_seed.clone()?,
            nonce: self.nonce?,
            result: self.result.clone()?,
            proof: self.proof.clone()?,
            physics_state: self.physics_state,
            theta_angles: self.theta_angles,
            created_at: self.created_at,
            revealed_at,
        })
    }
}

/// Fields supplied when creating a session. The store assigns the id.
#[derive(Clone, Debug)]
pub struct NewSession {
    /// Commitment to publish.
    pub commitment: Commitment,
    /// Secret house seed.
    pub house_seed: String,
    /// Final state of the house seed run.
    pub physics_state: SimulationState,
    /// Diagnostic angles of the house seed run.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Reveal deadline.
    pub expires_at: DateTime<Utc>,
}

/// Everything written by a reveal, in one atomic update.
#[derive(Clone, Debug)]
pub struct RevealRecord {
    /// Player seed.
    pub client_seed: String,
    /// Nonce.
    pub nonce: u64,
    /// Result.
    pub result: SpinResult,
    /// Signed proof.
    pub proof: Proof,
    /// Reveal time.
    pub revealed_at: DateTime<Utc>,
}

/// Returned by session creation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    /// Session id.
    pub session_id: SessionId,
    /// Commitment to show the player.
    pub commitment: Commitment,
    /// Reveal deadline.
    pub expires_at: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Returned by a successful reveal.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealOutcome {
    /// Session id.
    pub session_id: SessionId,
    /// Full grid.
    pub grid: Grid,
    /// Visible symbols, row-major.
    pub symbols: Vec<String>,
    /// Revealed house seed.
    pub house_seed: String,
    /// Signed proof.
    pub proof: Proof,
    /// Commitment published at creation.
    pub commitment: Commitment,
}

/// A revealed session, as exposed for verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealedSession {
    /// Session id.
    pub session_id: SessionId,
    /// Commitment.
    pub commitment: Commitment,
    /// House seed.
    pub house_seed: String,
    /// Player seed.
    pub client_seed: String,
    /// Nonce.
    pub nonce: u64,
    /// Result.
    pub result: SpinResult,
    /// Proof.
    pub proof: Proof,
    /// House seed run final state.
    pub physics_state: SimulationState,
    /// House seed run angles.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Reveal time.
    pub revealed_at: DateTime<Utc>,
}

/// Returned by session verification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVerification {
    /// Session id.
    pub session_id: SessionId,
    /// Verifier result.
    pub verification: VerificationResult,
    /// The verified session.
    pub session: RevealedSession,
}

/// Append-only audit entry for one verification request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    /// Verified session.
    pub session_id: SessionId,
    /// Verifier result.
    pub result: VerificationResult,
    /// Requesting client, if known.
    pub client_ip: Option<String>,
    /// Request time.
    pub timestamp: DateTime<Utc>,
}

/// History row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Session id.
    pub id: SessionId,
    /// Commitment.
    pub commitment: Commitment,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Reveal deadline.
    pub expires_at: DateTime<Utc>,
    /// Reveal time.
    pub revealed_at: Option<DateTime<Utc>>,
    /// Player seed.
    pub client_seed: Option<String>,
}

/// Store-wide counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// All stored sessions.
    pub total: u64,
    /// Revealed sessions.
    pub revealed: u64,
    /// Unrevealed and still within their deadline.
    pub pending: u64,
    /// Unrevealed and past their deadline.
    pub expired_unrevealed: u64,
    /// Logged verification requests.
    pub verifications: u64,
}
