//! Spin Session Management
//!
//! Commit-reveal lifecycle over pluggable storage.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SESSION LAYER                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  model.rs   - Session records and caller-facing views       │
//! │  store.rs   - Authoritative store contract, atomic reveal   │
//! │  cache.rs   - Optional TTL cache contract                   │
//! │  service.rs - Create / reveal / verify state machine        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod model;
pub mod store;
pub mod cache;
pub mod service;

pub use model::{
    CreatedSession, RevealOutcome, RevealedSession, SessionId, SessionStats, SessionSummary,
    SessionVerification, SpinResult, SpinSession, VerificationRecord,
};
pub use store::{MemorySessionStore, SessionStore, StoreError};
pub use cache::{CacheError, MemoryCache, SessionCache};
pub use service::{SessionConfig, SessionError, SessionService};
