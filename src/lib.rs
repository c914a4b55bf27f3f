//! # Three-Body Fair
//!
//! Provably-fair spin protocol with a chaotic three-body simulation as its
//! entropy source.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    THREE-BODY FAIR                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── hash.rs     - SHA-256 / HMAC-SHA256 helpers             │
//! │  └── vec3.rs     - f64 3-vector value type                   │
//! │                                                              │
//! │  physics/        - Entropy source (deterministic)            │
//! │  ├── body.rs     - Bodies and simulation state               │
//! │  └── simulation.rs - RK4 integration, canonical digest       │
//! │                                                              │
//! │  game/           - Outcome logic (deterministic)             │
//! │  ├── config.rs   - Explicit outcome configuration            │
//! │  └── outcome.rs  - Entropy -> symbol grid                    │
//! │                                                              │
//! │  proof/          - Commit, mix, sign, verify, publish        │
//! │                                                              │
//! │  session/        - Lifecycle (non-deterministic, async)      │
//! │  config.rs       - Environment configuration                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/`, `physics/` and `game/` modules are pure functions of
//! their inputs:
//! - Fixed RK4 stage order and IEEE-754 double arithmetic
//! - Canonical 15-digit scientific formatting before hashing
//! - No HashMap (uses BTreeMap for sorted iteration)
//! - No system time or OS randomness
//!
//! Given the same house seed, client seed, nonce and configuration, every
//! platform derives the **same entropy and the same grid**.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod core;
pub mod physics;
pub mod game;
pub mod proof;
pub mod session;
pub mod config;

// Re-export commonly used types
pub use config::{ConfigError, FairnessConfig, SigningKey};
pub use game::{derive_grid, Grid, OutcomeConfig, OutcomeDeriver};
pub use physics::{simulate, EntropyOutput, Schedule, SimulationState};
pub use proof::{Commitment, HouseSeed, Proof, VerificationResult, VerifyOutput};
pub use session::{SessionError, SessionService};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
