//! Provably-Fair Proof System
//!
//! Provides verifiable spin outcomes through:
//! - Commit-reveal of a physics-generated house seed
//! - Seed mixing (authoritative and publishable variants)
//! - Signed proofs checked with the shared secret
//! - Publishable bundles checked without any secret
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PROOF SYSTEM                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commitment.rs - House seed generation, SHA-256 commitment  │
//! │  mixing.rs     - House + client + nonce -> entropy          │
//! │  signer.rs     - Proof id and HMAC signature                │
//! │  verify.rs     - Authoritative verification (with secret)   │
//! │  bundle.rs     - Publishable bundle formats                 │
//! │  audit.rs      - Independent verification, audit report     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commitment;
pub mod mixing;
pub mod signer;
pub mod verify;
pub mod bundle;
pub mod audit;

// Re-export key types
pub use commitment::{Commitment, HouseSeed};
pub use mixing::{
    mix, combined_seed_hkdf, mixing_input, MixOutput, MixingAlgorithm,
    DEFAULT_HKDF_INFO, DEFAULT_HKDF_SALT,
};
pub use signer::{sign, sign_at, proof_id, Proof};
pub use verify::{verify_proof, VerificationChecks, VerificationResult};
pub use bundle::{
    parse_bundle, Bundle, BundleError, BundleShape, GameInfo, Payout,
    RoundData, SimplifiedBundle, SpinMode, VerificationBundle,
};
pub use audit::{
    generate_audit_report, verify_bundle, verify_hash_chain,
    BundleChecks, ChainCheck, CheckOutcome, ResultCheck, VerifyOutput,
};
