//! House Seed Commitment
//!
//! The house commits to `SHA256(house_seed)` before the player acts and
//! reveals the seed afterwards. The commitment is immutable once published.

use std::fmt;
use rand::RngCore;
use serde::{Serialize, Deserialize};

use crate::core::hash::{hex_eq, sha256_hex};
use crate::physics::{simulate, Schedule, SimulationState, ThetaAngles, BODY_COUNT};

/// Bytes of OS randomness folded into every fresh house seed.
const HOUSE_SEED_RANDOM_BYTES: usize = 32;

/// Published commitment: lowercase hex SHA-256 of the house seed.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(String);

impl Commitment {
    /// Commit to a house seed.
    pub fn from_house_seed(house_seed: &str) -> Self {
        Self(sha256_hex(house_seed))
    }

    /// Wrap a published commitment hash as-is.
    pub fn from_hex(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    /// Check a revealed seed against this commitment.
    pub fn verify(&self, house_seed: &str) -> bool {
        hex_eq(&sha256_hex(house_seed), &self.0)
    }

    /// Hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", self.0)
    }
}

/// A freshly generated house seed with its physics provenance.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseSeed {
    /// Entropy hex of the house seed run. Secret until reveal.
    pub seed: String,
    /// Final simulation state.
    pub physics_state: SimulationState,
    /// Diagnostic angles of the final state.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
}

impl HouseSeed {
    /// Run the house seed schedule on `base_seed`.
    pub fn from_base_seed(base_seed: &str) -> Self {
        let out = simulate(base_seed.as_bytes(), Schedule::HOUSE_SEED);
        Self {
            seed: out.entropy_hex,
            physics_state: out.final_state,
            theta_angles: out.theta_angles,
        }
    }

    /// Generate a fresh, unpredictable house seed.
    ///
    /// The base seed is `<unix millis>:<64 hex chars of OS randomness>`.
    pub fn generate() -> Self {
        let mut random = [0u8; HOUSE_SEED_RANDOM_BYTES];
        rand::rngs::OsRng.fill_bytes(&mut random);
        let base_seed = format!(
            "{}:{}",
            chrono::Utc::now().timestamp_millis(),
            hex::encode(random)
        );
        Self::from_base_seed(&base_seed)
    }

    /// Commitment to publish for this seed.
    pub fn commitment(&self) -> Commitment {
        Commitment::from_house_seed(&self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE_HOUSE_SEED: &str =
        "b5c57eb34d118fc75253e9b4c51c928f4f6fb628d52ea71a848a6bb585a8302d";
    const FIXTURE_COMMITMENT: &str =
        "e4a96a270eb959911f8fe2c3ebb3ee2a2cc2909dbe98e5e23360e816819c8615";

    #[test]
    fn test_fixture_commitment() {
        let house = HouseSeed::from_base_seed("test-fixture-001");
        assert_eq!(house.seed, FIXTURE_HOUSE_SEED);
        assert_eq!(house.commitment().as_str(), FIXTURE_COMMITMENT);
        assert!(house.commitment().verify(&house.seed));
    }

    #[test]
    fn test_wrong_seed_fails() {
        let commitment = Commitment::from_house_seed(FIXTURE_HOUSE_SEED);
        let mut tampered = FIXTURE_HOUSE_SEED.to_string();
        tampered.replace_range(0..1, "c");
        assert!(!commitment.verify(&tampered));
    }

    #[test]
    fn test_published_hash_case_insensitive() {
        let commitment = Commitment::from_hex(FIXTURE_COMMITMENT.to_uppercase());
        assert!(commitment.verify(FIXTURE_HOUSE_SEED));
    }

    #[test]
    fn test_generated_seeds_differ() {
        let a = HouseSeed::generate();
        let b = HouseSeed::generate();
        assert_ne!(a.seed, b.seed);
        assert_eq!(a.seed.len(), 64);
        assert!(a.commitment().verify(&a.seed));
    }
}
