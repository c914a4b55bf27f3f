//! Seed Mixing
//!
//! Combines the house seed, the client seed and the nonce into the entropy a
//! round is derived from. Two protocol variants exist and they do NOT agree
//! on the same inputs:
//!
//! - [`MixingAlgorithm::PhysicsHmac`]: replays the three-body simulation on
//!   the concatenated input and HMACs the final state with the signing
//!   secret. Produces `entropyHex` in a [`Proof`](super::signer::Proof).
//! - [`MixingAlgorithm::HkdfSha256`]: HKDF over the concatenated input with a
//!   published salt and info. Produces `combinedSeedHex` in a published
//!   bundle, recomputable without any secret.

use std::fmt;
use std::str::FromStr;
use hkdf::Hkdf;
use serde::{Serialize, Deserialize};
use sha2::Sha256;

use crate::config::SigningKey;
use crate::core::hash::hmac_sha256_hex;
use crate::physics::{simulate, Schedule, SimulationState, ThetaAngles, BODY_COUNT};

/// Salt used when a bundle does not name one.
pub const DEFAULT_HKDF_SALT: &str = "tb-entropy-v1";

/// Info string used when a bundle does not name one.
pub const DEFAULT_HKDF_INFO: &str = "spin";

/// HKDF output length in bytes.
pub const COMBINED_SEED_LEN: usize = 32;

/// Mixing protocol variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MixingAlgorithm {
    /// Physics replay keyed with the signing secret.
    #[serde(rename = "physics-hmac-sha256")]
    PhysicsHmac,
    /// HKDF-SHA256 with published salt and info.
    #[serde(rename = "HKDF-SHA256")]
    HkdfSha256,
}

impl MixingAlgorithm {
    /// Label written into bundles.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PhysicsHmac => "physics-hmac-sha256",
            Self::HkdfSha256 => "HKDF-SHA256",
        }
    }
}

impl fmt::Display for MixingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for MixingAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "physics-hmac-sha256" => Ok(Self::PhysicsHmac),
            "hkdf-sha256" => Ok(Self::HkdfSha256),
            other => Err(format!("unknown mixing algorithm: {}", other)),
        }
    }
}

/// Mixing input: `houseSeed:clientSeed:nonce`, nonce in decimal.
pub fn mixing_input(house_seed: &str, client_seed: &str, nonce: u64) -> String {
    format!("{}:{}:{}", house_seed, client_seed, nonce)
}

/// Result of the authoritative mix.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixOutput {
    /// HMAC-SHA256 of the mixing run's canonical state, lowercase hex.
    pub entropy_hex: String,
    /// Final state of the mixing run.
    pub final_state: SimulationState,
    /// Diagnostic angles of the final state.
    pub theta_angles: [ThetaAngles; BODY_COUNT],
}

/// Authoritative mix ([`MixingAlgorithm::PhysicsHmac`]).
pub fn mix(house_seed: &str, client_seed: &str, nonce: u64, key: &SigningKey) -> MixOutput {
    let ikm = mixing_input(house_seed, client_seed, nonce);
    let run = simulate(ikm.as_bytes(), Schedule::MIXING);

    MixOutput {
        entropy_hex: hmac_sha256_hex(key.as_bytes(), &run.state_string),
        final_state: run.final_state,
        theta_angles: run.theta_angles,
    }
}

/// Publishable combined seed ([`MixingAlgorithm::HkdfSha256`]).
pub fn combined_seed_hkdf(
    house_seed: &str,
    client_seed: &str,
    nonce: u64,
    salt: &str,
    info: &str,
) -> String {
    let ikm = mixing_input(house_seed, client_seed, nonce);
    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), ikm.as_bytes());
    let mut okm = [0u8; COMBINED_SEED_LEN];
    hk.expand(info.as_bytes(), &mut okm)
        .expect("32 bytes is a valid HKDF-SHA256 output length");
    hex::encode(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSE_SEED: &str = "b5c57eb34d118fc75253e9b4c51c928f4f6fb628d52ea71a848a6bb585a8302d";
    const NONCE: u64 = 1_700_000_000_000;

    fn key() -> SigningKey {
        SigningKey::new("test-signing-key").unwrap()
    }

    #[test]
    fn test_mixing_input_format() {
        assert_eq!(mixing_input("h", "c", 42), "h:c:42");
        assert_eq!(mixing_input("h", "", u64::MAX), "h::18446744073709551615");
    }

    #[test]
    fn test_physics_hmac_oracle() {
        let out = mix(HOUSE_SEED, "player-42", NONCE, &key());
        assert_eq!(
            out.entropy_hex,
            "bc25e5fbe036ab26aa61328d8c518e0c01a3a8b3811464ad6d1381e0c322aec2"
        );
    }

    #[test]
    fn test_physics_hmac_depends_on_key() {
        let other = SigningKey::new("another-key").unwrap();
        let a = mix(HOUSE_SEED, "player-42", NONCE, &key());
        let b = mix(HOUSE_SEED, "player-42", NONCE, &other);
        assert_ne!(a.entropy_hex, b.entropy_hex);
        // Same physics, different key
        assert_eq!(a.final_state, b.final_state);
    }

    #[test]
    fn test_hkdf_oracle() {
        let seed = combined_seed_hkdf(HOUSE_SEED, "player-42", NONCE, DEFAULT_HKDF_SALT, DEFAULT_HKDF_INFO);
        assert_eq!(seed, "bf8348b0b48b8928cc28e19f1e28d5b32d534b8da65e83ff9c1c26f6a246d4bc");
    }

    #[test]
    fn test_variants_disagree() {
        let physics = mix(HOUSE_SEED, "player-42", NONCE, &key());
        let hkdf = combined_seed_hkdf(HOUSE_SEED, "player-42", NONCE, DEFAULT_HKDF_SALT, DEFAULT_HKDF_INFO);
        assert_ne!(physics.entropy_hex, hkdf);
    }

    #[test]
    fn test_algorithm_labels() {
        for algo in [MixingAlgorithm::PhysicsHmac, MixingAlgorithm::HkdfSha256] {
            assert_eq!(algo.label().parse::<MixingAlgorithm>(), Ok(algo));
        }
        assert_eq!("hkdf-sha256".parse::<MixingAlgorithm>(), Ok(MixingAlgorithm::HkdfSha256));
        assert!("sha3".parse::<MixingAlgorithm>().is_err());
        assert_eq!(
            serde_json::to_string(&MixingAlgorithm::HkdfSha256).unwrap(),
            "\"HKDF-SHA256\""
        );
    }
}
