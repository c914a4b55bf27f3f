//! Proof Signing
//!
//! A [`Proof`] carries everything needed to redo a round's checks given the
//! published commitment and the shared secret.

use serde::{Serialize, Deserialize};

use crate::config::SigningKey;
use crate::core::hash::{hmac_sha256_hex, sha256_hex};
use super::commitment::Commitment;

/// Hex characters kept from the proof id digest.
pub const PROOF_ID_LEN: usize = 32;

/// Signed proof of one revealed round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// `SHA256(entropyHex:nonce)`, first 32 hex characters.
    pub proof_id: String,
    /// Revealed house seed.
    pub house_seed: String,
    /// Player-supplied seed.
    pub client_seed: String,
    /// Round nonce.
    pub nonce: u64,
    /// Mixed entropy the outcome was derived from.
    pub entropy_hex: String,
    /// HMAC-SHA256 over [`signing_message`].
    pub signature: String,
    /// Signing time, Unix milliseconds.
    pub timestamp: i64,
}

/// Proof identifier for `(entropy_hex, nonce)`.
pub fn proof_id(entropy_hex: &str, nonce: u64) -> String {
    let mut id = sha256_hex(&format!("{}:{}", entropy_hex, nonce));
    id.truncate(PROOF_ID_LEN);
    id
}

/// Message covered by the signature: `proofId:commitment:clientSeed:nonce`.
pub fn signing_message(proof_id: &str, commitment: &Commitment, client_seed: &str, nonce: u64) -> String {
    format!("{}:{}:{}:{}", proof_id, commitment, client_seed, nonce)
}

/// Sign a round at the current time.
pub fn sign(
    house_seed: &str,
    client_seed: &str,
    nonce: u64,
    entropy_hex: &str,
    commitment: &Commitment,
    key: &SigningKey,
) -> Proof {
    let now = chrono::Utc::now().timestamp_millis();
    sign_at(house_seed, client_seed, nonce, entropy_hex, commitment, key, now)
}

/// Sign a round with an explicit timestamp.
pub fn sign_at(
    house_seed: &str,
    client_seed: &str,
    nonce: u64,
    entropy_hex: &str,
    commitment: &Commitment,
    key: &SigningKey,
    timestamp: i64,
) -> Proof {
    let proof_id = proof_id(entropy_hex, nonce);
    let message = signing_message(&proof_id, commitment, client_seed, nonce);
    let signature = hmac_sha256_hex(key.as_bytes(), &message);

    Proof {
        proof_id,
        house_seed: house_seed.to_string(),
        client_seed: client_seed.to_string(),
        nonce,
        entropy_hex: entropy_hex.to_string(),
        signature,
        timestamp,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUSE_SEED: &str = "b5c57eb34d118fc75253e9b4c51c928f4f6fb628d52ea71a848a6bb585a8302d";
    const ENTROPY: &str = "bc25e5fbe036ab26aa61328d8c518e0c01a3a8b3811464ad6d1381e0c322aec2";
    const NONCE: u64 = 1_700_000_000_000;

    #[test]
    fn test_proof_oracle() {
        let key = SigningKey::new("test-signing-key").unwrap();
        let commitment = Commitment::from_house_seed(HOUSE_SEED);
        let proof = sign_at(HOUSE_SEED, "player-42", NONCE, ENTROPY, &commitment, &key, 1);

        assert_eq!(proof.proof_id, "d2c0d0451456136a454885cf1edd519e");
        assert_eq!(
            proof.signature,
            "cef8334f5f4546e744809a24f608c4e2c2888eea2e8ee9c154527fbfd6811fbd"
        );
        assert_eq!(proof.timestamp, 1);
    }

    #[test]
    fn test_proof_json_shape() {
        let key = SigningKey::new("k").unwrap();
        let commitment = Commitment::from_house_seed(HOUSE_SEED);
        let proof = sign_at(HOUSE_SEED, "c", 7, ENTROPY, &commitment, &key, 99);
        let json = serde_json::to_value(&proof).unwrap();

        for field in ["proofId", "houseSeed", "clientSeed", "nonce", "entropyHex", "signature", "timestamp"] {
            assert!(json.get(field).is_some(), "missing {}", field);
        }
        let back: Proof = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }
}
