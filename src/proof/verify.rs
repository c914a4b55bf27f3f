//! Authoritative Verification
//!
//! Recomputes a signed round with the shared secret. Every check runs even
//! when an earlier one fails, so a report always shows each failing step.
//! Mismatches are reported in the result, never raised.

use serde::{Serialize, Deserialize};

use crate::config::SigningKey;
use crate::core::hash::{hex_eq, verify_hmac_hex};
use super::commitment::Commitment;
use super::mixing::mix;
use super::signer::{signing_message, Proof};

/// Per-step outcome.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationChecks {
    /// `SHA256(houseSeed)` equals the published commitment.
    pub commitment_valid: bool,
    /// Re-mixing reproduces `entropyHex`.
    pub entropy_valid: bool,
    /// The signature matches the recomputed message.
    pub signature_valid: bool,
}

impl VerificationChecks {
    /// All checks passed.
    pub fn all(&self) -> bool {
        self.commitment_valid && self.entropy_valid && self.signature_valid
    }
}

/// Outcome of [`verify_proof`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Logical AND of every check.
    pub valid: bool,
    /// Individual checks.
    pub checks: VerificationChecks,
    /// One message per failing check.
    pub errors: Vec<String>,
}

/// Verify `proof` against `commitment` using `key`.
pub fn verify_proof(proof: &Proof, commitment: &Commitment, key: &SigningKey) -> VerificationResult {
    let mut errors = Vec::new();

    let commitment_valid = commitment.verify(&proof.house_seed);
    if !commitment_valid {
        errors.push(format!(
            "commitment mismatch: SHA256(houseSeed) does not equal {}",
            commitment
        ));
    }

    let remixed = mix(&proof.house_seed, &proof.client_seed, proof.nonce, key);
    let entropy_valid = hex_eq(&remixed.entropy_hex, &proof.entropy_hex);
    if !entropy_valid {
        errors.push(format!(
            "entropy mismatch: expected {}, recomputed {}",
            proof.entropy_hex, remixed.entropy_hex
        ));
    }

    let message = signing_message(&proof.proof_id, commitment, &proof.client_seed, proof.nonce);
    let signature_valid = verify_hmac_hex(key.as_bytes(), &message, &proof.signature);
    if !signature_valid {
        errors.push("signature mismatch".to_string());
    }

    let checks = VerificationChecks { commitment_valid, entropy_valid, signature_valid };
    VerificationResult {
        valid: checks.all(),
        checks,
        errors,
    }
}

// =============================================================================
// TESTS
// =============================================================================
