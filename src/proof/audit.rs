//! Independent Bundle Verification
//!
//! Checks a published bundle using only the data in it:
//! 1. commitment: `SHA256(serverSeed)` equals the published hash;
//! 2. mixing: HKDF over `serverSeed:clientSeed:nonce` reproduces the
//!    combined seed;
//! 3. result: reel stops re-derive from the combined seed;
//! 4. hash chain (optional): each element is the SHA-256 of the next.
//!
//! A check whose inputs are missing passes vacuously and adds a warning.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Deserialize};
use tracing::warn;

use crate::core::hash::{hex_eq, sha256_hex};
use crate::game::outcome::{derive_reel_stops, SYMBOLS_PER_REEL};
use super::bundle::{Bundle, BundleInputs};
use super::mixing::{combined_seed_hkdf, MixingAlgorithm};

/// Summary line when every check passes.
pub const SUMMARY_PASSED: &str = "All verification checks passed";

/// Summary line when any check fails.
pub const SUMMARY_FAILED: &str = "One or more verification checks failed";

/// Outcome of a hash comparison check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Check passed.
    pub ok: bool,
    /// Recomputed value, empty when the check was skipped.
    pub computed: String,
    /// Explanation.
    pub details: String,
}

impl CheckOutcome {
    fn skipped(details: &str) -> Self {
        Self { ok: true, computed: String::new(), details: details.to_string() }
    }
}

/// Outcome of the reel-stop check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultCheck {
    /// Check passed.
    pub ok: bool,
    /// Recomputed stops.
    pub computed_stops: Vec<u32>,
    /// Explanation.
    pub details: String,
}

/// Outcome of the hash-chain check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainCheck {
    /// Check passed.
    pub ok: bool,
    /// Explanation.
    pub details: String,
    /// First index `i` where `chain[i] != SHA256(chain[i + 1])`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_at: Option<usize>,
}

/// All checks of one bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleChecks {
    /// Commitment check.
    pub commitment: CheckOutcome,
    /// Mixing check.
    pub mixing: CheckOutcome,
    /// Result check.
    pub result: ResultCheck,
    /// Hash chain check, when the bundle carries a chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_chain: Option<ChainCheck>,
}

/// Verifier output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyOutput {
    /// Every check passed.
    pub ok: bool,
    /// Individual checks.
    pub checks: BundleChecks,
    /// Missing-data notes.
    pub warnings: Vec<String>,
    /// One-line summary.
    pub summary: String,
}

/// Run every check on `bundle`.
pub fn verify_bundle(bundle: &Bundle) -> VerifyOutput {
    verify_inputs(&bundle.inputs())
}

/// Run every check on normalized inputs.
pub fn verify_inputs(inputs: &BundleInputs) -> VerifyOutput {
    let mut warnings = Vec::new();

    let commitment = match (&inputs.server_seed, &inputs.commitment_hash) {
        (Some(seed), Some(hash)) => check_commitment(seed, hash),
        _ => {
            warnings.push("No server seed or commitment hash provided".to_string());
            CheckOutcome::skipped("No commitment data to verify")
        }
    };

    let mixing = match (&inputs.server_seed, &inputs.client_seed, inputs.nonce, &inputs.combined_seed_hex) {
        (Some(server), Some(client), Some(nonce), Some(combined)) => {
            check_mixing(server, client, nonce, inputs, combined)
        }
        (_, _, _, None) => {
            warnings.push("No combined seed hex provided for mixing verification".to_string());
            CheckOutcome::skipped("No mixing data to verify")
        }
        _ => {
            warnings.push("Seeds or nonce missing; mixing not verified".to_string());
            CheckOutcome::skipped("No mixing data to verify")
        }
    };

    let result = match &inputs.combined_seed_hex {
        Some(combined) => check_result(combined, &inputs.reel_stops),
        None => ResultCheck {
            ok: true,
            computed_stops: Vec::new(),
            details: "No combined seed for result verification".to_string(),
        },
    };

    let hash_chain = inputs.hash_chain.as_deref().map(verify_hash_chain);

    let ok = commitment.ok
        && mixing.ok
        && result.ok
        && hash_chain.as_ref().map_or(true, |c| c.ok);

    VerifyOutput {
        ok,
        checks: BundleChecks { commitment, mixing, result, hash_chain },
        warnings,
        summary: if ok { SUMMARY_PASSED } else { SUMMARY_FAILED }.to_string(),
    }
}

fn check_commitment(server_seed: &str, expected: &str) -> CheckOutcome {
    let computed = sha256_hex(server_seed);
    let ok = hex_eq(&computed, expected);
    let details = if ok {
        "Server seed hash matches commitment".to_string()
    } else {
        format!("Hash mismatch: expected {}, got {}", expected, computed)
    };
    CheckOutcome { ok, computed, details }
}

fn check_mixing(
    server_seed: &str,
    client_seed: &str,
    nonce: u64,
    inputs: &BundleInputs,
    expected: &str,
) -> CheckOutcome {
    if let Some(kdf) = &inputs.kdf {
        if kdf.parse::<MixingAlgorithm>() != Ok(MixingAlgorithm::HkdfSha256) {
            return CheckOutcome {
                ok: false,
                computed: String::new(),
                details: format!("Unsupported kdf for independent verification: {}", kdf),
            };
        }
    }

    let computed = combined_seed_hkdf(server_seed, client_seed, nonce, &inputs.salt, &inputs.info);
    let ok = hex_eq(&computed, expected);
    let details = if ok {
        "HKDF derivation matches expected combined seed".to_string()
    } else {
        format!("Derivation mismatch: expected {}, got {}", expected, computed)
    };
    CheckOutcome { ok, computed, details }
}

fn check_result(combined_seed_hex: &str, expected: &[u32]) -> ResultCheck {
    let Some(computed_stops) = derive_reel_stops(combined_seed_hex, expected.len(), SYMBOLS_PER_REEL) else {
        return ResultCheck {
            ok: false,
            computed_stops: Vec::new(),
            details: format!(
                "Combined seed is not hex or too short for {} reels",
                expected.len()
            ),
        };
    };

    let ok = computed_stops == expected;
    let details = if ok {
        "Reel stops match expected derivation".to_string()
    } else {
        format!(
            "Stops mismatch: expected {}, got {}",
            format_stops(expected),
            format_stops(&computed_stops)
        )
    };
    ResultCheck { ok, computed_stops, details }
}

fn format_stops(stops: &[u32]) -> String {
    let joined: Vec<String> = stops.iter().map(|s| s.to_string()).collect();
    format!("[{}]", joined.join(", "))
}

/// Check that every element is the SHA-256 of the next one.
///
/// Chains shorter than two elements pass with a note.
pub fn verify_hash_chain(chain: &[String]) -> ChainCheck {
    if chain.len() < 2 {
        return ChainCheck {
            ok: true,
            details: "Hash chain too short to verify (single hash or empty)".to_string(),
            broken_at: None,
        };
    }

    let broken = chain
        .windows(2)
        .position(|pair| !hex_eq(&sha256_hex(&pair[1]), &pair[0]));

    match broken {
        Some(i) => ChainCheck {
            ok: false,
            details: format!(
                "Hash chain broken at index {}: hash of [{}] does not equal [{}]",
                i,
                i + 1,
                i
            ),
            broken_at: Some(i),
        },
        None => ChainCheck {
            ok: true,
            details: format!("Hash chain verified: {} hashes in sequence", chain.len()),
            broken_at: None,
        },
    }
}

fn status(ok: bool) -> &'static str {
    if ok { "PASSED" } else { "FAILED" }
}

/// Plain-text audit report for a verified bundle.
pub fn generate_audit_report(bundle: &Bundle, output: &VerifyOutput, generated_at: DateTime<Utc>) -> String {
    let checks = &output.checks;
    let mut report = String::new();

    report.push_str("=== FAIRNESS VERIFICATION AUDIT REPORT ===\n");
    report.push_str(&format!("Generated: {}\n", generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)));
    report.push_str(&format!("Spin ID: {}\n", bundle.spin_id()));
    report.push_str(&format!("Overall Result: {}\n\n", status(output.ok)));

    report.push_str("--- VERIFICATION CHECKS ---\n\n");

    report.push_str("1. Commitment Verification\n");
    report.push_str(&format!("   Status: {}\n", status(checks.commitment.ok)));
    report.push_str(&format!("   Details: {}\n", checks.commitment.details));
    if !checks.commitment.computed.is_empty() {
        report.push_str(&format!("   Computed Hash: {}\n", checks.commitment.computed));
    }
    report.push('\n');

    report.push_str("2. Seed Mixing Verification\n");
    report.push_str(&format!("   Status: {}\n", status(checks.mixing.ok)));
    report.push_str(&format!("   Details: {}\n", checks.mixing.details));
    if !checks.mixing.computed.is_empty() {
        report.push_str(&format!("   Computed Combined Seed: {}\n", checks.mixing.computed));
    }
    report.push('\n');

    report.push_str("3. Result Derivation Verification\n");
    report.push_str(&format!("   Status: {}\n", status(checks.result.ok)));
    report.push_str(&format!("   Details: {}\n", checks.result.details));
    if !checks.result.computed_stops.is_empty() {
        report.push_str(&format!("   Computed Reel Stops: {}\n", format_stops(&checks.result.computed_stops)));
    }
    report.push('\n');

    if let Some(chain) = &checks.hash_chain {
        report.push_str("4. Hash Chain Verification\n");
        report.push_str(&format!("   Status: {}\n", status(chain.ok)));
        report.push_str(&format!("   Details: {}\n", chain.details));
        report.push('\n');
    }

    if !output.warnings.is_empty() {
        report.push_str("--- WARNINGS ---\n");
        for (i, warning) in output.warnings.iter().enumerate() {
            report.push_str(&format!("{}. {}\n", i + 1, warning));
        }
        report.push('\n');
    }

    report.push_str("--- BUNDLE DATA ---\n");
    match bundle.to_json_pretty() {
        Ok(json) => report.push_str(&json),
        Err(e) => {
            warn!("Bundle {} could not be serialized for the audit report: {}", bundle.spin_id(), e);
            report.push_str(&format!("<unavailable: {}>", e));
        }
    }
    report.push_str("\n\n");
    report.push_str("=== END OF REPORT ===\n");

    report
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proof::bundle::{parse_bundle, SimplifiedBundle, OutcomeData};
    use proptest::prelude::*;

    const HOUSE_SEED: &str = "b5c57eb34d118fc75253e9b4c51c928f4f6fb628d52ea71a848a6bb585a8302d";
    const COMMITMENT: &str = "e4a96a270eb959911f8fe2c3ebb3ee2a2cc2909dbe98e5e23360e816819c8615";
    const COMBINED: &str = "bf8348b0b48b8928cc28e19f1e28d5b32d534b8da65e83ff9c1c26f6a246d4bc";

    fn structured_json() -> serde_json::Value {
        serde_json::json!({
            "version": "1.0",
            "game": {"id": "tb", "mathVersion": "1"},
            "spin": {"spinId": "spin-7", "sessionId": "s", "timestamp": "2023-11-14T22:13:20.000Z", "mode": "real"},
            "commitment": {"commitmentHash": COMMITMENT, "hashAlg": "SHA-256", "publishedAt": "2023-11-14T22:13:10.000Z"},
            "seeds": {"serverSeed": HOUSE_SEED, "clientSeed": "player-42", "nonce": 1_700_000_000_000u64},
            "mixing": {"kdf": "HKDF-SHA256", "salt": "tb-entropy-v1", "info": "spin", "combinedSeedHex": COMBINED},
            "result": {"reelStops": [0, 16, 3, 7, 9], "symbols": [], "payout": {"bet": 1, "win": 0, "currency": "USD"}}
        })
    }

    fn parse(value: serde_json::Value) -> Bundle {
        parse_bundle(&value.to_string()).unwrap()
    }

    fn chain_of(tail: &str, len: usize) -> Vec<String> {
        let mut chain = vec![tail.to_string()];
        for _ in 1..len {
            let next = sha256_hex(&chain[0]);
            chain.insert(0, next);
        }
        chain
    }

    #[test]
    fn test_structured_bundle_passes() {
        let output = verify_bundle(&parse(structured_json()));
        assert!(output.ok, "{:?}", output);
        assert!(output.warnings.is_empty());
        assert_eq!(output.checks.commitment.computed, COMMITMENT);
        assert_eq!(output.checks.result.computed_stops, vec![0, 16, 3, 7, 9]);
        assert_eq!(output.summary, SUMMARY_PASSED);
    }

    #[test]
    fn test_uppercase_hex_accepted() {
        let mut json = structured_json();
        json["commitment"]["commitmentHash"] = COMMITMENT.to_uppercase().into();
        json["mixing"]["combinedSeedHex"] = COMBINED.to_uppercase().into();
        assert!(verify_bundle(&parse(json)).ok);
    }

    #[test]
    fn test_each_check_fails_independently() {
        let mut json = structured_json();
        json["result"]["reelStops"] = serde_json::json!([1, 16, 3, 7, 9]);
        let output = verify_bundle(&parse(json));
        assert!(!output.ok);
        assert!(output.checks.commitment.ok);
        assert!(output.checks.mixing.ok);
        assert!(!output.checks.result.ok);
        assert_eq!(output.checks.result.details, "Stops mismatch: expected [1, 16, 3, 7, 9], got [0, 16, 3, 7, 9]");

        let mut json = structured_json();
        json["seeds"]["clientSeed"] = "player-43".into();
        let output = verify_bundle(&parse(json));
        assert!(output.checks.commitment.ok);
        assert!(!output.checks.mixing.ok);
        assert!(output.checks.result.ok);
        assert_eq!(output.summary, SUMMARY_FAILED);
    }

    #[test]
    fn test_non_hkdf_kdf_fails_mixing() {
        let mut json = structured_json();
        json["mixing"]["kdf"] = "physics-hmac-sha256".into();
        let output = verify_bundle(&parse(json));
        assert!(!output.checks.mixing.ok);
        assert!(output.checks.mixing.details.contains("Unsupported kdf"));
    }

    #[test]
    fn test_redacted_simplified_bundle_passes_with_warnings() {
        let bundle = Bundle::Simplified(SimplifiedBundle {
            spin_id: "redacted".into(),
            timestamp: "t".into(),
            outcome: OutcomeData { reels: vec![3, 4], symbols: vec![], win_amount: 0.0 },
            server_seed: None,
            client_seed: None,
            nonce: None,
            commitment_hash: None,
            combined_seed_hex: None,
            hash_chain: None,
            initial_conditions: None,
            theta_values: None,
            proof: None,
        });
        let output = verify_bundle(&bundle);
        assert!(output.ok);
        assert_eq!(output.warnings.len(), 2);
        assert!(output.checks.hash_chain.is_none());
    }

    #[test]
    fn test_combined_seed_without_client_seed_skips_mixing() {
        let json = serde_json::json!({
            "spinId": "spin-7",
            "timestamp": "2023-11-14T22:13:20.000Z",
            "outcome": {"reels": [0, 16, 3, 7, 9], "symbols": [], "winAmount": 0},
            "serverSeed": HOUSE_SEED,
            "commitmentHash": COMMITMENT,
            "combinedSeedHex": COMBINED,
        });
        let output = verify_bundle(&parse(json));

        assert!(output.ok, "{:?}", output);
        assert!(output.checks.commitment.ok);
        assert_eq!(output.checks.commitment.computed, COMMITMENT);
        assert!(output.checks.mixing.ok);
        assert!(output.checks.mixing.computed.is_empty());
        assert_eq!(output.checks.mixing.details, "No mixing data to verify");
        assert_eq!(output.checks.result.computed_stops, vec![0, 16, 3, 7, 9]);
        assert_eq!(output.warnings, vec!["Seeds or nonce missing; mixing not verified".to_string()]);
    }

    #[test]
    fn test_simplified_full_bundle_uses_default_salt() {
        let json = serde_json::json!({
            "spinId": "spin-7",
            "timestamp": "2023-11-14T22:13:20.000Z",
            "outcome": {"reels": [0, 16, 3, 7, 9], "symbols": [], "winAmount": 0},
            "serverSeed": HOUSE_SEED,
            "clientSeed": "player-42",
            "nonce": 1_700_000_000_000u64,
            "commitmentHash": COMMITMENT,
            "combinedSeedHex": COMBINED,
            "hashChain": chain_of(HOUSE_SEED, 3),
        });
        let output = verify_bundle(&parse(json));
        assert!(output.ok, "{:?}", output);
        assert!(output.checks.hash_chain.unwrap().ok);
    }

    #[test]
    fn test_short_combined_seed_fails_result() {
        let mut json = structured_json();
        json["mixing"]["combinedSeedHex"] = "abcd".into();
        let output = verify_bundle(&parse(json));
        assert!(!output.checks.mixing.ok);
        assert!(!output.checks.result.ok);
        assert!(output.checks.result.computed_stops.is_empty());
    }

    #[test]
    fn test_hash_chain_cases() {
        let short = verify_hash_chain(&[]);
        assert!(short.ok);
        assert!(short.details.contains("too short"));
        assert!(verify_hash_chain(&["abc".to_string()]).ok);

        let good = chain_of("genesis", 3);
        assert!(verify_hash_chain(&good).ok);

        let broken = vec!["00".repeat(32), "genesis".to_string()];
        let check = verify_hash_chain(&broken);
        assert!(!check.ok);
        assert_eq!(check.broken_at, Some(0));
        assert!(check.details.contains("index 0"));
    }

    #[test]
    fn test_audit_report() {
        let bundle = parse(structured_json());
        let output = verify_bundle(&bundle);
        let at = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let report = generate_audit_report(&bundle, &output, at);

        assert!(report.starts_with("=== FAIRNESS VERIFICATION AUDIT REPORT ===\n"));
        assert!(report.contains("Generated: 2024-01-01T00:00:00.000Z\n"));
        assert!(report.contains("Spin ID: spin-7\n"));
        assert!(report.contains("Overall Result: PASSED"));
        assert!(report.contains("Computed Reel Stops: [0, 16, 3, 7, 9]"));
        assert!(!report.contains("4. Hash Chain"));
        assert!(!report.contains("--- WARNINGS ---"));
        assert!(report.contains("\"serverSeed\""));
        assert!(report.ends_with("=== END OF REPORT ===\n"));
    }

    proptest! {
        #[test]
        fn prop_hash_chain_detects_first_break(tail in "[a-z0-9]{1,16}", len in 2usize..8, pick in 0usize..8) {
            let mut chain = chain_of(&tail, len);
            prop_assert!(verify_hash_chain(&chain).ok);

            let k = pick % len;
            chain[k].push('x');
            let check = verify_hash_chain(&chain);
            prop_assert!(!check.ok);
            prop_assert_eq!(check.broken_at, Some(k.saturating_sub(1)));
        }
    }
}
