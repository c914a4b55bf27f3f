//! Publishable Verification Bundles
//!
//! Two equivalent JSON shapes are accepted:
//! - structured: explicit `game`, `spin`, `commitment`, `seeds`, `mixing`
//!   and `result` sections, every field required;
//! - simplified: flat, with most verification inputs optional so partially
//!   redacted bundles still load.
//!
//! Both normalize into [`BundleInputs`], the single input of the
//! independent verifier.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Deserialize};
use serde_json::Value;
use thiserror::Error;

use crate::game::outcome::{derive_reel_stops, SYMBOLS_PER_REEL};
use super::commitment::Commitment;
use super::mixing::{combined_seed_hkdf, MixingAlgorithm, DEFAULT_HKDF_INFO, DEFAULT_HKDF_SALT};

/// Structured bundle format version.
pub const BUNDLE_VERSION: &str = "1.0";

/// Hash algorithm named in commitments.
pub const COMMITMENT_HASH_ALG: &str = "SHA-256";

// =============================================================================
// STRUCTURED BUNDLE
// =============================================================================

/// Game identification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameInfo {
    /// Game identifier.
    pub id: String,
    /// Version of the game math.
    pub math_version: String,
    /// Hash of the published reel strips, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reel_strips_hash: Option<String>,
}

/// Whether the spin was played for money.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpinMode {
    /// Real-money spin.
    Real,
    /// Demo spin.
    Demo,
}

/// Spin identification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpinInfo {
    /// Spin identifier.
    pub spin_id: String,
    /// Session the spin belongs to.
    pub session_id: String,
    /// RFC 3339 timestamp.
    pub timestamp: String,
    /// Play mode.
    pub mode: SpinMode,
}

/// Published commitment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentData {
    /// Hex hash of the server seed.
    pub commitment_hash: String,
    /// Hash algorithm name.
    pub hash_alg: String,
    /// When the commitment was published, RFC 3339.
    pub published_at: String,
}

/// Revealed seeds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    /// Revealed house seed.
    pub server_seed: String,
    /// Player seed.
    pub client_seed: String,
    /// Round nonce.
    pub nonce: u64,
}

/// Publishable mixing parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixingData {
    /// Key derivation function label.
    pub kdf: String,
    /// HKDF salt.
    pub salt: String,
    /// HKDF info.
    pub info: String,
    /// Derived combined seed, hex.
    pub combined_seed_hex: String,
}

/// Payout of the spin.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    /// Stake.
    pub bet: f64,
    /// Amount won.
    pub win: f64,
    /// Currency code.
    pub currency: String,
}

/// Spin result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultData {
    /// Reel stop per reel.
    pub reel_stops: Vec<u32>,
    /// Visible symbols, row-major.
    pub symbols: Vec<String>,
    /// Payout.
    pub payout: Payout,
}

/// Commit chain links published by the server.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProof {
    /// Previous commitment in the chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_chain_prev: Option<String>,
    /// This round's chain link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_chain_this: Option<String>,
}

/// Structured verification bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationBundle {
    /// Format version.
    pub version: String,
    /// Game.
    pub game: GameInfo,
    /// Spin.
    pub spin: SpinInfo,
    /// Commitment.
    pub commitment: CommitmentData,
    /// Seeds.
    pub seeds: SeedData,
    /// Mixing.
    pub mixing: MixingData,
    /// Result.
    pub result: ResultData,
    /// Optional chain links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_proof: Option<ServerProof>,
}

// =============================================================================
// SIMPLIFIED BUNDLE
// =============================================================================

/// Outcome section of a simplified bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeData {
    /// Reel stops.
    pub reels: Vec<u32>,
    /// Visible symbols.
    pub symbols: Vec<String>,
    /// Amount won.
    pub win_amount: f64,
}

/// Initial simulation conditions, informational.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    /// Body masses.
    pub masses: Vec<f64>,
    /// Body positions.
    pub positions: Vec<Vec<f64>>,
    /// Body velocities.
    pub velocities: Vec<Vec<f64>>,
}

/// Signature section of a simplified bundle, informational.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofData {
    /// Signature.
    pub signature: String,
    /// Key the signature was made with.
    pub public_key: String,
}

/// Flat verification bundle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimplifiedBundle {
    /// Spin identifier.
    pub spin_id: String,
    /// Timestamp as published.
    pub timestamp: String,
    /// Outcome.
    pub outcome: OutcomeData,
    /// Revealed house seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_seed: Option<String>,
    /// Player seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_seed: Option<String>,
    /// Nonce.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// Published commitment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment_hash: Option<String>,
    /// HKDF combined seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_seed_hex: Option<String>,
    /// Hash chain, newest first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_chain: Option<Vec<String>>,
    /// Initial simulation conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_conditions: Option<InitialConditions>,
    /// Theta values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theta_values: Option<Vec<f64>>,
    /// Signature data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof: Option<ProofData>,
}

// =============================================================================
// PARSING
// =============================================================================

/// Which of the two shapes a bundle has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleShape {
    /// Sectioned bundle.
    Structured,
    /// Flat bundle.
    Simplified,
}

impl std::fmt::Display for BundleShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Structured => write!(f, "structured"),
            Self::Simplified => write!(f, "simplified"),
        }
    }
}

/// A parsed bundle of either shape.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Bundle {
    /// Structured shape.
    Structured(VerificationBundle),
    /// Simplified shape.
    Simplified(SimplifiedBundle),
}

/// Bundle input errors. Raised before any check runs.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Not valid JSON.
    #[error("invalid JSON syntax: {0}")]
    Syntax(#[source] serde_json::Error),

    /// Valid JSON, but not an object.
    #[error("invalid bundle: expected a JSON object")]
    NotAnObject,

    /// Neither shape's distinguishing fields are present.
    #[error("invalid bundle format: missing required fields (spinId, outcome or version, game, seeds)")]
    UnrecognizedShape,

    /// Shape detected, but a field is missing or has the wrong type.
    #[error("invalid {shape} bundle: {message}")]
    Invalid {
        /// Detected shape.
        shape: BundleShape,
        /// Field-level message.
        message: String,
    },
}

/// Detect the shape of a JSON object.
pub fn detect_shape(value: &Value) -> Option<BundleShape> {
    let obj = value.as_object()?;
    if ["version", "game", "seeds"].iter().all(|k| obj.contains_key(*k)) {
        Some(BundleShape::Structured)
    } else if ["spinId", "outcome"].iter().all(|k| obj.contains_key(*k)) {
        Some(BundleShape::Simplified)
    } else {
        None
    }
}

/// Parse a bundle of either shape.
pub fn parse_bundle(json: &str) -> Result<Bundle, BundleError> {
    let value: Value = serde_json::from_str(json).map_err(BundleError::Syntax)?;
    if !value.is_object() {
        return Err(BundleError::NotAnObject);
    }

    let shape = detect_shape(&value).ok_or(BundleError::UnrecognizedShape)?;
    let invalid = |e: serde_json::Error| BundleError::Invalid { shape, message: e.to_string() };

    match shape {
        BundleShape::Structured => serde_json::from_value(value).map(Bundle::Structured).map_err(invalid),
        BundleShape::Simplified => serde_json::from_value(value).map(Bundle::Simplified).map_err(invalid),
    }
}

/// Verification inputs common to both shapes.
///
/// Absent fields make the dependent check pass vacuously with a warning.
#[derive(Clone, Debug, PartialEq)]
pub struct BundleInputs {
    /// Spin identifier.
    pub spin_id: String,
    /// Revealed house seed.
    pub server_seed: Option<String>,
    /// Player seed.
    pub client_seed: Option<String>,
    /// Nonce.
    pub nonce: Option<u64>,
    /// Published commitment.
    pub commitment_hash: Option<String>,
    /// Declared KDF label, if the bundle names one.
    pub kdf: Option<String>,
    /// HKDF salt.
    pub salt: String,
    /// HKDF info.
    pub info: String,
    /// Combined seed to check.
    pub combined_seed_hex: Option<String>,
    /// Published reel stops.
    pub reel_stops: Vec<u32>,
    /// Hash chain to check.
    pub hash_chain: Option<Vec<String>>,
}

impl Bundle {
    /// Shape of this bundle.
    pub fn shape(&self) -> BundleShape {
        match self {
            Self::Structured(_) => BundleShape::Structured,
            Self::Simplified(_) => BundleShape::Simplified,
        }
    }

    /// Spin identifier.
    pub fn spin_id(&self) -> &str {
        match self {
            Self::Structured(b) => &b.spin.spin_id,
            Self::Simplified(b) => &b.spin_id,
        }
    }

    /// Normalize into verifier inputs.
    pub fn inputs(&self) -> BundleInputs {
        match self {
            Self::Structured(b) => BundleInputs {
                spin_id: b.spin.spin_id.clone(),
                server_seed: Some(b.seeds.server_seed.clone()),
                client_seed: Some(b.seeds.client_seed.clone()),
                nonce: Some(b.seeds.nonce),
                commitment_hash: Some(b.commitment.commitment_hash.clone()),
                kdf: Some(b.mixing.kdf.clone()),
                salt: b.mixing.salt.clone(),
                info: b.mixing.info.clone(),
                combined_seed_hex: Some(b.mixing.combined_seed_hex.clone()),
                reel_stops: b.result.reel_stops.clone(),
                hash_chain: None,
            },
            Self::Simplified(b) => BundleInputs {
                spin_id: b.spin_id.clone(),
                server_seed: b.server_seed.clone(),
                client_seed: b.client_seed.clone(),
                nonce: b.nonce,
                commitment_hash: b.commitment_hash.clone(),
                kdf: None,
                salt: DEFAULT_HKDF_SALT.to_string(),
                info: DEFAULT_HKDF_INFO.to_string(),
                combined_seed_hex: b.combined_seed_hex.clone(),
                reel_stops: b.outcome.reels.clone(),
                hash_chain: b.hash_chain.clone(),
            },
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// =============================================================================
// EXPORT
// =============================================================================

/// Everything needed to publish a revealed round.
#[derive(Clone, Debug)]
pub struct RoundData {
    /// Game.
    pub game: GameInfo,
    /// Play mode.
    pub mode: SpinMode,
    /// Spin identifier.
    pub spin_id: String,
    /// Session identifier.
    pub session_id: String,
    /// When the round was revealed.
    pub revealed_at: DateTime<Utc>,
    /// Commitment published at creation.
    pub commitment: Commitment,
    /// When the commitment was published.
    pub committed_at: DateTime<Utc>,
    /// Revealed house seed.
    pub server_seed: String,
    /// Player seed.
    pub client_seed: String,
    /// Nonce.
    pub nonce: u64,
    /// Number of reels.
    pub reel_count: usize,
    /// Visible symbols, row-major.
    pub symbols: Vec<String>,
    /// Payout.
    pub payout: Payout,
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

impl VerificationBundle {
    /// Build a publishable bundle for a revealed round.
    ///
    /// The combined seed uses the HKDF variant with the default salt and
    /// info, so the bundle verifies without the signing secret.
    pub fn from_round(round: RoundData) -> Self {
        let combined_seed_hex = combined_seed_hkdf(
            &round.server_seed,
            &round.client_seed,
            round.nonce,
            DEFAULT_HKDF_SALT,
            DEFAULT_HKDF_INFO,
        );
        let reel_stops = derive_reel_stops(&combined_seed_hex, round.reel_count, SYMBOLS_PER_REEL)
            .unwrap_or_default();

        Self {
            version: BUNDLE_VERSION.to_string(),
            game: round.game,
            spin: SpinInfo {
                spin_id: round.spin_id,
                session_id: round.session_id,
                timestamp: rfc3339(round.revealed_at),
                mode: round.mode,
            },
            commitment: CommitmentData {
                commitment_hash: round.commitment.as_str().to_string(),
                hash_alg: COMMITMENT_HASH_ALG.to_string(),
                published_at: rfc3339(round.committed_at),
            },
            seeds: SeedData {
                server_seed: round.server_seed,
                client_seed: round.client_seed,
                nonce: round.nonce,
            },
            mixing: MixingData {
                kdf: MixingAlgorithm::HkdfSha256.label().to_string(),
                salt: DEFAULT_HKDF_SALT.to_string(),
                info: DEFAULT_HKDF_INFO.to_string(),
                combined_seed_hex,
            },
            result: ResultData {
                reel_stops,
                symbols: round.symbols,
                payout: round.payout,
            },
            server_proof: None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const HOUSE_SEED: &str = "b5c57eb34d118fc75253e9b4c51c928f4f6fb628d52ea71a848a6bb585a8302d";

    fn fixture_round() -> RoundData {
        RoundData {
            game: GameInfo {
                id: "three-body-slots".into(),
                math_version: "1.0.0".into(),
                reel_strips_hash: None,
            },
            mode: SpinMode::Demo,
            spin_id: "spin-1".into(),
            session_id: "session-1".into(),
            revealed_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
            commitment: Commitment::from_house_seed(HOUSE_SEED),
            committed_at: Utc.timestamp_millis_opt(1_699_999_990_000).unwrap(),
            server_seed: HOUSE_SEED.into(),
            client_seed: "player-42".into(),
            nonce: 1_700_000_000_000,
            reel_count: 5,
            symbols: vec!["fa".into(); 30],
            payout: Payout { bet: 1.0, win: 0.0, currency: "USD".into() },
        }
    }

    #[test]
    fn test_from_round() {
        let bundle = VerificationBundle::from_round(fixture_round());
        assert_eq!(
            bundle.mixing.combined_seed_hex,
            "bf8348b0b48b8928cc28e19f1e28d5b32d534b8da65e83ff9c1c26f6a246d4bc"
        );
        assert_eq!(bundle.result.reel_stops, vec![0, 16, 3, 7, 9]);
        assert_eq!(bundle.spin.timestamp, "2023-11-14T22:13:20.000Z");
        assert_eq!(bundle.mixing.kdf, "HKDF-SHA256");
    }

    #[test]
    fn test_structured_roundtrip_through_parser() {
        let bundle = VerificationBundle::from_round(fixture_round());
        let json = serde_json::to_string(&bundle).unwrap();
        let parsed = parse_bundle(&json).unwrap();
        assert_eq!(parsed.shape(), BundleShape::Structured);
        assert_eq!(parsed, Bundle::Structured(bundle));

        let pretty = parsed.to_json_pretty().unwrap();
        assert!(pretty.contains("\n  \"version\": \"1.0\""));
        assert_eq!(parse_bundle(&pretty).unwrap(), parsed);
    }

    #[test]
    fn test_parse_simplified_minimal() {
        let json = r#"{"spinId": "s-9", "timestamp": "now", "outcome": {"reels": [1, 2], "symbols": [], "winAmount": 0}}"#;
        let bundle = parse_bundle(json).unwrap();
        assert_eq!(bundle.shape(), BundleShape::Simplified);
        assert_eq!(bundle.spin_id(), "s-9");

        let inputs = bundle.inputs();
        assert_eq!(inputs.server_seed, None);
        assert_eq!(inputs.salt, DEFAULT_HKDF_SALT);
        assert_eq!(inputs.reel_stops, vec![1, 2]);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(parse_bundle("{not json"), Err(BundleError::Syntax(_))));
        assert!(matches!(parse_bundle("[1, 2]"), Err(BundleError::NotAnObject)));
        assert!(matches!(parse_bundle(r#"{"spinId": "x"}"#), Err(BundleError::UnrecognizedShape)));

        let err = parse_bundle(r#"{"version": "1.0", "game": {}, "seeds": {}}"#).unwrap_err();
        match err {
            BundleError::Invalid { shape, message } => {
                assert_eq!(shape, BundleShape::Structured);
                assert!(message.contains("missing field"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_structured_detection_wins() {
        let mut value = serde_json::to_value(VerificationBundle::from_round(fixture_round())).unwrap();
        value["spinId"] = "also-here".into();
        value["outcome"] = serde_json::json!({});
        assert_eq!(detect_shape(&value), Some(BundleShape::Structured));
    }
}
