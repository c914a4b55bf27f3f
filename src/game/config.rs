//! Outcome Configuration
//!
//! Every recognized option of the grid derivation, with its default.
//! Unknown fields are rejected on load and conflicting values are rejected
//! by [`OutcomeConfig::validate`].

use std::collections::BTreeSet;
use serde::{Serialize, Deserialize};
use thiserror::Error;

/// Wild symbol name.
pub const WILD: &str = "wild";

/// Bonus symbol name.
pub const BONUS: &str = "bonus";

/// Suffix appended to a base symbol for its gold variant.
pub const GOLD_SUFFIX: &str = "_gold";

/// Largest accepted `reelCount`.
pub const MAX_REEL_COUNT: usize = 64;

/// Largest accepted `rowCount`.
pub const MAX_ROW_COUNT: usize = 64;

/// Largest accepted `bufferRows`.
pub const MAX_BUFFER_ROWS: usize = 64;

/// Spawn probabilities, each in [0, 1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct SpawnRates {
    /// Chance a cell is wild.
    pub wild_chance: f64,
    /// Chance a cell is bonus (subject to the visible-row cap).
    pub bonus_chance: f64,
    /// Chance a base symbol gets the gold variant (eligible columns only).
    pub gold_chance: f64,
}

impl Default for SpawnRates {
    fn default() -> Self {
        Self {
            wild_chance: 0.02,
            bonus_chance: 0.03,
            gold_chance: 0.15,
        }
    }
}

/// Configuration for grid derivation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct OutcomeConfig {
    /// Symbol pool. `wild` and `bonus` are excluded from base picks.
    pub symbols: Vec<String>,
    /// Number of reels (columns).
    pub reel_count: usize,
    /// Visible rows per reel.
    pub row_count: usize,
    /// Extra rows simulated outside the visible window.
    pub buffer_rows: usize,
    /// Spawn probabilities.
    pub spawn_rates: SpawnRates,
    /// Columns whose base symbols may turn gold.
    pub gold_allowed_columns: BTreeSet<usize>,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            symbols: [
                "fa", "zhong", "bai", "bawan", "wusuo",
                "wutong", "liangsuo", "liangtong", WILD, BONUS,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            reel_count: 5,
            row_count: 6,
            buffer_rows: 4,
            spawn_rates: SpawnRates::default(),
            gold_allowed_columns: [1, 2, 3].into_iter().collect(),
        }
    }
}

/// Invalid outcome configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutcomeConfigError {
    /// JSON could not be parsed, or named an unknown option.
    #[error("invalid outcome config: {0}")]
    Parse(String),

    /// No reels.
    #[error("reelCount must be at least 1")]
    ZeroReels,

    /// No visible rows.
    #[error("rowCount must be at least 1")]
    ZeroRows,

    /// A grid dimension exceeds its limit.
    #[error("{name} must be at most {max}, got {value}")]
    DimensionTooLarge {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: usize,
        /// Limit.
        max: usize,
    },

    /// A probability is outside [0, 1].
    #[error("{name} must be within [0, 1], got {value}")]
    ProbabilityOutOfRange {
        /// Option name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Nothing left to pick after removing wild and bonus.
    #[error("symbol pool has no base symbols")]
    EmptyPool,

    /// A symbol is listed twice.
    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    /// A gold column does not exist.
    #[error("gold column {column} out of range for {reel_count} reels")]
    GoldColumnOutOfRange {
        /// Offending column.
        column: usize,
        /// Configured reel count.
        reel_count: usize,
    },
}

impl OutcomeConfig {
    /// Parse from JSON and validate. Missing options take their defaults.
    pub fn from_json(json: &str) -> Result<Self, OutcomeConfigError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| OutcomeConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option and the relations between them.
    pub fn validate(&self) -> Result<(), OutcomeConfigError> {
        if self.reel_count == 0 {
            return Err(OutcomeConfigError::ZeroReels);
        }
        if self.row_count == 0 {
            return Err(OutcomeConfigError::ZeroRows);
        }

        let dimensions = [
            ("reelCount", self.reel_count, MAX_REEL_COUNT),
            ("rowCount", self.row_count, MAX_ROW_COUNT),
            ("bufferRows", self.buffer_rows, MAX_BUFFER_ROWS),
        ];
        for (name, value, max) in dimensions {
            if value > max {
                return Err(OutcomeConfigError::DimensionTooLarge { name, value, max });
            }
        }

        let rates = [
            ("wildChance", self.spawn_rates.wild_chance),
            ("bonusChance", self.spawn_rates.bonus_chance),
            ("goldChance", self.spawn_rates.gold_chance),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(OutcomeConfigError::ProbabilityOutOfRange { name, value });
            }
        }

        let mut seen = BTreeSet::new();
        for symbol in &self.symbols {
            if !seen.insert(symbol.as_str()) {
                return Err(OutcomeConfigError::DuplicateSymbol(symbol.clone()));
            }
        }

        if self.base_pool().is_empty() {
            return Err(OutcomeConfigError::EmptyPool);
        }

        if let Some(&column) = self.gold_allowed_columns.iter().find(|c| **c >= self.reel_count) {
            return Err(OutcomeConfigError::GoldColumnOutOfRange {
                column,
                reel_count: self.reel_count,
            });
        }

        Ok(())
    }

    /// Symbols eligible for a base pick, in configured order.
    pub fn base_pool(&self) -> Vec<String> {
        self.symbols
            .iter()
            .filter(|s| s.as_str() != WILD && s.as_str() != BONUS)
            .cloned()
            .collect()
    }

    /// Rows per reel including the buffer.
    pub fn total_rows(&self) -> usize {
        self.row_count + self.buffer_rows
    }

    /// Visible row range `[buffer_rows, buffer_rows + row_count)`.
    pub fn visible_rows(&self) -> std::ops::Range<usize> {
        self.buffer_rows..self.buffer_rows + self.row_count
    }

    /// Whether `cell` is one of the values a derived grid may contain.
    pub fn is_valid_cell(&self, cell: &str) -> bool {
        if cell == WILD || cell == BONUS {
            return true;
        }
        let base = cell.strip_suffix(GOLD_SUFFIX).unwrap_or(cell);
        self.base_pool().iter().any(|s| s == base)
    }
}
