//! Outcome Derivation
//!
//! Expands an entropy hex string into a symbol grid. Each cell draws from
//! its own HMAC sub-hashes, labelled by a running position counter, so the
//! grid is a pure function of `(entropy_hex, config)`.

use serde::{Serialize, Deserialize};

use crate::core::hash::{hmac_sha256, leading_u32};
use super::config::{OutcomeConfig, OutcomeConfigError, BONUS, GOLD_SUFFIX, WILD};

/// Labels consumed per cell: wild roll, bonus roll, symbol pick, gold roll.
const LABELS_PER_CELL: u64 = 4;

/// Symbols per virtual reel strip in the publishable reel-stop derivation.
pub const SYMBOLS_PER_REEL: u32 = 20;

/// Hex characters consumed per reel stop (4 bytes).
const HEX_PER_STOP: usize = 8;

/// Derived symbol grid, indexed `[column][row]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    columns: Vec<Vec<String>>,
}

impl Grid {
    /// Build from columns.
    pub fn from_columns(columns: Vec<Vec<String>>) -> Self {
        Self { columns }
    }

    /// All columns, top row first.
    pub fn columns(&self) -> &[Vec<String>] {
        &self.columns
    }

    /// Cell at `(column, row)`.
    pub fn get(&self, column: usize, row: usize) -> Option<&str> {
        self.columns.get(column)?.get(row).map(String::as_str)
    }

    /// Number of columns.
    pub fn reel_count(&self) -> usize {
        self.columns.len()
    }

    /// Visible cells flattened row by row, left to right.
    pub fn visible_symbols(&self, config: &OutcomeConfig) -> Vec<String> {
        config
            .visible_rows()
            .flat_map(|row| self.columns.iter().filter_map(move |col| col.get(row).cloned()))
            .collect()
    }

    /// Bonus symbols among the visible rows of `column`.
    pub fn visible_bonus_count(&self, column: usize, config: &OutcomeConfig) -> usize {
        self.columns
            .get(column)
            .map(|col| {
                config
                    .visible_rows()
                    .filter(|row| col.get(*row).map(String::as_str) == Some(BONUS))
                    .count()
            })
            .unwrap_or(0)
    }
}

/// Grid deriver bound to a validated configuration.
#[derive(Clone, Debug)]
pub struct OutcomeDeriver {
    config: OutcomeConfig,
    pool: Vec<String>,
}

impl Default for OutcomeDeriver {
    fn default() -> Self {
        let config = OutcomeConfig::default();
        let pool = config.base_pool();
        Self { config, pool }
    }
}

impl OutcomeDeriver {
    /// Validate `config` and build a deriver for it.
    pub fn new(config: OutcomeConfig) -> Result<Self, OutcomeConfigError> {
        config.validate()?;
        let pool = config.base_pool();
        Ok(Self { config, pool })
    }

    /// The configuration in use.
    pub fn config(&self) -> &OutcomeConfig {
        &self.config
    }

    /// Derive the grid for `entropy_hex`.
    ///
    /// Cells are visited column by column, top to bottom. For each cell,
    /// first match wins:
    /// 1. wild roll below `wild_chance` gives `wild`;
    /// 2. unless the column already shows a visible bonus, bonus roll below
    ///    `bonus_chance` gives `bonus`;
    /// 3. otherwise a base symbol, turned gold when the gold roll hits and
    ///    the column is eligible.
    pub fn derive(&self, entropy_hex: &str) -> Grid {
        let key = entropy_hex.as_bytes();
        let rates = &self.config.spawn_rates;
        let visible = self.config.visible_rows();
        let mut position: u64 = 0;
        let mut columns = Vec::with_capacity(self.config.reel_count);

        for col in 0..self.config.reel_count {
            let mut cells = Vec::with_capacity(self.config.total_rows());
            let mut visible_bonus = 0usize;
            let gold_allowed = self.config.gold_allowed_columns.contains(&col);

            for row in 0..self.config.total_rows() {
                let is_visible = visible.contains(&row);
                let label = position * LABELS_PER_CELL;

                let cell = if unit_float(key, label) < rates.wild_chance {
                    WILD.to_string()
                } else if !(is_visible && visible_bonus >= 1)
                    && unit_float(key, label + 1) < rates.bonus_chance
                {
                    if is_visible {
                        visible_bonus += 1;
                    }
                    BONUS.to_string()
                } else {
                    let index = bounded_int(key, label + 2, self.pool.len() as u32) as usize;
                    let symbol = &self.pool[index];
                    if unit_float(key, label + 3) < rates.gold_chance && gold_allowed {
                        format!("{}{}", symbol, GOLD_SUFFIX)
                    } else {
                        symbol.clone()
                    }
                };

                cells.push(cell);
                position += 1;
            }

            columns.push(cells);
        }

        Grid { columns }
    }
}

/// Derive a grid with `config`, validating it first.
pub fn derive_grid(entropy_hex: &str, config: &OutcomeConfig) -> Result<Grid, OutcomeConfigError> {
    Ok(OutcomeDeriver::new(config.clone())?.derive(entropy_hex))
}

/// Publishable reel stops: 4 bytes of the combined seed per reel, modulo
/// `symbols_per_reel`.
///
/// Returns `None` when the seed is too short or not hex.
pub fn derive_reel_stops(
    combined_seed_hex: &str,
    reel_count: usize,
    symbols_per_reel: u32,
) -> Option<Vec<u32>> {
    if symbols_per_reel == 0 {
        return None;
    }

    (0..reel_count)
        .map(|i| {
            let start = i * HEX_PER_STOP;
            let chunk = combined_seed_hex.get(start..start + HEX_PER_STOP)?;
            let value = u32::from_str_radix(chunk, 16).ok()?;
            Some(value % symbols_per_reel)
        })
        .collect()
}

/// Draw in [0, 1] from `float:<label>`.
fn unit_float(key: &[u8], label: u64) -> f64 {
    let digest = hmac_sha256(key, format!("float:{}", label).as_bytes());
    leading_u32(&digest) as f64 / u32::MAX as f64
}

/// Draw in [0, max) from `position:<label>`.
fn bounded_int(key: &[u8], label: u64, max: u32) -> u32 {
    let digest = hmac_sha256(key, format!("position:{}", label).as_bytes());
    leading_u32(&digest) % max
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Combined entropy of the end-to-end fixture round.
    const FIXTURE_ENTROPY: &str =
        "bc25e5fbe036ab26aa61328d8c518e0c01a3a8b3811464ad6d1381e0c322aec2";

    fn fixture_grid() -> Vec<Vec<&'static str>> {
        vec![
            vec!["bonus", "bawan", "zhong", "zhong", "liangsuo", "liangtong", "bai", "zhong", "fa", "liangtong"],
            vec!["bai_gold", "liangsuo", "fa", "fa", "fa_gold", "fa_gold", "bai", "liangsuo_gold", "wutong", "wild"],
            vec!["liangtong", "zhong", "bonus", "zhong_gold", "wutong", "bai", "wutong", "wutong", "fa", "wutong"],
            vec!["zhong", "bawan", "wutong", "fa_gold", "wusuo_gold", "liangtong", "wutong_gold", "wutong", "liangsuo", "liangtong"],
            vec!["liangsuo", "liangsuo", "liangsuo", "wutong", "wusuo", "bai", "bawan", "wutong", "liangtong", "liangsuo"],
        ]
    }

    #[test]
    fn test_fixture_grid_oracle() {
        let grid = OutcomeDeriver::default().derive(FIXTURE_ENTROPY);
        let expected: Vec<Vec<String>> = fixture_grid()
            .into_iter()
            .map(|col| col.into_iter().map(String::from).collect())
            .collect();
        assert_eq!(grid.columns(), expected.as_slice());
    }

    #[test]
    fn test_visible_symbols_row_major() {
        let config = OutcomeConfig::default();
        let grid = OutcomeDeriver::default().derive(FIXTURE_ENTROPY);
        let symbols = grid.visible_symbols(&config);

        assert_eq!(symbols.len(), 30);
        assert_eq!(symbols[0], "liangsuo"); // col 0, row 4
        assert_eq!(symbols[1], "fa_gold"); // col 1, row 4
        assert_eq!(symbols[5], "liangtong"); // col 0, row 5
        assert_eq!(symbols[29], "liangsuo"); // col 4, row 9
    }

    #[test]
    fn test_all_wild() {
        let mut config = OutcomeConfig::default();
        config.spawn_rates.wild_chance = 1.0;
        let grid = derive_grid("anything", &config).unwrap();
        assert!(grid.columns().iter().flatten().all(|c| c == WILD));
    }

    #[test]
    fn test_bonus_cap_applies_to_visible_rows_only() {
        let mut config = OutcomeConfig::default();
        config.spawn_rates.wild_chance = 0.0;
        config.spawn_rates.bonus_chance = 1.0;
        let grid = derive_grid(FIXTURE_ENTROPY, &config).unwrap();

        for col in grid.columns() {
            // Buffer rows are uncapped
            assert!(col[..4].iter().all(|c| c == BONUS));
            // First visible row takes the single visible bonus
            assert_eq!(col[4], BONUS);
            assert!(col[5..].iter().all(|c| c != BONUS));
        }
    }

    #[test]
    fn test_no_gold_outside_eligible_columns() {
        let mut config = OutcomeConfig::default();
        config.spawn_rates.gold_chance = 1.0;
        let grid = derive_grid(FIXTURE_ENTROPY, &config).unwrap();

        for (i, col) in grid.columns().iter().enumerate() {
            let has_gold = col.iter().any(|c| c.ends_with(GOLD_SUFFIX));
            let base_count = col.iter().filter(|c| *c != WILD && *c != BONUS).count();
            if config.gold_allowed_columns.contains(&i) {
                assert_eq!(col.iter().filter(|c| c.ends_with(GOLD_SUFFIX)).count(), base_count);
            } else {
                assert!(!has_gold);
            }
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = OutcomeConfig { reel_count: 0, ..Default::default() };
        assert!(OutcomeDeriver::new(config.clone()).is_err());
        assert!(derive_grid(FIXTURE_ENTROPY, &config).is_err());
    }

    #[test]
    fn test_reel_stops_oracle() {
        let combined = "bf8348b0b48b8928cc28e19f1e28d5b32d534b8da65e83ff9c1c26f6a246d4bc";
        assert_eq!(derive_reel_stops(combined, 5, SYMBOLS_PER_REEL), Some(vec![0, 16, 3, 7, 9]));
    }

    #[test]
    fn test_reel_stops_edge_cases() {
        assert_eq!(derive_reel_stops("ffffffff", 1, 20), Some(vec![0xffff_ffff % 20]));
        assert_eq!(derive_reel_stops("ffffffff", 2, 20), None);
        assert_eq!(derive_reel_stops("zzzzzzzz", 1, 20), None);
        assert_eq!(derive_reel_stops("ffffffff", 1, 0), None);
        assert_eq!(derive_reel_stops("", 0, 20), Some(vec![]));
    }

    proptest! {
        #[test]
        fn prop_grid_shape_and_bonus_cap(entropy in "[0-9a-f]{64}") {
            let config = OutcomeConfig::default();
            let grid = OutcomeDeriver::default().derive(&entropy);

            prop_assert_eq!(grid.reel_count(), 5);
            for (i, col) in grid.columns().iter().enumerate() {
                prop_assert_eq!(col.len(), 10);
                for cell in col {
                    prop_assert!(config.is_valid_cell(cell), "unexpected cell {}", cell);
                }
                prop_assert!(grid.visible_bonus_count(i, &config) <= 1);
            }
        }

        #[test]
        fn prop_derivation_is_pure(entropy in "[0-9a-f]{64}", reels in 1usize..7, rows in 1usize..8, buffer in 0usize..5) {
            let config = OutcomeConfig {
                reel_count: reels,
                row_count: rows,
                buffer_rows: buffer,
                gold_allowed_columns: (0..reels).filter(|c| c % 2 == 1).collect(),
                ..Default::default()
            };
            let deriver = OutcomeDeriver::new(config).unwrap();
            prop_assert_eq!(deriver.derive(&entropy), deriver.derive(&entropy));
        }
    }
}
