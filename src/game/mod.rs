//! Game outcome logic (deterministic).
//!
//! Turns an entropy hex string into the symbol grid of one spin.

pub mod config;
pub mod outcome;

pub use config::{OutcomeConfig, OutcomeConfigError, SpawnRates, BONUS, GOLD_SUFFIX, WILD};
pub use outcome::{derive_grid, derive_reel_stops, Grid, OutcomeDeriver, SYMBOLS_PER_REEL};
