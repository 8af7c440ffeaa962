//! Engine configuration, loadable from a TOML file.
//!
//! Every field has a default, so a config file only needs to name the values
//! it overrides:
//!
//! ```toml
//! lock_timeout_ms = 500
//!
//! [card]
//! min_score = 650
//! ```

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Shards of the account index.
    pub num_shards: usize,
    /// Upper bound on waiting for an account row lock.
    pub lock_timeout_ms: u64,
    /// Upper bound on a single call to the scoring provider.
    pub scoring_timeout_ms: u64,
    pub loan: LoanPolicy,
    pub card: CardPolicy,
    pub fallback: FallbackPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_shards: 16,
            lock_timeout_ms: 2_000,
            scoring_timeout_ms: 5_000,
            loan: LoanPolicy::default(),
            card: CardPolicy::default(),
            fallback: FallbackPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse engine config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_millis(self.scoring_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoanPolicy {
    pub max_installments: u32,
    /// Percentage points.
    pub base_rate: Decimal,
    /// Percentage points added per installment.
    pub rate_per_installment: Decimal,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_installments: 24,
            base_rate: dec!(2.50),
            rate_per_installment: dec!(0.10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CardPolicy {
    pub min_score: u16,
    pub min_movement: Decimal,
    /// Share of total movement offered as card limit.
    pub movement_limit_ratio: Decimal,
}

impl Default for CardPolicy {
    fn default() -> Self {
        Self {
            min_score: 600,
            min_movement: dec!(1000),
            movement_limit_ratio: dec!(0.20),
        }
    }
}

/// Decision applied when the scoring provider cannot produce one.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    /// Income strictly above this is approved.
    pub income_threshold: Decimal,
    pub limit_ratio: Decimal,
    pub approved_score: u16,
    pub rejected_score: u16,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            income_threshold: dec!(1500),
            limit_ratio: dec!(0.30),
            approved_score: 750,
            rejected_score: 300,
        }
    }
}
