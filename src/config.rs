//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every constant the backtest, betting, and calibration layers consume is
//! injected from here — components never read ambient global state.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub backtest: BacktestConfig,
    #[serde(default)]
    pub betting: BettingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
}

/// Walk-forward windowing options.
#[derive(Debug, Deserialize, Clone)]
pub struct BacktestConfig {
    /// "expanding" (canonical) or "fixed".
    #[serde(default = "default_window_policy")]
    pub window_policy: String,
    /// Seasons in the warm-up window (expanding) or the rolling window (fixed).
    #[serde(default = "default_window_seasons")]
    pub window_seasons: usize,
    /// Seasons held out inside each fold's training block for model selection.
    #[serde(default = "default_validation_seasons")]
    pub validation_seasons: usize,
}

fn default_window_policy() -> String {
    "expanding".to_string()
}

fn default_window_seasons() -> usize {
    5
}

fn default_validation_seasons() -> usize {
    1
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            window_policy: default_window_policy(),
            window_seasons: default_window_seasons(),
            validation_seasons: default_validation_seasons(),
        }
    }
}

/// Betting-decision options.
#[derive(Debug, Deserialize, Clone)]
pub struct BettingConfig {
    /// "probabilistic_edge" (canonical) or "percentage_edge".
    #[serde(default = "default_policy")]
    pub policy: String,
    /// Units returned per unit staked on a win (0.87 ≈ standard -115 juice).
    #[serde(default = "default_payout")]
    pub payout: Decimal,
    /// Units risked per bet.
    #[serde(default = "default_stake")]
    pub stake: Decimal,
    /// Percentage policy: bet over when pred exceeds this multiple of the max line.
    #[serde(default = "default_over_ratio")]
    pub over_ratio: f64,
    /// Percentage policy: bet under when pred falls below this multiple of the min line.
    #[serde(default = "default_under_ratio")]
    pub under_ratio: f64,
    /// Probabilistic policy: cover probability above which the over is bet.
    #[serde(default = "default_bet_threshold")]
    pub bet_threshold: f64,
    /// Probabilistic policy: cover probability below which the under is bet.
    #[serde(default = "default_fade_threshold")]
    pub fade_threshold: f64,
}

fn default_policy() -> String {
    "probabilistic_edge".to_string()
}

fn default_payout() -> Decimal {
    dec!(0.87)
}

fn default_stake() -> Decimal {
    Decimal::ONE
}

fn default_over_ratio() -> f64 {
    1.1
}

fn default_under_ratio() -> f64 {
    0.9
}

fn default_bet_threshold() -> f64 {
    0.60
}

fn default_fade_threshold() -> f64 {
    0.40
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            payout: default_payout(),
            stake: default_stake(),
            over_ratio: default_over_ratio(),
            under_ratio: default_under_ratio(),
            bet_threshold: default_bet_threshold(),
            fade_threshold: default_fade_threshold(),
        }
    }
}

/// Cover-probability table calibration constants.
#[derive(Debug, Deserialize, Clone)]
pub struct CalibrationConfig {
    /// Std-dev of the reference Gaussian fitted to historical margins.
    #[serde(default = "default_sigma_hist")]
    pub sigma_hist: f64,
    /// Std-dev of the conditional mass around an assumed true line
    /// (tighter than `sigma_hist`).
    #[serde(default = "default_sigma_cond")]
    pub sigma_cond: f64,
    /// Margin support half-width: rows span [-max_margin, max_margin].
    #[serde(default = "default_max_margin")]
    pub max_margin: i32,
    /// Assumed-line grid half-width: columns span [-max_line, max_line].
    #[serde(default = "default_max_line")]
    pub max_line: i32,
}

fn default_sigma_hist() -> f64 {
    22.0
}

fn default_sigma_cond() -> f64 {
    15.0
}

fn default_max_margin() -> i32 {
    60
}

fn default_max_line() -> i32 {
    40
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            sigma_hist: default_sigma_hist(),
            sigma_cond: default_sigma_cond(),
            max_margin: default_max_margin(),
            max_line: default_max_line(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load from a TOML file, falling back to defaults when it is absent.
    /// A present-but-malformed file is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.backtest.window_policy, "expanding");
        assert_eq!(cfg.backtest.window_seasons, 5);
        assert_eq!(cfg.betting.policy, "probabilistic_edge");
        assert_eq!(cfg.betting.payout, dec!(0.87));
        assert_eq!(cfg.calibration.max_margin, 60);
        assert_eq!(cfg.calibration.max_line, 40);
        assert!(cfg.calibration.sigma_cond < cfg.calibration.sigma_hist);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: AppConfig = toml::from_str(
            r#"
            [backtest]
            window_seasons = 3

            [betting]
            policy = "percentage_edge"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.backtest.window_seasons, 3);
        assert_eq!(cfg.backtest.window_policy, "expanding");
        assert_eq!(cfg.betting.policy, "percentage_edge");
        assert_eq!(cfg.betting.over_ratio, 1.1);
        assert_eq!(cfg.calibration.sigma_hist, 22.0);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let cfg = AppConfig::load_or_default("does_not_exist.toml").unwrap();
        assert_eq!(cfg.backtest.window_seasons, 5);
    }
}
