//! Performance evaluation.
//!
//! Aggregates the settled unit-PnL series into summary statistics and
//! checks prediction quality against realized outcomes. Warm-up
//! diagnostic rows and no-bet rows never enter the aggregates.

use rust_decimal::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::OddsTable;

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Complete backtest performance report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub num_bets: usize,
    pub wins: usize,
    pub losses: usize,
    /// Fraction of settled bets with positive PnL.
    pub win_rate: f64,
    pub net_pnl: Decimal,
    /// Minimum of the cumulative PnL path.
    pub max_drawdown: Decimal,
    /// Net PnL over the standard deviation of the cumulative path.
    pub sharpe: f64,
    /// Running PnL after each settled bet, for charting.
    pub cumulative: Vec<Decimal>,
    /// Prediction-vs-outcome diagnostics over predicted rows, when any.
    pub regression: Option<RegressionMetrics>,
}

/// Regression quality of predictions against realized outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub r2: f64,
    pub mse: f64,
    pub mae: f64,
    pub n: usize,
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Summarize a settled odds table.
pub fn evaluate(odds: &OddsTable) -> PerformanceReport {
    // Warm-up rows are diagnostic-only: out of every aggregate.
    let rows: Vec<_> = odds.games().iter().filter(|g| !g.is_train).collect();

    let bet_pnls: Vec<Decimal> = rows
        .iter()
        .filter_map(|g| g.unit_pnl)
        .filter(|pnl| !pnl.is_zero())
        .collect();

    let mut cumulative = Vec::with_capacity(bet_pnls.len());
    let mut running = Decimal::ZERO;
    for pnl in &bet_pnls {
        running += pnl;
        cumulative.push(running);
    }

    let num_bets = bet_pnls.len();
    let wins = bet_pnls.iter().filter(|p| p.is_sign_positive()).count();
    let losses = num_bets - wins;
    let net_pnl = running;
    let max_drawdown = cumulative.iter().min().copied().unwrap_or(Decimal::ZERO);
    let sharpe = sharpe_ratio(net_pnl, &cumulative);

    let regression = regression_metrics(&rows);

    PerformanceReport {
        num_bets,
        wins,
        losses,
        win_rate: if num_bets > 0 {
            wins as f64 / num_bets as f64
        } else {
            0.0
        },
        net_pnl,
        max_drawdown,
        sharpe,
        cumulative,
        regression,
    }
}

/// Net PnL over the sample standard deviation of the cumulative path.
fn sharpe_ratio(net_pnl: Decimal, cumulative: &[Decimal]) -> f64 {
    if cumulative.len() < 2 {
        return 0.0;
    }
    let path: Vec<f64> = cumulative
        .iter()
        .map(|v| v.to_f64().unwrap_or(0.0))
        .collect();
    let n = path.len() as f64;
    let mean = path.iter().sum::<f64>() / n;
    let variance = path.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev < 1e-10 {
        return 0.0;
    }
    net_pnl.to_f64().unwrap_or(0.0) / std_dev
}

fn regression_metrics(rows: &[&crate::types::GameRecord]) -> Option<RegressionMetrics> {
    let pairs: Vec<(f64, f64)> = rows
        .iter()
        .filter_map(|g| g.pred.map(|p| (g.outcome, p)))
        .filter(|(outcome, pred)| outcome.is_finite() && pred.is_finite())
        .collect();
    if pairs.is_empty() {
        return None;
    }

    let n = pairs.len() as f64;
    let mean_outcome = pairs.iter().map(|(o, _)| o).sum::<f64>() / n;

    let ss_res: f64 = pairs.iter().map(|(o, p)| (o - p).powi(2)).sum();
    let ss_tot: f64 = pairs.iter().map(|(o, _)| (o - mean_outcome).powi(2)).sum();
    let mse = ss_res / n;
    let mae = pairs.iter().map(|(o, p)| (o - p).abs()).sum::<f64>() / n;
    let r2 = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    Some(RegressionMetrics {
        r2,
        mse,
        mae,
        n: pairs.len(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
