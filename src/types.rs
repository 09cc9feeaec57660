//! Shared types for the GRIDLINE backtester.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the splitter, backtest,
//! and strategy modules can depend on them without circular references.
//!
//! Money (stakes, payouts, PnL) uses `Decimal`; predictions, lines,
//! and probabilities stay `f64` for the statistical computations.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Game record
// ---------------------------------------------------------------------------

/// A completed game with its market lines — one row of the odds table.
///
/// Produced upstream with `outcome` and the line bounds already known;
/// the backtester fills `pred` and the decision engine fills `unit_pnl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    /// Season the game belongs to — the walk-forward windowing key.
    pub season: u16,
    /// Kickoff time; breaks ordering ties within a season.
    pub date: DateTime<Utc>,
    /// Realized margin or total, depending on what the model targets.
    pub outcome: f64,
    /// Best (lowest) line offered across books, if any.
    pub min_line: Option<f64>,
    /// Worst (highest) line offered across books, if any.
    pub max_line: Option<f64>,
    /// Out-of-sample model prediction, written once per game by the sweep.
    pub pred: Option<f64>,
    /// Realized unit profit/loss once a betting policy has been applied.
    pub unit_pnl: Option<Decimal>,
    /// First-fold in-sample diagnostic row — never counted toward PnL.
    #[serde(default)]
    pub is_train: bool,
}

impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} s{}] outcome {:.1} (lines {:?}..{:?}, pred {:?})",
            self.id, self.season, self.outcome, self.min_line, self.max_line, self.pred,
        )
    }
}

impl GameRecord {
    /// Whether both market line bounds are present.
    pub fn has_lines(&self) -> bool {
        self.min_line.is_some() && self.max_line.is_some()
    }

    /// Helper to build a test game with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, season: u16, outcome: f64) -> Self {
        GameRecord {
            id: id.to_string(),
            season,
            date: Utc::now(),
            outcome,
            min_line: Some(outcome - 2.0),
            max_line: Some(outcome + 2.0),
            pred: None,
            unit_pnl: None,
            is_train: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Odds table
// ---------------------------------------------------------------------------

/// The odds table: every game in chronological order, index-aligned with
/// the feature matrix and target slice handed to the backtester.
///
/// Construction sorts by (season, date, id) so downstream index ranges are
/// contiguous per season and deterministic across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OddsTable {
    games: Vec<GameRecord>,
}

impl OddsTable {
    pub fn new(mut games: Vec<GameRecord>) -> Self {
        games.sort_by(|a, b| (a.season, a.date, &a.id).cmp(&(b.season, b.date, &b.id)));
        Self { games }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    /// Sorted unique seasons present in the table.
    pub fn seasons(&self) -> Vec<u16> {
        let mut seasons: Vec<u16> = self.games.iter().map(|g| g.season).collect();
        seasons.sort_unstable();
        seasons.dedup();
        seasons
    }

    /// Write an out-of-sample prediction at `idx`.
    ///
    /// Each game receives its prediction from exactly one fold; warm-up
    /// rows are the only flagged exception.
    pub fn set_pred(&mut self, idx: usize, pred: f64) {
        debug_assert!(
            self.games[idx].pred.is_none() || self.games[idx].is_train,
            "prediction written twice for game {}",
            self.games[idx].id
        );
        self.games[idx].pred = Some(pred);
    }

    /// Record a first-fold in-sample prediction and flag the row diagnostic.
    pub fn set_train_pred(&mut self, idx: usize, pred: f64) {
        self.games[idx].pred = Some(pred);
        self.games[idx].is_train = true;
    }

    pub fn set_unit_pnl(&mut self, idx: usize, pnl: Decimal) {
        self.games[idx].unit_pnl = Some(pnl);
    }

    /// Fraction of non-warm-up games holding a prediction.
    pub fn pred_coverage(&self) -> f64 {
        let eligible: Vec<&GameRecord> = self.games.iter().filter(|g| !g.is_train).collect();
        if eligible.is_empty() {
            return 0.0;
        }
        let filled = eligible.iter().filter(|g| g.pred.is_some()).count();
        filled as f64 / eligible.len() as f64
    }
}

// ---------------------------------------------------------------------------
// Feature matrix & contributions
// ---------------------------------------------------------------------------

/// Dense numeric feature matrix, row-aligned with the odds table.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn new(names: Vec<String>, rows: Vec<Vec<f64>>) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == names.len()));
        Self { names, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.names.len()
    }

    /// Materialize the rows at `indices` (fold train/test subsets).
    pub fn select(&self, indices: &[usize]) -> Vec<Vec<f64>> {
        indices.iter().map(|&i| self.rows[i].clone()).collect()
    }
}

/// Per-game feature attributions: one column per feature plus a trailing
/// bias term, rows keyed by odds-table index and kept sorted.
#[derive(Debug, Clone)]
pub struct ContributionTable {
    pub columns: Vec<String>,
    rows: Vec<(usize, Vec<f64>)>,
}

impl ContributionTable {
    pub fn new(feature_names: &[String]) -> Self {
        let mut columns: Vec<String> = feature_names.to_vec();
        columns.push("bias".to_string());
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, index: usize, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push((index, values));
    }

    /// Sort rows by odds-table index so the concatenated output is
    /// canonical regardless of fold append order.
    pub fn sort(&mut self) {
        self.rows.sort_by_key(|(i, _)| *i);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[(usize, Vec<f64>)] {
        &self.rows
    }
}

// ---------------------------------------------------------------------------
// Bets
// ---------------------------------------------------------------------------

/// Bet direction relative to the market line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BetSide {
    Over,
    Under,
}

impl BetSide {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            BetSide::Over => BetSide::Under,
            BetSide::Under => BetSide::Over,
        }
    }
}

impl fmt::Display for BetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetSide::Over => write!(f, "OVER"),
            BetSide::Under => write!(f, "UNDER"),
        }
    }
}

/// A settled bet decision for one game.
#[derive(Debug, Clone)]
pub struct Bet {
    pub side: BetSide,
    /// Cover probability for probabilistic policies; `None` for policies
    /// that gate on a simple edge ratio.
    pub probability: Option<f64>,
    /// Realized units: `+payout·stake` on a win, `-stake` on a loss,
    /// zero on an exact push.
    pub unit_pnl: Decimal,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
