//! Per-fold model selection.
//!
//! Inside one walk-forward fold, candidate predictors compete on a nested
//! season split carved from that fold's training rows only — later
//! seasons stay invisible. The winner (lowest held-out mean squared
//! error) is handed back to the runner, which refits it on the full
//! training block.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::predictor::Predictor;
use crate::split::{SeasonSplitter, WindowPolicy};

// ---------------------------------------------------------------------------
// Selector trait
// ---------------------------------------------------------------------------

/// Chooses the predictor a fold should train.
///
/// `keys` carries the (season, timestamp) of each training row so the
/// selector can nest a season-aware split without seeing the fold's test
/// rows.
pub trait ModelSelector<P: Predictor> {
    fn select(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        keys: &[(u16, DateTime<Utc>)],
    ) -> Result<P>;
}

// ---------------------------------------------------------------------------
// Candidate search
// ---------------------------------------------------------------------------

/// Scores a pool of candidate predictors by nested cross-validation.
///
/// Optionally evaluates only a seeded random subset of the pool, the way
/// a randomized search trades coverage for fit time.
pub struct CandidateSearch<P> {
    candidates: Vec<P>,
    window: WindowPolicy,
    sample: Option<(usize, u64)>,
}

impl<P: Predictor + Clone> CandidateSearch<P> {
    pub fn new(candidates: Vec<P>, window: WindowPolicy) -> Self {
        Self {
            candidates,
            window,
            sample: None,
        }
    }

    /// Evaluate at most `n_iter` candidates, drawn with the given seed.
    pub fn with_sample(mut self, n_iter: usize, seed: u64) -> Self {
        self.sample = Some((n_iter, seed));
        self
    }

    /// Mean held-out MSE of one candidate across the inner splits.
    fn score(
        &self,
        candidate: &P,
        x: &[Vec<f64>],
        y: &[f64],
        splitter: &SeasonSplitter,
    ) -> Result<f64> {
        let mut total = 0.0;
        let mut folds = 0usize;
        for split in splitter.splits()? {
            let mut model = candidate.clone();
            let x_train: Vec<Vec<f64>> =
                split.train.iter().map(|&i| x[i].clone()).collect();
            let y_train: Vec<f64> = split.train.iter().map(|&i| y[i]).collect();
            model
                .fit(&x_train, &y_train)
                .context("candidate fit failed during model selection")?;

            let x_val: Vec<Vec<f64>> =
                split.test.iter().map(|&i| x[i].clone()).collect();
            let preds = model.predict(&x_val);
            let mse = split
                .test
                .iter()
                .zip(&preds)
                .map(|(&i, pred)| (y[i] - pred).powi(2))
                .sum::<f64>()
                / split.test.len().max(1) as f64;
            total += mse;
            folds += 1;
        }
        Ok(total / folds as f64)
    }
}

impl<P: Predictor + Clone> ModelSelector<P> for CandidateSearch<P> {
    fn select(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        keys: &[(u16, DateTime<Utc>)],
    ) -> Result<P> {
        if self.candidates.is_empty() {
            bail!("no candidate predictors to select from");
        }

        let splitter = SeasonSplitter::new(keys, self.window);
        // Verify the nested split is feasible before scoring anything.
        splitter
            .splits()
            .context("training block too small for nested model selection")?;

        let mut pool: Vec<usize> = (0..self.candidates.len()).collect();
        if let Some((n_iter, seed)) = self.sample {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            pool.shuffle(&mut rng);
            pool.truncate(n_iter.max(1));
        }

        let mut best: Option<(usize, f64)> = None;
        for idx in pool {
            let mse = self.score(&self.candidates[idx], x, y, &splitter)?;
            debug!(candidate = idx, mse, "Candidate scored");
            if best.map_or(true, |(_, best_mse)| mse < best_mse) {
                best = Some((idx, mse));
            }
        }

        let (winner, mse) = best.expect("non-empty pool");
        debug!(candidate = winner, mse, "Candidate selected");
        Ok(self.candidates[winner].clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
