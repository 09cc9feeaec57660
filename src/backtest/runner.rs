//! Walk-forward sweep.
//!
//! Repeatedly fits the predictor on elapsed seasons and predicts the next
//! one, filling the shared odds table so that every game beyond the
//! warm-up window carries exactly one out-of-sample prediction. The first
//! fold also records its in-sample predictions, flagged `is_train`, for
//! train-vs-test diagnostics.

use tracing::{info, warn};

use crate::error::BacktestError;
use crate::predictor::Predictor;
use crate::split::{SeasonSplitter, WindowPolicy};
use crate::types::{ContributionTable, FeatureMatrix, OddsTable};

use super::tuning::ModelSelector;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of a completed sweep.
#[derive(Debug)]
pub struct BacktestRun {
    pub folds: usize,
    /// Per-game feature attributions across all test folds, when the
    /// predictor exposes them.
    pub contributions: Option<ContributionTable>,
}

// ---------------------------------------------------------------------------
// Backtester
// ---------------------------------------------------------------------------

pub struct WalkForwardBacktester<P: Predictor> {
    predictor: P,
    window: WindowPolicy,
    selector: Option<Box<dyn ModelSelector<P>>>,
}

impl<P: Predictor> WalkForwardBacktester<P> {
    pub fn new(predictor: P, window: WindowPolicy) -> Self {
        Self {
            predictor,
            window,
            selector: None,
        }
    }

    /// Run per-fold model selection (on the fold's training subset only)
    /// before each fit.
    pub fn with_model_selection(mut self, selector: Box<dyn ModelSelector<P>>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// After `run`, the predictor left here is the final fold's fitted model.
    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    pub fn into_predictor(self) -> P {
        self.predictor
    }

    /// Sweep every eligible season in chronological order.
    ///
    /// Aborts on the first fold whose fit fails — a hole in the prediction
    /// column is worse than no result.
    pub fn run(
        &mut self,
        x: &FeatureMatrix,
        y: &[f64],
        odds: &mut OddsTable,
    ) -> Result<BacktestRun, BacktestError> {
        if x.len() != odds.len() {
            return Err(BacktestError::MisalignedInputs {
                what: "feature matrix",
                left: x.len(),
                right: odds.len(),
            });
        }
        if y.len() != odds.len() {
            return Err(BacktestError::MisalignedInputs {
                what: "target",
                left: y.len(),
                right: odds.len(),
            });
        }

        let splitter = SeasonSplitter::from_games(odds.games(), self.window);
        let splits = splitter.splits()?;

        let mut contributions: Option<ContributionTable> =
            Some(ContributionTable::new(&x.names));
        let mut folds = 0usize;
        let mut first_fold = true;

        for split in splits {
            let x_train = x.select(&split.train);
            let y_train: Vec<f64> = split.train.iter().map(|&i| y[i]).collect();

            // Inner model selection sees only this fold's training rows.
            if let Some(selector) = &self.selector {
                let train_keys: Vec<_> = split
                    .train
                    .iter()
                    .map(|&i| {
                        let g = &odds.games()[i];
                        (g.season, g.date)
                    })
                    .collect();
                match selector.select(&x_train, &y_train, &train_keys) {
                    Ok(best) => self.predictor = best,
                    Err(source) => {
                        return Err(BacktestError::FoldTraining {
                            fold: split.fold,
                            test_season: split.test_season,
                            source,
                        })
                    }
                }
            }

            self.predictor
                .fit(&x_train, &y_train)
                .map_err(|source| BacktestError::FoldTraining {
                    fold: split.fold,
                    test_season: split.test_season,
                    source,
                })?;

            // First fold only: record already-seen predictions, flagged so
            // they never leak into out-of-sample PnL.
            if first_fold {
                let train_preds = self.predictor.predict(&x_train);
                for (&idx, pred) in split.train.iter().zip(train_preds) {
                    odds.set_train_pred(idx, pred);
                }
                first_fold = false;
            }

            let x_test = x.select(&split.test);
            let test_preds = self.predictor.predict(&x_test);
            for (&idx, pred) in split.test.iter().zip(&test_preds) {
                odds.set_pred(idx, *pred);
            }

            if contributions.is_some() {
                match self.predictor.contributions(&x_test) {
                    Some(rows) => {
                        if let Some(table) = contributions.as_mut() {
                            for (&idx, row) in split.test.iter().zip(rows) {
                                table.push(idx, row);
                            }
                        }
                    }
                    None => {
                        if folds > 0 {
                            warn!(
                                fold = split.fold,
                                "Predictor stopped exposing contributions mid-sweep"
                            );
                        }
                        contributions = None;
                    }
                }
            }

            info!(
                fold = split.fold,
                test_season = split.test_season,
                train_rows = split.train.len(),
                test_rows = split.test.len(),
                "Fold complete"
            );
            folds += 1;
        }

        if let Some(table) = &mut contributions {
            table.sort();
        }

        info!(folds, coverage = odds.pred_coverage(), "Walk-forward sweep complete");
        Ok(BacktestRun {
            folds,
            contributions,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
