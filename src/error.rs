//! Typed errors for the backtesting core.
//!
//! Every failure carries enough context (fold index, test season, column)
//! to reproduce the run; nothing here is retried — a backtest is a
//! deterministic offline computation that either completes or aborts.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BacktestError {
    /// Fewer seasons than the minimum window. Surfaced before any fold runs;
    /// an empty split sequence never silently succeeds.
    #[error("not enough data: {seasons} season(s) available, window needs more than {required}")]
    NotEnoughData { seasons: usize, required: usize },

    /// A fold's model fit failed. Aborts the whole sweep — partial
    /// prediction coverage is worse than no result.
    #[error("training failed on fold {fold} (test season {test_season}): {source}")]
    FoldTraining {
        fold: usize,
        test_season: u16,
        #[source]
        source: anyhow::Error,
    },

    /// Degenerate probability-table normalization (zero or non-finite
    /// column mass). Raised at construction, never a silent NaN.
    #[error("calibration failed: {0}")]
    Calibration(String),

    /// Feature matrix, target, and odds table must be index-aligned.
    #[error("misaligned inputs: {what} has {left} rows, expected {right}")]
    MisalignedInputs {
        what: &'static str,
        left: usize,
        right: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_context() {
        let err = BacktestError::NotEnoughData {
            seasons: 3,
            required: 5,
        };
        assert!(err.to_string().contains("3 season(s)"));

        let err = BacktestError::FoldTraining {
            fold: 2,
            test_season: 2021,
            source: anyhow::anyhow!("singular matrix"),
        };
        let msg = err.to_string();
        assert!(msg.contains("fold 2"));
        assert!(msg.contains("2021"));
    }

    #[test]
    fn test_misaligned_inputs_display() {
        let err = BacktestError::MisalignedInputs {
            what: "target",
            left: 10,
            right: 12,
        };
        assert!(err.to_string().contains("target"));
        assert!(err.to_string().contains("10"));
    }
}
