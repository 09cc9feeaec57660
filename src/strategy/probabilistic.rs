//! Probabilistic-edge betting policy.
//!
//! Asks the calibrated cover-probability model how likely the prediction
//! is to beat each market line bound, and only bets when that probability
//! clears a confidence gate: over when covering the worst (highest) line
//! is likely, under when covering the best (lowest) line is unlikely.

use std::sync::Arc;

use rust_decimal::Decimal;

use super::{settle, BettingPolicy};
use crate::config::BettingConfig;
use crate::probability::CoverProbabilityModel;
use crate::types::{Bet, BetSide, GameRecord};

/// Edge measured as a calibrated cover probability.
///
/// Holds the probability table behind an `Arc`: built once, read-only,
/// shared across every evaluation.
#[derive(Clone)]
pub struct ProbabilisticEdgePolicy {
    model: Arc<CoverProbabilityModel>,
    bet_threshold: f64,
    fade_threshold: f64,
    payout: Decimal,
    stake: Decimal,
}

impl ProbabilisticEdgePolicy {
    pub fn new(cfg: &BettingConfig, model: Arc<CoverProbabilityModel>) -> Self {
        Self {
            model,
            bet_threshold: cfg.bet_threshold,
            fade_threshold: cfg.fade_threshold,
            payout: cfg.payout,
            stake: cfg.stake,
        }
    }
}

impl BettingPolicy for ProbabilisticEdgePolicy {
    fn name(&self) -> &'static str {
        "probabilistic_edge"
    }

    fn evaluate(&self, game: &GameRecord) -> Option<Bet> {
        let pred = game.pred?;

        // Over leg: the margin must beat even the worst offered line.
        if let Some(max_line) = game.max_line {
            if let Some(p_cover) = self.model.cover_probability(pred, max_line) {
                if p_cover > self.bet_threshold {
                    return Some(Bet {
                        side: BetSide::Over,
                        probability: Some(p_cover),
                        unit_pnl: settle(
                            BetSide::Over,
                            max_line,
                            game.outcome,
                            self.payout,
                            self.stake,
                        ),
                    });
                }
            }
        }

        // Under leg: covering even the best line must be unlikely.
        if let Some(min_line) = game.min_line {
            if let Some(p_cover) = self.model.cover_probability(pred, min_line) {
                if p_cover < self.fade_threshold {
                    return Some(Bet {
                        side: BetSide::Under,
                        probability: Some(1.0 - p_cover),
                        unit_pnl: settle(
                            BetSide::Under,
                            min_line,
                            game.outcome,
                            self.payout,
                            self.stake,
                        ),
                    });
                }
            }
        }

        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CalibrationConfig;
    use rust_decimal_macros::dec;

    fn make_model() -> Arc<CoverProbabilityModel> {
        // Flat-multiplier history: empirical mass mirrors the reference
        // Gaussian, so cover probabilities behave like a plain truncated CDF.
        let mut margins = Vec::new();
        for m in -60i32..=60 {
            let z = m as f64 / 22.0;
            let copies = ((-0.5 * z * z).exp() * 4000.0).round() as usize;
            margins.extend(std::iter::repeat(m as f64).take(copies));
        }
        Arc::new(
            CoverProbabilityModel::from_history(&margins, &CalibrationConfig::default())
                .unwrap(),
        )
    }

    fn policy() -> ProbabilisticEdgePolicy {
        ProbabilisticEdgePolicy::new(&BettingConfig::default(), make_model())
    }

    fn make_game(pred: Option<f64>, min: f64, max: f64, outcome: f64) -> GameRecord {
        let mut game = GameRecord::sample("g1", 2022, outcome);
        game.pred = pred;
        game.min_line = Some(min);
        game.max_line = Some(max);
        game
    }

    #[test]
    fn test_confident_over() {
        // Prediction far above the lines → cover probability well past 0.60.
        let bet = policy()
            .evaluate(&make_game(Some(18.0), 3.0, 4.0, 10.0))
            .unwrap();
        assert_eq!(bet.side, BetSide::Over);
        assert!(bet.probability.unwrap() > 0.6);
        assert_eq!(bet.unit_pnl, dec!(0.87));
    }

    #[test]
    fn test_confident_under() {
        let bet = policy()
            .evaluate(&make_game(Some(-14.0), 3.0, 4.0, -2.0))
            .unwrap();
        assert_eq!(bet.side, BetSide::Under);
        assert!(bet.probability.unwrap() > 0.6);
        assert_eq!(bet.unit_pnl, dec!(0.87));

        let bet = policy()
            .evaluate(&make_game(Some(-14.0), 3.0, 4.0, 9.0))
            .unwrap();
        assert_eq!(bet.unit_pnl, dec!(-1));
    }

    #[test]
    fn test_no_edge_no_bet() {
        // Prediction sits on the lines — a coin flip either way.
        assert!(policy()
            .evaluate(&make_game(Some(3.5), 3.0, 4.0, 7.0))
            .is_none());
    }

    #[test]
    fn test_missing_inputs_no_bet() {
        assert!(policy()
            .evaluate(&make_game(None, 3.0, 4.0, 7.0))
            .is_none());

        let mut game = make_game(Some(18.0), 3.0, 4.0, 7.0);
        game.max_line = None;
        game.min_line = None;
        assert!(policy().evaluate(&game).is_none());

        // NaN line → the model declines, so no bet rather than a panic.
        let game = make_game(Some(18.0), f64::NAN, f64::NAN, 7.0);
        assert!(policy().evaluate(&game).is_none());
    }

    #[test]
    fn test_sides_mutually_exclusive() {
        // min_line ≤ max_line makes cover(min) ≥ cover(max): both gates can
        // never open at once. Sweep predictions across the range to check.
        let p = policy();
        for step in 0..81 {
            let pred = -20.0 + step as f64 * 0.5;
            let game = make_game(Some(pred), 3.0, 4.0, 7.0);
            if let Some(bet) = p.evaluate(&game) {
                match bet.side {
                    BetSide::Over => assert!(pred > 4.0),
                    BetSide::Under => assert!(pred < 3.0),
                }
            }
        }
    }

    #[test]
    fn test_push_on_exact_line() {
        let bet = policy()
            .evaluate(&make_game(Some(18.0), 3.0, 4.0, 4.0))
            .unwrap();
        assert_eq!(bet.side, BetSide::Over);
        assert_eq!(bet.unit_pnl, Decimal::ZERO);
    }
}
