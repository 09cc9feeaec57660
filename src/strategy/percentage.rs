//! Percentage-edge betting policy.
//!
//! Bets the over when the prediction clears the worst offered line by a
//! configured ratio, the under when it undercuts the best line likewise.
//! The escalated variant doubles the stake past a second, wider ratio.

use rust_decimal::Decimal;

use super::{settle, BettingPolicy};
use crate::config::BettingConfig;
use crate::types::{Bet, BetSide, GameRecord};

/// Stake escalation past a second edge tier.
#[derive(Debug, Clone, Copy)]
struct Escalation {
    over_ratio: f64,
    under_ratio: f64,
    multiplier: Decimal,
}

/// Edge measured as a simple ratio between prediction and line.
#[derive(Debug, Clone)]
pub struct PercentageEdgePolicy {
    over_ratio: f64,
    under_ratio: f64,
    payout: Decimal,
    stake: Decimal,
    escalation: Option<Escalation>,
}

impl PercentageEdgePolicy {
    pub fn new(cfg: &BettingConfig) -> Self {
        Self {
            over_ratio: cfg.over_ratio,
            under_ratio: cfg.under_ratio,
            payout: cfg.payout,
            stake: cfg.stake,
            escalation: None,
        }
    }

    /// Two-tier staking: double the stake once the prediction clears the
    /// wider `over_ratio` / `under_ratio` pair.
    pub fn with_escalation(mut self, over_ratio: f64, under_ratio: f64) -> Self {
        self.escalation = Some(Escalation {
            over_ratio,
            under_ratio,
            multiplier: Decimal::TWO,
        });
        self
    }
}

impl BettingPolicy for PercentageEdgePolicy {
    fn name(&self) -> &'static str {
        "percentage_edge"
    }

    fn evaluate(&self, game: &GameRecord) -> Option<Bet> {
        let pred = game.pred?;
        if !pred.is_finite() {
            return None;
        }

        if let Some(max_line) = game.max_line {
            if pred > self.over_ratio * max_line {
                let stake = match self.escalation {
                    Some(esc) if pred > esc.over_ratio * max_line => {
                        self.stake * esc.multiplier
                    }
                    _ => self.stake,
                };
                return Some(Bet {
                    side: BetSide::Over,
                    probability: None,
                    unit_pnl: settle(BetSide::Over, max_line, game.outcome, self.payout, stake),
                });
            }
        }

        if let Some(min_line) = game.min_line {
            if pred < self.under_ratio * min_line {
                let stake = match self.escalation {
                    Some(esc) if pred < esc.under_ratio * min_line => {
                        self.stake * esc.multiplier
                    }
                    _ => self.stake,
                };
                return Some(Bet {
                    side: BetSide::Under,
                    probability: None,
                    unit_pnl: settle(BetSide::Under, min_line, game.outcome, self.payout, stake),
                });
            }
        }

        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
