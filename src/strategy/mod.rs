//! Betting decision engine — converts predictions and market lines into
//! realized unit PnL.
//!
//! Policies are interchangeable behind `BettingPolicy`; each evaluation is
//! a pure function of one row (and, for the probabilistic policy, the
//! immutable probability model), so rows can be settled in any order.

pub mod percentage;
pub mod probabilistic;

use std::sync::Arc;

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::config::BettingConfig;
use crate::probability::CoverProbabilityModel;
use crate::types::{Bet, BetSide, GameRecord, OddsTable};
use percentage::PercentageEdgePolicy;
use probabilistic::ProbabilisticEdgePolicy;

// ---------------------------------------------------------------------------
// Policy trait
// ---------------------------------------------------------------------------

/// A betting decision rule.
///
/// `evaluate` returns `None` for no-bet; otherwise the bet is already
/// settled against the row's realized outcome. Implementations hold no
/// mutable state.
pub trait BettingPolicy {
    fn name(&self) -> &'static str;

    fn evaluate(&self, game: &GameRecord) -> Option<Bet>;
}

/// Build the configured policy. The probabilistic policy needs the
/// calibrated cover-probability model; the percentage policy does not.
pub fn build_policy(
    cfg: &BettingConfig,
    model: Option<Arc<CoverProbabilityModel>>,
) -> Result<Box<dyn BettingPolicy>> {
    match cfg.policy.as_str() {
        "percentage_edge" => Ok(Box::new(PercentageEdgePolicy::new(cfg))),
        "probabilistic_edge" => match model {
            Some(model) => Ok(Box::new(ProbabilisticEdgePolicy::new(cfg, model))),
            None => bail!("probabilistic_edge policy requires a calibrated probability model"),
        },
        other => bail!("unknown betting policy: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Settle a bet against the realized outcome.
///
/// Win pays `+payout·stake`, loss pays `-stake`; an outcome exactly on
/// the line is a push and settles zero.
pub(crate) fn settle(
    side: BetSide,
    line: f64,
    outcome: f64,
    payout: Decimal,
    stake: Decimal,
) -> Decimal {
    let won = match side {
        BetSide::Over => outcome > line,
        BetSide::Under => outcome < line,
    };
    let lost = match side {
        BetSide::Over => outcome < line,
        BetSide::Under => outcome > line,
    };
    if won {
        payout * stake
    } else if lost {
        -stake
    } else {
        Decimal::ZERO
    }
}

// ---------------------------------------------------------------------------
// Table pass
// ---------------------------------------------------------------------------

/// Evaluate the policy over every row, writing `unit_pnl` (zero for
/// no-bet). Warm-up rows are never bet. Re-running on an unchanged table
/// produces identical results.
///
/// Returns the number of bets placed.
pub fn apply_bets(policy: &dyn BettingPolicy, odds: &mut OddsTable) -> usize {
    let mut placed = 0usize;
    for idx in 0..odds.len() {
        let game = &odds.games()[idx];
        if game.is_train {
            odds.set_unit_pnl(idx, Decimal::ZERO);
            continue;
        }
        match policy.evaluate(game) {
            Some(bet) => {
                debug!(
                    game_id = %odds.games()[idx].id,
                    side = %bet.side,
                    probability = ?bet.probability,
                    pnl = %bet.unit_pnl,
                    "Bet settled"
                );
                odds.set_unit_pnl(idx, bet.unit_pnl);
                placed += 1;
            }
            None => odds.set_unit_pnl(idx, Decimal::ZERO),
        }
    }
    info!(
        policy = policy.name(),
        games = odds.len(),
        bets = placed,
        "Betting pass complete"
    );
    placed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
