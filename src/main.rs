//! GRIDLINE — Season-Aware Walk-Forward Backtester
//!
//! Entry point. Loads configuration, initialises structured logging,
//! generates a seeded synthetic league, and runs the full
//! split→fit→predict→bet→evaluate pipeline, writing JSON results.

use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use gridline::backtest::evaluation;
use gridline::backtest::runner::WalkForwardBacktester;
use gridline::backtest::tuning::CandidateSearch;
use gridline::config::AppConfig;
use gridline::data::synthetic::{self, SyntheticConfig};
use gridline::predictor::LinearPredictor;
use gridline::probability::CoverProbabilityModel;
use gridline::split::WindowPolicy;
use gridline::storage;
use gridline::strategy;

const BANNER: &str = r#"
  ____ ____  ___ ____  _     ___ _   _ _____
 / ___|  _ \|_ _|  _ \| |   |_ _| \ | | ____|
| |  _| |_) || || | | | |    | ||  \| |  _|
| |_| |  _ < | || |_| | |___ | || |\  | |___
 \____|_| \_\___|____/|_____|___|_| \_|_____|

  Season-Aware Walk-Forward Backtester
  v0.1.0
"#;

fn main() -> Result<()> {
    let cfg = AppConfig::load_or_default("config.toml")?;
    init_logging();

    println!("{BANNER}");
    info!(
        window_policy = %cfg.backtest.window_policy,
        window_seasons = cfg.backtest.window_seasons,
        betting_policy = %cfg.betting.policy,
        "GRIDLINE starting up"
    );

    // -- Inputs ------------------------------------------------------------

    info!("Generating synthetic league");
    let (x, y, mut odds) = synthetic::generate(&SyntheticConfig::default());
    info!(games = odds.len(), seasons = odds.seasons().len(), "League ready");

    let window = match cfg.backtest.window_policy.as_str() {
        "expanding" => WindowPolicy::Expanding {
            min_seasons: cfg.backtest.window_seasons,
        },
        "fixed" => WindowPolicy::Fixed {
            seasons: cfg.backtest.window_seasons,
        },
        other => bail!("unknown window policy: {other}"),
    };

    // -- Probability model -------------------------------------------------
    //
    // Calibrated once, from outcomes the sweep has already elapsed past
    // (the warm-up seasons); immutable and shared from then on.

    let seasons = odds.seasons();
    let warmup_cutoff = seasons
        .get(cfg.backtest.window_seasons.saturating_sub(1))
        .copied()
        .unwrap_or(u16::MAX);
    let historical_margins: Vec<f64> = odds
        .games()
        .iter()
        .filter(|g| g.season <= warmup_cutoff)
        .map(|g| g.outcome)
        .collect();
    let model = Arc::new(CoverProbabilityModel::from_history(
        &historical_margins,
        &cfg.calibration,
    )?);
    info!(
        margins = historical_margins.len(),
        lines = 2 * model.max_line() + 1,
        "Cover-probability table calibrated"
    );

    // -- Walk-forward sweep ------------------------------------------------

    let inner_window = cfg
        .backtest
        .window_seasons
        .saturating_sub(cfg.backtest.validation_seasons)
        .max(1);
    let search = CandidateSearch::new(
        vec![
            LinearPredictor::with_ridge(0.01),
            LinearPredictor::with_ridge(1.0),
            LinearPredictor::with_ridge(100.0),
        ],
        WindowPolicy::Expanding {
            min_seasons: inner_window,
        },
    );

    let mut backtester = WalkForwardBacktester::new(LinearPredictor::new(), window)
        .with_model_selection(Box::new(search));
    let run = backtester.run(&x, &y, &mut odds)?;
    info!(folds = run.folds, "Sweep finished");

    // -- Betting & evaluation ----------------------------------------------

    let policy = strategy::build_policy(&cfg.betting, Some(model))?;
    let bets = strategy::apply_bets(policy.as_ref(), &mut odds);

    let report = evaluation::evaluate(&odds);
    info!(
        bets,
        wins = report.wins,
        win_rate = format!("{:.1}%", report.win_rate * 100.0),
        net_pnl = %report.net_pnl,
        max_drawdown = %report.max_drawdown,
        sharpe = format!("{:.2}", report.sharpe),
        "Backtest evaluated"
    );
    if let Some(reg) = &report.regression {
        info!(
            r2 = format!("{:.3}", reg.r2),
            mse = format!("{:.1}", reg.mse),
            mae = format!("{:.1}", reg.mae),
            n = reg.n,
            "Prediction diagnostics"
        );
    }

    storage::save_odds_table(&odds, "gridline_odds.json")?;
    storage::save_report(&report, "gridline_report.json")?;
    info!("Results written to gridline_odds.json / gridline_report.json");

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
