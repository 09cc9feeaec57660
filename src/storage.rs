//! Result export.
//!
//! Writes the augmented odds table and the performance report as JSON so
//! downstream notebooks can chart the run. Model artifacts themselves are
//! persisted upstream; only backtest outputs live here.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::backtest::evaluation::PerformanceReport;
use crate::types::OddsTable;

/// Save the settled odds table to a JSON file.
pub fn save_odds_table(odds: &OddsTable, path: &str) -> Result<()> {
    let json = serde_json::to_string_pretty(odds).context("Failed to serialise odds table")?;
    std::fs::write(path, &json).context(format!("Failed to write odds table to {path}"))?;
    debug!(path, games = odds.len(), "Odds table saved");
    Ok(())
}

/// Load an odds table previously saved with `save_odds_table`.
/// Returns None if the file doesn't exist.
pub fn load_odds_table(path: &str) -> Result<Option<OddsTable>> {
    if !Path::new(path).exists() {
        return Ok(None);
    }
    let json =
        std::fs::read_to_string(path).context(format!("Failed to read odds table from {path}"))?;
    let odds: OddsTable =
        serde_json::from_str(&json).context(format!("Failed to parse odds table from {path}"))?;
    Ok(Some(odds))
}

/// Save a performance report to a JSON file.
pub fn save_report(report: &PerformanceReport, path: &str) -> Result<()> {
    let json =
        serde_json::to_string_pretty(report).context("Failed to serialise performance report")?;
    std::fs::write(path, &json).context(format!("Failed to write report to {path}"))?;
    debug!(path, bets = report.num_bets, "Report saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameRecord;
    use rust_decimal_macros::dec;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("gridline_test_{name}_{}.json", std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_odds_table_round_trip() {
        let path = temp_path("odds");
        let mut table = OddsTable::new(vec![
            GameRecord::sample("a", 2019, 48.0),
            GameRecord::sample("b", 2020, 55.0),
        ]);
        table.set_pred(1, 53.5);
        table.set_unit_pnl(1, dec!(0.87));

        save_odds_table(&table, &path).unwrap();
        let loaded = load_odds_table(&path).unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.games()[1].pred, Some(53.5));
        assert_eq!(loaded.games()[1].unit_pnl, Some(dec!(0.87)));

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_missing_returns_none() {
        assert!(load_odds_table("definitely_not_here.json")
            .unwrap()
            .is_none());
    }
}
