//! Season-aware walk-forward splitting.
//!
//! Rolls a training window over whole seasons so that every test season is
//! strictly later than everything it was trained on. Example with a fixed
//! window of 5: train on 2018–2022, test on 2023; train on 2019–2023, test
//! on 2024. The expanding policy anchors the window at the first season
//! instead of rolling it forward.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::BacktestError;
use crate::types::GameRecord;

// ---------------------------------------------------------------------------
// Window policy
// ---------------------------------------------------------------------------

/// How the training window grows (or rolls) as the sweep advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowPolicy {
    /// Anchored at the first season: train on everything seen so far,
    /// after a warm-up of `min_seasons`.
    Expanding { min_seasons: usize },
    /// Rolling window of exactly `seasons` most recent seasons.
    Fixed { seasons: usize },
}

impl WindowPolicy {
    /// Seasons consumed before the first test season.
    pub fn window_size(&self) -> usize {
        match self {
            WindowPolicy::Expanding { min_seasons } => *min_seasons,
            WindowPolicy::Fixed { seasons } => *seasons,
        }
    }
}

// ---------------------------------------------------------------------------
// Splits
// ---------------------------------------------------------------------------

/// One train/test partition. Indices refer to rows of the odds table /
/// feature matrix the splitter was built from.
#[derive(Debug, Clone)]
pub struct Split {
    pub fold: usize,
    pub test_season: u16,
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Produces chronologically safe train/test partitions, one per eligible
/// season. The sequence is lazy and restartable — `splits()` hands out a
/// fresh iterator each call.
#[derive(Debug, Clone)]
pub struct SeasonSplitter {
    policy: WindowPolicy,
    /// Sorted unique seasons.
    unique_seasons: Vec<u16>,
    /// Row indices per unique season, ordered by (timestamp, index).
    season_indices: Vec<Vec<usize>>,
}

impl SeasonSplitter {
    /// Build from explicit (season, timestamp) row keys.
    pub fn new(keys: &[(u16, DateTime<Utc>)], policy: WindowPolicy) -> Self {
        let mut unique_seasons: Vec<u16> = keys.iter().map(|(s, _)| *s).collect();
        unique_seasons.sort_unstable();
        unique_seasons.dedup();

        let mut season_indices: Vec<Vec<usize>> = vec![Vec::new(); unique_seasons.len()];
        for (idx, (season, _)) in keys.iter().enumerate() {
            let pos = unique_seasons.binary_search(season).expect("season present");
            season_indices[pos].push(idx);
        }
        // Ties within a season break on timestamp, then index, for
        // deterministic fold contents.
        for indices in &mut season_indices {
            indices.sort_by_key(|&i| (keys[i].1, i));
        }

        Self {
            policy,
            unique_seasons,
            season_indices,
        }
    }

    /// Build from odds-table rows.
    pub fn from_games(games: &[GameRecord], policy: WindowPolicy) -> Self {
        let keys: Vec<(u16, DateTime<Utc>)> =
            games.iter().map(|g| (g.season, g.date)).collect();
        Self::new(&keys, policy)
    }

    pub fn policy(&self) -> WindowPolicy {
        self.policy
    }

    /// Number of folds the sweep will produce.
    pub fn n_splits(&self) -> usize {
        self.unique_seasons
            .len()
            .saturating_sub(self.policy.window_size())
    }

    /// Iterator over splits, or `NotEnoughData` when no fold would run.
    ///
    /// An empty sequence must never read as "zero folds succeeded".
    pub fn splits(&self) -> Result<SplitIter<'_>, BacktestError> {
        if self.n_splits() == 0 {
            return Err(BacktestError::NotEnoughData {
                seasons: self.unique_seasons.len(),
                required: self.policy.window_size(),
            });
        }
        Ok(SplitIter {
            splitter: self,
            position: self.policy.window_size(),
        })
    }
}

/// Lazy walk over the eligible seasons.
#[derive(Debug)]
pub struct SplitIter<'a> {
    splitter: &'a SeasonSplitter,
    position: usize,
}

impl Iterator for SplitIter<'_> {
    type Item = Split;

    fn next(&mut self) -> Option<Split> {
        let s = self.splitter;
        if self.position >= s.unique_seasons.len() {
            return None;
        }

        let i = self.position;
        let train_range = match s.policy {
            WindowPolicy::Expanding { .. } => 0..i,
            WindowPolicy::Fixed { seasons } => (i - seasons)..i,
        };

        let train: Vec<usize> = train_range
            .flat_map(|si| s.season_indices[si].iter().copied())
            .collect();
        let test = s.season_indices[i].clone();
        let test_season = s.unique_seasons[i];
        let fold = i - s.policy.window_size();

        debug!(
            fold,
            test_season,
            train_rows = train.len(),
            test_rows = test.len(),
            "Split produced"
        );

        self.position += 1;
        Some(Split {
            fold,
            test_season,
            train,
            test,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    /// `games_per_season` rows per season over `n_seasons` seasons
    /// starting at 2015, already in chronological order.
    fn make_keys(n_seasons: u16, games_per_season: usize) -> Vec<(u16, DateTime<Utc>)> {
        let mut keys = Vec::new();
        for s in 0..n_seasons {
            let season = 2015 + s;
            let opener = Utc.with_ymd_and_hms(season as i32, 9, 1, 18, 0, 0).unwrap();
            for g in 0..games_per_season {
                keys.push((season, opener + Duration::days(7 * g as i64)));
            }
        }
        keys
    }

    #[test]
    fn test_no_leakage() {
        let keys = make_keys(8, 4);
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 3 });
        for split in splitter.splits().unwrap() {
            let max_train_season = split.train.iter().map(|&i| keys[i].0).max().unwrap();
            assert!(
                max_train_season < split.test_season,
                "train season {max_train_season} not before test {}",
                split.test_season
            );
        }
    }

    #[test]
    fn test_disjoint_total_cover() {
        let keys = make_keys(8, 4);
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 3 });

        let mut seen = std::collections::HashSet::new();
        let mut test_seasons = Vec::new();
        for split in splitter.splits().unwrap() {
            test_seasons.push(split.test_season);
            for idx in split.test {
                assert!(seen.insert(idx), "row {idx} tested twice");
            }
        }
        // Every season beyond the warm-up appears as test exactly once.
        assert_eq!(test_seasons, vec![2018, 2019, 2020, 2021, 2022]);
        // And every game in those seasons is covered.
        let eligible = keys.iter().filter(|(s, _)| *s >= 2018).count();
        assert_eq!(seen.len(), eligible);
    }

    #[test]
    fn test_expanding_grows_fixed_rolls() {
        let keys = make_keys(7, 2);

        let expanding =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 3 });
        let sizes: Vec<usize> = expanding
            .splits()
            .unwrap()
            .map(|s| s.train.len())
            .collect();
        assert_eq!(sizes, vec![6, 8, 10, 12]);

        let fixed = SeasonSplitter::new(&keys, WindowPolicy::Fixed { seasons: 3 });
        let sizes: Vec<usize> = fixed.splits().unwrap().map(|s| s.train.len()).collect();
        assert_eq!(sizes, vec![6, 6, 6, 6]);

        // Fixed window drops the oldest season each fold.
        let second = fixed.splits().unwrap().nth(1).unwrap();
        let min_train_season = second.train.iter().map(|&i| keys[i].0).min().unwrap();
        assert_eq!(min_train_season, 2016);
    }

    #[test]
    fn test_not_enough_data() {
        let keys = make_keys(3, 2);
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 5 });
        assert_eq!(splitter.n_splits(), 0);
        match splitter.splits() {
            Err(BacktestError::NotEnoughData { seasons, required }) => {
                assert_eq!(seasons, 3);
                assert_eq!(required, 5);
            }
            other => panic!("expected NotEnoughData, got {other:?}"),
        }

        // Exactly window_size seasons is still not enough: nothing to test on.
        let keys = make_keys(5, 2);
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 5 });
        assert!(splitter.splits().is_err());
    }

    #[test]
    fn test_six_seasons_window_five_single_split() {
        let keys = make_keys(6, 3);
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 5 });
        let splits: Vec<Split> = splitter.splits().unwrap().collect();
        assert_eq!(splits.len(), 1);
        assert_eq!(splits[0].test_season, 2020);
        assert_eq!(splits[0].train.len(), 15);
        assert_eq!(splits[0].test.len(), 3);
    }

    #[test]
    fn test_restartable() {
        let keys = make_keys(6, 2);
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 4 });
        let first: Vec<u16> = splitter.splits().unwrap().map(|s| s.test_season).collect();
        let second: Vec<u16> = splitter.splits().unwrap().map(|s| s.test_season).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ties_broken_by_timestamp() {
        // Rows arrive out of chronological order within the season.
        let opener = Utc.with_ymd_and_hms(2020, 9, 1, 18, 0, 0).unwrap();
        let keys = vec![
            (2019, opener - Duration::days(365)),
            (2020, opener + Duration::days(14)),
            (2020, opener),
            (2020, opener + Duration::days(7)),
        ];
        let splitter =
            SeasonSplitter::new(&keys, WindowPolicy::Expanding { min_seasons: 1 });
        let split = splitter.splits().unwrap().next().unwrap();
        assert_eq!(split.test, vec![2, 3, 1]);
    }
}
