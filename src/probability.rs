//! Cover-probability model.
//!
//! Converts a continuous point prediction of a scoring margin into the
//! probability that the realized outcome beats an arbitrary market line.
//! Real margins are not Gaussian — scoring increments pile mass on common
//! numbers — so a naive CDF misprices edges. The model reweights a
//! reference Gaussian by the empirical margin frequency, then conditions
//! on a grid of assumed true lines.
//!
//! Built once from historical completed games and immutable afterwards;
//! safe to share read-only across any number of bet evaluations.

use std::f64::consts::PI;

use tracing::debug;

use crate::config::CalibrationConfig;
use crate::error::BacktestError;

// ---------------------------------------------------------------------------
// Model
// ---------------------------------------------------------------------------

/// Conditional probability table over (margin, assumed line).
///
/// Rows span integer margins in `[-max_margin, max_margin]`; columns span
/// integer assumed lines in `[-max_line, max_line]`. Each column holds the
/// conditional mass of the margin given that column's line, normalized to
/// sum 1, alongside its running cumulative sum for threshold queries.
#[derive(Debug, Clone)]
pub struct CoverProbabilityModel {
    max_margin: i32,
    max_line: i32,
    /// `cond[c][r]`: P(margin = -max_margin + r | line = -max_line + c).
    cond: Vec<Vec<f64>>,
    /// `cum[c][r]`: P(margin ≤ -max_margin + r | line = -max_line + c).
    cum: Vec<Vec<f64>>,
}

impl CoverProbabilityModel {
    /// Build the table from historical realized margins.
    ///
    /// Margins are rounded to integers and clamped into the support; the
    /// empirical mass is divided by a reference Gaussian (mean 0,
    /// `sigma_hist`) to form the reweighting multiplier, which then scales
    /// a tighter Gaussian (`sigma_cond`) centred on each assumed line.
    pub fn from_history(
        margins: &[f64],
        cfg: &CalibrationConfig,
    ) -> Result<Self, BacktestError> {
        if cfg.sigma_hist <= 0.0 || cfg.sigma_cond <= 0.0 {
            return Err(BacktestError::Calibration(format!(
                "standard deviations must be positive (sigma_hist={}, sigma_cond={})",
                cfg.sigma_hist, cfg.sigma_cond
            )));
        }
        if cfg.max_margin <= 0 || cfg.max_line <= 0 {
            return Err(BacktestError::Calibration(format!(
                "support bounds must be positive (max_margin={}, max_line={})",
                cfg.max_margin, cfg.max_line
            )));
        }

        let m = cfg.max_margin;
        let support = (2 * m + 1) as usize;

        let finite: Vec<f64> = margins.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Err(BacktestError::Calibration(
                "no historical margins to calibrate from".to_string(),
            ));
        }

        // Empirical mass over the integer support.
        let mut counts = vec![0u64; support];
        for &margin in &finite {
            let rounded = (margin.round() as i32).clamp(-m, m);
            counts[(rounded + m) as usize] += 1;
        }
        let n = finite.len() as f64;

        // Reweighting multiplier: empirical mass over reference Gaussian mass.
        let mut mult = vec![0.0f64; support];
        for r in 0..support {
            let margin = (r as i32 - m) as f64;
            let empirical = counts[r] as f64 / n;
            let gauss = normal_pdf(margin, 0.0, cfg.sigma_hist);
            if gauss <= 0.0 {
                if empirical > 0.0 {
                    return Err(BacktestError::Calibration(format!(
                        "reference mass underflows at margin {margin} with sigma_hist {}",
                        cfg.sigma_hist
                    )));
                }
                continue;
            }
            mult[r] = empirical / gauss;
        }

        // One conditional column per assumed line, normalized to sum 1.
        let l = cfg.max_line;
        let n_cols = (2 * l + 1) as usize;
        let mut cond = Vec::with_capacity(n_cols);
        let mut cum = Vec::with_capacity(n_cols);
        for c in 0..n_cols {
            let line = (c as i32 - l) as f64;
            let mut column: Vec<f64> = (0..support)
                .map(|r| {
                    let margin = (r as i32 - m) as f64;
                    mult[r] * normal_pdf(margin, line, cfg.sigma_cond)
                })
                .collect();

            let total: f64 = column.iter().sum();
            if !total.is_finite() || total <= 0.0 {
                return Err(BacktestError::Calibration(format!(
                    "zero conditional mass for assumed line {line}"
                )));
            }
            for v in &mut column {
                *v /= total;
            }

            let mut running = 0.0;
            let cumulative: Vec<f64> = column
                .iter()
                .map(|v| {
                    running += v;
                    running
                })
                .collect();

            cond.push(column);
            cum.push(cumulative);
        }

        debug!(
            margins = finite.len(),
            support,
            lines = n_cols,
            "Cover-probability table calibrated"
        );

        Ok(Self {
            max_margin: m,
            max_line: l,
            cond,
            cum,
        })
    }

    /// Probability that the realized margin strictly beats `line`, given
    /// the model's point `prediction`.
    ///
    /// Both arguments are arbitrary reals: the prediction is clipped to the
    /// line grid and both are resolved by linear interpolation between
    /// their neighbouring integers (bilinear over the four corners).
    /// Missing inputs yield `None` — callers read that as "no bet".
    pub fn cover_probability(&self, prediction: f64, line: f64) -> Option<f64> {
        if !prediction.is_finite() || !line.is_finite() {
            return None;
        }

        let l = self.max_line as f64;
        let clipped = prediction.clamp(-l, l);
        let col_lo = clipped.floor();
        let w_hi = clipped - col_lo;

        let t_lo = line.floor();
        let v_hi = line - t_lo;

        let mut prob = 0.0;
        for (col, col_w) in [(col_lo, 1.0 - w_hi), (col_lo + 1.0, w_hi)] {
            if col_w == 0.0 {
                continue;
            }
            let column = &self.cum[(col as i32 + self.max_line) as usize];
            for (threshold, t_w) in [(t_lo, 1.0 - v_hi), (t_lo + 1.0, v_hi)] {
                if t_w == 0.0 {
                    continue;
                }
                prob += col_w * t_w * (1.0 - cum_leq(column, threshold as i32, self.max_margin));
            }
        }

        Some(prob)
    }

    /// Total mass of the conditional column for an integer assumed line.
    pub fn column_mass(&self, line: i32) -> f64 {
        self.cond[(line + self.max_line) as usize].iter().sum()
    }

    pub fn max_line(&self) -> i32 {
        self.max_line
    }

    pub fn max_margin(&self) -> i32 {
        self.max_margin
    }
}

/// Cumulative mass at integer threshold, clamping outside the support.
fn cum_leq(cumulative: &[f64], threshold: i32, max_margin: i32) -> f64 {
    if threshold < -max_margin {
        0.0
    } else if threshold >= max_margin {
        1.0
    } else {
        cumulative[(threshold + max_margin) as usize]
    }
}

fn normal_pdf(x: f64, mean: f64, sd: f64) -> f64 {
    let z = (x - mean) / sd;
    (-0.5 * z * z).exp() / (sd * (2.0 * PI).sqrt())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
