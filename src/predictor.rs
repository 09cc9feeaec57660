//! Predictor capability.
//!
//! The walk-forward sweep treats the model as an opaque fit/predict pair;
//! anything satisfying `Predictor` can sit behind it. `LinearPredictor`
//! is the built-in reference model: least squares with an optional ridge
//! penalty, plus the per-feature contribution decomposition the
//! contribution table is built from.

use anyhow::{bail, Result};

// ---------------------------------------------------------------------------
// Capability trait
// ---------------------------------------------------------------------------

/// An opaque predictive model.
///
/// `fit` replaces any previously learned state; `predict` is only
/// meaningful after a successful fit. `contributions` optionally
/// decomposes each prediction into per-feature terms plus a trailing
/// bias term that together sum to the prediction.
#[cfg_attr(test, mockall::automock)]
pub trait Predictor {
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()>;

    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64>;

    fn contributions(&self, x: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
        let _ = x;
        None
    }
}

// ---------------------------------------------------------------------------
// Linear predictor
// ---------------------------------------------------------------------------

/// Ordinary least squares with an optional ridge penalty on the slopes.
#[derive(Debug, Clone, Default)]
pub struct LinearPredictor {
    /// L2 penalty applied to every coefficient except the intercept.
    ridge: f64,
    /// Learned slopes, one per feature.
    coefficients: Vec<f64>,
    intercept: f64,
}

impl LinearPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ridge(ridge: f64) -> Self {
        Self {
            ridge,
            ..Self::default()
        }
    }

    pub fn ridge(&self) -> f64 {
        self.ridge
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Predictor for LinearPredictor {
    /// Solve the (ridge-regularized) normal equations. The intercept is an
    /// unpenalized extra column.
    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<()> {
        if x.is_empty() {
            bail!("cannot fit on an empty training set");
        }
        if x.len() != y.len() {
            bail!("feature rows ({}) and targets ({}) differ", x.len(), y.len());
        }
        let width = x[0].len();
        if x.iter().any(|row| row.len() != width) {
            bail!("ragged feature rows");
        }

        // Augmented design: features plus intercept column.
        let dim = width + 1;
        let mut xtx = vec![vec![0.0f64; dim]; dim];
        let mut xty = vec![0.0f64; dim];
        for (row, &target) in x.iter().zip(y) {
            for i in 0..dim {
                let xi = if i < width { row[i] } else { 1.0 };
                xty[i] += xi * target;
                for j in i..dim {
                    let xj = if j < width { row[j] } else { 1.0 };
                    xtx[i][j] += xi * xj;
                }
            }
        }
        // Mirror the upper triangle and penalize the slopes.
        for i in 0..dim {
            for j in 0..i {
                xtx[i][j] = xtx[j][i];
            }
            if i < width {
                xtx[i][i] += self.ridge;
            }
        }

        let solution = solve(xtx, xty)?;
        self.intercept = solution[width];
        self.coefficients = solution;
        self.coefficients.truncate(width);
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Vec<f64> {
        x.iter()
            .map(|row| {
                self.intercept
                    + row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(v, c)| v * c)
                        .sum::<f64>()
            })
            .collect()
    }

    /// Per-feature terms plus the intercept as the bias column; the row
    /// sum reproduces the prediction exactly.
    fn contributions(&self, x: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
        Some(
            x.iter()
                .map(|row| {
                    let mut contribs: Vec<f64> = row
                        .iter()
                        .zip(&self.coefficients)
                        .map(|(v, c)| v * c)
                        .collect();
                    contribs.push(self.intercept);
                    contribs
                })
                .collect(),
        )
    }
}

/// Gaussian elimination with partial pivoting.
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| {
                a[i][col]
                    .abs()
                    .partial_cmp(&a[j][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if a[pivot_row][col].abs() < 1e-12 {
            bail!("singular normal equations (collinear or constant features)");
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut solution = vec![0.0f64; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in (row + 1)..n {
            acc -= a[row][col] * solution[col];
        }
        solution[row] = acc / a[row][row];
    }
    Ok(solution)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
