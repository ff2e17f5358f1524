// src/models/swaption.rs
//! Swaption Instrument Parameters
//!
//! A European swaption on a fixed-for-floating swap, described on a uniform
//! time grid of `steps` periods spanning `years`:
//! - exercise at `maturity` years
//! - underlying swap of `tenor` years paying every `payment_interval` years
//! - fixed rate `strike`, quoted with `compounding` periods per year
//!   (0 means continuous compounding)
//!
//! The market state is the per-period yield curve (length `steps`) and the
//! factor-loading matrix (`factors × (steps - 1)`), one volatility curve per
//! HJM risk factor.

use crate::error::{validation::*, SwaptionError, SwaptionResult};
use crate::mc::payoffs::SwaptionKind;
use ndarray::{arr2, Array2};

/// Time-grid size of the reference batch.
pub const REFERENCE_STEPS: usize = 11;
/// Factor count of the reference batch.
pub const REFERENCE_FACTORS: usize = 3;
/// Horizon of the reference batch, in years.
pub const REFERENCE_YEARS: f64 = 5.5;

/// Immutable per-instrument inputs for one swaption.
#[derive(Debug, Clone, PartialEq)]
pub struct SwaptionParams {
    pub id: usize,
    pub strike: f64,
    pub compounding: f64,
    pub maturity: f64,
    pub tenor: f64,
    pub payment_interval: f64,
    pub kind: SwaptionKind,
    pub factors: usize,
    pub steps: usize,
    pub years: f64,
    pub yield_curve: Vec<f64>,
    pub factor_loadings: Array2<f64>,
}

impl SwaptionParams {
    /// Validate shapes and value ranges
    pub fn validate(&self) -> SwaptionResult<()> {
        if self.steps < 2 {
            return Err(SwaptionError::InvalidConfiguration {
                field: "steps".to_string(),
                reason: format!("time grid needs at least 2 points (got {})", self.steps),
            });
        }
        validate_at_least_one("factors", self.factors)?;

        validate_positive("years", self.years)?;
        validate_finite("years", self.years)?;
        validate_finite("strike", self.strike)?;
        validate_non_negative("compounding", self.compounding)?;
        validate_finite("compounding", self.compounding)?;
        validate_non_negative("maturity", self.maturity)?;
        validate_finite("maturity", self.maturity)?;
        validate_positive("tenor", self.tenor)?;
        validate_finite("tenor", self.tenor)?;
        validate_positive("payment_interval", self.payment_interval)?;
        validate_finite("payment_interval", self.payment_interval)?;

        if self.compounding > 0.0 && 1.0 + self.strike * self.compounding <= 0.0 {
            return Err(SwaptionError::InvalidParameters {
                parameter: "strike".to_string(),
                value: self.strike,
                constraint: format!(
                    "1 + strike × compounding must be positive for compounding {}",
                    self.compounding
                ),
            });
        }

        if self.yield_curve.len() != self.steps {
            return Err(SwaptionError::InvalidConfiguration {
                field: "yield_curve".to_string(),
                reason: format!(
                    "expected {} points, got {}",
                    self.steps,
                    self.yield_curve.len()
                ),
            });
        }
        validate_all_finite("yield_curve", &self.yield_curve)?;

        let expected = (self.factors, self.steps - 1);
        if self.factor_loadings.dim() != expected {
            return Err(SwaptionError::InvalidConfiguration {
                field: "factor_loadings".to_string(),
                reason: format!(
                    "expected {}×{} matrix, got {}×{}",
                    expected.0,
                    expected.1,
                    self.factor_loadings.nrows(),
                    self.factor_loadings.ncols()
                ),
            });
        }
        validate_all_finite("factor_loadings", self.factor_loadings.iter())?;

        Ok(())
    }

    /// Length of one time step in years.
    pub fn dt(&self) -> f64 {
        self.years / self.steps as f64
    }

    /// Swaption from the reference batch with the given strike.
    pub fn reference(id: usize, strike: f64) -> Self {
        SwaptionParams {
            id,
            strike,
            compounding: 0.0,
            maturity: 1.0,
            tenor: 2.0,
            payment_interval: 1.0,
            kind: SwaptionKind::Receiver,
            factors: REFERENCE_FACTORS,
            steps: REFERENCE_STEPS,
            years: REFERENCE_YEARS,
            yield_curve: reference_yield_curve(REFERENCE_STEPS),
            factor_loadings: reference_factor_loadings(),
        }
    }
}

/// Yield curve starting at 10% and rising 50bp per period.
pub fn reference_yield_curve(steps: usize) -> Vec<f64> {
    let mut curve = Vec::with_capacity(steps);
    let mut y = 0.1;
    for _ in 0..steps {
        curve.push(y);
        y += 0.005;
    }
    curve
}

/// Three-factor loadings: a parallel level, a decaying slope, a twist.
pub fn reference_factor_loadings() -> Array2<f64> {
    arr2(&[
        [0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01, 0.01],
        [
            0.009048, 0.008187, 0.007408, 0.006703, 0.006065, 0.005488, 0.004966, 0.004493,
            0.004066, 0.003679,
        ],
        [
            0.001000, 0.000750, 0.000500, 0.000250, 0.000000, -0.000250, -0.000500, -0.000750,
            -0.001000, -0.001250,
        ],
    ])
}

/// `count` reference swaptions with strikes `i / count`.
pub fn reference_batch(count: usize) -> Vec<SwaptionParams> {
    (0..count)
        .map(|i| SwaptionParams::reference(i, i as f64 / count as f64))
        .collect()
}
