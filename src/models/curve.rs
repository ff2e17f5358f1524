// src/models/curve.rs
//! Static HJM Curve Model for One Swaption
//!
//! # Mathematical Framework
//!
//! Under HJM the instantaneous forward curve evolves as
//! ```text
//! df(t,T) = α(t,T) dt + Σₖ σₖ(t,T) dWₖ(t)
//! ```
//! and absence of arbitrage pins the drift to the volatilities:
//! ```text
//! α(t,T) = Σₖ σₖ(t,T) ∫ₜᵀ σₖ(t,s) ds
//! ```
//!
//! On a uniform grid of step Δt the integrated drift per maturity bucket is
//! built recursively, per factor `k`:
//! ```text
//! d[k][0] = ½ Δt v[k][0]²
//! d[k][m] = -Σ_{l<m} d[k][l] + ½ Δt (Σ_{l≤m} v[k][l])²
//! ```
//! so that `Σ_{l≤m} d[k][l] = ½ Δt (Σ_{l≤m} v[k][l])²`. The simulator only needs
//! the factor total `D[m] = Σₖ d[k][m]`.
//!
//! Everything here depends only on the swaption's inputs, never on a path, so it
//! is computed once per swaption and shared read-only by every trial.

use crate::error::{validation::*, SwaptionError, SwaptionResult};
use crate::models::swaption::SwaptionParams;
use ndarray::Array2;

/// Integer positions of the underlying swap on the time grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapSchedule {
    /// Grid index of the exercise date.
    pub start_index: usize,
    /// Number of grid points from exercise to the end of the grid.
    pub vector_length: usize,
    /// Number of grid points spanned by the swap tenor.
    pub time_points: usize,
    /// Grid points between two payments.
    pub freq_ratio: usize,
}

/// Per-swaption quantities that do not depend on the simulated path.
#[derive(Debug, Clone)]
pub struct CurveModel {
    pub dt: f64,
    pub sqrt_dt: f64,
    /// Strike restated under continuous compounding.
    pub strike_continuous: f64,
    /// Initial forward curve, one rate per grid point.
    pub forward: Vec<f64>,
    /// Per-factor drift increments, `factors × (steps - 1)`.
    pub factor_drifts: Array2<f64>,
    /// Drift correction summed over factors, length `steps - 1`.
    pub total_drift: Vec<f64>,
    /// Cash flows of the fixed leg per unit notional, length `schedule.vector_length`.
    pub swap_payoffs: Vec<f64>,
    pub schedule: SwapSchedule,
    /// Span of the swap discounting vector in years.
    pub swap_vector_years: f64,
}

impl CurveModel {
    /// Derive the curve model of one swaption.
    ///
    /// # Errors
    ///
    /// - `InvalidParameters` / `InvalidConfiguration` if the swaption does not validate
    ///   or the swap does not fit on the grid
    /// - `NonIntegralDiscretization` if maturity, tenor or payment interval is not a
    ///   whole number of time steps
    pub fn build(params: &SwaptionParams) -> SwaptionResult<Self> {
        params.validate()?;

        let n = params.steps;
        let dt = params.dt();
        let sqrt_dt = dt.sqrt();

        let freq_ratio = whole_steps("payment_interval", params.payment_interval, dt)?;
        let start_index = whole_steps("maturity", params.maturity, dt)?;
        let time_points = whole_steps("tenor", params.tenor, dt)?;
        validate_at_least_one("payment_interval steps", freq_ratio)?;

        if start_index >= n {
            return Err(SwaptionError::InvalidConfiguration {
                field: "maturity".to_string(),
                reason: format!(
                    "exercise falls on grid point {} but the grid ends at {}",
                    start_index,
                    n - 1
                ),
            });
        }
        let vector_length = n - start_index;
        if time_points >= vector_length {
            return Err(SwaptionError::InvalidConfiguration {
                field: "tenor".to_string(),
                reason: format!(
                    "swap needs {} grid points after exercise but only {} remain",
                    time_points,
                    vector_length - 1
                ),
            });
        }

        let schedule = SwapSchedule {
            start_index,
            vector_length,
            time_points,
            freq_ratio,
        };

        let strike_continuous = continuous_strike(params.strike, params.compounding);
        let swap_payoffs = swap_payoffs(
            &schedule,
            strike_continuous,
            params.payment_interval,
        );
        let forward = yield_to_forward(&params.yield_curve);
        let factor_drifts = factor_drifts(&params.factor_loadings, dt);
        let total_drift = factor_drifts
            .columns()
            .into_iter()
            .map(|col| col.sum())
            .collect();

        tracing::debug!(
            swaption = params.id,
            dt,
            swap_start = start_index,
            swap_len = vector_length,
            freq_ratio,
            "built curve model"
        );

        Ok(CurveModel {
            dt,
            sqrt_dt,
            strike_continuous,
            forward,
            factor_drifts,
            total_drift,
            swap_payoffs,
            schedule,
            swap_vector_years: vector_length as f64 * dt,
        })
    }

    /// Grid size of the model.
    pub fn steps(&self) -> usize {
        self.forward.len()
    }
}

/// Strike under continuous compounding; `compounding == 0` means already continuous.
pub fn continuous_strike(strike: f64, compounding: f64) -> f64 {
    if compounding == 0.0 {
        strike
    } else {
        (1.0 / compounding) * (1.0 + strike * compounding).ln()
    }
}

/// Fixed-leg cash flows on the swap grid.
///
/// Coupon `e^{K·Δp} - 1` at every payment date, coupon plus principal `e^{K·Δp}`
/// at the last one, zero elsewhere.
pub fn swap_payoffs(schedule: &SwapSchedule, strike_continuous: f64, payment_interval: f64) -> Vec<f64> {
    let mut payoffs = vec![0.0; schedule.vector_length];
    let gross = (strike_continuous * payment_interval).exp();
    let mut j = schedule.freq_ratio;
    while j <= schedule.time_points {
        payoffs[j] = if j == schedule.time_points {
            gross
        } else {
            gross - 1.0
        };
        j += schedule.freq_ratio;
    }
    payoffs
}

/// Forward rates implied by per-period average yields: `f[j] = (j+1) y[j] - j y[j-1]`.
pub fn yield_to_forward(yields: &[f64]) -> Vec<f64> {
    let mut forward = Vec::with_capacity(yields.len());
    if let Some(&first) = yields.first() {
        forward.push(first);
    }
    for j in 1..yields.len() {
        forward.push((j + 1) as f64 * yields[j] - j as f64 * yields[j - 1]);
    }
    forward
}

/// Risk-neutral drift increments per factor and maturity bucket.
pub fn factor_drifts(loadings: &Array2<f64>, dt: f64) -> Array2<f64> {
    let (factors, buckets) = loadings.dim();
    let mut drifts = Array2::<f64>::zeros((factors, buckets));
    for k in 0..factors {
        let mut cumulative_drift = 0.0;
        let mut cumulative_vol = 0.0;
        for m in 0..buckets {
            cumulative_vol += loadings[[k, m]];
            let d = 0.5 * dt * cumulative_vol * cumulative_vol - cumulative_drift;
            drifts[[k, m]] = d;
            cumulative_drift += d;
        }
    }
    drifts
}
