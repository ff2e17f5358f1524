// src/mc/path_sim.rs
//! Blocked HJM Forward-Curve Path Simulation
//!
//! # Discretisation
//!
//! The forward curve is held on the grid `f(tⱼ, tⱼ + l·Δt)`, i.e. indexed by
//! time step `j` and time-to-maturity `l`. One Euler step moves every point one
//! bucket closer to maturity and applies drift and shocks:
//! ```text
//! f(j, l) = f(j-1, l+1) + D[l] Δt + √Δt Σₖ v[k][l] Z[k][j]
//! ```
//! The short rate on the path is `r(j) = f(j, 0)`; discount factors are
//! ```text
//! P(0) = 1,   P(i) = Πₘ<ᵢ exp(-r(m) Δt)
//! ```
//!
//! # Valuation at Exercise
//!
//! At the exercise index `s` the curve `f(s, ·)` is turned into swap discount
//! factors the same way, the fixed leg is valued against them, and the exercise
//! value is discounted back to today with `P(s)`.
//!
//! # Memory Layout
//!
//! Trials of a block are innermost in every buffer (`row × block_size + trial`),
//! so each inner loop runs over a contiguous, independent lane of trials.

use crate::error::{SwaptionError, SwaptionResult};
use crate::mc::accumulator::PartialSums;
use crate::mc::payoffs::{fixed_leg_value, SwaptionKind};
use crate::models::curve::CurveModel;
use crate::models::swaption::SwaptionParams;
use crate::rng::PoolShape;
use ndarray::Array2;

fn zeroed(buffer: &str, len: usize) -> SwaptionResult<Vec<f64>> {
    let mut v: Vec<f64> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| SwaptionError::AllocationFailure {
            buffer: buffer.to_string(),
            elements: len,
        })?;
    v.resize(len, 0.0);
    Ok(v)
}

/// Scratch state for one block of trials.
///
/// Owned by a single worker and reused block after block; buffers are
/// addressed by index only and dropped with the arena.
#[derive(Debug)]
pub struct BlockArena {
    steps: usize,
    swap_len: usize,
    block_size: usize,
    /// `steps × steps × block_size`, `(time × steps + maturity) × block_size + trial`
    hjm_path: Vec<f64>,
    shocks: Vec<f64>,
    discount_rates: Vec<f64>,
    payoff_discount: Vec<f64>,
    swap_rates: Vec<f64>,
    swap_discount: Vec<f64>,
    payoffs: Vec<f64>,
}

impl BlockArena {
    pub fn new(steps: usize, swap_len: usize, block_size: usize) -> SwaptionResult<Self> {
        let path_len = steps
            .checked_mul(steps)
            .and_then(|n| n.checked_mul(block_size))
            .ok_or_else(|| SwaptionError::AllocationFailure {
                buffer: "HJM path".to_string(),
                elements: usize::MAX,
            })?;
        Ok(Self {
            steps,
            swap_len,
            block_size,
            hjm_path: zeroed("HJM path", path_len)?,
            shocks: zeroed("shock", block_size)?,
            discount_rates: zeroed("discount rate path", steps * block_size)?,
            payoff_discount: zeroed("payoff discount factors", steps * block_size)?,
            swap_rates: zeroed("swap rate path", swap_len * block_size)?,
            swap_discount: zeroed("swap discount factors", swap_len * block_size)?,
            payoffs: zeroed("payoffs", block_size)?,
        })
    }

    /// Arena sized for the given model and block size.
    pub fn for_model(model: &CurveModel, block_size: usize) -> SwaptionResult<Self> {
        Self::new(model.steps(), model.schedule.vector_length, block_size)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Discounted payoffs of the last simulated block, one per trial.
    pub fn payoffs(&self) -> &[f64] {
        &self.payoffs
    }

    /// Simulated forward rate at `(time, maturity)` for `trial` of the last block.
    pub fn forward_rate(&self, time: usize, maturity: usize, trial: usize) -> f64 {
        self.hjm_path[(time * self.steps + maturity) * self.block_size + trial]
    }

    /// Path discount factor to grid point `time` for `trial` of the last block.
    pub fn discount_factor(&self, time: usize, trial: usize) -> f64 {
        self.payoff_discount[time * self.block_size + trial]
    }

    fn fits(&self, model: &CurveModel) -> bool {
        self.steps == model.steps() && self.swap_len == model.schedule.vector_length
    }
}

/// Discount factors from a point-major rate path: `P(0) = 1`, `P(i) = P(i-1) e^{-r(i-1) Δt}`.
pub fn discount_factors(rates: &[f64], out: &mut [f64], points: usize, block_size: usize, dt: f64) {
    if points == 0 {
        return;
    }
    out[..block_size].iter_mut().for_each(|p| *p = 1.0);
    for i in 1..points {
        let (done, rest) = out.split_at_mut(i * block_size);
        let prev = &done[(i - 1) * block_size..];
        let cur = &mut rest[..block_size];
        let r = &rates[(i - 1) * block_size..i * block_size];
        for b in 0..block_size {
            cur[b] = prev[b] * (-r[b] * dt).exp();
        }
    }
}

/// Simulates blocks of trials for one swaption.
#[derive(Debug, Clone, Copy)]
pub struct PathSimulator<'a> {
    model: &'a CurveModel,
    loadings: &'a Array2<f64>,
    kind: SwaptionKind,
    shape: PoolShape,
}

impl<'a> PathSimulator<'a> {
    /// # Errors
    ///
    /// `InvalidConfiguration` if the swaption needs more factors or steps than
    /// the pool provides per block.
    pub fn new(
        params: &'a SwaptionParams,
        model: &'a CurveModel,
        shape: PoolShape,
    ) -> SwaptionResult<Self> {
        let steps = model.steps();
        let factors = params.factor_loadings.nrows();
        if factors > shape.factors || steps > shape.steps {
            return Err(SwaptionError::InvalidConfiguration {
                field: "random pool".to_string(),
                reason: format!(
                    "swaption {} needs {} factors × {} steps, pool provides {} × {}",
                    params.id, factors, steps, shape.factors, shape.steps
                ),
            });
        }
        if params.factor_loadings.ncols() + 1 != steps {
            return Err(SwaptionError::InvalidConfiguration {
                field: "factor_loadings".to_string(),
                reason: format!(
                    "{} columns do not match a {}-point curve model",
                    params.factor_loadings.ncols(),
                    steps
                ),
            });
        }
        Ok(Self {
            model,
            loadings: &params.factor_loadings,
            kind: params.kind,
            shape,
        })
    }

    /// Simulate one block and accumulate the first `trials` payoffs.
    ///
    /// `draws` is the block's slice of the random pool. All `block_size` paths
    /// are simulated; only the first `trials` enter `sums`, which lets the last
    /// block of a run be partial.
    pub fn simulate_block(
        &self,
        draws: &[f64],
        arena: &mut BlockArena,
        trials: usize,
        sums: &mut PartialSums,
    ) -> SwaptionResult<()> {
        let b_size = self.shape.block_size;
        let expected = self.shape.block_stride()?;
        if draws.len() != expected {
            return Err(SwaptionError::MonteCarloError {
                trials,
                reason: format!("block has {} draws, expected {}", draws.len(), expected),
            });
        }
        if arena.block_size != b_size || !arena.fits(self.model) {
            return Err(SwaptionError::InvalidConfiguration {
                field: "arena".to_string(),
                reason: "scratch arena does not match the swaption or block size".to_string(),
            });
        }
        if trials > b_size {
            return Err(SwaptionError::MonteCarloError {
                trials,
                reason: format!("block holds only {} trials", b_size),
            });
        }

        self.evolve_forward_curve(draws, arena);
        self.value_at_exercise(arena);

        for &payoff in &arena.payoffs[..trials] {
            sums.add(payoff);
        }
        Ok(())
    }

    fn evolve_forward_curve(&self, draws: &[f64], arena: &mut BlockArena) {
        let n = self.model.steps();
        let b_size = self.shape.block_size;
        let dt = self.model.dt;
        let sqrt_dt = self.model.sqrt_dt;
        let factors = self.loadings.nrows();

        for (l, &f) in self.model.forward.iter().enumerate() {
            arena.hjm_path[l * b_size..(l + 1) * b_size]
                .iter_mut()
                .for_each(|x| *x = f);
        }

        for j in 1..n {
            let (prev_rows, cur_rows) = arena.hjm_path.split_at_mut(j * n * b_size);
            let prev = &prev_rows[(j - 1) * n * b_size..];
            for l in 0..n - j {
                let shocks = &mut arena.shocks;
                shocks.iter_mut().for_each(|s| *s = 0.0);
                for k in 0..factors {
                    let v = self.loadings[[k, l]];
                    let start = self.shape.offset_in_block(k, j, 0);
                    let z = &draws[start..start + b_size];
                    for b in 0..b_size {
                        shocks[b] += v * z[b];
                    }
                }

                let drift = self.model.total_drift[l] * dt;
                let src = &prev[(l + 1) * b_size..(l + 2) * b_size];
                let dst = &mut cur_rows[l * b_size..(l + 1) * b_size];
                for b in 0..b_size {
                    dst[b] = src[b] + drift + sqrt_dt * shocks[b];
                }
            }
        }
    }

    fn value_at_exercise(&self, arena: &mut BlockArena) {
        let n = self.model.steps();
        let b_size = self.shape.block_size;
        let schedule = self.model.schedule;
        let swap_len = schedule.vector_length;

        for i in 0..n {
            let row = (i * n) * b_size;
            arena.discount_rates[i * b_size..(i + 1) * b_size]
                .copy_from_slice(&arena.hjm_path[row..row + b_size]);
        }
        discount_factors(
            &arena.discount_rates,
            &mut arena.payoff_discount,
            n,
            b_size,
            self.model.dt,
        );

        let exercise_row = schedule.start_index * n * b_size;
        arena.swap_rates.copy_from_slice(
            &arena.hjm_path[exercise_row..exercise_row + swap_len * b_size],
        );
        discount_factors(
            &arena.swap_rates,
            &mut arena.swap_discount,
            swap_len,
            b_size,
            self.model.swap_vector_years / swap_len as f64,
        );

        let exercise_discount =
            &arena.payoff_discount[schedule.start_index * b_size..(schedule.start_index + 1) * b_size];
        for b in 0..b_size {
            let fixed_leg = fixed_leg_value(&self.model.swap_payoffs, &arena.swap_discount, b_size, b);
            arena.payoffs[b] = self.kind.exercise_value(fixed_leg) * exercise_discount[b];
        }
    }
}
