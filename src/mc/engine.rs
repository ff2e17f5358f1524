// src/mc/engine.rs
//! Run Driver for Batched Swaption Pricing
//!
//! A run prices every swaption of a batch against one shared pool of normal
//! increments. Trials are grouped into blocks of `block_size`; the blocks of
//! each swaption are split into `trial_partitions` contiguous ranges, and each
//! (swaption, range) pair becomes an independent work item.
//!
//! ```text
//! num_blocks        = ⌈num_trials / block_size⌉
//! trials_in_block b = min(block_size, num_trials - b · block_size)
//! ```
//!
//! Partial sums are reduced per swaption in partition order once every item
//! has finished, so a fixed seed, block size and partition count give the same
//! prices for any worker count or executor backend.

use crate::error::{validation::*, SwaptionError, SwaptionResult};
use crate::mc::accumulator::PartialSums;
use crate::mc::aggregator::{aggregate, SwaptionPrice};
use crate::mc::executor::{Executor, ExecutorKind, WorkItem};
use crate::mc::path_sim::{BlockArena, PathSimulator};
use crate::models::curve::CurveModel;
use crate::models::swaption::SwaptionParams;
use crate::rng::{even_ranges, NormalGenerator, PoolShape, RandomPool};

#[derive(Debug, Clone, PartialEq)]
pub struct PricingConfig {
    /// Trials per swaption.
    pub num_trials: usize,
    pub block_size: usize,
    /// Worker threads for pool generation and the thread-pool executor.
    pub workers: usize,
    /// Block ranges per swaption; fixes the reduction order.
    pub trial_partitions: usize,
    pub seed: u64,
    pub generator: NormalGenerator,
    pub executor: ExecutorKind,
}

impl PricingConfig {
    /// Validate the run configuration
    pub fn validate(&self) -> SwaptionResult<()> {
        validate_trials(self.num_trials)?;
        validate_at_least_one("block_size", self.block_size)?;
        validate_workers(self.workers)?;
        validate_at_least_one("trial_partitions", self.trial_partitions)?;
        Ok(())
    }

    /// `⌈num_trials / block_size⌉`, without overflow near `usize::MAX`.
    pub fn num_blocks(&self) -> usize {
        let block = self.block_size.max(1);
        self.num_trials / block + usize::from(self.num_trials % block != 0)
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        PricingConfig {
            num_trials: 102_400,
            block_size: 16,
            workers: num_cpus::get().clamp(1, MAX_WORKERS),
            trial_partitions: 64,
            seed: 100,
            generator: NormalGenerator::Counter,
            executor: ExecutorKind::ThreadPool,
        }
    }
}

/// Everything a work item reads: configuration, swaptions, their curve
/// models and the random pool. Immutable once built.
#[derive(Debug)]
pub struct RunContext {
    config: PricingConfig,
    swaptions: Vec<SwaptionParams>,
    models: Vec<CurveModel>,
    pool: RandomPool,
}

impl RunContext {
    /// Validate inputs, build one curve model per swaption and generate the pool.
    ///
    /// # Errors
    ///
    /// - `InvalidConfiguration` for an empty batch or invalid config
    /// - any error from swaption validation or curve construction
    /// - `AllocationFailure` if the pool cannot be allocated
    pub fn new(config: PricingConfig, swaptions: Vec<SwaptionParams>) -> SwaptionResult<Self> {
        config.validate()?;
        if swaptions.is_empty() {
            return Err(SwaptionError::InvalidConfiguration {
                field: "swaptions".to_string(),
                reason: "batch is empty".to_string(),
            });
        }

        let models = swaptions
            .iter()
            .map(CurveModel::build)
            .collect::<SwaptionResult<Vec<_>>>()?;

        let shape = PoolShape {
            factors: swaptions.iter().map(|s| s.factors).max().unwrap_or(0),
            steps: swaptions.iter().map(|s| s.steps).max().unwrap_or(0),
            block_size: config.block_size,
            num_blocks: config.num_blocks(),
        };
        let pool = RandomPool::generate(shape, config.seed, config.generator, config.workers)?;

        Ok(Self {
            config,
            swaptions,
            models,
            pool,
        })
    }

    /// Work items in canonical order: swaption-major, partition ascending.
    pub fn work_items(&self) -> Vec<WorkItem> {
        let ranges = even_ranges(self.config.num_blocks(), self.config.trial_partitions);
        (0..self.swaptions.len())
            .flat_map(|swaption| {
                ranges
                    .iter()
                    .filter(|r| !r.is_empty())
                    .enumerate()
                    .map(move |(partition, blocks)| WorkItem {
                        swaption,
                        partition,
                        blocks: blocks.clone(),
                    })
            })
            .collect()
    }

    /// Trials that count towards the result in block `block`.
    pub fn trials_in_block(&self, block: usize) -> usize {
        let start = block.saturating_mul(self.config.block_size);
        self.config
            .num_trials
            .saturating_sub(start)
            .min(self.config.block_size)
    }

    /// Price every swaption with the given executor.
    pub fn price_with(&self, executor: &dyn Executor) -> SwaptionResult<Vec<SwaptionPrice>> {
        let items = self.work_items();
        tracing::info!(
            swaptions = self.swaptions.len(),
            trials = self.config.num_trials,
            blocks = self.config.num_blocks(),
            items = items.len(),
            executor = executor.name(),
            "starting swaption pricing run"
        );

        let partials = executor.execute_all(self, &items)?;
        if partials.len() != items.len() {
            return Err(SwaptionError::ExecutorError {
                backend: executor.name().to_string(),
                reason: format!(
                    "returned {} results for {} work items",
                    partials.len(),
                    items.len()
                ),
            });
        }

        let mut grouped: Vec<Vec<PartialSums>> = vec![Vec::new(); self.swaptions.len()];
        for (item, sums) in items.iter().zip(partials) {
            grouped[item.swaption].push(sums);
        }

        let prices = grouped
            .iter()
            .map(|parts| aggregate(parts, self.config.num_trials))
            .collect::<SwaptionResult<Vec<_>>>()?;

        for (params, price) in self.swaptions.iter().zip(&prices) {
            tracing::debug!(
                id = params.id,
                price = price.mean,
                std_error = price.std_error,
                "priced swaption"
            );
        }
        tracing::info!(swaptions = prices.len(), "pricing run complete");
        Ok(prices)
    }

    /// Price every swaption with the configured executor.
    pub fn price_all(&self) -> SwaptionResult<Vec<SwaptionPrice>> {
        let executor = self.config.executor.build(self.config.workers)?;
        self.price_with(executor.as_ref())
    }

    /// Discounted payoff of every counted trial of one swaption, in trial order.
    pub fn trial_payoffs(&self, swaption: usize) -> SwaptionResult<Vec<f64>> {
        let params = self.swaption(swaption)?;
        let model = self.model(swaption)?;
        let shape = self.pool.shape();
        let simulator = PathSimulator::new(params, model, shape)?;
        let mut arena = BlockArena::for_model(model, shape.block_size)?;

        let mut payoffs = Vec::with_capacity(self.config.num_trials);
        let mut scratch = PartialSums::new();
        for block in 0..shape.num_blocks {
            let trials = self.trials_in_block(block);
            simulator.simulate_block(self.pool.block(block), &mut arena, trials, &mut scratch)?;
            payoffs.extend_from_slice(&arena.payoffs()[..trials]);
        }
        Ok(payoffs)
    }

    pub fn swaption(&self, index: usize) -> SwaptionResult<&SwaptionParams> {
        self.swaptions.get(index).ok_or_else(|| unknown_swaption(index))
    }

    pub fn model(&self, index: usize) -> SwaptionResult<&CurveModel> {
        self.models.get(index).ok_or_else(|| unknown_swaption(index))
    }

    pub fn swaptions(&self) -> &[SwaptionParams] {
        &self.swaptions
    }

    pub fn pool(&self) -> &RandomPool {
        &self.pool
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }
}

fn unknown_swaption(index: usize) -> SwaptionError {
    SwaptionError::InvalidConfiguration {
        field: "swaption".to_string(),
        reason: format!("no swaption at index {}", index),
    }
}

/// Price a batch of swaptions in one call.
pub fn price_swaptions(
    config: PricingConfig,
    swaptions: Vec<SwaptionParams>,
) -> SwaptionResult<Vec<SwaptionPrice>> {
    RunContext::new(config, swaptions)?.price_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mc::executor::SerialExecutor;
    use crate::models::swaption::reference_batch;
    use approx::assert_relative_eq;

    fn config(num_trials: usize, block_size: usize, trial_partitions: usize) -> PricingConfig {
        PricingConfig {
            num_trials,
            block_size,
            workers: 2,
            trial_partitions,
            ..Default::default()
        }
    }

    #[test]
    fn test_block_accounting() {
        let ctx = RunContext::new(config(100, 16, 3), reference_batch(1)).unwrap();
        assert_eq!(ctx.config().num_blocks(), 7);
        assert_eq!(ctx.trials_in_block(0), 16);
        assert_eq!(ctx.trials_in_block(6), 4);
        assert_eq!(ctx.trials_in_block(7), 0);
        let total: usize = (0..7).map(|b| ctx.trials_in_block(b)).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_work_items_cover_every_block_once() {
        let ctx = RunContext::new(config(100, 16, 3), reference_batch(2)).unwrap();
        let items = ctx.work_items();
        assert_eq!(items.len(), 6);
        for s in 0..2 {
            let mut blocks: Vec<usize> = items
                .iter()
                .filter(|i| i.swaption == s)
                .flat_map(|i| i.blocks.clone())
                .collect();
            blocks.sort_unstable();
            assert_eq!(blocks, (0..7).collect::<Vec<_>>());
        }
        assert_eq!(items[0].swaption, 0);
        assert_eq!(items[3].swaption, 1);
        assert_eq!(items[3].partition, 0);
    }

    #[test]
    fn test_more_partitions_than_blocks_skips_empty_ranges() {
        let ctx = RunContext::new(config(20, 16, 8), reference_batch(1)).unwrap();
        let items = ctx.work_items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.blocks.is_empty()));
    }

    #[test]
    fn test_price_matches_trial_payoffs() {
        let ctx = RunContext::new(config(150, 16, 4), reference_batch(2)).unwrap();
        let prices = ctx.price_with(&SerialExecutor).unwrap();
        for (s, price) in prices.iter().enumerate() {
            let payoffs = ctx.trial_payoffs(s).unwrap();
            assert_eq!(payoffs.len(), 150);
            let mean = payoffs.iter().sum::<f64>() / 150.0;
            assert_relative_eq!(price.mean, mean, max_relative = 1e-12);
            assert_eq!(price.trials, 150);
        }
    }

    #[test]
    fn test_invalid_configuration_rejected() {
        assert!(RunContext::new(config(1, 16, 1), reference_batch(1)).is_err());
        assert!(RunContext::new(config(100, 0, 1), reference_batch(1)).is_err());
        assert!(RunContext::new(config(100, 16, 0), reference_batch(1)).is_err());
        assert!(RunContext::new(config(100, 16, 1), Vec::new()).is_err());

        let mut cfg = config(100, 16, 1);
        cfg.workers = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_huge_trial_count_is_allocation_failure() {
        let cfg = config(usize::MAX, 16, 4);
        assert_eq!(cfg.num_blocks(), usize::MAX / 16 + 1);
        assert_eq!(config(usize::MAX, 1, 1).num_blocks(), usize::MAX);

        let err = RunContext::new(cfg, reference_batch(1)).unwrap_err();
        assert!(matches!(err, SwaptionError::AllocationFailure { .. }));
    }

    #[test]
    fn test_index_out_of_range() {
        let ctx = RunContext::new(config(32, 16, 1), reference_batch(1)).unwrap();
        assert!(ctx.swaption(1).is_err());
        assert!(ctx.trial_payoffs(3).is_err());
    }
}
