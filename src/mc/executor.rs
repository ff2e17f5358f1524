// src/mc/executor.rs
//! Execution backends for work items.
//!
//! A run is cut into [`WorkItem`]s, each one swaption and a contiguous range
//! of trial blocks. Items are independent: they read the shared pool and curve
//! models and return their own [`PartialSums`]. Backends differ only in how the
//! items are scheduled; every backend returns results in item order.

use crate::error::{validation::validate_workers, SwaptionError, SwaptionResult};
use crate::mc::accumulator::PartialSums;
use crate::mc::engine::RunContext;
use crate::mc::path_sim::{BlockArena, PathSimulator};
use rayon::prelude::*;
use std::ops::Range;

/// One swaption and the trial blocks simulated for it by a single worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub swaption: usize,
    /// Position of the block range among the swaption's partitions.
    pub partition: usize,
    pub blocks: Range<usize>,
}

/// Simulate every block of `item` with a private arena.
pub fn execute(ctx: &RunContext, item: &WorkItem) -> SwaptionResult<PartialSums> {
    let params = ctx.swaption(item.swaption)?;
    let model = ctx.model(item.swaption)?;
    let pool = ctx.pool();
    let shape = pool.shape();
    if item.blocks.start > item.blocks.end || item.blocks.end > shape.num_blocks {
        return Err(SwaptionError::InvalidConfiguration {
            field: "work item".to_string(),
            reason: format!(
                "block range {}..{} outside the pool's {} blocks",
                item.blocks.start, item.blocks.end, shape.num_blocks
            ),
        });
    }

    let simulator = PathSimulator::new(params, model, shape)?;
    let mut arena = BlockArena::for_model(model, shape.block_size)?;
    let mut sums = PartialSums::new();

    for block in item.blocks.clone() {
        simulator.simulate_block(pool.block(block), &mut arena, ctx.trials_in_block(block), &mut sums)?;
    }

    tracing::trace!(
        swaption = item.swaption,
        partition = item.partition,
        blocks = item.blocks.len(),
        trials = sums.trials,
        "work item done"
    );
    Ok(sums)
}

/// Schedules work items and collects their partial sums in item order.
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    fn execute_all(&self, ctx: &RunContext, items: &[WorkItem]) -> SwaptionResult<Vec<PartialSums>>;
}

/// Runs every item on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialExecutor;

impl Executor for SerialExecutor {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn execute_all(&self, ctx: &RunContext, items: &[WorkItem]) -> SwaptionResult<Vec<PartialSums>> {
        items.iter().map(|item| execute(ctx, item)).collect()
    }
}

/// Runs items on a dedicated rayon pool with a fixed worker count.
pub struct ThreadPoolExecutor {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl ThreadPoolExecutor {
    pub fn new(workers: usize) -> SwaptionResult<Self> {
        validate_workers(workers)?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("hjm-worker-{}", i))
            .build()
            .map_err(|e| SwaptionError::ExecutorError {
                backend: "thread-pool".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Executor for ThreadPoolExecutor {
    fn name(&self) -> &'static str {
        "thread-pool"
    }

    fn execute_all(&self, ctx: &RunContext, items: &[WorkItem]) -> SwaptionResult<Vec<PartialSums>> {
        self.pool.install(|| {
            items
                .par_iter()
                .map(|item| execute(ctx, item))
                .collect::<SwaptionResult<Vec<_>>>()
        })
    }
}

/// Executor backend, chosen when the run is configured.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExecutorKind {
    Serial,
    #[default]
    ThreadPool,
}

impl ExecutorKind {
    pub fn build(self, workers: usize) -> SwaptionResult<Box<dyn Executor>> {
        match self {
            ExecutorKind::Serial => Ok(Box::new(SerialExecutor)),
            ExecutorKind::ThreadPool => Ok(Box::new(ThreadPoolExecutor::new(workers)?)),
        }
    }
}

impl std::str::FromStr for ExecutorKind {
    type Err = SwaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "serial" => Ok(ExecutorKind::Serial),
            "thread-pool" | "threadpool" | "threads" => Ok(ExecutorKind::ThreadPool),
            other => Err(SwaptionError::InvalidConfiguration {
                field: "executor".to_string(),
                reason: format!("unknown executor '{}' (expected serial or thread-pool)", other),
            }),
        }
    }
}
