// src/rng.rs
//! Random Increment Pool for HJM Path Simulation
//!
//! # Design Philosophy
//!
//! Every trial of every swaption consumes `factors × (steps - 1)` standard
//! normal draws. Rather than drawing inside the simulation loop, the whole run's
//! increments are generated once, up front, into a single read-only pool:
//! 1. **Reproducibility**: same seed and generator → same pool, bit for bit
//! 2. **Parallel safety**: workers read disjoint slices, no synchronisation
//! 3. **Sharing**: every swaption in a batch is driven by the same increments
//!
//! # Counter-Based Uniforms
//!
//! The default generator maps `(seed, index)` straight to a uniform value with
//! the splitmix64 finalizer. The seed is hashed once into a stream key, and each
//! draw hashes the key advanced by `index` golden-gamma steps:
//! ```text
//! key = mix(seed + γ)
//! z   = mix(key + index × γ)
//! u   = (⌊z / 2¹²⌋ + ½) × 2⁻⁵²                 γ = 0x9e3779b97f4a7c15
//! ```
//! No state is carried between draws, so the pool can be filled in any order
//! and by any number of workers with identical results. Nearby seeds give
//! unrelated streams, not shifted copies of one another.
//!
//! # Layout
//!
//! ```text
//! index = block × block_stride + factor × (steps × block_size) + step × block_size + trial
//! ```
//! Trials are innermost so that one factor/step row of a block is contiguous.

use crate::error::{SwaptionError, SwaptionResult};
use crate::math_utils::inverse_normal;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use rayon::prelude::*;
use std::ops::Range;

const GOLDEN_GAMMA: u64 = 0x9e37_79b9_7f4a_7c15;
const UNIFORM_SCALE: f64 = 1.0 / (1u64 << 52) as f64;

#[inline]
fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

/// Counter-based RNG for reproducible parallel simulations
///
/// Each draw is a pure function of `(base_seed, counter)`, so two instances
/// positioned at the same counter yield the same sequence.
#[derive(Debug, Clone)]
pub struct CounterRng {
    base_seed: u64,
    counter: u64,
}

impl CounterRng {
    pub fn new(base_seed: u64, counter: u64) -> Self {
        Self { base_seed, counter }
    }

    /// Uniform draw at absolute position `index` of the stream seeded by `seed`.
    ///
    /// The result lies strictly inside (0, 1).
    pub fn uniform_at(seed: u64, index: u64) -> f64 {
        let key = mix64(seed.wrapping_add(GOLDEN_GAMMA));
        let z = mix64(key.wrapping_add(index.wrapping_mul(GOLDEN_GAMMA)));
        // 52 bits plus a half step keeps both ends off 0 and 1
        ((z >> 12) as f64 + 0.5) * UNIFORM_SCALE
    }

    pub fn uniform(&mut self) -> f64 {
        let u = Self::uniform_at(self.base_seed, self.counter);
        self.counter = self.counter.wrapping_add(1);
        u
    }

    /// Standard normal via the inverse CDF, one uniform per draw.
    pub fn normal(&mut self) -> f64 {
        inverse_normal(self.uniform())
    }

    pub fn counter(&self) -> u64 {
        self.counter
    }
}

/// RNG factory for reproducible parallel simulations
#[derive(Debug, Clone, Copy)]
pub struct RngFactory {
    base_seed: u64,
}

impl RngFactory {
    pub fn new(base_seed: u64) -> Self {
        Self { base_seed }
    }

    /// Create a counter RNG positioned at `offset` within the stream
    pub fn create_counter_rng(&self, offset: u64) -> CounterRng {
        CounterRng::new(self.base_seed, offset)
    }

    /// Create a standard RNG for a specific trial block
    pub fn create_std_rng(&self, block_id: u64) -> StdRng {
        StdRng::seed_from_u64(self.base_seed.wrapping_add(block_id))
    }
}

pub fn get_normal_draw<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    StandardNormal.sample(rng)
}

/// Source of the standard normal increments in the pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum NormalGenerator {
    /// Counter-based splitmix64 uniforms mapped through Moro's inverse CDF.
    #[default]
    Counter,
    /// `StdRng` seeded per trial block, sampled with `rand_distr::StandardNormal`.
    StdNormal,
}

impl std::str::FromStr for NormalGenerator {
    type Err = SwaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "counter" => Ok(NormalGenerator::Counter),
            "std" | "std-normal" | "stdnormal" => Ok(NormalGenerator::StdNormal),
            other => Err(SwaptionError::InvalidConfiguration {
                field: "generator".to_string(),
                reason: format!("unknown generator '{}' (expected counter or std-normal)", other),
            }),
        }
    }
}

/// Dimensions of the random increment pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolShape {
    pub factors: usize,
    pub steps: usize,
    pub block_size: usize,
    pub num_blocks: usize,
}

impl PoolShape {
    /// Draws per trial block: `factors × steps × block_size`.
    pub fn block_stride(&self) -> SwaptionResult<usize> {
        self.factors
            .checked_mul(self.steps)
            .and_then(|n| n.checked_mul(self.block_size))
            .ok_or_else(|| self.overflow())
    }

    /// Total number of draws in the pool.
    pub fn total(&self) -> SwaptionResult<usize> {
        self.block_stride()?
            .checked_mul(self.num_blocks)
            .ok_or_else(|| self.overflow())
    }

    /// Offset of `(factor, step, trial)` inside one block.
    #[inline]
    pub fn offset_in_block(&self, factor: usize, step: usize, trial: usize) -> usize {
        (factor * self.steps + step) * self.block_size + trial
    }

    fn overflow(&self) -> SwaptionError {
        SwaptionError::AllocationFailure {
            buffer: "random pool".to_string(),
            elements: usize::MAX,
        }
    }
}

/// Split `0..total` into `parts` contiguous, disjoint ranges.
///
/// Sizes differ by at most one; the first `total % parts` ranges get the extra
/// element. Ranges may be empty when `parts > total`.
pub fn even_ranges(total: usize, parts: usize) -> Vec<Range<usize>> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let leftover = total % parts;
    let mut start = 0;
    (0..parts)
        .map(|i| {
            let len = if i < leftover { base + 1 } else { base };
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// Read-only pool of standard normal increments shared by every worker.
#[derive(Debug, Clone)]
pub struct RandomPool {
    draws: Vec<f64>,
    shape: PoolShape,
    block_stride: usize,
    seed: u64,
    generator: NormalGenerator,
}

impl RandomPool {
    /// Generate the full pool.
    ///
    /// `workers` controls how many disjoint ranges are filled concurrently; it
    /// never changes the values produced.
    pub fn generate(
        shape: PoolShape,
        seed: u64,
        generator: NormalGenerator,
        workers: usize,
    ) -> SwaptionResult<Self> {
        let block_stride = shape.block_stride()?;
        let total = shape.total()?;

        let mut draws: Vec<f64> = Vec::new();
        draws
            .try_reserve_exact(total)
            .map_err(|_| SwaptionError::AllocationFailure {
                buffer: "random pool".to_string(),
                elements: total,
            })?;
        draws.resize(total, 0.0);

        let factory = RngFactory::new(seed);
        match generator {
            NormalGenerator::Counter => {
                let mut chunks = Vec::with_capacity(workers.max(1));
                let mut rest = draws.as_mut_slice();
                for range in even_ranges(total, workers.max(1)) {
                    let (head, tail) = rest.split_at_mut(range.len());
                    chunks.push((range.start, head));
                    rest = tail;
                }
                let fill = |(start, chunk): (usize, &mut [f64])| {
                    let mut rng = factory.create_counter_rng(start as u64);
                    for x in chunk.iter_mut() {
                        *x = rng.normal();
                    }
                };
                if workers > 1 {
                    chunks.into_par_iter().for_each(fill);
                } else {
                    chunks.into_iter().for_each(fill);
                }
            }
            NormalGenerator::StdNormal if block_stride > 0 => {
                let fill = |(block, chunk): (usize, &mut [f64])| {
                    let mut rng = factory.create_std_rng(block as u64);
                    for x in chunk.iter_mut() {
                        *x = get_normal_draw(&mut rng);
                    }
                };
                if workers > 1 {
                    draws
                        .par_chunks_mut(block_stride)
                        .enumerate()
                        .for_each(fill);
                } else {
                    draws.chunks_mut(block_stride).enumerate().for_each(fill);
                }
            }
            NormalGenerator::StdNormal => {}
        }

        tracing::debug!(
            draws = total,
            blocks = shape.num_blocks,
            ?generator,
            "generated random increment pool"
        );

        Ok(Self {
            draws,
            shape,
            block_stride,
            seed,
            generator,
        })
    }

    /// Disjoint contiguous index ranges covering the pool, one per worker.
    pub fn partition(&self, workers: usize) -> Vec<Range<usize>> {
        even_ranges(self.draws.len(), workers)
    }

    /// Draws of one trial block.
    pub fn block(&self, block: usize) -> &[f64] {
        let start = block * self.block_stride;
        &self.draws[start..start + self.block_stride]
    }

    pub fn slice(&self, range: Range<usize>) -> &[f64] {
        &self.draws[range]
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.draws
    }

    pub fn shape(&self) -> PoolShape {
        self.shape
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generator(&self) -> NormalGenerator {
        self.generator
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> PoolShape {
        PoolShape {
            factors: 3,
            steps: 11,
            block_size: 16,
            num_blocks: 5,
        }
    }

    #[test]
    fn test_counter_rng_reproducibility() {
        let factory = RngFactory::new(100);

        let mut rng1 = factory.create_counter_rng(0);
        let mut rng2 = factory.create_counter_rng(0);

        for _ in 0..100 {
            assert_eq!(rng1.uniform().to_bits(), rng2.uniform().to_bits());
        }
    }

    #[test]
    fn test_counter_rng_matches_absolute_position() {
        let mut rng = RngFactory::new(7).create_counter_rng(40);
        for i in 40..60 {
            assert_eq!(rng.uniform(), CounterRng::uniform_at(7, i));
        }
        assert_eq!(rng.counter(), 60);
    }

    #[test]
    fn test_uniform_in_open_unit_interval() {
        for i in 0..10_000 {
            let u = CounterRng::uniform_at(100, i);
            assert!(u > 0.0 && u < 1.0, "uniform out of range: {}", u);
        }
        for seed in [0, 1, u64::MAX] {
            for index in [0, 1, u64::MAX] {
                let u = CounterRng::uniform_at(seed, index);
                assert!(u > 0.0 && u < 1.0, "uniform out of range: {}", u);
            }
        }
    }

    #[test]
    fn test_adjacent_seeds_are_not_shifted_streams() {
        let a: Vec<f64> = (0..64).map(|i| CounterRng::uniform_at(100, i)).collect();
        let b: Vec<f64> = (0..64).map(|i| CounterRng::uniform_at(101, i)).collect();
        for lag in 0..4 {
            assert_ne!(a[1 + lag..], b[..63 - lag]);
            assert_ne!(b[1 + lag..], a[..63 - lag]);
        }
        // sample correlation of two independent streams stays near zero
        let n = 20_000u64;
        let (mut sa, mut sb, mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for i in 0..n {
            let x = CounterRng::uniform_at(100, i);
            let y = CounterRng::uniform_at(101, i);
            sa += x;
            sb += y;
            sab += x * y;
            saa += x * x;
            sbb += y * y;
        }
        let n = n as f64;
        let cov = sab / n - (sa / n) * (sb / n);
        let corr = cov / ((saa / n - (sa / n).powi(2)) * (sbb / n - (sb / n).powi(2))).sqrt();
        assert!(corr.abs() < 0.05, "seed 100/101 correlation {}", corr);
    }

    #[test]
    fn test_normal_distribution() {
        let mut rng = RngFactory::new(42).create_counter_rng(0);

        let samples: Vec<f64> = (0..20_000).map(|_| rng.normal()).collect();

        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let variance =
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;

        assert!(mean.abs() < 0.05, "Mean should be close to 0, got {}", mean);
        assert!(
            (variance - 1.0).abs() < 0.05,
            "Variance should be close to 1, got {}",
            variance
        );
    }

    #[test]
    fn test_even_ranges_cover_without_overlap() {
        let ranges = even_ranges(10, 3);
        assert_eq!(ranges, vec![0..4, 4..7, 7..10]);

        let ranges = even_ranges(2, 4);
        assert_eq!(ranges, vec![0..1, 1..2, 2..2, 2..2]);

        assert!(even_ranges(5, 0).is_empty());
    }

    #[test]
    fn test_pool_is_independent_of_worker_count() {
        for generator in [NormalGenerator::Counter, NormalGenerator::StdNormal] {
            let serial = RandomPool::generate(shape(), 100, generator, 1).unwrap();
            let parallel = RandomPool::generate(shape(), 100, generator, 7).unwrap();
            assert_eq!(serial.len(), 3 * 11 * 16 * 5);
            assert_eq!(serial.as_slice(), parallel.as_slice());
        }
    }

    #[test]
    fn test_pool_seed_changes_draws() {
        let a = RandomPool::generate(shape(), 1, NormalGenerator::Counter, 1).unwrap();
        let b = RandomPool::generate(shape(), 2, NormalGenerator::Counter, 1).unwrap();
        assert_ne!(a.as_slice(), b.as_slice());
    }

    #[test]
    fn test_pool_partition_and_blocks() {
        let pool = RandomPool::generate(shape(), 100, NormalGenerator::Counter, 2).unwrap();
        let parts = pool.partition(4);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts.first().unwrap().start, 0);
        assert_eq!(parts.last().unwrap().end, pool.len());
        for pair in parts.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }

        let stride = shape().block_stride().unwrap();
        assert_eq!(pool.block(2), pool.slice(2 * stride..3 * stride));
        let s = shape();
        let idx = s.offset_in_block(1, 3, 5);
        assert_eq!(pool.block(4)[idx], pool.as_slice()[4 * stride + idx]);
    }

    #[test]
    fn test_pool_size_overflow_is_allocation_failure() {
        let huge = PoolShape {
            factors: usize::MAX / 2,
            steps: 3,
            block_size: 1,
            num_blocks: 1,
        };
        let err = RandomPool::generate(huge, 1, NormalGenerator::Counter, 1).unwrap_err();
        assert!(matches!(err, SwaptionError::AllocationFailure { .. }));
    }
}
