// src/mc/aggregator.rs
//! Final reduction of partial sums into a price and standard error.
//!
//! ```text
//! mean   = S / N
//! stderr = √((Q - S²/N) / (N - 1)) / √N
//! ```
//! with `S = Σ payoff`, `Q = Σ payoff²` and `N` the swaption's total trial count.

use crate::error::{validation::validate_trials, SwaptionError, SwaptionResult};
use crate::math_utils::two_sided_normal_quantile;
use crate::mc::accumulator::PartialSums;

/// Monte Carlo estimate for one swaption.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwaptionPrice {
    pub mean: f64,
    pub std_error: f64,
    pub trials: usize,
}

impl SwaptionPrice {
    /// Normal-approximation confidence interval, e.g. `level = 0.95`
    pub fn confidence_interval(&self, level: f64) -> Option<(f64, f64)> {
        let z = two_sided_normal_quantile(level)?;
        Some((self.mean - z * self.std_error, self.mean + z * self.std_error))
    }
}

/// Reduce the partial sums of one swaption, in slice order, to its price.
///
/// # Errors
///
/// - `InvalidConfiguration` if `num_trials < 2`
/// - `MonteCarloError` if the partial sums do not cover exactly `num_trials` trials
/// - `NumericalInstability` if the variance is materially negative or a result is not finite
pub fn aggregate(partials: &[PartialSums], num_trials: usize) -> SwaptionResult<SwaptionPrice> {
    validate_trials(num_trials)?;

    let total = PartialSums::merged(partials);
    if total.trials != num_trials {
        return Err(SwaptionError::MonteCarloError {
            trials: num_trials,
            reason: format!(
                "partial sums cover {} trials across {} partitions",
                total.trials,
                partials.len()
            ),
        });
    }

    let n = num_trials as f64;
    let mean = total.sum / n;
    let mut variance = (total.sum_sq - total.sum * total.sum / n) / (n - 1.0);

    if variance < 0.0 {
        // cancellation when every payoff is (nearly) equal
        let tolerance = 1e-10 * (total.sum_sq / n).max(1.0);
        if variance > -tolerance {
            tracing::warn!(variance, "clamping rounding-level negative variance to zero");
            variance = 0.0;
        } else {
            tracing::warn!(variance, "negative payoff variance");
            return Err(SwaptionError::NumericalInstability {
                method: "Monte Carlo aggregation".to_string(),
                reason: format!("variance estimate became significantly negative: {}", variance),
            });
        }
    }

    let std_error = variance.sqrt() / n.sqrt();

    if !mean.is_finite() {
        return Err(SwaptionError::NumericalInstability {
            method: "Monte Carlo aggregation".to_string(),
            reason: format!("price estimate is not finite: {}", mean),
        });
    }
    if !std_error.is_finite() {
        return Err(SwaptionError::NumericalInstability {
            method: "Monte Carlo aggregation".to_string(),
            reason: format!("standard error is not finite: {}", std_error),
        });
    }

    Ok(SwaptionPrice {
        mean,
        std_error,
        trials: num_trials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Run `f` with a WARN-level subscriber and return what it logged.
    fn warnings_from<T>(f: impl FnOnce() -> T) -> (T, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let logged = String::from_utf8_lossy(&buffer.0.lock().unwrap()).into_owned();
        (out, logged)
    }

    fn sums(payoffs: &[f64]) -> PartialSums {
        let mut acc = PartialSums::new();
        payoffs.iter().for_each(|&p| acc.add(p));
        acc
    }

    #[test]
    fn test_mean_and_std_error() {
        let payoffs = [1.0, 2.0, 3.0, 4.0];
        let price = aggregate(&[sums(&payoffs)], 4).unwrap();
        assert_relative_eq!(price.mean, 2.5);
        // sample variance 5/3
        assert_relative_eq!(price.std_error, (5.0f64 / 3.0).sqrt() / 2.0, epsilon = 1e-15);
        assert_eq!(price.trials, 4);
    }

    #[test]
    fn test_partitioning_does_not_change_result() {
        let payoffs = [0.5, 0.0, 0.25, 1.0, 0.75, 0.0];
        let whole = aggregate(&[sums(&payoffs)], 6).unwrap();
        let split = aggregate(
            &[sums(&payoffs[..1]), sums(&payoffs[1..4]), sums(&payoffs[4..])],
            6,
        )
        .unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn test_single_trial_rejected() {
        let err = aggregate(&[sums(&[1.0])], 1).unwrap_err();
        assert!(matches!(err, SwaptionError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_trial_count_mismatch_rejected() {
        let err = aggregate(&[sums(&[1.0, 2.0, 3.0])], 4).unwrap_err();
        assert!(matches!(err, SwaptionError::MonteCarloError { .. }));
    }

    #[test]
    fn test_constant_payoffs_have_zero_error() {
        let payoffs = vec![0.1; 1000];
        let price = aggregate(&[sums(&payoffs)], 1000).unwrap();
        assert_relative_eq!(price.mean, 0.1, epsilon = 1e-12);
        assert!(price.std_error >= 0.0 && price.std_error < 1e-9);
    }

    #[test]
    fn test_clamped_variance_is_logged_as_warning() {
        // S²/N exceeds Q by rounding only: variance -1e-12
        let near_zero = PartialSums {
            sum: 2.0,
            sum_sq: 2.0 - 1e-12,
            trials: 2,
        };
        let (price, logged) = warnings_from(|| aggregate(&[near_zero], 2));
        let price = price.unwrap();
        assert_eq!(price.std_error, 0.0);
        assert_relative_eq!(price.mean, 1.0);
        assert!(logged.contains("WARN"), "log output: {}", logged);
        assert!(logged.contains("clamping rounding-level negative variance"));

        let materially_negative = PartialSums {
            sum: 2.0,
            sum_sq: 1.0,
            trials: 2,
        };
        let (result, logged) = warnings_from(|| aggregate(&[materially_negative], 2));
        assert!(matches!(
            result.unwrap_err(),
            SwaptionError::NumericalInstability { .. }
        ));
        assert!(logged.contains("negative payoff variance"));
    }

    #[test]
    fn test_confidence_interval_brackets_mean() {
        let price = SwaptionPrice {
            mean: 1.0,
            std_error: 0.1,
            trials: 100,
        };
        let (lo, hi) = price.confidence_interval(0.95).unwrap();
        assert_relative_eq!(hi - 1.0, 0.1959964, epsilon = 1e-6);
        assert_relative_eq!(1.0 - lo, hi - 1.0, epsilon = 1e-12);
        assert!(price.confidence_interval(1.5).is_none());
    }
}
