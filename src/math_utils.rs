// src/math_utils.rs
use statrs::distribution::{ContinuousCDF, Normal};
use statrs::function::erf;
use std::f64::consts::SQRT_2;

const MORO_A: [f64; 4] = [
    2.50662823884,
    -18.61500062529,
    41.39119773534,
    -25.44106049637,
];

const MORO_B: [f64; 4] = [
    -8.47351093090,
    23.08336743743,
    -21.06224101826,
    3.13082909833,
];

const MORO_C: [f64; 9] = [
    0.3374754822726147,
    0.9761690190917186,
    0.1607979714918209,
    0.0276438810333863,
    0.0038405729373609,
    0.0003951896511919,
    0.0000321767881768,
    0.0000002888167364,
    0.0000003960315187,
];

/// Inverse of the standard normal CDF (Moro's approximation).
///
/// Rational approximation in the central region `|u - 0.5| < 0.42`,
/// Chebyshev series in `ln(-ln(u))` in the tails. Absolute error is about 3e-9
/// over `(1e-10, 1 - 1e-10)`, which is well below Monte Carlo noise.
///
/// `u` must lie in the open interval (0, 1).
pub fn inverse_normal(u: f64) -> f64 {
    let x = u - 0.5;
    if x.abs() < 0.42 {
        let r = x * x;
        return x * (((MORO_A[3] * r + MORO_A[2]) * r + MORO_A[1]) * r + MORO_A[0])
            / ((((MORO_B[3] * r + MORO_B[2]) * r + MORO_B[1]) * r + MORO_B[0]) * r + 1.0);
    }

    let tail = if x > 0.0 { 1.0 - u } else { u };
    let r = (-tail.ln()).ln();
    let mut value = MORO_C[8];
    for c in MORO_C[..8].iter().rev() {
        value = c + r * value;
    }
    if x < 0.0 {
        -value
    } else {
        value
    }
}

pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf::erf(x / SQRT_2))
}

/// Two-sided standard normal quantile for a confidence level in (0, 1).
pub fn two_sided_normal_quantile(level: f64) -> Option<f64> {
    if !(level > 0.0 && level < 1.0) {
        return None;
    }
    let normal = Normal::new(0.0, 1.0).ok()?;
    Some(normal.inverse_cdf(0.5 * (1.0 + level)))
}

pub struct Timer {
    start_time: std::time::Instant,
}

impl Timer {
    pub fn new() -> Timer {
        Timer {
            start_time: std::time::Instant::now(),
        }
    }

    pub fn start(&mut self) {
        self.start_time = std::time::Instant::now();
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.start_time.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_inverse_normal_center() {
        assert_abs_diff_eq!(inverse_normal(0.5), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_inverse_normal_matches_statrs() {
        let normal = Normal::new(0.0, 1.0).unwrap();
        for &u in &[1e-8, 0.001, 0.025, 0.08, 0.3, 0.5, 0.7, 0.92, 0.975, 0.999, 1.0 - 1e-8] {
            assert_abs_diff_eq!(inverse_normal(u), normal.inverse_cdf(u), epsilon = 1e-7);
        }
    }

    #[test]
    fn test_inverse_normal_symmetry() {
        for &u in &[0.01, 0.2, 0.45] {
            assert_abs_diff_eq!(inverse_normal(u), -inverse_normal(1.0 - u), epsilon = 1e-9);
        }
    }

    #[test]
    fn test_inverse_normal_round_trips_through_cdf() {
        for &z in &[-2.5, -1.0, 0.3, 1.96] {
            assert_abs_diff_eq!(inverse_normal(norm_cdf(z)), z, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_two_sided_quantile() {
        assert_abs_diff_eq!(two_sided_normal_quantile(0.95).unwrap(), 1.959964, epsilon = 1e-5);
        assert!(two_sided_normal_quantile(1.0).is_none());
        assert!(two_sided_normal_quantile(0.0).is_none());
    }
}
