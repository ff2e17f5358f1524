// src/error.rs
use std::fmt;

/// Error types for the swaption pricing engine
#[derive(Debug, Clone, PartialEq)]
pub enum SwaptionError {
    /// Invalid swaption parameter values
    InvalidParameters {
        parameter: String,
        value: f64,
        constraint: String,
    },

    /// Invalid run or swaption configuration
    InvalidConfiguration { field: String, reason: String },

    /// A ratio against the time step that should be a whole number of steps is not
    NonIntegralDiscretization {
        quantity: String,
        ratio: f64,
        step: f64,
    },

    /// Random pool or scratch buffer could not be allocated
    AllocationFailure { buffer: String, elements: usize },

    /// Monte Carlo bookkeeping error
    MonteCarloError { trials: usize, reason: String },

    /// Numerical instability or non-finite result
    NumericalInstability { method: String, reason: String },

    /// Executor backend failure (thread pool construction, worker panic)
    ExecutorError { backend: String, reason: String },
}

impl fmt::Display for SwaptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwaptionError::InvalidParameters {
                parameter,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid parameter '{}' = {}: {}",
                    parameter, value, constraint
                )
            }
            SwaptionError::InvalidConfiguration { field, reason } => {
                write!(f, "Invalid configuration for '{}': {}", field, reason)
            }
            SwaptionError::NonIntegralDiscretization {
                quantity,
                ratio,
                step,
            } => {
                write!(
                    f,
                    "'{}' is {:.6} time steps of {:.6} years; it must be a whole number of steps",
                    quantity, ratio, step
                )
            }
            SwaptionError::AllocationFailure { buffer, elements } => {
                write!(
                    f,
                    "Failed to allocate {} buffer of {} elements",
                    buffer, elements
                )
            }
            SwaptionError::MonteCarloError { trials, reason } => {
                write!(
                    f,
                    "Monte Carlo simulation error with {} trials: {}",
                    trials, reason
                )
            }
            SwaptionError::NumericalInstability { method, reason } => {
                write!(f, "Numerical instability in {}: {}", method, reason)
            }
            SwaptionError::ExecutorError { backend, reason } => {
                write!(f, "Executor '{}' failed: {}", backend, reason)
            }
        }
    }
}

impl std::error::Error for SwaptionError {}

/// Result type alias for swaption pricing operations
pub type SwaptionResult<T> = Result<T, SwaptionError>;

/// Validation utilities
pub mod validation {
    use super::{SwaptionError, SwaptionResult};

    /// Largest supported worker count.
    pub const MAX_WORKERS: usize = 1024;

    /// Tolerance used when checking that a ratio is a whole number of time steps.
    pub const INTEGRAL_TOLERANCE: f64 = 1e-6;

    /// Validate that a parameter is positive
    pub fn validate_positive(name: &str, value: f64) -> SwaptionResult<()> {
        if value <= 0.0 || value.is_nan() {
            Err(SwaptionError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be positive (> 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a parameter is non-negative
    pub fn validate_non_negative(name: &str, value: f64) -> SwaptionResult<()> {
        if value < 0.0 || value.is_nan() {
            Err(SwaptionError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be non-negative (≥ 0)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a value is finite and not NaN
    pub fn validate_finite(name: &str, value: f64) -> SwaptionResult<()> {
        if !value.is_finite() {
            Err(SwaptionError::InvalidParameters {
                parameter: name.to_string(),
                value,
                constraint: "must be finite (not NaN or infinite)".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Validate every element of a curve or matrix
    pub fn validate_all_finite<'a, I>(name: &str, values: I) -> SwaptionResult<()>
    where
        I: IntoIterator<Item = &'a f64>,
    {
        for (i, v) in values.into_iter().enumerate() {
            validate_finite(&format!("{}[{}]", name, i), *v)?;
        }
        Ok(())
    }

    /// Validate the total trial count; N = 1 leaves the variance undefined
    pub fn validate_trials(trials: usize) -> SwaptionResult<()> {
        if trials < 2 {
            Err(SwaptionError::InvalidConfiguration {
                field: "num_trials".to_string(),
                reason: format!(
                    "must be at least 2 for the standard error to be defined (got {})",
                    trials
                ),
            })
        } else {
            Ok(())
        }
    }

    /// Validate worker/thread count
    pub fn validate_workers(workers: usize) -> SwaptionResult<()> {
        if workers == 0 || workers > MAX_WORKERS {
            Err(SwaptionError::InvalidConfiguration {
                field: "workers".to_string(),
                reason: format!("must be between 1 and {} (got {})", MAX_WORKERS, workers),
            })
        } else {
            Ok(())
        }
    }

    /// Validate that a count is at least one
    pub fn validate_at_least_one(field: &str, value: usize) -> SwaptionResult<()> {
        if value == 0 {
            Err(SwaptionError::InvalidConfiguration {
                field: field.to_string(),
                reason: "must be greater than 0".to_string(),
            })
        } else {
            Ok(())
        }
    }

    /// Round a ratio that is mathematically integral to the nearest whole number.
    ///
    /// Adds 0.5 before truncating so that e.g. 1.9999999 maps to 2 rather than 1.
    pub fn round_steps(ratio: f64) -> usize {
        if ratio <= 0.0 {
            0
        } else {
            (ratio + 0.5).floor() as usize
        }
    }

    /// Round `value / step` and reject it if it is not a whole number of steps
    pub fn whole_steps(quantity: &str, value: f64, step: f64) -> SwaptionResult<usize> {
        let ratio = value / step;
        let rounded = round_steps(ratio);
        if (ratio - rounded as f64).abs() > INTEGRAL_TOLERANCE * ratio.abs().max(1.0) {
            Err(SwaptionError::NonIntegralDiscretization {
                quantity: quantity.to_string(),
                ratio,
                step,
            })
        } else {
            Ok(rounded)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::validation::*;
    use super::*;

    #[test]
    fn test_validate_positive() {
        assert!(validate_positive("years", 5.5).is_ok());
        assert!(validate_positive("years", 0.0).is_err());
        assert!(validate_positive("years", -1.0).is_err());
        assert!(validate_positive("years", f64::NAN).is_err());
    }

    #[test]
    fn test_validate_trials_rejects_single_trial() {
        assert!(validate_trials(0).is_err());
        assert!(validate_trials(1).is_err());
        assert!(validate_trials(2).is_ok());
    }

    #[test]
    fn test_validate_workers_bounds() {
        assert!(validate_workers(0).is_err());
        assert!(validate_workers(1).is_ok());
        assert!(validate_workers(MAX_WORKERS).is_ok());
        assert!(validate_workers(MAX_WORKERS + 1).is_err());
    }

    #[test]
    fn test_round_steps_absorbs_representation_error() {
        assert_eq!(round_steps(1.9999999), 2);
        assert_eq!(round_steps(2.0000001), 2);
        assert_eq!(round_steps(0.0), 0);
        assert_eq!(round_steps(-3.0), 0);
    }

    #[test]
    fn test_whole_steps() {
        assert_eq!(whole_steps("payment_interval", 1.0, 0.5).unwrap(), 2);
        assert_eq!(whole_steps("maturity", 0.3, 0.1).unwrap(), 3);
        let err = whole_steps("payment_interval", 0.75, 0.5).unwrap_err();
        assert!(matches!(
            err,
            SwaptionError::NonIntegralDiscretization { .. }
        ));
    }

    #[test]
    fn test_error_display() {
        let error = SwaptionError::InvalidParameters {
            parameter: "years".to_string(),
            value: -0.5,
            constraint: "must be positive".to_string(),
        };

        let display = format!("{}", error);
        assert!(display.contains("years"));
        assert!(display.contains("-0.5"));
        assert!(display.contains("positive"));

        let error = SwaptionError::NonIntegralDiscretization {
            quantity: "payment_interval".to_string(),
            ratio: 1.5,
            step: 0.5,
        };
        let display = error.to_string();
        assert!(display.contains("payment_interval"));
        assert!(display.contains("whole number"));
    }
}
