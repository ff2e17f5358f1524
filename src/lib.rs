// src/lib.rs
//! # hjm-swaptions: Parallel Monte Carlo Swaption Pricing under HJM
//!
//! Prices a batch of European swaptions by simulating forward-rate curves
//! under a multi-factor Heath-Jarrow-Morton model.
//!
//! ## Key Features
//!
//! - **Shared Random Pool**: one pre-generated, read-only pool of normal increments
//! - **Blocked Simulation**: trials processed in blocks with trial-innermost buffers
//! - **Deterministic Reduction**: identical prices for any worker count or backend
//! - **Pluggable Executors**: serial and rayon thread-pool backends
//!
//! ## Quick Start
//!
//! ```rust
//! use hjm_swaptions::mc::engine::{price_swaptions, PricingConfig};
//! use hjm_swaptions::models::swaption::reference_batch;
//!
//! let config = PricingConfig {
//!     num_trials: 1_000,
//!     workers: 2,
//!     ..Default::default()
//! };
//!
//! let prices = price_swaptions(config, reference_batch(4)).expect("Valid configuration");
//! for (i, p) in prices.iter().enumerate() {
//!     println!("Swaption{}: {:.6} ± {:.6}", i, p.mean, p.std_error);
//! }
//! ```
//!
//! ## Mathematical Foundation
//!
//! The forward curve `f(t, T)` evolves under the risk-neutral HJM dynamics
//! ```text
//! df(t, T) = μ(t, T) dt + Σₖ σₖ(t, T) dWₖ(t)
//! ```
//! with the no-arbitrage drift fixed by the factor volatilities. Each trial
//! discounts the swaption's exercise value along its own short-rate path; the
//! price is the average over trials.

pub mod error;
pub mod math_utils;
pub mod mc;
pub mod models;
pub mod output;
pub mod rng;

pub use error::{SwaptionError, SwaptionResult};
pub use mc::aggregator::SwaptionPrice;
pub use mc::engine::{price_swaptions, PricingConfig, RunContext};
pub use mc::executor::ExecutorKind;
pub use mc::payoffs::SwaptionKind;
pub use models::swaption::SwaptionParams;
pub use rng::NormalGenerator;
