// src/mc/payoffs.rs
//! Swaption Exercise Payoffs
//!
//! # Mathematical Definitions
//!
//! At exercise the holder values the underlying swap per unit notional from the
//! simulated swap discount curve `P_s(t_i)`:
//! ```text
//! FL = Σᵢ cᵢ P_s(tᵢ)
//! ```
//! where `cᵢ` are the fixed-leg cash flows (coupons, plus principal at the end).
//! The floating leg of a swap starting at exercise is worth par, so
//!
//! - **Receiver** (receive fixed): max(FL - 1, 0)
//! - **Payer** (pay fixed): max(1 - FL, 0)
//!
//! The exercise value is then discounted to today along the same path.

/// Direction of the underlying swap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SwaptionKind {
    /// Right to enter the swap receiving the fixed leg.
    #[default]
    Receiver,
    /// Right to enter the swap paying the fixed leg.
    Payer,
}

impl SwaptionKind {
    /// Non-negative exercise value given the fixed-leg value per unit notional
    #[inline]
    pub fn exercise_value(&self, fixed_leg_value: f64) -> f64 {
        match self {
            SwaptionKind::Receiver => (fixed_leg_value - 1.0).max(0.0),
            SwaptionKind::Payer => (1.0 - fixed_leg_value).max(0.0),
        }
    }
}

impl std::str::FromStr for SwaptionKind {
    type Err = crate::error::SwaptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "receiver" => Ok(SwaptionKind::Receiver),
            "payer" => Ok(SwaptionKind::Payer),
            other => Err(crate::error::SwaptionError::InvalidConfiguration {
                field: "kind".to_string(),
                reason: format!("unknown swaption kind '{}'", other),
            }),
        }
    }
}

/// Value of the fixed leg for one trial of a block.
///
/// `discount_factors` is laid out point-major (`point × block_size + trial`).
#[inline]
pub fn fixed_leg_value(
    cash_flows: &[f64],
    discount_factors: &[f64],
    block_size: usize,
    trial: usize,
) -> f64 {
    cash_flows
        .iter()
        .enumerate()
        .map(|(i, c)| c * discount_factors[i * block_size + trial])
        .sum()
}
