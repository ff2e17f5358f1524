// src/mc/accumulator.rs
//! Worker-local running sums of discounted swaption payoffs.
//!
//! Nothing is normalised here: division by the trial count happens once, in
//! [`crate::mc::aggregator`], so partial sums from any partitioning of the
//! trials can be merged without rescaling.

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PartialSums {
    pub sum: f64,
    pub sum_sq: f64,
    pub trials: usize,
}

impl PartialSums {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn add(&mut self, payoff: f64) {
        self.sum += payoff;
        self.sum_sq += payoff * payoff;
        self.trials += 1;
    }

    pub fn merge(&mut self, other: &PartialSums) {
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
        self.trials += other.trials;
    }

    /// Merge in iteration order; callers fix the order for reproducibility.
    pub fn merged<'a, I>(parts: I) -> PartialSums
    where
        I: IntoIterator<Item = &'a PartialSums>,
    {
        let mut total = PartialSums::new();
        for part in parts {
            total.merge(part);
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_tracks_sum_and_square() {
        let mut acc = PartialSums::new();
        acc.add(0.5);
        acc.add(1.5);
        assert_eq!(acc.trials, 2);
        assert_eq!(acc.sum, 2.0);
        assert_eq!(acc.sum_sq, 0.25 + 2.25);
    }

    #[test]
    fn test_merge_equals_single_accumulator() {
        let payoffs = [0.0, 0.25, 0.5, 1.0, 0.125, 0.0, 2.0];

        let mut whole = PartialSums::new();
        payoffs.iter().for_each(|&p| whole.add(p));

        let mut left = PartialSums::new();
        let mut right = PartialSums::new();
        payoffs[..3].iter().for_each(|&p| left.add(p));
        payoffs[3..].iter().for_each(|&p| right.add(p));

        // dyadic values keep every partial sum exact
        assert_eq!(PartialSums::merged(&[left, right]), whole);
    }

    #[test]
    fn test_merging_empty_is_identity() {
        let mut acc = PartialSums::new();
        acc.add(0.75);
        let before = acc;
        acc.merge(&PartialSums::new());
        assert_eq!(acc, before);
    }
}
