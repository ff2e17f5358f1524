// tests/partition_invariance_test.rs
use approx::assert_relative_eq;
use hjm_swaptions::mc::accumulator::PartialSums;
use hjm_swaptions::mc::aggregator::aggregate;
use hjm_swaptions::mc::engine::{PricingConfig, RunContext};
use hjm_swaptions::mc::executor::ExecutorKind;
use hjm_swaptions::models::swaption::reference_batch;
use hjm_swaptions::rng::{even_ranges, NormalGenerator};
use proptest::prelude::*;

fn config(num_trials: usize, block_size: usize, trial_partitions: usize, workers: usize) -> PricingConfig {
    PricingConfig {
        num_trials,
        block_size,
        workers,
        trial_partitions,
        seed: 100,
        generator: NormalGenerator::Counter,
        executor: ExecutorKind::ThreadPool,
    }
}

#[test]
fn test_trial_payoffs_are_deterministic() {
    let a = RunContext::new(config(300, 16, 4, 1), reference_batch(2)).expect("Valid configuration");
    let b = RunContext::new(config(300, 16, 7, 5), reference_batch(2)).expect("Valid configuration");
    for s in 0..2 {
        let pa = a.trial_payoffs(s).expect("Valid swaption index");
        let pb = b.trial_payoffs(s).expect("Valid swaption index");
        assert_eq!(pa, pb);
        assert!(pa.iter().all(|&p| p >= 0.0 && p.is_finite()));
    }

    let mut other = config(300, 16, 4, 1);
    other.seed = 101;
    let c = RunContext::new(other, reference_batch(2)).expect("Valid configuration");
    assert_ne!(
        a.trial_payoffs(1).expect("Valid swaption index"),
        c.trial_payoffs(1).expect("Valid swaption index")
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_prices_invariant_to_partition_count(
        num_trials in 2usize..600,
        block_size in 1usize..40,
        partitions_a in 1usize..32,
        partitions_b in 1usize..32,
        workers in 1usize..6,
    ) {
        let a = RunContext::new(config(num_trials, block_size, partitions_a, workers), reference_batch(2))
            .expect("Valid configuration")
            .price_all()
            .expect("Pricing should succeed");
        let b = RunContext::new(config(num_trials, block_size, partitions_b, 1), reference_batch(2))
            .expect("Valid configuration")
            .price_all()
            .expect("Pricing should succeed");

        for (x, y) in a.iter().zip(&b) {
            prop_assert_eq!(x.trials, num_trials);
            prop_assert!(x.mean >= 0.0 && x.std_error >= 0.0);
            assert_relative_eq!(x.mean, y.mean, epsilon = 1e-14, max_relative = 1e-12);
            assert_relative_eq!(x.std_error, y.std_error, epsilon = 1e-12, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_any_split_of_payoffs_aggregates_alike(
        payoffs in prop::collection::vec(0.0f64..2.0, 2..300),
        parts in 1usize..20,
    ) {
        let n = payoffs.len();
        let mut whole = PartialSums::new();
        payoffs.iter().for_each(|&p| whole.add(p));

        let split: Vec<PartialSums> = even_ranges(n, parts)
            .into_iter()
            .map(|r| {
                let mut acc = PartialSums::new();
                payoffs[r].iter().for_each(|&p| acc.add(p));
                acc
            })
            .collect();

        let lhs = aggregate(&[whole], n).expect("Valid trial count");
        let rhs = aggregate(&split, n).expect("Valid trial count");
        prop_assert_eq!(lhs.trials, rhs.trials);
        assert_relative_eq!(lhs.mean, rhs.mean, epsilon = 1e-14, max_relative = 1e-12);
        assert_relative_eq!(lhs.std_error, rhs.std_error, epsilon = 1e-10, max_relative = 1e-8);
    }
}
