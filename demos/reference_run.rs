// demos/reference_run.rs
use hjm_swaptions::math_utils::Timer;
use hjm_swaptions::mc::engine::{PricingConfig, RunContext};
use hjm_swaptions::mc::executor::{ExecutorKind, SerialExecutor};
use hjm_swaptions::models::swaption::reference_batch;
use hjm_swaptions::output::{format_price_line, write_prices_to_csv, ReportColumns};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let csv = args.iter().any(|a| a == "--csv");

    // Reference scenario: 11-point grid, 3 factors, 5.5 years, 10 000 trials.
    let config = PricingConfig {
        num_trials: 10_000,
        block_size: 16,
        seed: 100,
        executor: ExecutorKind::ThreadPool,
        ..Default::default()
    };
    println!(
        "Pricing 8 reference swaptions with {} trials on {} workers",
        config.num_trials, config.workers
    );

    let ctx = RunContext::new(config, reference_batch(8)).expect("Valid configuration");
    println!(
        "Random pool: {} draws, seed {}, {:?} generator",
        ctx.pool().len(),
        ctx.pool().seed(),
        ctx.pool().generator()
    );

    let mut timer = Timer::new();
    timer.start();
    let prices = ctx.price_all().expect("Pricing should succeed");
    let parallel_ms = timer.elapsed_ms();

    timer.start();
    let serial = ctx.price_with(&SerialExecutor).expect("Pricing should succeed");
    let serial_ms = timer.elapsed_ms();

    for (i, price) in prices.iter().enumerate() {
        let (lo, hi) = price.confidence_interval(0.95).unwrap_or((f64::NAN, f64::NAN));
        println!("{}  95% CI [{:.6}, {:.6}]", format_price_line(i, price), lo, hi);
    }

    let identical = prices == serial;
    println!("\nThread pool: {:.2} ms, serial: {:.2} ms", parallel_ms, serial_ms);
    println!("Serial and thread-pool results identical: {}", identical);

    if csv {
        let columns = ReportColumns::all();
        match write_prices_to_csv("reference_prices.csv", ctx.swaptions(), &prices, columns) {
            Ok(()) => println!("Wrote reference_prices.csv"),
            Err(e) => eprintln!("could not write CSV: {}", e),
        }
    }
}
