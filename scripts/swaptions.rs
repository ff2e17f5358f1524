// scripts/swaptions.rs
use clap::Parser;
use hjm_swaptions::error::validation::MAX_WORKERS;
use hjm_swaptions::math_utils::Timer;
use hjm_swaptions::mc::engine::{PricingConfig, RunContext};
use hjm_swaptions::mc::executor::ExecutorKind;
use hjm_swaptions::models::swaption::reference_batch;
use hjm_swaptions::output::{write_price_lines, write_prices_to_csv, ReportColumns};
use hjm_swaptions::rng::NormalGenerator;
use hjm_swaptions::SwaptionKind;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "swaptions", about = "Price a batch of swaptions under a multi-factor HJM model")]
struct Args {
    /// Number of swaptions in the reference batch
    #[arg(long, default_value_t = 16)]
    swaptions: usize,
    /// Monte Carlo trials per swaption
    #[arg(long, default_value_t = 10_000)]
    trials: usize,
    /// Worker threads (defaults to the number of logical CPUs)
    #[arg(long)]
    threads: Option<usize>,
    #[arg(long, default_value_t = 16)]
    block_size: usize,
    #[arg(long, default_value_t = 100)]
    seed: u64,
    /// Block ranges per swaption; fixes the reduction order
    #[arg(long, default_value_t = 64)]
    partitions: usize,
    /// Normal generator: counter or std
    #[arg(long, default_value = "counter")]
    generator: NormalGenerator,
    /// Executor backend: serial or thread-pool
    #[arg(long, default_value = "thread-pool")]
    executor: ExecutorKind,
    /// Price payer instead of receiver swaptions
    #[arg(long)]
    payer: bool,
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Also write prices, errors and 95% intervals to this CSV file
    #[arg(long)]
    csv: Option<String>,
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = PricingConfig {
        num_trials: args.trials,
        block_size: args.block_size,
        workers: args
            .threads
            .unwrap_or_else(|| num_cpus::get().clamp(1, MAX_WORKERS)),
        trial_partitions: args.partitions,
        seed: args.seed,
        generator: args.generator,
        executor: args.executor,
    };

    let mut batch = reference_batch(args.swaptions);
    if args.payer {
        batch.iter_mut().for_each(|s| s.kind = SwaptionKind::Payer);
    }

    let mut timer = Timer::new();
    timer.start();
    let ctx = RunContext::new(config, batch)?;
    let prices = ctx.price_all()?;
    tracing::info!(elapsed_ms = timer.elapsed_ms(), "done");

    write_price_lines(&mut io::stdout().lock(), &prices)?;

    if let Some(path) = args.csv {
        let columns = ReportColumns::PRICE
            | ReportColumns::STD_ERROR
            | ReportColumns::CONFIDENCE_95
            | ReportColumns::TRIALS;
        write_prices_to_csv(&path, ctx.swaptions(), &prices, columns)?;
        tracing::info!(path = %path, "wrote price report");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(&args.log_level);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
