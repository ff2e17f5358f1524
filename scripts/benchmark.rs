// scripts/benchmark.rs
use hjm_swaptions::math_utils::Timer;
use hjm_swaptions::mc::engine::{PricingConfig, RunContext};
use hjm_swaptions::mc::executor::{ExecutorKind, SerialExecutor, ThreadPoolExecutor};
use hjm_swaptions::models::swaption::reference_batch;
use hjm_swaptions::output::write_summary_to_csv;
use hjm_swaptions::rng::NormalGenerator;
use hjm_swaptions::SwaptionPrice;
use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::process::Command;

const SWAPTIONS: usize = 16;
const TRIALS: usize = 20_000;

#[derive(Debug)]
struct SystemInfo {
    os: String,
    cpu_model: String,
    cpu_cores: usize,
    rust_version: String,
    rustc_flags: String,
}

impl SystemInfo {
    fn gather() -> Self {
        let cpu_model = std::fs::read_to_string("/proc/cpuinfo")
            .ok()
            .and_then(|content| {
                content
                    .lines()
                    .find(|line| line.starts_with("model name"))
                    .and_then(|line| line.split(':').nth(1))
                    .map(|s| s.trim().to_string())
            })
            .unwrap_or_else(|| "Unknown CPU".to_string());
        let rust_version = Command::new("rustc")
            .arg("--version")
            .output()
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
            .unwrap_or_else(|_| "Unknown Rust version".to_string());

        Self {
            os: env::consts::OS.to_string(),
            cpu_model,
            cpu_cores: num_cpus::get(),
            rust_version,
            rustc_flags: env::var("RUSTFLAGS").unwrap_or_else(|_| "default".to_string()),
        }
    }
}

#[derive(Debug)]
struct BenchmarkResult {
    name: String,
    workers: usize,
    time_ms: f64,
    trials_per_sec: f64,
    first_price: f64,
    max_abs_diff: f64,
}

fn config(workers: usize, generator: NormalGenerator) -> PricingConfig {
    PricingConfig {
        num_trials: TRIALS,
        workers,
        generator,
        executor: ExecutorKind::ThreadPool,
        ..Default::default()
    }
}

fn max_abs_diff(a: &[SwaptionPrice], b: &[SwaptionPrice]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x.mean - y.mean).abs())
        .fold(0.0, f64::max)
}

fn run_scaling_benchmarks(generator: NormalGenerator) -> hjm_swaptions::SwaptionResult<Vec<BenchmarkResult>> {
    let mut results = Vec::new();
    let max_workers = num_cpus::get().max(1);

    let ctx = RunContext::new(config(max_workers, generator), reference_batch(SWAPTIONS))?;
    let mut timer = Timer::new();
    timer.start();
    let baseline = ctx.price_with(&SerialExecutor)?;
    let serial_ms = timer.elapsed_ms();
    results.push(BenchmarkResult {
        name: format!("serial ({:?})", generator),
        workers: 1,
        time_ms: serial_ms,
        trials_per_sec: (SWAPTIONS * TRIALS) as f64 / (serial_ms / 1000.0),
        first_price: baseline[0].mean,
        max_abs_diff: 0.0,
    });

    let mut workers = 1;
    while workers <= max_workers {
        println!("Benchmarking {} workers ({:?})...", workers, generator);
        let executor = ThreadPoolExecutor::new(workers)?;
        timer.start();
        let prices = ctx.price_with(&executor)?;
        let time_ms = timer.elapsed_ms();
        results.push(BenchmarkResult {
            name: format!("thread-pool ({:?})", generator),
            workers: executor.workers(),
            time_ms,
            trials_per_sec: (SWAPTIONS * TRIALS) as f64 / (time_ms / 1000.0),
            first_price: prices[0].mean,
            max_abs_diff: max_abs_diff(&baseline, &prices),
        });
        workers *= 2;
    }

    Ok(results)
}

fn write_results_to_csv(results: &[BenchmarkResult], info: &SystemInfo, filename: &str) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "# OS: {}", info.os)?;
    writeln!(file, "# CPU: {}", info.cpu_model)?;
    writeln!(file, "# CPU Cores: {}", info.cpu_cores)?;
    writeln!(file, "# Rust Version: {}", info.rust_version)?;
    writeln!(file, "# RUSTFLAGS: {}", info.rustc_flags)?;
    writeln!(
        file,
        "# Benchmark Date: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(file, "Benchmark,Workers,Time_ms,Trials_per_sec,Swaption0,Max_Abs_Diff")?;
    for r in results {
        writeln!(
            file,
            "{},{},{:.2},{:.0},{:.10},{:e}",
            r.name, r.workers, r.time_ms, r.trials_per_sec, r.first_price, r.max_abs_diff
        )?;
    }
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    println!("hjm-swaptions Scaling Benchmark");
    println!("===============================\n");

    let info = SystemInfo::gather();
    println!("  OS: {}", info.os);
    println!("  CPU: {}", info.cpu_model);
    println!("  CPU Cores: {}", info.cpu_cores);
    println!("  Rust Version: {}\n", info.rust_version);

    let mut all_results = Vec::new();
    for generator in [NormalGenerator::Counter, NormalGenerator::StdNormal] {
        match run_scaling_benchmarks(generator) {
            Ok(results) => all_results.extend(results),
            Err(e) => {
                eprintln!("benchmark failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    println!("\n{:=<80}", "");
    println!(
        "{:<28} {:>8} {:>12} {:>15} {:>12} {:>10}",
        "Benchmark", "Workers", "Time (ms)", "Trials/s", "Swaption0", "Max Diff"
    );
    println!("{:-<80}", "");
    for r in &all_results {
        println!(
            "{:<28} {:>8} {:>12.2} {:>15.0} {:>12.8} {:>10.1e}",
            r.name, r.workers, r.time_ms, r.trials_per_sec, r.first_price, r.max_abs_diff
        );
    }
    println!("{:=<80}", "");

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("benchmark_results_{}.csv", timestamp);
    let summary_file = format!("benchmark_summary_{}.csv", timestamp);
    let swaptions = SWAPTIONS.to_string();
    let trials = TRIALS.to_string();
    let outcome = write_results_to_csv(&all_results, &info, &filename).and_then(|_| {
        write_summary_to_csv(
            &summary_file,
            &[("swaptions", swaptions.as_str()), ("trials", trials.as_str())],
        )
    });
    match outcome {
        Ok(()) => println!("Results saved to: {}", filename),
        Err(e) => eprintln!("could not write results: {}", e),
    }
}
