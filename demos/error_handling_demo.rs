// demos/error_handling_demo.rs
use hjm_swaptions::error::SwaptionError;
use hjm_swaptions::mc::engine::{price_swaptions, PricingConfig};
use hjm_swaptions::models::swaption::{reference_batch, SwaptionParams};

fn small_config() -> PricingConfig {
    PricingConfig {
        num_trials: 2_000,
        workers: 2,
        ..Default::default()
    }
}

fn report(result: Result<Vec<hjm_swaptions::SwaptionPrice>, SwaptionError>) {
    match result {
        Ok(prices) => println!("   Unexpected: priced {} swaptions", prices.len()),
        Err(e) => println!("   ✓ Caught error: {}", e),
    }
}

fn main() {
    println!("Error Handling Demo for hjm-swaptions");
    println!("=====================================\n");

    println!("1. Testing a single trial (standard error undefined)...");
    let cfg = PricingConfig {
        num_trials: 1,
        ..small_config()
    };
    report(price_swaptions(cfg, reference_batch(1)));

    println!("\n2. Testing a maturity that is not a whole number of steps...");
    let mut params = SwaptionParams::reference(0, 0.05);
    params.maturity = 1.2;
    report(price_swaptions(small_config(), vec![params]));

    println!("\n3. Testing a factor-loading matrix of the wrong shape...");
    let mut params = SwaptionParams::reference(0, 0.05);
    params.factors = 2;
    report(price_swaptions(small_config(), vec![params]));

    println!("\n4. Testing a swap that runs past the simulated horizon...");
    let mut params = SwaptionParams::reference(0, 0.05);
    params.tenor = 10.0;
    report(price_swaptions(small_config(), vec![params]));

    println!("\n5. Testing a worker count of zero...");
    let cfg = PricingConfig {
        workers: 0,
        ..small_config()
    };
    report(price_swaptions(cfg, reference_batch(1)));

    println!("\n6. Testing an empty batch...");
    report(price_swaptions(small_config(), Vec::new()));

    println!("\n7. Pricing a valid batch...");
    match price_swaptions(small_config(), reference_batch(2)) {
        Ok(prices) => {
            for (i, p) in prices.iter().enumerate() {
                println!("   ✓ Swaption{}: {:.6} ± {:.6}", i, p.mean, p.std_error);
            }
        }
        Err(e) => println!("   Unexpected error: {}", e),
    }

    println!("\nError handling demo complete!");
}
