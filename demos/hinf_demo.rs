//! Demonstration of H-infinity synthesis with hinfsyn
//!
//! Designs a controller for an unstable first-order plant, then checks the
//! closed loop: stability and the peak gain from w to z.
//!
//! Run with `RUST_LOG=info` to see the γ trace.

use hinfsyn_rs::closed_loop::lower_lft;
use hinfsyn_rs::{hinfsyn, GeneralizedPlant, SynthesisOptions};
use ndarray::{arr2, Array1, Array2};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("=== H-infinity Synthesis Demonstration ===\n");

    // dx/dt = x + w1 + u,  z = [x; u],  y = x + w2
    let plant = GeneralizedPlant::new(
        arr2(&[[1.0]]),
        arr2(&[[1.0, 0.0]]),
        arr2(&[[1.0]]),
        arr2(&[[1.0], [0.0]]),
        arr2(&[[1.0]]),
        Array2::zeros((2, 2)),
        arr2(&[[0.0], [1.0]]),
        arr2(&[[0.0, 1.0]]),
        Array2::zeros((1, 1)),
    )?;

    let options = SynthesisOptions::new().with_verbose(true);
    println!("Searching gamma in {:?}, {} iterations", options.interval, options.max_iter);

    let result = hinfsyn(&plant, &options)?;
    let (controller, gamma) = match (result.controller, result.gamma) {
        (Some(k), Some(g)) => (k, g),
        _ => {
            println!("No feasible controller in the search interval");
            return Ok(());
        }
    };

    println!("\nAchieved gamma = {:.6}", gamma);
    println!("Optimal gamma  = {:.6} (1 + sqrt 3)", 1.0 + 3f64.sqrt());

    println!("\nController:");
    println!("Ac = {:?}", controller.a);
    println!("Bc = {:?}", controller.b);
    println!("Cc = {:?}", controller.c);
    println!("Dc = {:?}", controller.d);

    let closed = lower_lft(&plant, &controller)?;
    let freqs = Array1::logspace(10.0, -3.0, 3.0, 200);
    let peak = closed.peak_gain(freqs.as_slice().unwrap_or(&[]))?;

    println!("\n=== Closed Loop ===");
    println!("Stable: {}", closed.is_stable()?);
    println!("Peak gain over frequency grid: {:.6} (< gamma: {})", peak, peak < gamma);

    Ok(())
}
