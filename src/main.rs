use std::env;

use tracing::{info, Level};

use cavity_rs::json_io::{JsonOutputManager, DEFAULT_DOWNSAMPLE, DEFAULT_FRAME_SKIP};
use cavity_rs::{CavitySolver, SimulationConfig};

/// Usage: `cavity-rs [config.json] [output.json]`
fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::default(),
    };
    let output_path = args.next();

    let mut solver = CavitySolver::from_config(config)?;
    let result = solver.run()?;

    let last = result.num_steps();
    if let Some(frame) = result.frame(last) {
        info!(
            "Final state at t = {:.4}: max speed = {:.4}, max |curl| = {:.4}",
            frame.time,
            frame.speed.max(),
            frame.curl.amax()
        );
    }

    if let Some(path) = output_path {
        let manager = JsonOutputManager::new(path, DEFAULT_FRAME_SKIP, DEFAULT_DOWNSAMPLE)?;
        manager.write(&result, solver.grid(), solver.config())?;
    }

    Ok(())
}
