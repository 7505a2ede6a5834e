//! linksim1090: an air-traffic surveillance link simulator
//!
//! Aircraft broadcast 112-bit extended squitter frames which cross a
//! BPSK fading channel to groundstations, directly and via a relay
//! satellite. Groundstations decode what survives, pair even/odd CPR
//! reports, and account for what the channel destroyed.

mod bits;
mod channel;
mod codec;
mod config;
mod cpr;
mod crc;
mod mover;
mod sim;
mod station;
mod track;
mod transmission;

use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::config::Config;
use crate::sim::Simulation;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_args();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
    info!("linksim1090 starting...");
    info!("Configuration: {:?}", config);

    let json = config.json;
    let mut simulation = Simulation::with_default_scenario(config);
    let report = simulation.run();

    println!(
        "Total time passed in simulation: {:.1} min ({} steps)",
        report.sim_seconds / 60.0,
        report.steps
    );
    for station in &report.stations {
        println!(
            "{}: {} frames received, {} corrupted ({:.1}%)",
            station.id,
            station.frames_received,
            station.checksum_failures,
            station.corrupted_message_rate * 100.0
        );
    }
    println!("Resolved fixes: {}", report.fixes.len());

    if json {
        println!("{}", serde_json::to_string_pretty(&report.fixes)?);
    }

    Ok(())
}
