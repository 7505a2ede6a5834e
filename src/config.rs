//! Configuration and command-line argument parsing

use std::env;

use crate::channel::FadingModel;

#[derive(Debug, Clone)]
pub struct Config {
    // Timing
    /// Simulation timestep in seconds. 0.5 s matches the position
    /// publishing rate.
    pub timestep_s: f64,
    /// Hard cap on simulated time, as a runaway guard.
    pub max_sim_s: f64,
    /// Identification broadcast period in seconds (0.2 Hz).
    pub ident_period_s: f64,

    // Link budget
    pub plane_to_ground_snr_db: f64,
    pub plane_to_sat_snr_db: f64,
    pub sat_to_ground_snr_db: f64,
    pub fading: FadingModel,
    pub samples_per_symbol: usize,

    // Carriers
    /// 1090 MHz extended squitter carrier.
    pub adsb_carrier_hz: f64,
    /// 1616 MHz satellite uplink/downlink carrier.
    pub sat_carrier_hz: f64,

    // Geometry
    pub ground_range_m: f64,
    pub plane_speed_mps: f64,
    pub plane_altitude_m: f64,

    // Run control
    pub seed: u64,
    /// Dump resolved fixes as JSON at exit.
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timestep_s: 0.5,
            max_sim_s: 7200.0,
            ident_period_s: 5.0,
            plane_to_ground_snr_db: 12.0,
            plane_to_sat_snr_db: 6.1,
            sat_to_ground_snr_db: 6.1,
            fading: FadingModel::Rayleigh,
            samples_per_symbol: 48,
            adsb_carrier_hz: 1_090_000_000.0,
            sat_carrier_hz: 1_616_000_000.0,
            ground_range_m: 370_000.0,
            plane_speed_mps: 250.0,
            plane_altitude_m: 10_000.0,
            seed: 1090,
            json: false,
        }
    }
}

impl Config {
    pub fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Config::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--timestep" => {
                    i += 1;
                    config.timestep_s = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(0.5);
                }
                "--max-time" => {
                    i += 1;
                    config.max_sim_s = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(7200.0);
                }
                "--snr-ground" => {
                    i += 1;
                    config.plane_to_ground_snr_db =
                        args.get(i).and_then(|s| s.parse().ok()).unwrap_or(12.0);
                }
                "--snr-sat" => {
                    i += 1;
                    let snr = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(6.1);
                    config.plane_to_sat_snr_db = snr;
                    config.sat_to_ground_snr_db = snr;
                }
                "--rician" => config.fading = FadingModel::Rician,
                "--rayleigh" => config.fading = FadingModel::Rayleigh,
                "--samples-per-symbol" => {
                    i += 1;
                    let sps = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(48);
                    config.samples_per_symbol = if sps == 96 { 96 } else { 48 };
                }
                "--range" => {
                    i += 1;
                    config.ground_range_m = args
                        .get(i)
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(370_000.0);
                }
                "--speed" => {
                    i += 1;
                    config.plane_speed_mps =
                        args.get(i).and_then(|s| s.parse().ok()).unwrap_or(250.0);
                }
                "--altitude" => {
                    i += 1;
                    config.plane_altitude_m =
                        args.get(i).and_then(|s| s.parse().ok()).unwrap_or(10_000.0);
                }
                "--seed" => {
                    i += 1;
                    config.seed = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(1090);
                }
                "--json" => config.json = true,
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown option: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        config
    }
}

fn print_help() {
    println!(
        r#"linksim1090 - surveillance link simulator

Usage: linksim1090 [OPTIONS]

Options:
  --timestep <s>           Simulation timestep (default: 0.5)
  --max-time <s>           Stop after this much simulated time (default: 7200)
  --snr-ground <db>        Plane-to-groundstation SNR (default: 12)
  --snr-sat <db>           Satellite link SNR, both hops (default: 6.1)
  --rayleigh               Rayleigh fading on all links (default)
  --rician                 Rician fading on all links
  --samples-per-symbol <n> 48 or 96 (default: 48)
  --range <m>              Groundstation antenna range (default: 370000)
  --speed <m/s>            Plane speed (default: 250)
  --altitude <m>           Plane cruise altitude (default: 10000)
  --seed <n>               Master seed for fading/noise draws (default: 1090)
  --json                   Print resolved fixes as JSON at exit
  --help                   Show this help
"#
    );
}
