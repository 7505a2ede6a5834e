//! Step-synchronous link simulation
//!
//! One discrete loop: advance every plane, collect the step's outbound
//! transmissions into a single batch, let the satellite relay what it
//! buffered last step, then deliver the batch to the satellite and every
//! groundstation before the clock moves. The codec and channel calls are
//! pure per transmission; the only mutable state per receiver is its own
//! `TrackStore`.

use crossbeam_channel::bounded;
use rand::RngCore;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::channel::{ChannelConfig, ChannelModel};
use crate::config::Config;
use crate::mover::Plane;
use crate::station::{CommSat, Groundstation};
use crate::track::PositionFix;
use crate::transmission::Transmission;

const FIX_CHANNEL_CAPACITY: usize = 1024;

/// End-of-run accounting for one groundstation.
#[derive(Debug, Clone, Serialize)]
pub struct StationSummary {
    pub id: String,
    pub frames_received: u64,
    pub checksum_failures: u64,
    pub corrupted_message_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct SimReport {
    pub sim_seconds: f64,
    pub steps: u64,
    pub fixes: Vec<PositionFix>,
    pub stations: Vec<StationSummary>,
}

pub struct Simulation {
    config: Config,
    planes: Vec<Plane>,
    stations: Vec<Groundstation>,
    sat: CommSat,
    rng: ChaCha8Rng,
}

impl Simulation {
    pub fn new(
        config: Config,
        planes: Vec<Plane>,
        stations: Vec<Groundstation>,
        sat: CommSat,
    ) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            planes,
            stations,
            sat,
            rng,
        }
    }

    /// Two airliners crossing between Hanoi and Saigon, one relay
    /// satellite over the South China Sea.
    pub fn with_default_scenario(config: Config) -> Self {
        let hanoi = (105.808_817, 21.028_511);
        let saigon = (106.660_172, 10.762_622);

        let planes = vec![
            Plane::new(
                0x40621D,
                "TUAN01",
                hanoi,
                config.plane_altitude_m,
                config.plane_speed_mps,
                vec![saigon],
            ),
            Plane::new(
                0x888151,
                "HVN205",
                saigon,
                config.plane_altitude_m,
                config.plane_speed_mps,
                vec![hanoi],
            ),
        ];
        let stations = vec![
            Groundstation::new("HAN", hanoi, config.ground_range_m),
            Groundstation::new("SGN", saigon, config.ground_range_m),
        ];

        Self::new(config, planes, stations, CommSat::new("SAT1"))
    }

    fn plane_to_ground_config(&self) -> ChannelConfig {
        ChannelConfig {
            carrier_hz: self.config.adsb_carrier_hz,
            snr_db: self.config.plane_to_ground_snr_db,
            fading: self.config.fading,
            samples_per_symbol: self.config.samples_per_symbol,
        }
    }

    fn plane_to_sat_config(&self) -> ChannelConfig {
        ChannelConfig {
            carrier_hz: self.config.adsb_carrier_hz,
            snr_db: self.config.plane_to_sat_snr_db,
            fading: self.config.fading,
            samples_per_symbol: self.config.samples_per_symbol,
        }
    }

    fn sat_to_ground_config(&self) -> ChannelConfig {
        ChannelConfig {
            carrier_hz: self.config.sat_carrier_hz,
            snr_db: self.config.sat_to_ground_snr_db,
            fading: self.config.fading,
            samples_per_symbol: self.config.samples_per_symbol,
        }
    }

    /// Run until every plane reaches its last waypoint (or the time cap
    /// trips), then drain the satellite's final buffer.
    pub fn run(&mut self) -> SimReport {
        let dt = self.config.timestep_s;
        let ident_every = (self.config.ident_period_s / dt).round().max(1.0) as u64;
        let station_ids: Vec<String> = self.stations.iter().map(|s| s.id.clone()).collect();

        let ground_cfg = self.plane_to_ground_config();
        let uplink_cfg = self.plane_to_sat_config();
        let downlink_cfg = self.sat_to_ground_config();

        let (fix_tx, fix_rx) = bounded(FIX_CHANNEL_CAPACITY);
        let mut fixes = Vec::new();

        let mut time = 0.0;
        let mut step: u64 = 0;

        info!(
            planes = self.planes.len(),
            stations = self.stations.len(),
            "simulation starting"
        );

        loop {
            let mut batch: Vec<Transmission> = Vec::new();
            let mut all_arrived = true;

            // Advance movers and collect this step's broadcasts.
            for plane in &mut self.planes {
                if plane.at_destination() {
                    continue;
                }
                all_arrived = false;
                plane.update_pos(dt);

                let mut frames = vec![plane.position_frame()];
                // Identification broadcasts run at 0.2 Hz.
                if step % ident_every == 0 {
                    frames.push(plane.identification_frame());
                }

                for frame in frames {
                    for station in &self.stations {
                        if station.in_range(plane.position) {
                            batch.push(Transmission::new(
                                frame.clone(),
                                plane.hex_addr.clone(),
                                station.id.clone(),
                                ChannelModel::with_seed(ground_cfg, self.rng.next_u64()),
                            ));
                        }
                    }
                    batch.push(Transmission::new(
                        frame,
                        plane.hex_addr.clone(),
                        self.sat.id.clone(),
                        ChannelModel::with_seed(uplink_cfg, self.rng.next_u64()),
                    ));
                }
            }

            // Last step's uplink traffic comes back down now.
            let rng = &mut self.rng;
            batch.extend(self.sat.relay(&station_ids, || {
                ChannelModel::with_seed(downlink_cfg, rng.next_u64())
            }));

            // Deliver the batch.
            self.sat.receive(&mut batch);
            for station in &mut self.stations {
                station.receive(&mut batch, &fix_tx);
            }
            while let Ok(fix) = fix_rx.try_recv() {
                fixes.push(fix);
            }

            time += dt;
            step += 1;

            if all_arrived {
                break;
            }
            if time >= self.config.max_sim_s {
                warn!(time, "time cap reached before all planes arrived");
                break;
            }
        }

        // The satellite may still hold the final step's uplink frames.
        let rng = &mut self.rng;
        let mut tail = self.sat.relay(&station_ids, || {
            ChannelModel::with_seed(downlink_cfg, rng.next_u64())
        });
        for station in &mut self.stations {
            station.receive(&mut tail, &fix_tx);
        }
        while let Ok(fix) = fix_rx.try_recv() {
            fixes.push(fix);
        }

        info!(
            minutes = time / 60.0,
            fixes = fixes.len(),
            "simulation finished"
        );

        let stations = self
            .stations
            .iter()
            .map(|s| StationSummary {
                id: s.id.clone(),
                frames_received: s.store.frames_received(),
                checksum_failures: s.store.checksum_failures(),
                corrupted_message_rate: s.store.corrupted_message_rate(),
            })
            .collect();

        SimReport {
            sim_seconds: time,
            steps: step,
            fixes,
            stations,
        }
    }
}
