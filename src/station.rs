//! Receiving entities: groundstations and the relay satellite
//!
//! A groundstation runs every transmission addressed to it through the
//! physical layer, decodes the result, and folds it into its own
//! `TrackStore`. The satellite does no decoding at all: whatever bits
//! survive the uplink are buffered and relayed to every groundstation on
//! the next step.

use crossbeam_channel::Sender;
use tracing::{debug, warn};

use crate::channel::ChannelModel;
use crate::codec::{self, DecodeOutcome};
use crate::mover::haversine_km;
use crate::track::{PositionFix, TrackStore};
use crate::transmission::Transmission;

pub struct Groundstation {
    pub id: String,
    /// Antenna site as (lon, lat) degrees.
    pub position: (f64, f64),
    pub range_m: f64,
    pub store: TrackStore,
}

impl Groundstation {
    pub fn new(id: &str, position: (f64, f64), range_m: f64) -> Self {
        Self {
            id: id.to_string(),
            position,
            range_m,
            store: TrackStore::new(),
        }
    }

    /// Line-of-sight gate for direct plane-to-ground reception.
    pub fn in_range(&self, position: (f64, f64)) -> bool {
        let dist_m =
            haversine_km(self.position.1, self.position.0, position.1, position.0) * 1000.0;
        dist_m <= self.range_m
    }

    /// Deliver one batch: transmit and decode everything addressed to
    /// this station, emitting a fix for every report that resolved.
    pub fn receive(&mut self, batch: &mut [Transmission], fixes: &Sender<PositionFix>) {
        let id = self.id.clone();
        for item in batch.iter_mut().filter(|t| t.destination == id) {
            let received = match item.transmit() {
                Ok(hex) => hex,
                Err(e) => {
                    warn!(station = %id, error = %e, "undecodable transmission payload");
                    continue;
                }
            };

            let outcome = match codec::decode(&received) {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(station = %id, error = %e, "malformed frame from link");
                    continue;
                }
            };

            if let DecodeOutcome::ChecksumFailure { .. } = outcome {
                debug!(station = %id, source = %item.source, "checksum failure");
            }

            let resolved = self.store.record(&outcome);
            if let (Some((lat, lon)), DecodeOutcome::Position(report)) = (resolved, &outcome) {
                let fix = PositionFix {
                    receiver: id.clone(),
                    address: report.prefix.address.clone(),
                    lon,
                    lat,
                    altitude_m: report.altitude_m,
                };
                if fixes.try_send(fix).is_err() {
                    warn!(station = %id, "fix channel full, dropping fix");
                }
            }
        }
    }
}

/// Relay satellite: store-and-forward with a one-timestep delay.
pub struct CommSat {
    pub id: String,
    buffer: Vec<String>,
}

impl CommSat {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            buffer: Vec::new(),
        }
    }

    /// Take delivery of everything addressed to the satellite. The
    /// received bits go into the relay buffer as-is, damage included.
    pub fn receive(&mut self, batch: &mut [Transmission]) {
        let id = self.id.clone();
        for item in batch.iter_mut().filter(|t| t.destination == id) {
            match item.transmit() {
                Ok(hex) => self.buffer.push(hex),
                Err(e) => warn!(sat = %id, error = %e, "undecodable transmission payload"),
            }
        }
    }

    /// Drain the buffer into downlink transmissions, one per
    /// groundstation, on a fresh channel instance each.
    pub fn relay<F>(&mut self, station_ids: &[String], mut make_channel: F) -> Vec<Transmission>
    where
        F: FnMut() -> ChannelModel,
    {
        let mut downlink = Vec::with_capacity(self.buffer.len() * station_ids.len());
        for frame in self.buffer.drain(..) {
            for station in station_ids {
                downlink.push(Transmission::new(
                    frame.clone(),
                    self.id.clone(),
                    station.clone(),
                    make_channel(),
                ));
            }
        }
        downlink
    }

    #[allow(dead_code)]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, FadingModel};
    use crate::cpr::CprParity;
    use crossbeam_channel::bounded;

    const HANOI: (f64, f64) = (105.8088, 21.0285);

    fn clean_channel(seed: u64) -> ChannelModel {
        let config = ChannelConfig {
            snr_db: 120.0,
            fading: FadingModel::Rician,
            ..ChannelConfig::default()
        };
        ChannelModel::with_seed(config, seed)
    }

    fn position_frame(parity: CprParity) -> String {
        codec::encode_position(
            17, 5, 0x40621D, 0, false, 10_000.0, 21.0285, 105.8048, false, 11, parity,
        )
    }

    #[test]
    fn test_in_range_gate() {
        let gs = Groundstation::new("HAN", HANOI, 370_000.0);
        assert!(gs.in_range((105.81, 21.03)));
        // Saigon is about 1150 km out.
        assert!(!gs.in_range((106.6602, 10.7626)));
    }

    #[test]
    fn test_receive_resolves_pair_and_emits_fix() {
        let mut gs = Groundstation::new("HAN", HANOI, 370_000.0);
        let (tx, rx) = bounded(16);

        let mut batch = vec![
            Transmission::new(
                position_frame(CprParity::Even),
                "40621D".into(),
                "HAN".into(),
                clean_channel(1),
            ),
            Transmission::new(
                position_frame(CprParity::Odd),
                "40621D".into(),
                "HAN".into(),
                clean_channel(2),
            ),
            // Addressed elsewhere; must be ignored.
            Transmission::new(
                position_frame(CprParity::Odd),
                "40621D".into(),
                "SGN".into(),
                clean_channel(3),
            ),
        ];
        gs.receive(&mut batch, &tx);

        assert_eq!(gs.store.frames_received(), 2);
        let fix = rx.try_recv().expect("pair should produce a fix");
        assert_eq!(fix.receiver, "HAN");
        assert_eq!(fix.address, "40621D");
        assert!((fix.lat - 21.0285).abs() < 1e-4);
        assert!((fix.lon - 105.8048).abs() < 1e-4);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_sat_buffers_then_relays() {
        let mut sat = CommSat::new("SAT1");
        let mut batch = vec![Transmission::new(
            position_frame(CprParity::Even),
            "40621D".into(),
            "SAT1".into(),
            clean_channel(4),
        )];
        sat.receive(&mut batch);
        assert_eq!(sat.buffered(), 1);

        let stations = vec!["HAN".to_string(), "SGN".to_string()];
        let mut seed = 10;
        let downlink = sat.relay(&stations, || {
            seed += 1;
            clean_channel(seed)
        });

        assert_eq!(downlink.len(), 2);
        assert_eq!(sat.buffered(), 0);
        assert!(downlink.iter().any(|t| t.destination == "HAN"));
        assert!(downlink.iter().any(|t| t.destination == "SGN"));
        for t in &downlink {
            assert_eq!(t.source, "SAT1");
            assert_eq!(t.frame_hex, position_frame(CprParity::Even));
        }
    }
}
