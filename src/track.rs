//! Per-receiver report history and position resolution
//!
//! Each receiving entity owns exactly one `TrackStore`; the codec never
//! touches it. Position reports are appended in arrival order, keyed by
//! source address, and never evicted. Resolution pairs the newest report
//! with the most recent opposite-parity entry for the same address, so a
//! lone report is simply "not yet resolvable".

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::codec::{AltitudeSource, DecodeOutcome, IdentificationReport, PositionReport};
use crate::cpr::{self, RawPosition};

const CPR_SCALE: f64 = 131072.0;

/// One appended position report plus whatever it resolved to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionEntry {
    pub raw: RawPosition,
    pub time_flag: bool,
    pub altitude_m: f64,
    pub altitude_source: AltitudeSource,
    /// Global position, present once a complementary-parity partner
    /// existed at append time.
    pub resolved: Option<(f64, f64)>,
}

/// A successfully resolved position fix, as handed to the consumer side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionFix {
    pub receiver: String,
    pub address: String,
    /// Degrees east.
    pub lon: f64,
    /// Degrees north.
    pub lat: f64,
    pub altitude_m: f64,
}

/// Append-only report history for one receiver.
#[derive(Debug, Default)]
pub struct TrackStore {
    histories: HashMap<String, Vec<PositionEntry>>,
    callsigns: HashMap<String, String>,
    next_seq: u64,
    frames_received: u64,
    checksum_failures: u64,
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one decode outcome into the store. Returns the resolved
    /// position when this report completed a usable even/odd pair.
    pub fn record(&mut self, outcome: &DecodeOutcome) -> Option<(f64, f64)> {
        self.frames_received += 1;
        match outcome {
            DecodeOutcome::ChecksumFailure { .. } => {
                self.checksum_failures += 1;
                None
            }
            DecodeOutcome::Identification(report) => {
                self.record_identification(report);
                None
            }
            DecodeOutcome::Position(report) => self.append_position(report),
            DecodeOutcome::Other(_) => None,
        }
    }

    fn record_identification(&mut self, report: &IdentificationReport) {
        self.callsigns.insert(
            report.prefix.address.clone(),
            report.callsign.trim_end().to_string(),
        );
    }

    /// Append a position report to its address history and try to
    /// resolve it against the reports already seen.
    pub fn append_position(&mut self, report: &PositionReport) -> Option<(f64, f64)> {
        let raw = RawPosition {
            parity: report.parity,
            lat: report.lat_cpr as f64 / CPR_SCALE,
            lon: report.lon_cpr as f64 / CPR_SCALE,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let history = self
            .histories
            .entry(report.prefix.address.clone())
            .or_default();

        let resolved = cpr::resolve(&raw, history.iter().map(|entry| &entry.raw));
        if resolved.is_none() {
            debug!(
                address = %report.prefix.address,
                "position not yet resolvable"
            );
        }

        history.push(PositionEntry {
            raw,
            time_flag: report.time_flag,
            altitude_m: report.altitude_m,
            altitude_source: report.altitude_source,
            resolved,
        });

        resolved
    }

    /// Full report history for an address, in arrival order.
    #[allow(dead_code)]
    pub fn lookup(&self, address: &str) -> &[PositionEntry] {
        self.histories
            .get(address)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Last callsign decoded for an address, if any identification frame
    /// survived the channel.
    #[allow(dead_code)]
    pub fn callsign(&self, address: &str) -> Option<&str> {
        self.callsigns.get(address).map(String::as_str)
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received
    }

    pub fn checksum_failures(&self) -> u64 {
        self.checksum_failures
    }

    /// Fraction of received frames discarded for checksum damage.
    pub fn corrupted_message_rate(&self) -> f64 {
        if self.frames_received == 0 {
            return 0.0;
        }
        self.checksum_failures as f64 / self.frames_received as f64
    }
}
