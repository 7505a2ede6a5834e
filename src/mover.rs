//! Aircraft movers
//!
//! A plane flies great-circle legs toward its waypoint list and emits
//! the frames the link simulation carries: a position report every step
//! and an identification report at 0.2 Hz. The CPR parity and time flag
//! both toggle on every position publication.

use tracing::debug;

use crate::codec::{self, DF_EXTENDED_SQUITTER};
use crate::cpr::CprParity;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Type code used for identification broadcasts.
const IDENT_TYPE_CODE: u8 = 4;
/// Barometric airborne position type code.
const POSITION_TYPE_CODE: u8 = 11;

pub struct Plane {
    pub address: u32,
    /// Address as it appears on the wire, 6 uppercase hex digits.
    pub hex_addr: String,
    pub callsign: String,
    pub category: u8,
    pub capability: u8,
    /// Current position as (lon, lat) degrees.
    pub position: (f64, f64),
    pub altitude_m: f64,
    pub speed_mps: f64,
    waypoints: Vec<(f64, f64)>,
    parity: CprParity,
    time_flag: bool,
}

impl Plane {
    pub fn new(
        address: u32,
        callsign: &str,
        position: (f64, f64),
        altitude_m: f64,
        speed_mps: f64,
        waypoints: Vec<(f64, f64)>,
    ) -> Self {
        Self {
            address,
            hex_addr: format!("{:06X}", address),
            callsign: callsign.to_string(),
            category: 3,
            capability: 5,
            position,
            altitude_m,
            speed_mps,
            waypoints,
            parity: CprParity::Even,
            time_flag: false,
        }
    }

    pub fn at_destination(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Advance along the great circle toward the first waypoint. A
    /// waypoint reached (or overshot) within the step is snapped to and
    /// removed.
    pub fn update_pos(&mut self, dt: f64) -> (f64, f64) {
        let Some(&target) = self.waypoints.first() else {
            return self.position;
        };

        let dist_m = haversine_km(self.position.1, self.position.0, target.1, target.0) * 1000.0;
        let travel_m = self.speed_mps * dt;

        if dist_m <= travel_m || dist_m == 0.0 {
            self.position = target;
            self.waypoints.remove(0);
            debug!(addr = %self.hex_addr, lon = target.0, lat = target.1, "waypoint reached");
        } else {
            self.position = intermediate_point(self.position, target, travel_m / dist_m);
        }
        self.position
    }

    /// Build the next position frame; parity and time flag toggle per
    /// publication.
    pub fn position_frame(&mut self) -> String {
        let frame = codec::encode_position(
            DF_EXTENDED_SQUITTER,
            self.capability,
            self.address,
            0,
            false,
            self.altitude_m,
            self.position.1,
            self.position.0,
            self.time_flag,
            POSITION_TYPE_CODE,
            self.parity,
        );
        self.parity = self.parity.opposite();
        self.time_flag = !self.time_flag;
        frame
    }

    pub fn identification_frame(&self) -> String {
        codec::encode_identification(
            DF_EXTENDED_SQUITTER,
            self.capability,
            self.address,
            self.category,
            &self.callsign,
            IDENT_TYPE_CODE,
        )
    }
}

/// Great-circle distance in kilometers (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Point a fraction of the way along the great circle from `from` to
/// `to`, both (lon, lat) degrees.
fn intermediate_point(from: (f64, f64), to: (f64, f64), fraction: f64) -> (f64, f64) {
    let (lon1, lat1) = (from.0.to_radians(), from.1.to_radians());
    let (lon2, lat2) = (to.0.to_radians(), to.1.to_radians());

    let delta = (haversine_km(from.1, from.0, to.1, to.0) / EARTH_RADIUS_KM).max(1e-12);
    let a = ((1.0 - fraction) * delta).sin() / delta.sin();
    let b = (fraction * delta).sin() / delta.sin();

    let x = a * lat1.cos() * lon1.cos() + b * lat2.cos() * lon2.cos();
    let y = a * lat1.cos() * lon1.sin() + b * lat2.cos() * lon2.sin();
    let z = a * lat1.sin() + b * lat2.sin();

    let lat = z.atan2((x * x + y * y).sqrt());
    let lon = y.atan2(x);
    (lon.to_degrees(), lat.to_degrees())
}
