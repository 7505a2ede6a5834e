//! Compact Position Reporting
//!
//! Encodes a latitude/longitude into the pair of 17-bit values carried by
//! position frames, and recovers a global position from a complementary
//! even/odd report pair. Global decode follows the usual CPR arithmetic:
//! latitude zone index `j` from the two latitude fractions, an NL
//! agreement check, then the longitude zone index `m` in the zone count
//! of whichever frame is newer.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Latitude zones per hemisphere for even frames.
const NZ: f64 = 15.0;

/// Scale of a 17-bit CPR fraction (2^17).
const CPR_SCALE: f64 = 131072.0;

const DLAT_EVEN: f64 = 360.0 / 60.0;
const DLAT_ODD: f64 = 360.0 / 59.0;

/// CPR format flag carried in every position frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CprParity {
    Even,
    Odd,
}

impl CprParity {
    pub fn bit(self) -> u32 {
        match self {
            CprParity::Even => 0,
            CprParity::Odd => 1,
        }
    }

    pub fn from_bit(bit: u32) -> Self {
        if bit & 1 == 0 {
            CprParity::Even
        } else {
            CprParity::Odd
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            CprParity::Even => CprParity::Odd,
            CprParity::Odd => CprParity::Even,
        }
    }
}

/// One position report reduced to what global decode needs: the format
/// flag, the two CPR fractions in [0,1), and the receiver-assigned
/// sequence marker ("newer wins" tie-break).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawPosition {
    pub parity: CprParity,
    pub lat: f64,
    pub lon: f64,
    pub seq: u64,
}

/// Encode a position into the two 17-bit CPR values for the given format.
pub fn encode(lat: f64, lon: f64, parity: CprParity) -> (u32, u32) {
    let dlat = 360.0 / (60.0 - parity.bit() as f64);
    let lat_cpr = ((lat.rem_euclid(dlat) / dlat) * CPR_SCALE + 0.5).floor() as u32 & 0x1FFFF;

    let lon = if lon < 0.0 { lon + 360.0 } else { lon };
    let zones = (nl(lat) - parity.bit() as i32).max(1);
    let dlon = 360.0 / zones as f64;
    let lon_cpr = ((lon.rem_euclid(dlon) / dlon) * CPR_SCALE + 0.5).floor() as u32 & 0x1FFFF;

    (lat_cpr, lon_cpr)
}

/// Number of longitude zones at a latitude.
///
/// The exact-0 and exact-87 degree cases are intentional discontinuities
/// of the zone table, not approximations.
pub fn nl(lat: f64) -> i32 {
    if lat == 0.0 {
        return 59;
    }
    if lat.abs() == 87.0 {
        return 2;
    }
    if lat.abs() > 87.0 {
        return 1;
    }
    let a = 1.0 - (PI / (2.0 * NZ)).cos();
    let b = (PI * lat / 180.0).cos().powi(2);
    (2.0 * PI / (1.0 - a / b).acos()).floor() as i32
}

/// Resolve the newest report against its per-address history.
///
/// Scans the history newest-to-oldest for the most recent entry of the
/// opposite parity; without one there is nothing to pair against and the
/// position is simply not yet resolvable.
pub fn resolve<'a, I>(latest: &RawPosition, history: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a RawPosition>,
    I::IntoIter: DoubleEndedIterator,
{
    let other = history
        .into_iter()
        .rev()
        .find(|entry| entry.parity != latest.parity)?;

    match latest.parity {
        CprParity::Even => global_position(latest, other),
        CprParity::Odd => global_position(other, latest),
    }
}

/// Global decode from an even/odd pair.
fn global_position(even: &RawPosition, odd: &RawPosition) -> Option<(f64, f64)> {
    debug_assert_eq!(even.parity, CprParity::Even);
    debug_assert_eq!(odd.parity, CprParity::Odd);

    // Latitude zone index.
    let j = (59.0 * even.lat - 60.0 * odd.lat + 0.5).floor();

    let mut rlat_even = DLAT_EVEN * (modulo(j, 60.0) + even.lat);
    let mut rlat_odd = DLAT_ODD * (modulo(j, 59.0) + odd.lat);
    if rlat_even >= 270.0 {
        rlat_even -= 360.0;
    }
    if rlat_odd >= 270.0 {
        rlat_odd -= 360.0;
    }

    // Both frames must sit in the same longitude zone band.
    if nl(rlat_even) != nl(rlat_odd) {
        return None;
    }

    let newer_even = even.seq >= odd.seq;
    let lat = if newer_even { rlat_even } else { rlat_odd };

    let nl_val = nl(lat);
    let m = (even.lon * (nl_val - 1) as f64 - odd.lon * nl_val as f64 + 0.5).floor();

    let zones = if newer_even {
        nl_val.max(1)
    } else {
        (nl_val - 1).max(1)
    };
    let dlon = 360.0 / zones as f64;
    let frac = if newer_even { even.lon } else { odd.lon };

    let mut lon = dlon * (modulo(m, zones as f64) + frac);
    if lon >= 180.0 {
        lon -= 360.0;
    }

    Some((lat, lon))
}

/// Modulo that always returns a non-negative result.
fn modulo(x: f64, y: f64) -> f64 {
    x - y * (x / y).floor()
}
