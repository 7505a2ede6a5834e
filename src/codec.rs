//! Link-layer frame codec
//!
//! Builds and parses the 112-bit extended squitter frame: a prefix byte
//! holding downlink format and transponder capability, the 24-bit source
//! address, a 56-bit type-coded payload, and the 24-bit checksum.
//!
//! Checksum mismatch is an expected, frequent condition on a noisy link
//! and is reported as a decode outcome, never as an error. Only
//! structurally invalid input (wrong length, non-hex characters) fails
//! the call.

use serde::Serialize;
use thiserror::Error;

use crate::bits;
use crate::cpr::{self, CprParity};
use crate::crc;

pub const FRAME_BITS: usize = 112;
pub const FRAME_DATA_BITS: usize = 88;
pub const FRAME_HEX_CHARS: usize = 28;

/// Downlink format for civil extended squitter frames.
pub const DF_EXTENDED_SQUITTER: u8 = 17;

const FEET_PER_METER: f64 = 1.0 / 0.3048;

/// Structurally invalid frame input. Channel corruption never lands
/// here; it surfaces as [`DecodeOutcome::ChecksumFailure`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("frame must be {FRAME_HEX_CHARS} hex characters, got {0}")]
    InvalidLength(usize),
    #[error("invalid hex digit {0:?} in frame")]
    InvalidHexDigit(char),
}

/// Fields shared by every frame regardless of payload type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FramePrefix {
    pub downlink_format: u8,
    pub capability: u8,
    /// Source address as 6 uppercase hex digits.
    pub address: String,
    pub type_code: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentificationReport {
    pub prefix: FramePrefix,
    pub category: u8,
    /// Always 8 characters, space-padded.
    pub callsign: String,
}

/// Which altitude reference the type code selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AltitudeSource {
    Barometric,
    Gnss,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionReport {
    pub prefix: FramePrefix,
    pub surveillance_status: u8,
    pub single_antenna: bool,
    pub altitude_m: f64,
    pub altitude_source: AltitudeSource,
    pub time_flag: bool,
    pub parity: CprParity,
    /// Raw 17-bit CPR values, undecoded until paired with a
    /// complementary report.
    pub lat_cpr: u32,
    pub lon_cpr: u32,
}

/// Result of decoding one frame with a valid structure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodeOutcome {
    Identification(IdentificationReport),
    Position(PositionReport),
    /// Valid checksum but a type code with no semantic interpretation;
    /// the prefix fields still pass through.
    Other(FramePrefix),
    /// Recomputed checksum disagrees with the received one. The payload
    /// is untrustworthy and must be discarded.
    ChecksumFailure { computed: u32, received: u32 },
}

/// Build an identification frame. The callsign is truncated to 8
/// characters and right-padded with the space code.
pub fn encode_identification(
    downlink_format: u8,
    capability: u8,
    address: u32,
    category: u8,
    callsign: &str,
    type_code: u8,
) -> String {
    let mut payload = Vec::with_capacity(56);
    bits::push_bits(&mut payload, type_code as u32, 5);
    bits::push_bits(&mut payload, category as u32, 3);
    for c in callsign.chars().take(8) {
        bits::push_bits(&mut payload, bits::callsign_code(c) as u32, 6);
    }
    while payload.len() < 56 {
        bits::push_bits(&mut payload, bits::callsign_code(' ') as u32, 6);
    }

    seal_frame(downlink_format, capability, address, &payload)
}

/// Build a position frame. Altitude is taken in meters and lat/lon in
/// degrees; the CPR parity selects the 60- vs 59-zone grid.
#[allow(clippy::too_many_arguments)]
pub fn encode_position(
    downlink_format: u8,
    capability: u8,
    address: u32,
    surveillance_status: u8,
    single_antenna: bool,
    altitude_m: f64,
    lat: f64,
    lon: f64,
    time_flag: bool,
    type_code: u8,
    parity: CprParity,
) -> String {
    let (lat_cpr, lon_cpr) = cpr::encode(lat, lon, parity);

    let mut payload = Vec::with_capacity(56);
    bits::push_bits(&mut payload, type_code as u32, 5);
    bits::push_bits(&mut payload, surveillance_status as u32, 2);
    bits::push_bits(&mut payload, u32::from(single_antenna), 1);
    bits::push_bits(&mut payload, encode_altitude(altitude_m), 12);
    bits::push_bits(&mut payload, u32::from(time_flag), 1);
    bits::push_bits(&mut payload, parity.bit(), 1);
    bits::push_bits(&mut payload, lat_cpr, 17);
    bits::push_bits(&mut payload, lon_cpr, 17);

    seal_frame(downlink_format, capability, address, &payload)
}

/// Prepend the prefix byte and address, append the checksum, and render
/// the finished frame as 28 uppercase hex digits.
fn seal_frame(downlink_format: u8, capability: u8, address: u32, payload: &[u8]) -> String {
    debug_assert_eq!(payload.len(), 56);

    let mut frame = Vec::with_capacity(FRAME_BITS);
    bits::push_bits(&mut frame, downlink_format as u32, 5);
    bits::push_bits(&mut frame, capability as u32, 3);
    bits::push_bits(&mut frame, address & 0xFF_FFFF, 24);
    frame.extend_from_slice(payload);

    let crc = crc::checksum(&frame);
    bits::push_bits(&mut frame, crc, 24);

    bits::bits_to_hex(&frame)
}

/// Parse one received frame.
///
/// Wrong-length or non-hex input is the caller's mistake and comes back
/// as `Err`; a checksum mismatch is routine channel damage and comes
/// back as a normal outcome.
pub fn decode(hex: &str) -> Result<DecodeOutcome, CodecError> {
    if hex.len() != FRAME_HEX_CHARS {
        return Err(CodecError::InvalidLength(hex.len()));
    }
    let frame = bits::hex_to_bits(hex)?;

    let received = bits::bits_to_u32(&frame[FRAME_DATA_BITS..]);
    let computed = crc::checksum(&frame[..FRAME_DATA_BITS]);
    if received != computed {
        return Ok(DecodeOutcome::ChecksumFailure { computed, received });
    }

    let prefix = FramePrefix {
        downlink_format: bits::bits_to_u32(&frame[0..5]) as u8,
        capability: bits::bits_to_u32(&frame[5..8]) as u8,
        address: format!("{:06X}", bits::bits_to_u32(&frame[8..32])),
        type_code: bits::bits_to_u32(&frame[32..37]) as u8,
    };

    let outcome = match prefix.type_code {
        1..=4 => DecodeOutcome::Identification(decode_identification(prefix, &frame)),
        9..=18 => DecodeOutcome::Position(decode_position(
            prefix,
            &frame,
            AltitudeSource::Barometric,
        )),
        20..=22 => DecodeOutcome::Position(decode_position(prefix, &frame, AltitudeSource::Gnss)),
        _ => DecodeOutcome::Other(prefix),
    };
    Ok(outcome)
}

fn decode_identification(prefix: FramePrefix, frame: &[u8]) -> IdentificationReport {
    let category = bits::bits_to_u32(&frame[37..40]) as u8;
    let callsign = frame[40..88]
        .chunks_exact(6)
        .map(|code| bits::callsign_char(bits::bits_to_u32(code) as u8))
        .collect();

    IdentificationReport {
        prefix,
        category,
        callsign,
    }
}

fn decode_position(prefix: FramePrefix, frame: &[u8], source: AltitudeSource) -> PositionReport {
    PositionReport {
        prefix,
        surveillance_status: bits::bits_to_u32(&frame[37..39]) as u8,
        single_antenna: frame[39] == 1,
        altitude_m: decode_altitude(bits::bits_to_u32(&frame[40..52])),
        altitude_source: source,
        time_flag: frame[52] == 1,
        parity: CprParity::from_bit(frame[53] as u32),
        lat_cpr: bits::bits_to_u32(&frame[54..71]),
        lon_cpr: bits::bits_to_u32(&frame[71..88]),
    }
}

/// Pack an altitude into the 12-bit field: an 11-bit step count with the
/// resolution (Q) bit spliced in at position 7. Altitudes at or above
/// 50000 ft fall back to 100 ft steps.
fn encode_altitude(altitude_m: f64) -> u32 {
    let feet = altitude_m * FEET_PER_METER;
    let (step, q) = if feet >= 50_000.0 { (100.0, 0) } else { (25.0, 1) };
    let magnitude = (((feet + 1000.0) / step).floor() as u32) & 0x7FF;

    ((magnitude >> 4) << 5) | (q << 4) | (magnitude & 0xF)
}

/// Inverse of [`encode_altitude`], back to meters.
fn decode_altitude(field: u32) -> f64 {
    let q = (field >> 4) & 1;
    let magnitude = ((field >> 5) << 4) | (field & 0xF);
    let step = if q == 1 { 25.0 } else { 100.0 };
    let feet = magnitude as f64 * step - 1000.0;
    feet / FEET_PER_METER
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identification_literal_scenario() {
        let hex = encode_identification(17, 5, 0x40621D, 2, "TUAN01", 4);
        assert_eq!(hex.len(), FRAME_HEX_CHARS);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hex, hex.to_uppercase());

        match decode(&hex).unwrap() {
            DecodeOutcome::Identification(report) => {
                assert_eq!(report.prefix.downlink_format, 17);
                assert_eq!(report.prefix.capability, 5);
                assert_eq!(report.prefix.address, "40621D");
                assert_eq!(report.prefix.type_code, 4);
                assert_eq!(report.category, 2);
                assert_eq!(report.callsign, "TUAN01  ");
            }
            other => panic!("expected identification report, got {:?}", other),
        }
    }

    #[test]
    fn test_identification_truncates_long_callsign() {
        let hex = encode_identification(17, 6, 0x888151, 3, "LONGCALLSIGN", 1);
        match decode(&hex).unwrap() {
            DecodeOutcome::Identification(report) => {
                assert_eq!(report.callsign, "LONGCALL");
            }
            other => panic!("expected identification report, got {:?}", other),
        }
    }

    #[test]
    fn test_identification_invalid_chars_become_spaces() {
        let hex = encode_identification(17, 6, 0x888151, 3, "AB*c1", 2);
        match decode(&hex).unwrap() {
            // Lowercase sits outside the alphabet and encodes as space.
            DecodeOutcome::Identification(report) => assert_eq!(report.callsign, "AB  1   "),
            other => panic!("expected identification report, got {:?}", other),
        }
    }

    #[test]
    fn test_position_round_trip() {
        let hex = encode_position(
            17,
            5,
            0x40621D,
            1,
            false,
            10_000.0,
            21.0285,
            105.8048,
            false,
            11,
            CprParity::Even,
        );
        match decode(&hex).unwrap() {
            DecodeOutcome::Position(report) => {
                assert_eq!(report.prefix.address, "40621D");
                assert_eq!(report.prefix.type_code, 11);
                assert_eq!(report.altitude_source, AltitudeSource::Barometric);
                assert_eq!(report.surveillance_status, 1);
                assert!(!report.single_antenna);
                assert!(!report.time_flag);
                assert_eq!(report.parity, CprParity::Even);

                let (lat_cpr, lon_cpr) = cpr::encode(21.0285, 105.8048, CprParity::Even);
                assert_eq!(report.lat_cpr, lat_cpr);
                assert_eq!(report.lon_cpr, lon_cpr);

                // 25 ft steps: within one step after the meter/feet trip.
                assert!((report.altitude_m - 10_000.0).abs() <= 25.0 * 0.3048);
            }
            other => panic!("expected position report, got {:?}", other),
        }
    }

    #[test]
    fn test_position_gnss_type_code() {
        let hex = encode_position(
            17,
            5,
            0x888151,
            0,
            true,
            9_000.0,
            10.7626,
            106.6602,
            true,
            20,
            CprParity::Odd,
        );
        match decode(&hex).unwrap() {
            DecodeOutcome::Position(report) => {
                assert_eq!(report.altitude_source, AltitudeSource::Gnss);
                assert_eq!(report.parity, CprParity::Odd);
                assert!(report.time_flag);
                assert!(report.single_antenna);
            }
            other => panic!("expected position report, got {:?}", other),
        }
    }

    #[test]
    fn test_coarse_altitude_steps_above_50000_ft() {
        // 18 km is above the 50000 ft cutover, so 100 ft steps apply.
        let hex = encode_position(
            17,
            5,
            0x888151,
            0,
            false,
            18_000.0,
            21.0,
            105.8,
            false,
            12,
            CprParity::Even,
        );
        match decode(&hex).unwrap() {
            DecodeOutcome::Position(report) => {
                assert!((report.altitude_m - 18_000.0).abs() <= 100.0 * 0.3048);
            }
            other => panic!("expected position report, got {:?}", other),
        }
    }

    #[test]
    fn test_checksum_failure_is_an_outcome() {
        let hex = encode_identification(17, 5, 0x40621D, 2, "TUAN01", 4);

        // Flip one payload nibble.
        let mut corrupted: Vec<char> = hex.chars().collect();
        corrupted[10] = if corrupted[10] == '0' { '1' } else { '0' };
        let corrupted: String = corrupted.into_iter().collect();

        match decode(&corrupted).unwrap() {
            DecodeOutcome::ChecksumFailure { computed, received } => {
                assert_ne!(computed, received);
            }
            other => panic!("expected checksum failure, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_type_code_passes_prefix_through() {
        // Type code 19 is structurally valid but carries no semantics
        // here.
        let mut payload = Vec::new();
        bits::push_bits(&mut payload, 19, 5);
        payload.resize(56, 0);
        let hex = seal_frame(17, 5, 0xABCDEF, &payload);

        match decode(&hex).unwrap() {
            DecodeOutcome::Other(prefix) => {
                assert_eq!(prefix.downlink_format, 17);
                assert_eq!(prefix.address, "ABCDEF");
                assert_eq!(prefix.type_code, 19);
            }
            other => panic!("expected passthrough, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        assert_eq!(decode("8D4062"), Err(CodecError::InvalidLength(6)));
        assert_eq!(
            decode("8D4840D6202CC371C32CE057609Z"),
            Err(CodecError::InvalidHexDigit('Z'))
        );
    }

    #[test]
    fn test_decode_known_valid_frame() {
        // Captured DF17 identification frame with a correct checksum.
        match decode("8D4840D6202CC371C32CE0576098").unwrap() {
            DecodeOutcome::Identification(report) => {
                assert_eq!(report.prefix.downlink_format, 17);
                assert_eq!(report.prefix.address, "4840D6");
                assert_eq!(report.prefix.type_code, 4);
            }
            other => panic!("expected identification report, got {:?}", other),
        }
    }
}
