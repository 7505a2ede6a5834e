//! CRC-24 protection for the 112-bit link-layer frame
//!
//! The checksum is the remainder of polynomial long division over the
//! first 88 frame bits, computed bit by bit with an explicit XOR window
//! rather than a lookup table. Bit positions 88..112 only absorb XOR
//! effects from the tail of the window; they are never inspected as
//! trigger bits.

use crate::codec::{FRAME_BITS, FRAME_DATA_BITS};

/// 25-bit generator polynomial, MSB first.
const GENERATOR: [u8; 25] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 0, 1, 0, 0, 0, 0, 0, 0, 1, 0, 0, 1,
];

/// Compute the 24-bit checksum over the 88 data bits of a frame.
pub fn checksum(data_bits: &[u8]) -> u32 {
    debug_assert_eq!(data_bits.len(), FRAME_DATA_BITS);

    // Zero-extend the data to the full frame width, then divide.
    let mut work = [0u8; FRAME_BITS];
    work[..FRAME_DATA_BITS].copy_from_slice(data_bits);

    for i in 0..FRAME_DATA_BITS {
        if work[i] == 1 {
            for (j, g) in GENERATOR.iter().enumerate() {
                work[i + j] ^= g;
            }
        }
    }

    work[FRAME_DATA_BITS..]
        .iter()
        .fold(0u32, |acc, &b| (acc << 1) | b as u32)
}

/// Checksum formatted the way it appears on the wire: 6 uppercase hex
/// digits, zero-padded.
#[allow(dead_code)]
pub fn checksum_hex(data_bits: &[u8]) -> String {
    format!("{:06X}", checksum(data_bits))
}
