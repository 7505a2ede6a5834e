//! One frame through one radio link
//!
//! A transmission binds an encoded frame to a channel instance and the
//! ids of the two endpoints. `transmit` runs the whole physical layer
//! and hands back the hex string the receiver actually observes, damage
//! included.

use crate::bits;
use crate::channel::ChannelModel;
use crate::codec::CodecError;

pub struct Transmission {
    /// Frame as built by the sender, 28 hex digits.
    #[allow(dead_code)]
    pub frame_hex: String,
    pub source: String,
    pub destination: String,
    channel: ChannelModel,
}

impl Transmission {
    pub fn new(
        frame_hex: String,
        source: String,
        destination: String,
        channel: ChannelModel,
    ) -> Self {
        Self {
            frame_hex,
            source,
            destination,
            channel,
        }
    }

    /// Modulate, degrade, demodulate, and re-encode as hex.
    pub fn transmit(&mut self) -> Result<String, CodecError> {
        let tx_bits = bits::hex_to_bits(&self.frame_hex)?;
        let signal = self.channel.modulate(&tx_bits);
        let degraded = self.channel.simulate(&signal);
        let rx_bits = self.channel.demodulate(&degraded);
        Ok(bits::bits_to_hex(&rx_bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelConfig, ChannelModel, FadingModel};
    use crate::codec::{self, DecodeOutcome};
    use crate::cpr::CprParity;

    fn channel(snr_db: f64, seed: u64) -> ChannelModel {
        let config = ChannelConfig {
            snr_db,
            fading: FadingModel::Rician,
            ..ChannelConfig::default()
        };
        ChannelModel::with_seed(config, seed)
    }

    #[test]
    fn test_clean_link_is_bit_exact() {
        let frame = codec::encode_identification(17, 5, 0x40621D, 2, "TUAN01", 4);
        let mut tx = Transmission::new(
            frame.clone(),
            "40621D".into(),
            "HAN".into(),
            channel(120.0, 7),
        );
        assert_eq!(tx.transmit().unwrap(), frame);
    }

    #[test]
    fn test_noisy_link_fails_the_checksum() {
        let frame = codec::encode_position(
            17,
            5,
            0x40621D,
            0,
            false,
            10_000.0,
            21.0285,
            105.8048,
            false,
            11,
            CprParity::Even,
        );
        let mut tx = Transmission::new(frame, "40621D".into(), "HAN".into(), channel(-30.0, 8));
        let received = tx.transmit().unwrap();

        assert!(matches!(
            codec::decode(&received).unwrap(),
            DecodeOutcome::ChecksumFailure { .. }
        ));
    }
}
