//! BPSK physical-layer channel model
//!
//! Turns a frame bit vector into a sampled waveform, degrades it with a
//! flat fading draw plus additive white Gaussian noise at a configured
//! SNR, and recovers bits with a correlation receiver.
//!
//! The receiver divides the noisy signal by the per-sample fading
//! magnitude before demodulating (zero-forcing with perfect channel-state
//! knowledge). That is a known fidelity limitation of the model and is
//! load-bearing for the corruption-rate behaviour, so it stays.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, SQRT_2};

/// Carrier periods spanned by one symbol window.
const CYCLES_PER_SYMBOL: f64 = 3.0;

/// Fading statistics family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FadingModel {
    /// No line of sight: magnitude of a circularly-symmetric complex
    /// Gaussian.
    Rayleigh,
    /// Dominant line-of-sight path: Rice distribution with shape 1.
    Rician,
}

/// Per-link channel parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Carrier frequency in Hz.
    pub carrier_hz: f64,
    /// Target signal-to-noise ratio in dB.
    pub snr_db: f64,
    pub fading: FadingModel,
    /// Samples per symbol, 48 or 96 depending on profile. Fixed for the
    /// lifetime of a channel instance.
    pub samples_per_symbol: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            carrier_hz: 1_090_000_000.0,
            snr_db: 12.0,
            fading: FadingModel::Rayleigh,
            samples_per_symbol: 48,
        }
    }
}

/// One simulated radio link.
pub struct ChannelModel {
    config: ChannelConfig,
    rng: ChaCha8Rng,
    unit_normal: Normal<f64>,
}

impl ChannelModel {
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    /// Deterministic channel for reproducible runs; all fading and noise
    /// draws derive from `seed`.
    pub fn with_seed(config: ChannelConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            unit_normal: Normal::new(0.0, 1.0).unwrap(),
        }
    }

    #[allow(dead_code)]
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Reference waveform for one symbol at the given phase offset.
    fn reference_symbol(&self, phase: f64) -> Vec<f64> {
        let n = self.config.samples_per_symbol;
        let f = self.config.carrier_hz;
        (0..n)
            .map(|k| {
                let t = k as f64 * CYCLES_PER_SYMBOL / (f * n as f64);
                (2.0 * PI * f * t + phase).sin()
            })
            .collect()
    }

    /// BPSK-modulate a bit vector: phase 0 for a one, phase 180 for a
    /// zero, one symbol window per bit.
    pub fn modulate(&self, bits: &[u8]) -> Vec<f64> {
        let one = self.reference_symbol(0.0);
        let zero = self.reference_symbol(PI);

        let mut signal = Vec::with_capacity(bits.len() * self.config.samples_per_symbol);
        for &bit in bits {
            signal.extend_from_slice(if bit == 1 { &one } else { &zero });
        }
        signal
    }

    fn fading_magnitude(&mut self) -> f64 {
        let x = self.unit_normal.sample(&mut self.rng);
        let y = self.unit_normal.sample(&mut self.rng);
        match self.config.fading {
            FadingModel::Rayleigh => (x * x + y * y).sqrt() / SQRT_2,
            FadingModel::Rician => ((1.0 + x) * (1.0 + x) + y * y).sqrt(),
        }
    }

    /// Run a waveform through the fading/noise channel.
    pub fn simulate(&mut self, signal: &[f64]) -> Vec<f64> {
        if signal.is_empty() {
            return Vec::new();
        }

        let h: Vec<f64> = (0..signal.len()).map(|_| self.fading_magnitude()).collect();
        let faded: Vec<f64> = signal.iter().zip(&h).map(|(s, m)| s * m).collect();

        let power = faded.iter().map(|s| s * s).sum::<f64>() / faded.len() as f64;
        let n0 = power / 10f64.powf(self.config.snr_db / 10.0);
        let noise = Normal::new(0.0, (n0 / 2.0).sqrt()).unwrap();

        faded
            .iter()
            .zip(&h)
            .map(|(s, m)| (s + noise.sample(&mut self.rng)) / m)
            .collect()
    }

    /// Correlation receiver: compare each symbol window against the two
    /// reference phases; ties fall to zero.
    pub fn demodulate(&self, signal: &[f64]) -> Vec<u8> {
        let one = self.reference_symbol(0.0);
        let zero = self.reference_symbol(PI);

        signal
            .chunks_exact(self.config.samples_per_symbol)
            .map(|window| {
                let corr_one: f64 = window.iter().zip(&one).map(|(s, r)| s * r).sum();
                let corr_zero: f64 = window.iter().zip(&zero).map(|(s, r)| s * r).sum();
                u8::from(corr_one > corr_zero)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_bits() -> Vec<u8> {
        (0..112).map(|i| ((i * 7) ^ (i >> 2)) as u8 & 1).collect()
    }

    fn config(snr_db: f64, fading: FadingModel) -> ChannelConfig {
        ChannelConfig {
            snr_db,
            fading,
            ..ChannelConfig::default()
        }
    }

    #[test]
    fn test_modulate_length_and_phase() {
        let chan = ChannelModel::with_seed(ChannelConfig::default(), 1);
        let signal = chan.modulate(&[1, 0]);
        assert_eq!(signal.len(), 2 * 48);

        // Opposite phases: the two symbol windows mirror each other.
        for k in 0..48 {
            assert!((signal[k] + signal[48 + k]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_demodulate_clean_signal() {
        let chan = ChannelModel::with_seed(ChannelConfig::default(), 2);
        let bits = test_bits();
        let signal = chan.modulate(&bits);
        assert_eq!(chan.demodulate(&signal), bits);
    }

    #[test]
    fn test_high_snr_is_transparent() {
        for fading in [FadingModel::Rayleigh, FadingModel::Rician] {
            let mut chan = ChannelModel::with_seed(config(120.0, fading), 3);
            let bits = test_bits();
            let signal = chan.modulate(&bits);
            let degraded = chan.simulate(&signal);
            assert_eq!(chan.demodulate(&degraded), bits);
        }
    }

    #[test]
    fn test_low_snr_corrupts() {
        let mut chan = ChannelModel::with_seed(config(-30.0, FadingModel::Rayleigh), 4);
        let bits = test_bits();
        let signal = chan.modulate(&bits);
        let degraded = chan.simulate(&signal);
        assert_ne!(chan.demodulate(&degraded), bits);
    }

    #[test]
    fn test_seed_reproducibility() {
        let bits = test_bits();
        let run = |seed| {
            let mut chan = ChannelModel::with_seed(config(6.1, FadingModel::Rician), seed);
            let signal = chan.modulate(&bits);
            chan.simulate(&signal)
        };
        assert_eq!(run(99), run(99));
        assert_ne!(run(99), run(100));
    }

    #[test]
    fn test_96_sample_profile() {
        let cfg = ChannelConfig {
            samples_per_symbol: 96,
            ..ChannelConfig::default()
        };
        let chan = ChannelModel::with_seed(cfg, 5);
        let bits = test_bits();
        let signal = chan.modulate(&bits);
        assert_eq!(signal.len(), 112 * 96);
        assert_eq!(chan.demodulate(&signal), bits);
    }
}
