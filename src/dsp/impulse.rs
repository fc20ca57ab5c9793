//! Synthetic reverb impulse responses.

use rand::Rng;

/// Reference level the convolver normalizes an impulse response to (-58 dB).
const GAIN_CALIBRATION: f32 = 0.001_25;
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44_100.0;
const MIN_POWER: f32 = 0.000_125;

/// A multichannel impulse response.
#[derive(Debug, Clone, PartialEq)]
pub struct ImpulseResponse {
    sample_rate: f32,
    channels: Vec<Vec<f32>>,
}

impl ImpulseResponse {
    /// Stereo noise shaped by a power-law fade:
    ///
    /// `x[i] = uniform(-1, 1) · (1 - t/duration)^decay`, `t = i / sample_rate`
    ///
    /// Each channel draws its own noise, which decorrelates left and right.
    pub fn decaying_noise<R: Rng + ?Sized>(
        rng: &mut R,
        sample_rate: f32,
        duration: f64,
        decay: f64,
    ) -> Self {
        let len = (duration * sample_rate as f64).floor().max(1.0) as usize;
        let channels = (0..2)
            .map(|_| {
                (0..len)
                    .map(|i| {
                        let t = i as f64 / sample_rate as f64;
                        let envelope = (1.0 - t / duration).max(0.0).powf(decay);
                        (rng.gen_range(-1.0..1.0) * envelope) as f32
                    })
                    .collect()
            })
            .collect();

        Self {
            sample_rate,
            channels,
        }
    }

    /// Wrap existing channel data. Channels shorter than the longest are
    /// zero padded.
    pub fn from_channels(sample_rate: f32, mut channels: Vec<Vec<f32>>) -> Self {
        let len = channels.iter().map(Vec::len).max().unwrap_or(0).max(1);
        if channels.is_empty() {
            channels.push(Vec::new());
        }
        for channel in &mut channels {
            channel.resize(len, 0.0);
        }
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Frames per channel.
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index.min(self.channels.len() - 1)]
    }

    /// Scale that brings the response's RMS power to the calibration level.
    pub fn normalization_scale(&self) -> f32 {
        let count = (self.channels.len() * self.len()) as f32;
        let energy: f32 = self
            .channels
            .iter()
            .flat_map(|c| c.iter())
            .map(|&x| x * x)
            .sum();

        let mut power = (energy / count).sqrt();
        if !power.is_finite() || power < MIN_POWER {
            power = MIN_POWER;
        }

        (1.0 / power) * GAIN_CALIBRATION * (GAIN_CALIBRATION_SAMPLE_RATE / self.sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn decaying_noise_has_expected_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let ir = ImpulseResponse::decaying_noise(&mut rng, 48_000.0, 1.4, 2.2);

        assert_eq!(ir.num_channels(), 2);
        assert_eq!(ir.len(), 67_200);
        assert!((ir.duration() - 1.4).abs() < 1e-9);
        for ch in 0..2 {
            assert!(ir.channel(ch).iter().all(|x| (-1.0..=1.0).contains(x)));
        }
    }

    #[test]
    fn tail_decays_towards_silence() {
        let mut rng = StdRng::seed_from_u64(1);
        let ir = ImpulseResponse::decaying_noise(&mut rng, 8_000.0, 1.0, 2.2);
        let head: f32 = ir.channel(0)[..800].iter().map(|x| x.abs()).sum();
        let tail: f32 = ir.channel(0)[7_200..].iter().map(|x| x.abs()).sum();
        assert!(tail < head * 0.01, "head {head}, tail {tail}");
    }

    #[test]
    fn channels_are_independent() {
        let mut rng = StdRng::seed_from_u64(3);
        let ir = ImpulseResponse::decaying_noise(&mut rng, 8_000.0, 0.5, 2.2);
        assert_ne!(ir.channel(0), ir.channel(1));
    }

    #[test]
    fn same_seed_same_response() {
        let a = ImpulseResponse::decaying_noise(&mut StdRng::seed_from_u64(9), 8_000.0, 0.2, 2.2);
        let b = ImpulseResponse::decaying_noise(&mut StdRng::seed_from_u64(9), 8_000.0, 0.2, 2.2);
        assert_eq!(a, b);
    }

    #[test]
    fn silent_response_gets_bounded_scale() {
        let ir = ImpulseResponse::from_channels(44_100.0, vec![vec![0.0; 16]]);
        let scale = ir.normalization_scale();
        assert!(scale.is_finite());
        assert!((scale - GAIN_CALIBRATION / MIN_POWER).abs() < 1e-3);
    }
}
