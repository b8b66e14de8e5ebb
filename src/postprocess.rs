//! Vocoder output → playable [`AudioBuffer`].
//!
//! Every sample is hard-clipped to `[-1.0, 1.0]`; vocoders routinely overshoot
//! and the WAV writer assumes full scale is ±1.  NaN is rejected rather than
//! clipped, since there is no meaningful sample value to substitute.

use tracing::{debug, warn};

use crate::{
    audio::AudioBuffer,
    error::{Result, Stage, TtsError},
    tensor::Tensor,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformPostprocessor {
    sample_rate: u32,
}

impl WaveformPostprocessor {
    /// `sample_rate` is the rate of the decoder / vocoder pair in use.
    pub fn new(sample_rate: u32) -> Self {
        Self { sample_rate }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Clip and repackage a waveform tensor (`[T]`, `[1, T]` or `[1, 1, T]`).
    pub fn finish(&self, waveform: Tensor<f32>) -> Result<AudioBuffer> {
        let shape = waveform.shape();
        if shape.is_empty() || shape[..shape.len() - 1].iter().any(|&d| d != 1) {
            return Err(TtsError::inference(
                Stage::Vocode,
                format!("waveform must be a single mono batch, got shape {shape:?}"),
            ));
        }

        let mut samples = waveform.into_data();
        if samples.is_empty() {
            return Err(TtsError::EmptyWaveform);
        }

        let mut clipped = 0usize;
        for (index, s) in samples.iter_mut().enumerate() {
            if s.is_nan() {
                return Err(TtsError::NonFinite { stage: Stage::Postprocess, index });
            }
            if s.abs() > 1.0 {
                clipped += 1;
                *s = s.clamp(-1.0, 1.0);
            }
        }

        if clipped > 0 {
            warn!(clipped, total = samples.len(), "waveform samples clipped to [-1, 1]");
        }
        debug!(samples = samples.len(), sample_rate = self.sample_rate, "waveform finished");

        Ok(AudioBuffer::mono(self.sample_rate, samples))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clips_to_unit_range() {
        let raw = vec![0.5, -0.25, 1.5, -7.0, f32::INFINITY, f32::NEG_INFINITY, 1.0, -1.0, f32::MAX];
        let buf = WaveformPostprocessor::new(22_050).finish(Tensor::row(raw)).unwrap();
        assert_eq!(buf.samples(), &[0.5, -0.25, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0]);
        assert!(buf.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_buffer_format() {
        let buf = WaveformPostprocessor::new(24_000).finish(Tensor::row(vec![0.0; 480])).unwrap();
        assert_eq!(buf.sample_rate(), 24_000);
        assert_eq!(buf.channels(), 1);
        assert_eq!(buf.frame_count(), 480);
    }

    #[test]
    fn test_accepts_rank_one_and_three() {
        let p = WaveformPostprocessor::new(16_000);
        let rank1 = Tensor::new(vec![3], vec![0.1, 0.2, 0.3]).unwrap();
        assert_eq!(p.finish(rank1).unwrap().frame_count(), 3);
        let rank3 = Tensor::new(vec![1, 1, 2], vec![0.1, 0.2]).unwrap();
        assert_eq!(p.finish(rank3).unwrap().frame_count(), 2);
    }

    #[test]
    fn test_rejects_batched_waveform() {
        let batched = Tensor::new(vec![2, 2], vec![0.0; 4]).unwrap();
        let err = WaveformPostprocessor::new(16_000).finish(batched).unwrap_err();
        assert_eq!(err.stage(), Stage::Vocode);
    }

    #[test]
    fn test_empty_waveform() {
        let err = WaveformPostprocessor::new(16_000).finish(Tensor::row(vec![])).unwrap_err();
        assert!(matches!(err, TtsError::EmptyWaveform));
    }

    #[test]
    fn test_nan_is_an_error() {
        let err = WaveformPostprocessor::new(16_000)
            .finish(Tensor::row(vec![0.0, 2.0, f32::NAN]))
            .unwrap_err();
        assert!(matches!(err, TtsError::NonFinite { stage: Stage::Postprocess, index: 2 }));
    }
}
