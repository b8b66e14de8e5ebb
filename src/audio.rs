//! Audio buffers and in-order concatenation.

use std::fmt;

use crate::error::{Result, TtsError};

/// Sample rate and channel layout shared by every buffer in one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub fn mono(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 1 }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz / {} ch", self.sample_rate, self.channels)
    }
}

/// Interleaved 32-bit float samples tagged with their format.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    format: AudioFormat,
    samples: Vec<f32>,
}

impl AudioBuffer {
    /// Buffer of interleaved `samples` in `format`.
    pub fn new(format: AudioFormat, samples: Vec<f32>) -> Self {
        Self { format, samples }
    }

    /// Mono buffer at `sample_rate`.
    pub fn mono(sample_rate: u32, samples: Vec<f32>) -> Self {
        Self { format: AudioFormat::mono(sample_rate), samples }
    }

    /// Zero-length buffer in `format`.
    pub fn empty(format: AudioFormat) -> Self {
        Self { format, samples: Vec::new() }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn sample_rate(&self) -> u32 {
        self.format.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.format.channels
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }

    /// Frames = samples / channels.
    pub fn frame_count(&self) -> usize {
        self.samples.len() / usize::from(self.format.channels.max(1))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.frame_count() as f32 / self.format.sample_rate as f32
    }

    /// Join `parts` in order into one buffer of `format`.
    ///
    /// Every part must already be in `format`; a mismatch fails with
    /// [`TtsError::FormatMismatch`] naming the offending part.  No resampling
    /// or channel mixing is attempted.  An empty `parts` yields an empty buffer.
    pub fn concat(format: AudioFormat, parts: Vec<AudioBuffer>) -> Result<AudioBuffer> {
        if let Some((chunk, part)) = parts.iter().enumerate().find(|(_, p)| p.format != format) {
            return Err(TtsError::FormatMismatch { chunk, expected: format, found: part.format });
        }

        let total: usize = parts.iter().map(|p| p.samples.len()).sum();
        let mut samples = Vec::with_capacity(total);
        for part in parts {
            samples.extend_from_slice(&part.samples);
        }
        Ok(AudioBuffer { format, samples })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
