//! Length regulation: per-phoneme features → per-frame features.
//!
//! Each phoneme `i` gets an integer frame count
//!
//! ```text
//! duration[i] = round(max(floor, exp(log_durations[i]) - 1))
//! ```
//!
//! and its hidden-state row (plus pitch and energy, for the prosody variant) is
//! written `duration[i]` times in a row.  Values are piecewise constant over
//! each phoneme's window; there is no interpolation.
//!
//! The floor is an explicit [`DurationPolicy`] setting.  With `floor = 0` a
//! phoneme predicted shorter than half a frame vanishes and contributes no
//! frames; with `floor = 1` every phoneme is audible and the total frame count
//! `T` is at least `N`.

use tracing::debug;

use crate::{
    error::{Result, Stage, TtsError},
    model::{EncoderOutput, ExpandedFeatures},
    tensor::Tensor,
};

/// Default per-phoneme frame cap.  At 22 050 Hz with a 256-sample hop this is
/// about 11.6 s for a single phoneme.
pub const DEFAULT_MAX_FRAMES: u32 = 1_000;

/// How predicted log-durations become integer frame counts.
///
/// The frame cap is never below the floor, so a policy can always produce
/// some output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationPolicy {
    floor: u32,
    max_frames: u32,
}

impl DurationPolicy {
    /// Phonemes may receive zero frames.
    pub const MAY_VANISH: u32 = 0;
    /// Every phoneme receives at least one frame.
    pub const AT_LEAST_ONE: u32 = 1;

    /// A policy with the given floor and [`DEFAULT_MAX_FRAMES`], raised to
    /// `floor` if the floor is larger.
    pub fn new(floor: u32) -> Self {
        Self { floor, max_frames: DEFAULT_MAX_FRAMES.max(floor) }
    }

    /// Cap each phoneme at `max_frames`; a cap below the floor is raised to it.
    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = max_frames.max(self.floor);
        self
    }

    /// Minimum frames per phoneme before rounding.  0 lets phonemes vanish.
    pub fn floor(&self) -> u32 {
        self.floor
    }

    /// Largest duration accepted for one phoneme; anything above fails with
    /// [`TtsError::DurationOverflow`] instead of allocating.
    pub fn max_frames(&self) -> u32 {
        self.max_frames
    }

    /// Integer duration for one predicted log-duration.
    fn frames(&self, index: usize, log_duration: f32) -> Result<usize> {
        if log_duration.is_nan() {
            return Err(TtsError::NonFinite { stage: Stage::Regulate, index });
        }
        // f64 keeps exp() finite up to ~709; beyond that the result is +inf
        // and is rejected below without allocating anything.
        let frames = (f64::from(log_duration).exp() - 1.0)
            .max(f64::from(self.floor))
            .round();
        if !frames.is_finite() || frames > f64::from(self.max_frames) {
            return Err(TtsError::DurationOverflow { index, frames, max: self.max_frames });
        }
        Ok(frames as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRegulator {
    policy: DurationPolicy,
}

impl LengthRegulator {
    pub fn new(policy: DurationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DurationPolicy {
        self.policy
    }

    /// Integer frame counts for each phoneme.
    pub fn durations(&self, log_durations: &[f32]) -> Result<Vec<usize>> {
        log_durations
            .iter()
            .enumerate()
            .map(|(i, &d)| self.policy.frames(i, d))
            .collect()
    }

    /// Expand encoder outputs using their predicted durations.
    pub fn expand(&self, encoded: &EncoderOutput) -> Result<ExpandedFeatures> {
        let durations = self.durations(encoded.log_durations().data())?;
        self.expand_with_durations(encoded, &durations)
    }

    /// Expand encoder outputs using caller-supplied integer durations.
    ///
    /// `durations` must hold one entry per phoneme.  Entries above the
    /// policy's `max_frames` fail exactly as predicted durations would.
    pub fn expand_with_durations(
        &self,
        encoded: &EncoderOutput,
        durations: &[usize],
    ) -> Result<ExpandedFeatures> {
        let n = encoded.phonemes();
        if durations.len() != n {
            return Err(TtsError::DurationCount { expected: n, found: durations.len() });
        }
        let max = self.policy.max_frames as usize;
        if let Some((index, &d)) = durations.iter().enumerate().find(|&(_, &d)| d > max) {
            return Err(TtsError::DurationOverflow {
                index,
                frames: d as f64,
                max: self.policy.max_frames,
            });
        }

        let total: usize = durations.iter().sum();
        if total == 0 {
            return Err(TtsError::EmptyExpansion);
        }

        let hidden = encoded.hidden();
        let width = hidden.width();
        let expanded_hidden = frames_tensor(
            vec![1, total, width],
            repeat_rows(hidden.data(), width, durations, total),
        )?;

        debug!(phonemes = n, frames = total, width, "length regulation");

        Ok(match encoded {
            EncoderOutput::Basic { .. } => ExpandedFeatures::Basic { hidden: expanded_hidden },
            EncoderOutput::Prosody { pitch, energy, .. } => ExpandedFeatures::Prosody {
                hidden: expanded_hidden,
                pitch: frames_tensor(vec![1, total], repeat_rows(pitch.data(), 1, durations, total))?,
                energy: frames_tensor(vec![1, total], repeat_rows(energy.data(), 1, durations, total))?,
            },
        })
    }
}

/// Write row `i` of `data` (rows of `width` values) `durations[i]` times.
fn repeat_rows(data: &[f32], width: usize, durations: &[usize], total: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(total * width);
    if width == 0 {
        return out;
    }
    for (row, &d) in data.chunks_exact(width).zip(durations) {
        for _ in 0..d {
            out.extend_from_slice(row);
        }
    }
    out
}

fn frames_tensor(shape: Vec<usize>, data: Vec<f32>) -> Result<Tensor<f32>> {
    Tensor::new(shape, data).map_err(|e| TtsError::inference(Stage::Regulate, e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
