//! Model boundary: the three neural networks as call-response functions.
//!
//! The encoder, decoder and vocoder are external collaborators.  The core only
//! knows their tensor contracts:
//!
//! | Call     | Inputs                                                     | Outputs                                                       |
//! |----------|------------------------------------------------------------|---------------------------------------------------------------|
//! | `encode` | `input_ids [1,N]` int64                                    | `encoded_phonemes [1,N,H]`, `log_durations [1,N]`, prosody: `pitch_predictions`, `energy_predictions` `[1,N]` |
//! | `decode` | `expanded_hidden_states [1,T,H]`, prosody: `expanded_pitch`, `expanded_energy` `[1,T]` | `mel_spectrogram [1,T,M]` |
//! | `vocode` | `mel_spectrogram [1,M,T]`                                  | `waveform [1,T']`                                             |
//!
//! Implementations return whatever named tensors the network produced; this
//! module checks that the required ones are present and correctly shaped.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, Stage, TtsError},
    tensor::Tensor,
};

pub const INPUT_IDS: &str = "input_ids";
pub const ENCODED_PHONEMES: &str = "encoded_phonemes";
pub const LOG_DURATIONS: &str = "log_durations";
pub const PITCH_PREDICTIONS: &str = "pitch_predictions";
pub const ENERGY_PREDICTIONS: &str = "energy_predictions";
pub const EXPANDED_HIDDEN_STATES: &str = "expanded_hidden_states";
pub const EXPANDED_PITCH: &str = "expanded_pitch";
pub const EXPANDED_ENERGY: &str = "expanded_energy";
pub const MEL_SPECTROGRAM: &str = "mel_spectrogram";
pub const WAVEFORM: &str = "waveform";

/// Named float tensors passed across the model boundary.
pub type TensorMap = BTreeMap<String, Tensor<f32>>;

/// The encoder / decoder / vocoder triple.
///
/// Calls are synchronous and may block for a long time.  A failed call is
/// final: the pipeline never retries.  Implementations need not be reentrant;
/// the pipeline issues one call at a time.
pub trait InferenceModel {
    /// `input_ids [1,N]` → encoder outputs.
    fn encode(&self, input_ids: Tensor<i64>) -> Result<TensorMap>;

    /// Expanded per-frame features → `mel_spectrogram [1,T,M]`.
    fn decode(&self, inputs: TensorMap) -> Result<TensorMap>;

    /// `mel_spectrogram [1,M,T]` → `waveform`.
    fn vocode(&self, mel: Tensor<f32>) -> Result<TensorMap>;

    /// Output sample rate of the decoder / vocoder pair, in Hz.
    fn sample_rate(&self) -> u32;

    /// Mel channel count `M` the decoder emits.
    fn mel_channels(&self) -> usize;
}

impl<M: InferenceModel + ?Sized> InferenceModel for &M {
    fn encode(&self, input_ids: Tensor<i64>) -> Result<TensorMap> {
        (**self).encode(input_ids)
    }
    fn decode(&self, inputs: TensorMap) -> Result<TensorMap> {
        (**self).decode(inputs)
    }
    fn vocode(&self, mel: Tensor<f32>) -> Result<TensorMap> {
        (**self).vocode(mel)
    }
    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
    fn mel_channels(&self) -> usize {
        (**self).mel_channels()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder variants
// ─────────────────────────────────────────────────────────────────────────────

/// Which encoder wire format the active model uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncoderVariant {
    /// Two outputs: hidden states and log durations.
    Basic,
    /// Four outputs: additionally per-phoneme pitch and energy.
    Prosody,
}

/// Validated encoder outputs, all sharing phoneme count `N`.
#[derive(Debug, Clone, PartialEq)]
pub enum EncoderOutput {
    Basic {
        hidden: Tensor<f32>,
        log_durations: Tensor<f32>,
    },
    Prosody {
        hidden: Tensor<f32>,
        log_durations: Tensor<f32>,
        pitch: Tensor<f32>,
        energy: Tensor<f32>,
    },
}

fn take(outputs: &mut TensorMap, name: &str, stage: Stage) -> Result<Tensor<f32>> {
    outputs
        .remove(name)
        .ok_or_else(|| TtsError::inference(stage, format!("missing output `{name}`")))
}

fn check(tensor: &Tensor<f32>, name: &str, pattern: &[Option<usize>], stage: Stage) -> Result<()> {
    tensor
        .expect_shape(pattern)
        .map_err(|e| TtsError::inference(stage, format!("`{name}`: {e}")))
}

impl EncoderOutput {
    /// Pick the outputs `variant` requires from `outputs` and check they all
    /// describe the `n` phonemes that were fed in.
    pub fn from_outputs(variant: EncoderVariant, mut outputs: TensorMap, n: usize) -> Result<Self> {
        let stage = Stage::Encode;
        let hidden = take(&mut outputs, ENCODED_PHONEMES, stage)?;
        check(&hidden, ENCODED_PHONEMES, &[Some(1), Some(n), None], stage)?;
        let log_durations = take(&mut outputs, LOG_DURATIONS, stage)?;
        check(&log_durations, LOG_DURATIONS, &[Some(1), Some(n)], stage)?;

        match variant {
            EncoderVariant::Basic => Ok(EncoderOutput::Basic { hidden, log_durations }),
            EncoderVariant::Prosody => {
                let pitch = take(&mut outputs, PITCH_PREDICTIONS, stage)?;
                check(&pitch, PITCH_PREDICTIONS, &[Some(1), Some(n)], stage)?;
                let energy = take(&mut outputs, ENERGY_PREDICTIONS, stage)?;
                check(&energy, ENERGY_PREDICTIONS, &[Some(1), Some(n)], stage)?;
                Ok(EncoderOutput::Prosody { hidden, log_durations, pitch, energy })
            }
        }
    }

    pub fn variant(&self) -> EncoderVariant {
        match self {
            EncoderOutput::Basic { .. } => EncoderVariant::Basic,
            EncoderOutput::Prosody { .. } => EncoderVariant::Prosody,
        }
    }

    pub fn hidden(&self) -> &Tensor<f32> {
        match self {
            EncoderOutput::Basic { hidden, .. } | EncoderOutput::Prosody { hidden, .. } => hidden,
        }
    }

    pub fn log_durations(&self) -> &Tensor<f32> {
        match self {
            EncoderOutput::Basic { log_durations, .. }
            | EncoderOutput::Prosody { log_durations, .. } => log_durations,
        }
    }

    /// Phoneme count `N`.
    pub fn phonemes(&self) -> usize {
        self.log_durations().len()
    }
}

/// Per-frame features produced by length regulation, in the encoder's variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpandedFeatures {
    Basic {
        hidden: Tensor<f32>,
    },
    Prosody {
        hidden: Tensor<f32>,
        pitch: Tensor<f32>,
        energy: Tensor<f32>,
    },
}

impl ExpandedFeatures {
    pub fn hidden(&self) -> &Tensor<f32> {
        match self {
            ExpandedFeatures::Basic { hidden } | ExpandedFeatures::Prosody { hidden, .. } => hidden,
        }
    }

    /// Frame count `T`.
    pub fn frames(&self) -> usize {
        self.hidden().shape().get(1).copied().unwrap_or(0)
    }

    /// Decoder inputs for this variant.
    pub fn into_decoder_inputs(self) -> TensorMap {
        let mut inputs = TensorMap::new();
        match self {
            ExpandedFeatures::Basic { hidden } => {
                inputs.insert(EXPANDED_HIDDEN_STATES.to_string(), hidden);
            }
            ExpandedFeatures::Prosody { hidden, pitch, energy } => {
                inputs.insert(EXPANDED_HIDDEN_STATES.to_string(), hidden);
                inputs.insert(EXPANDED_PITCH.to_string(), pitch);
                inputs.insert(EXPANDED_ENERGY.to_string(), energy);
            }
        }
        inputs
    }
}

/// Pull `mel_spectrogram [1,T,M]` out of decoder outputs.
pub fn mel_from_outputs(mut outputs: TensorMap, frames: usize, mel_channels: usize) -> Result<Tensor<f32>> {
    let mel = take(&mut outputs, MEL_SPECTROGRAM, Stage::Decode)?;
    check(&mel, MEL_SPECTROGRAM, &[Some(1), Some(frames), Some(mel_channels)], Stage::Decode)?;
    Ok(mel)
}

/// Pull `waveform` out of vocoder outputs.  Shape is checked by the postprocessor.
pub fn waveform_from_outputs(mut outputs: TensorMap) -> Result<Tensor<f32>> {
    take(&mut outputs, WAVEFORM, Stage::Vocode)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
