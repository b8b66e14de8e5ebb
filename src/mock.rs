//! Deterministic stand-in for the three networks.
//!
//! [`MockModel`] honours the tensor contracts exactly but computes trivial
//! values, so the pipeline can be exercised end to end without model files:
//!
//! - encode: `hidden[i, h] = id_i + h / 100`, every phoneme lasts
//!   `frames_per_phoneme` frames, `pitch[i] = id_i`, `energy[i] = 1`.
//! - decode: `mel[t, m] = hidden[t, 0] + pitch[t] / 1000 + m / 1000`.
//! - vocode: each frame becomes `hop_length` samples of `gain · mel[0, t]`.
//!
//! Failures can be injected per stage and call number, outputs can be
//! withheld, and every call is recorded in order.

use std::sync::Mutex;

use crate::{
    error::{Result, Stage, TtsError},
    model::{
        EncoderVariant, InferenceModel, TensorMap, ENCODED_PHONEMES, ENERGY_PREDICTIONS,
        EXPANDED_ENERGY, EXPANDED_HIDDEN_STATES, EXPANDED_PITCH, LOG_DURATIONS, MEL_SPECTROGRAM,
        PITCH_PREDICTIONS, WAVEFORM,
    },
    tensor::Tensor,
};

#[derive(Debug)]
pub struct MockModel {
    variant: EncoderVariant,
    hidden_size: usize,
    mel_channels: usize,
    sample_rate: u32,
    hop_length: usize,
    frames_per_phoneme: f32,
    gain: f32,
    failure: Option<(Stage, usize)>,
    withheld: Vec<String>,
    calls: Mutex<Vec<Stage>>,
}

impl MockModel {
    /// A small model emitting the outputs of `variant`: H = 4, M = 8,
    /// 16 kHz, 4 samples per frame, 2 frames per phoneme.
    pub fn new(variant: EncoderVariant) -> Self {
        Self {
            variant,
            hidden_size: 4,
            mel_channels: 8,
            sample_rate: 16_000,
            hop_length: 4,
            frames_per_phoneme: 2.0,
            gain: 0.01,
            failure: None,
            withheld: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_hop_length(mut self, hop_length: usize) -> Self {
        self.hop_length = hop_length;
        self
    }

    /// Predicted (pre-rounding) duration of every phoneme.
    pub fn with_frames_per_phoneme(mut self, frames: f32) -> Self {
        self.frames_per_phoneme = frames;
        self
    }

    /// Waveform scale; values above ~0.02 push samples past full scale.
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Fail the `nth` (zero-based) call to `stage`.
    pub fn failing_at(mut self, stage: Stage, nth: usize) -> Self {
        self.failure = Some((stage, nth));
        self
    }

    /// Leave `output` out of whichever call would produce it.
    pub fn without_output(mut self, output: &str) -> Self {
        self.withheld.push(output.to_string());
        self
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<Stage> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, stage: Stage) -> Result<()> {
        let mut calls = self
            .calls
            .lock()
            .map_err(|_| TtsError::inference(stage, "mock call log poisoned"))?;
        let nth = calls.iter().filter(|&&s| s == stage).count();
        calls.push(stage);
        match self.failure {
            Some((s, n)) if s == stage && n == nth => {
                Err(TtsError::inference(stage, format!("injected failure on call {nth}")))
            }
            _ => Ok(()),
        }
    }

    fn emit(&self, outputs: &mut TensorMap, name: &str, shape: Vec<usize>, data: Vec<f32>, stage: Stage) -> Result<()> {
        if self.withheld.iter().any(|w| w == name) {
            return Ok(());
        }
        let tensor = Tensor::new(shape, data).map_err(|e| TtsError::inference(stage, e.to_string()))?;
        outputs.insert(name.to_string(), tensor);
        Ok(())
    }
}

fn input<'a>(inputs: &'a TensorMap, name: &str, stage: Stage) -> Result<&'a Tensor<f32>> {
    inputs
        .get(name)
        .ok_or_else(|| TtsError::inference(stage, format!("missing input `{name}`")))
}

impl InferenceModel for MockModel {
    fn encode(&self, input_ids: Tensor<i64>) -> Result<TensorMap> {
        self.record(Stage::Encode)?;
        input_ids
            .expect_shape(&[Some(1), None])
            .map_err(|e| TtsError::inference(Stage::Encode, e.to_string()))?;

        let ids = input_ids.data();
        let n = ids.len();
        let h = self.hidden_size;
        let hidden: Vec<f32> = ids
            .iter()
            .flat_map(|&id| (0..h).map(move |k| id as f32 + k as f32 / 100.0))
            .collect();
        let log_duration = (self.frames_per_phoneme + 1.0).ln();

        let mut out = TensorMap::new();
        self.emit(&mut out, ENCODED_PHONEMES, vec![1, n, h], hidden, Stage::Encode)?;
        self.emit(&mut out, LOG_DURATIONS, vec![1, n], vec![log_duration; n], Stage::Encode)?;
        if self.variant == EncoderVariant::Prosody {
            let pitch = ids.iter().map(|&id| id as f32).collect();
            self.emit(&mut out, PITCH_PREDICTIONS, vec![1, n], pitch, Stage::Encode)?;
            self.emit(&mut out, ENERGY_PREDICTIONS, vec![1, n], vec![1.0; n], Stage::Encode)?;
        }
        Ok(out)
    }

    fn decode(&self, inputs: TensorMap) -> Result<TensorMap> {
        self.record(Stage::Decode)?;
        let hidden = input(&inputs, EXPANDED_HIDDEN_STATES, Stage::Decode)?;
        hidden
            .expect_shape(&[Some(1), None, Some(self.hidden_size)])
            .map_err(|e| TtsError::inference(Stage::Decode, e.to_string()))?;
        let t = hidden.shape()[1];

        let pitch = match self.variant {
            EncoderVariant::Basic => vec![0.0; t],
            EncoderVariant::Prosody => {
                input(&inputs, EXPANDED_ENERGY, Stage::Decode)?;
                input(&inputs, EXPANDED_PITCH, Stage::Decode)?.data().to_vec()
            }
        };

        let m = self.mel_channels;
        let mel: Vec<f32> = hidden
            .data()
            .chunks_exact(self.hidden_size)
            .zip(&pitch)
            .flat_map(|(row, &p)| (0..m).map(move |c| row[0] + p / 1000.0 + c as f32 / 1000.0))
            .collect();

        let mut out = TensorMap::new();
        self.emit(&mut out, MEL_SPECTROGRAM, vec![1, t, m], mel, Stage::Decode)?;
        Ok(out)
    }

    fn vocode(&self, mel: Tensor<f32>) -> Result<TensorMap> {
        self.record(Stage::Vocode)?;
        mel.expect_shape(&[Some(1), Some(self.mel_channels), None])
            .map_err(|e| TtsError::inference(Stage::Vocode, e.to_string()))?;
        let t = mel.shape()[2];

        // Row 0 of the transposed mel is channel 0 across all frames.
        let samples: Vec<f32> = mel.data()[..t]
            .iter()
            .flat_map(|&v| std::iter::repeat(self.gain * v).take(self.hop_length))
            .collect();

        let mut out = TensorMap::new();
        self.emit(&mut out, WAVEFORM, vec![1, samples.len()], samples, Stage::Vocode)?;
        Ok(out)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn mel_channels(&self) -> usize {
        self.mel_channels
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
