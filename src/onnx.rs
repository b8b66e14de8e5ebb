//! ONNX Runtime adapter — three [`ort`] sessions behind [`InferenceModel`].
//!
//! Inputs are passed by name (see [`crate::model`] for the contract), and
//! only the output names the contract knows about are read back; anything
//! else the graph emits is ignored.

use std::{borrow::Cow, path::Path, sync::Mutex};

use anyhow::{Context, Result as AnyResult};
use ort::{
    session::{Session, SessionInputValue},
    value::Tensor as OrtTensor,
};
use tracing::debug;

use crate::{
    config::ModelConfig,
    error::{Result, Stage, TtsError},
    model::{
        InferenceModel, TensorMap, ENCODED_PHONEMES, ENERGY_PREDICTIONS, INPUT_IDS, LOG_DURATIONS,
        MEL_SPECTROGRAM, PITCH_PREDICTIONS, WAVEFORM,
    },
    tensor::Tensor,
};

const ENCODER_OUTPUTS: &[&str] = &[ENCODED_PHONEMES, LOG_DURATIONS, PITCH_PREDICTIONS, ENERGY_PREDICTIONS];
const DECODER_OUTPUTS: &[&str] = &[MEL_SPECTROGRAM];
const VOCODER_OUTPUTS: &[&str] = &[WAVEFORM];

pub struct OrtModel {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
    vocoder: Mutex<Session>,
    sample_rate: u32,
    mel_channels: usize,
}

fn load_session(path: &Path) -> AnyResult<Session> {
    Session::builder()
        .context("Failed to create ORT session builder")?
        .commit_from_file(path)
        .with_context(|| format!("Cannot load ONNX model: {}", path.display()))
}

impl OrtModel {
    /// Load the encoder, decoder and vocoder graphs.
    pub fn load(
        encoder: &Path,
        decoder: &Path,
        vocoder: &Path,
        sample_rate: u32,
        mel_channels: usize,
    ) -> AnyResult<Self> {
        Ok(Self {
            encoder: Mutex::new(load_session(encoder)?),
            decoder: Mutex::new(load_session(decoder)?),
            vocoder: Mutex::new(load_session(vocoder)?),
            sample_rate,
            mel_channels,
        })
    }

    /// Load the graphs named by a bundle `config.json`.
    pub fn from_config(config: &ModelConfig) -> AnyResult<Self> {
        Self::load(
            &config.resolve(&config.encoder),
            &config.resolve(&config.decoder),
            &config.resolve(&config.vocoder),
            config.sample_rate,
            config.mel_channels,
        )
    }

    fn run(
        session: &Mutex<Session>,
        stage: Stage,
        inputs: Vec<(Cow<'static, str>, SessionInputValue<'static>)>,
        wanted: &[&str],
    ) -> Result<TensorMap> {
        let mut session = session
            .lock()
            .map_err(|_| TtsError::inference(stage, "ORT session mutex poisoned"))?;
        let outputs = session
            .run(inputs)
            .map_err(|e| TtsError::inference(stage, format!("ONNX inference failed: {e}")))?;

        // Copy the named f32 outputs that are present into owned tensors.
        let mut map = TensorMap::new();
        for &name in wanted {
            let Some(value) = outputs.get(name) else {
                continue;
            };
            let (shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| TtsError::inference(stage, format!("`{name}`: {e}")))?;
            let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            let tensor = Tensor::new(shape, data.to_vec())
                .map_err(|e| TtsError::inference(stage, format!("`{name}`: {e}")))?;
            map.insert(name.to_string(), tensor);
        }
        debug!(%stage, outputs = map.len(), "collected model outputs");
        Ok(map)
    }
}

fn f32_input(name: &str, tensor: Tensor<f32>, stage: Stage) -> Result<(Cow<'static, str>, SessionInputValue<'static>)> {
    let (shape, data) = tensor.into_parts();
    let value = OrtTensor::<f32>::from_array((shape, data))
        .map_err(|e| TtsError::inference(stage, format!("Failed to build `{name}` tensor: {e}")))?;
    Ok((Cow::Owned(name.to_string()), value.into()))
}

impl InferenceModel for OrtModel {
    fn encode(&self, input_ids: Tensor<i64>) -> Result<TensorMap> {
        let (shape, data) = input_ids.into_parts();
        let ids = OrtTensor::<i64>::from_array((shape, data))
            .map_err(|e| TtsError::inference(Stage::Encode, format!("Failed to build input_ids tensor: {e}")))?;
        Self::run(
            &self.encoder,
            Stage::Encode,
            vec![(Cow::Borrowed(INPUT_IDS), ids.into())],
            ENCODER_OUTPUTS,
        )
    }

    fn decode(&self, inputs: TensorMap) -> Result<TensorMap> {
        let inputs = inputs
            .into_iter()
            .map(|(name, tensor)| f32_input(&name, tensor, Stage::Decode))
            .collect::<Result<Vec<_>>>()?;
        Self::run(&self.decoder, Stage::Decode, inputs, DECODER_OUTPUTS)
    }

    fn vocode(&self, mel: Tensor<f32>) -> Result<TensorMap> {
        let input = f32_input(MEL_SPECTROGRAM, mel, Stage::Vocode)?;
        Self::run(&self.vocoder, Stage::Vocode, vec![input], VOCODER_OUTPUTS)
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn mel_channels(&self) -> usize {
        self.mel_channels
    }
}
