//! Typed errors for the synthesis pipeline.
//!
//! Every failure carries the [`Stage`] it came from so a caller can tell which
//! step of a request broke without parsing messages.  Resource loading (config,
//! vocabulary, ONNX sessions) uses `anyhow` instead; see [`crate::config`].

use std::fmt;

use thiserror::Error;

use crate::audio::AudioFormat;

/// Pipeline step a [`TtsError`] originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Text → phoneme tokens (external front end).
    Phonemize,
    /// Phoneme tokens → ID tensor.
    Tokenize,
    /// Encoder model call.
    Encode,
    /// Length regulation.
    Regulate,
    /// Decoder model call.
    Decode,
    /// Vocoder model call.
    Vocode,
    /// Waveform clipping / repackaging.
    Postprocess,
    /// Joining per-chunk buffers.
    Concatenate,
    /// WAV serialisation or storage.
    Container,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Phonemize => "phonemize",
            Stage::Tokenize => "tokenize",
            Stage::Encode => "encode",
            Stage::Regulate => "regulate",
            Stage::Decode => "decode",
            Stage::Vocode => "vocode",
            Stage::Postprocess => "postprocess",
            Stage::Concatenate => "concatenate",
            Stage::Container => "container",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum TtsError {
    /// A stage received nothing to work on (no phonemes, no text).
    #[error("{stage}: empty input")]
    EmptyInput { stage: Stage },

    /// The text front end could not produce phonemes.
    #[error("phonemize: {message}")]
    Phonemize { message: String },

    /// A model call failed, or returned missing / mis-shaped outputs.
    #[error("{stage}: model inference failed: {message}")]
    ModelInference { stage: Stage, message: String },

    /// Every phoneme received zero frames.
    #[error("regulate: durations sum to zero frames")]
    EmptyExpansion,

    /// A predicted duration exceeded the per-phoneme frame cap (or was infinite).
    #[error("regulate: phoneme {index} duration {frames} exceeds the limit of {max} frames")]
    DurationOverflow { index: usize, frames: f64, max: u32 },

    /// Caller-supplied durations do not match the phoneme count.
    #[error("regulate: {found} durations for {expected} phonemes")]
    DurationCount { expected: usize, found: usize },

    /// NaN in a numeric stream where a real value is required.
    #[error("{stage}: non-finite value at index {index}")]
    NonFinite { stage: Stage, index: usize },

    /// The vocoder produced no samples.
    #[error("postprocess: waveform has no samples")]
    EmptyWaveform,

    /// Chunk buffers disagree on sample rate or channel count.
    #[error("concatenate: chunk {chunk} is {found}, expected {expected}")]
    FormatMismatch { chunk: usize, expected: AudioFormat, found: AudioFormat },

    /// The WAV container could not be built or stored.
    #[error("container: {0}")]
    ContainerWrite(#[source] std::io::Error),

    /// Failure inside one chunk of a multi-chunk request.
    #[error("chunk {index}: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: Box<TtsError>,
    },
}

impl TtsError {
    /// Shorthand for a [`TtsError::ModelInference`].
    pub fn inference(stage: Stage, message: impl Into<String>) -> Self {
        TtsError::ModelInference { stage, message: message.into() }
    }

    /// The stage that failed, looking through [`TtsError::Chunk`] wrappers.
    pub fn stage(&self) -> Stage {
        match self {
            TtsError::EmptyInput { stage }
            | TtsError::ModelInference { stage, .. }
            | TtsError::NonFinite { stage, .. } => *stage,
            TtsError::Phonemize { .. } => Stage::Phonemize,
            TtsError::EmptyExpansion
            | TtsError::DurationOverflow { .. }
            | TtsError::DurationCount { .. } => Stage::Regulate,
            TtsError::EmptyWaveform => Stage::Postprocess,
            TtsError::FormatMismatch { .. } => Stage::Concatenate,
            TtsError::ContainerWrite(_) => Stage::Container,
            TtsError::Chunk { source, .. } => source.stage(),
        }
    }

    /// Index of the failing chunk, when the error came from a multi-chunk request.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            TtsError::Chunk { index, .. } => Some(*index),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TtsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_through_chunk_wrapper() {
        let err = TtsError::Chunk {
            index: 1,
            source: Box::new(TtsError::inference(Stage::Decode, "boom")),
        };
        assert_eq!(err.stage(), Stage::Decode);
        assert_eq!(err.chunk_index(), Some(1));
        assert_eq!(err.to_string(), "chunk 1: decode: model inference failed: boom");
    }

    #[test]
    fn test_stage_of_leaf_errors() {
        assert_eq!(TtsError::EmptyExpansion.stage(), Stage::Regulate);
        assert_eq!(TtsError::EmptyWaveform.stage(), Stage::Postprocess);
        assert_eq!(TtsError::EmptyInput { stage: Stage::Tokenize }.stage(), Stage::Tokenize);
        assert_eq!(TtsError::EmptyWaveform.chunk_index(), None);
    }
}
