//! Model bundle `config.json`.
//!
//! ```json
//! {
//!   "encoder": "encoder.onnx",
//!   "decoder": "decoder.onnx",
//!   "vocoder": "hifigan.onnx",
//!   "vocab": "phonemes.json",
//!   "sample_rate": 22050,
//!   "mel_channels": 80,
//!   "encoder_variant": "prosody",
//!   "synthesis": {
//!     "duration_floor": 1,
//!     "max_frames_per_phoneme": 1000,
//!     "sample_encoding": "pcm16",
//!     "delimiters": "。！？!?.",
//!     "max_chunk_chars": 400
//!   }
//! }
//! ```
//!
//! File names are resolved relative to the directory holding `config.json`.
//! `duration_floor` has no default: the choice between letting phonemes
//! vanish (0) and giving each at least one frame (1) changes output length,
//! so each bundle must state it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::{
    chunk::{SentenceSplitter, DEFAULT_DELIMITERS, DEFAULT_MAX_CHARS},
    model::EncoderVariant,
    pipeline::SynthesisOptions,
    regulate::{DurationPolicy, DEFAULT_MAX_FRAMES},
    tokenize::Vocabulary,
    wav::SampleEncoding,
};

fn default_mel_channels() -> usize {
    80
}

fn default_max_frames() -> u32 {
    DEFAULT_MAX_FRAMES
}

fn default_delimiters() -> String {
    DEFAULT_DELIMITERS.to_string()
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHARS
}

/// Deserialised bundle `config.json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Encoder graph file.
    pub encoder: PathBuf,
    /// Decoder graph file.
    pub decoder: PathBuf,
    /// Vocoder graph file.
    pub vocoder: PathBuf,
    /// JSON vocabulary; the built-in table is used when absent.
    #[serde(default)]
    pub vocab: Option<PathBuf>,
    /// Output sample rate of the decoder / vocoder pair.
    pub sample_rate: u32,
    #[serde(default = "default_mel_channels")]
    pub mel_channels: usize,
    pub encoder_variant: EncoderVariant,
    pub synthesis: SynthesisConfig,

    #[serde(skip)]
    base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SynthesisConfig {
    pub duration_floor: u32,
    #[serde(default = "default_max_frames")]
    pub max_frames_per_phoneme: u32,
    #[serde(default)]
    pub sample_encoding: SampleEncoding,
    #[serde(default = "default_delimiters")]
    pub delimiters: String,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
}

impl ModelConfig {
    /// Read and validate `config.json` at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Cannot read config: {}", path.display()))?;
        let mut config = Self::from_json_slice(&bytes)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(config)
    }

    /// Parse and validate; relative paths resolve against the current directory.
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        let config: ModelConfig = serde_json::from_slice(bytes).context("invalid config.json")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            bail!("sample_rate must be positive");
        }
        if self.mel_channels == 0 {
            bail!("mel_channels must be positive");
        }
        if self.synthesis.max_frames_per_phoneme == 0 {
            bail!("max_frames_per_phoneme must be positive");
        }
        if self.synthesis.duration_floor > self.synthesis.max_frames_per_phoneme {
            bail!(
                "duration_floor ({}) exceeds max_frames_per_phoneme ({})",
                self.synthesis.duration_floor,
                self.synthesis.max_frames_per_phoneme
            );
        }
        if self.synthesis.delimiters.is_empty() {
            bail!("delimiters must not be empty");
        }
        Ok(())
    }

    /// `path` relative to the config file's directory (absolute paths pass through).
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.base_dir.join(path)
    }

    /// The vocabulary this bundle uses.
    pub fn vocabulary(&self) -> Result<Vocabulary> {
        match &self.vocab {
            Some(path) => Vocabulary::load(&self.resolve(path)),
            None => Ok(Vocabulary::builtin().clone()),
        }
    }

    /// Pipeline options described by the `synthesis` block.
    pub fn options(&self) -> SynthesisOptions {
        let s = &self.synthesis;
        SynthesisOptions {
            encoder_variant: self.encoder_variant,
            durations: DurationPolicy::new(s.duration_floor).with_max_frames(s.max_frames_per_phoneme),
            splitter: SentenceSplitter::new(&s.delimiters).with_max_chars(s.max_chunk_chars),
            encoding: s.sample_encoding,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
