//! # onsei
//!
//! Feature expansion and audio assembly for FastSpeech-style neural TTS:
//! phoneme IDs in, WAV bytes out, with the encoder, decoder and vocoder
//! networks treated as opaque tensor functions.
//!
//! ## Quick start
//!
//! ```no_run
//! use onsei::{config::ModelConfig, onnx::OrtModel, Synthesizer, WhitespacePhonemizer};
//!
//! let config = ModelConfig::load(std::path::Path::new("bundle/config.json")).unwrap();
//! let model = OrtModel::from_config(&config).unwrap();
//! let tts = Synthesizer::new(model, WhitespacePhonemizer, config.vocabulary().unwrap(), config.options());
//!
//! // Pre-phonemised input, one sentence per chunk.
//! tts.generate_to_file("k o N n i ch i w a 。 s a y o n a r a", std::path::Path::new("out.wav"))
//!     .unwrap();
//! ```
//!
//! Any text front end plugs in through [`Phonemizer`]; closures work too:
//!
//! ```
//! use onsei::{mock::MockModel, EncoderVariant, SynthesisOptions, Synthesizer, Vocabulary};
//!
//! let g2p = |text: &str| -> onsei::Result<Vec<String>> {
//!     Ok(text.chars().filter(|c| !c.is_whitespace()).map(|c| c.to_string()).collect())
//! };
//! let tts = Synthesizer::new(
//!     MockModel::new(EncoderVariant::Basic),
//!     g2p,
//!     Vocabulary::builtin().clone(),
//!     SynthesisOptions::new(EncoderVariant::Basic, 1),
//! );
//! let audio = tts.generate("aiueo. kakiku").unwrap();
//! assert!(audio.frame_count() > 0);
//! ```
//!
//! ## Pipeline
//! 1. **Chunking** — text split at sentence punctuation ([`chunk`]).
//! 2. **Phonemisation** — caller-supplied [`Phonemizer`].
//! 3. **Tokenisation** — phonemes → `input_ids [1, N]` ([`tokenize`]).
//! 4. **Encode** — hidden states, log durations, optional pitch / energy ([`model`]).
//! 5. **Length regulation** — per-phoneme → per-frame features ([`regulate`]).
//! 6. **Decode / vocode** — mel spectrogram → waveform ([`model`]).
//! 7. **Postprocess** — clip to `[-1, 1]` ([`postprocess`]).
//! 8. **Concat** — chunk buffers joined in order ([`pipeline`]).
//! 9. **WAV** — 16-bit PCM or 32-bit float container ([`wav`]).
//!
//! Chunks run strictly one after another and the first failure aborts the
//! request; see [`synthesize_long_text`].

pub mod audio;
pub mod chunk;
pub mod config;
pub mod error;
pub mod mock;
pub mod model;
pub mod onnx;
pub mod pipeline;
pub mod postprocess;
pub mod regulate;
pub mod tensor;
pub mod tokenize;
pub mod wav;

// ─── Re-exports for convenience ─────────────────────────────────────────────

pub use audio::{AudioBuffer, AudioFormat};
pub use chunk::{ChunkSplitter, SentenceSplitter};
pub use error::{Result, Stage, TtsError};
pub use model::{EncoderOutput, EncoderVariant, ExpandedFeatures, InferenceModel, TensorMap};
pub use pipeline::{synthesize_long_text, Phonemizer, SynthesisOptions, Synthesizer, WhitespacePhonemizer};
pub use postprocess::WaveformPostprocessor;
pub use regulate::{DurationPolicy, LengthRegulator};
pub use tensor::Tensor;
pub use tokenize::Vocabulary;
pub use wav::{SampleEncoding, WavWriter};
