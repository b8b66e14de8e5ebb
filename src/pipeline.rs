//! Synthesis pipeline: text → chunks → phonemes → model → audio.
//!
//! One chunk runs through
//!
//! 1. **Phonemisation**: caller-supplied [`Phonemizer`].
//! 2. **Tokenisation**: phoneme tokens → `input_ids [1, N]`.
//! 3. **Encode**: hidden states, log durations (and pitch / energy).
//! 4. **Length regulation**: per-phoneme → per-frame features.
//! 5. **Decode**: mel spectrogram `[1, T, M]`.
//! 6. **Vocode**: transposed mel `[1, M, T]` → waveform.
//! 7. **Postprocess**: clip to `[-1, 1]`, tag with the model's sample rate.
//!
//! Long text is split into sentence chunks which run strictly one after the
//! other; the first failure aborts the request and no partial audio is
//! returned.

use std::path::Path;

use tracing::{debug, info};

use crate::{
    audio::{AudioBuffer, AudioFormat},
    chunk::{ChunkSplitter, SentenceSplitter},
    error::{Result, Stage, TtsError},
    model::{mel_from_outputs, waveform_from_outputs, EncoderOutput, EncoderVariant, InferenceModel},
    postprocess::WaveformPostprocessor,
    regulate::{DurationPolicy, LengthRegulator},
    tokenize::Vocabulary,
    wav::{SampleEncoding, WavWriter},
};

// ─────────────────────────────────────────────────────────────────────────────
// Text front end
// ─────────────────────────────────────────────────────────────────────────────

/// Text → ordered phoneme tokens.
pub trait Phonemizer {
    fn phonemize(&self, text: &str) -> Result<Vec<String>>;
}

impl<F> Phonemizer for F
where
    F: Fn(&str) -> Result<Vec<String>>,
{
    fn phonemize(&self, text: &str) -> Result<Vec<String>> {
        self(text)
    }
}

/// Treats the input as already phonemised: tokens separated by whitespace.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WhitespacePhonemizer;

impl Phonemizer for WhitespacePhonemizer {
    fn phonemize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Chunk orchestration
// ─────────────────────────────────────────────────────────────────────────────

/// Synthesise `text` chunk by chunk and join the results in order.
///
/// - No chunks (empty or delimiter-only text) is a successful, empty buffer.
/// - Chunks run sequentially; the first error stops the loop and is returned
///   wrapped in [`TtsError::Chunk`] with its zero-based chunk index.  Audio from
///   earlier chunks is dropped.
/// - Every chunk buffer must be in `format`, else [`TtsError::FormatMismatch`].
pub fn synthesize_long_text<S, F>(
    text: &str,
    splitter: &S,
    format: AudioFormat,
    mut synthesize_one: F,
) -> Result<AudioBuffer>
where
    S: ChunkSplitter + ?Sized,
    F: FnMut(&str) -> Result<AudioBuffer>,
{
    let chunks = splitter.split(text);
    if chunks.is_empty() {
        debug!("no chunks to synthesise");
        return Ok(AudioBuffer::empty(format));
    }

    let mut buffers = Vec::with_capacity(chunks.len());
    for (index, chunk) in chunks.iter().enumerate() {
        debug!(index, total = chunks.len(), chunk = %chunk, "synthesising chunk");
        let buffer = synthesize_one(chunk)
            .map_err(|e| TtsError::Chunk { index, source: Box::new(e) })?;
        buffers.push(buffer);
    }

    let audio = AudioBuffer::concat(format, buffers)?;
    info!(
        chunks = chunks.len(),
        frames = audio.frame_count(),
        seconds = audio.duration_secs(),
        "synthesis complete"
    );
    Ok(audio)
}

// ─────────────────────────────────────────────────────────────────────────────
// Synthesizer
// ─────────────────────────────────────────────────────────────────────────────

/// Settings that change what the pipeline produces.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    /// Encoder wire format of the loaded model.
    pub encoder_variant: EncoderVariant,
    /// Log-duration → frame-count rule.
    pub durations: DurationPolicy,
    /// Long-text chunking.
    pub splitter: SentenceSplitter,
    /// WAV sample encoding for file output.
    pub encoding: SampleEncoding,
}

impl SynthesisOptions {
    /// Options for `encoder_variant` with the given duration floor and
    /// defaults elsewhere.
    pub fn new(encoder_variant: EncoderVariant, duration_floor: u32) -> Self {
        Self {
            encoder_variant,
            durations: DurationPolicy::new(duration_floor),
            splitter: SentenceSplitter::default(),
            encoding: SampleEncoding::default(),
        }
    }
}

/// A model, a phoneme front end and a vocabulary, wired into one pipeline.
///
/// Holds no per-request state: every call builds and drops its own tensors.
pub struct Synthesizer<M, P = WhitespacePhonemizer> {
    model: M,
    phonemizer: P,
    vocabulary: Vocabulary,
    encoder_variant: EncoderVariant,
    regulator: LengthRegulator,
    postprocessor: WaveformPostprocessor,
    splitter: SentenceSplitter,
    writer: WavWriter,
}

impl<M: InferenceModel, P: Phonemizer> Synthesizer<M, P> {
    pub fn new(model: M, phonemizer: P, vocabulary: Vocabulary, options: SynthesisOptions) -> Self {
        let postprocessor = WaveformPostprocessor::new(model.sample_rate());
        Self {
            model,
            phonemizer,
            vocabulary,
            encoder_variant: options.encoder_variant,
            regulator: LengthRegulator::new(options.durations),
            postprocessor,
            splitter: options.splitter,
            writer: WavWriter::new(options.encoding),
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Format of every buffer this synthesizer returns.
    pub fn format(&self) -> AudioFormat {
        AudioFormat::mono(self.model.sample_rate())
    }

    // ── Phonemes → audio ──────────────────────────────────────────────────────

    /// One full pass for a phoneme sequence.
    pub fn generate_from_phonemes<S: AsRef<str>>(&self, phonemes: &[S]) -> Result<AudioBuffer> {
        let input_ids = self.vocabulary.encode_ids(phonemes)?;
        let n = input_ids.len();

        let encoded = EncoderOutput::from_outputs(self.encoder_variant, self.model.encode(input_ids)?, n)?;
        let expanded = self.regulator.expand(&encoded)?;
        drop(encoded);

        let frames = expanded.frames();
        let mel = mel_from_outputs(
            self.model.decode(expanded.into_decoder_inputs())?,
            frames,
            self.model.mel_channels(),
        )?;
        debug!(phonemes = n, frames, "decoded mel spectrogram");

        let mel = mel
            .transpose_last2()
            .map_err(|e| TtsError::inference(Stage::Vocode, e.to_string()))?;
        let waveform = waveform_from_outputs(self.model.vocode(mel)?)?;

        self.postprocessor.finish(waveform)
    }

    // ── Text → audio ──────────────────────────────────────────────────────────

    /// Phonemise one chunk of text and synthesise it.
    ///
    /// Empty text, or text the front end turns into no phonemes, fails with
    /// [`TtsError::EmptyInput`].
    pub fn generate_chunk(&self, text: &str) -> Result<AudioBuffer> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TtsError::EmptyInput { stage: Stage::Phonemize });
        }
        let phonemes = self.phonemizer.phonemize(text)?;
        self.generate_from_phonemes(&phonemes)
    }

    /// Synthesise arbitrarily long text, chunk by chunk.
    ///
    /// Text with no chunks yields an empty buffer rather than an error.
    pub fn generate(&self, text: &str) -> Result<AudioBuffer> {
        synthesize_long_text(text, &self.splitter, self.format(), |chunk| self.generate_chunk(chunk))
    }

    /// Synthesise `text` into WAV bytes.
    pub fn generate_wav(&self, text: &str) -> Result<Vec<u8>> {
        let audio = self.generate(text)?;
        self.writer.write(&audio)
    }

    /// Synthesise `text` and write a WAV file.
    pub fn generate_to_file(&self, text: &str, output_path: &Path) -> Result<()> {
        let audio = self.generate(text)?;
        self.writer.write_to_file(&audio, output_path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    fn tone(n: usize, value: f32) -> AudioBuffer {
        AudioBuffer::mono(22_050, vec![value; n])
    }

    #[test]
    fn test_chunks_concatenated_in_order() {
        let splitter = SentenceSplitter::new("。！");
        let lens = [("A", 100usize), ("B", 200), ("C", 50)];
        let audio = synthesize_long_text("A。B！C", &splitter, AudioFormat::mono(22_050), |chunk| {
            let (i, &(_, n)) = lens.iter().enumerate().find(|(_, (c, _))| *c == chunk).unwrap();
            Ok(tone(n, i as f32))
        })
        .unwrap();

        assert_eq!(audio.frame_count(), 350);
        assert_eq!(audio.samples()[99], 0.0);
        assert_eq!(audio.samples()[100], 1.0);
        assert_eq!(audio.samples()[300], 2.0);
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let seen = RefCell::new(Vec::new());
        let err = synthesize_long_text("A。B。C", &SentenceSplitter::new("。"), AudioFormat::mono(22_050), |chunk| {
            seen.borrow_mut().push(chunk.to_string());
            if chunk == "B" {
                Err(TtsError::inference(Stage::Decode, "out of memory"))
            } else {
                Ok(tone(10, 0.0))
            }
        })
        .unwrap_err();

        assert_eq!(*seen.borrow(), vec!["A", "B"]);
        assert_eq!(err.chunk_index(), Some(1));
        assert_eq!(err.stage(), Stage::Decode);
    }

    #[test]
    fn test_empty_text_is_vacuous_success() {
        let audio = synthesize_long_text("  。 ", &SentenceSplitter::default(), AudioFormat::mono(8_000), |_| {
            panic!("no chunk should be synthesised")
        })
        .unwrap();
        assert!(audio.is_empty());
        assert_eq!(audio.sample_rate(), 8_000);
    }

    #[test]
    fn test_mismatched_chunk_format() {
        let err = synthesize_long_text("A. B", &SentenceSplitter::default(), AudioFormat::mono(22_050), |chunk| {
            Ok(if chunk == "B" { AudioBuffer::mono(16_000, vec![0.0]) } else { tone(1, 0.0) })
        })
        .unwrap_err();
        assert!(matches!(err, TtsError::FormatMismatch { chunk: 1, .. }));
    }

    #[test]
    fn test_whitespace_phonemizer() {
        let p = WhitespacePhonemizer.phonemize(" k o  N\tn i ").unwrap();
        assert_eq!(p, vec!["k", "o", "N", "n", "i"]);
    }
}
