//! End-to-end pipeline tests against the deterministic mock model.

use std::io::Cursor;

use onsei::{
    mock::MockModel,
    model::{ENERGY_PREDICTIONS, MEL_SPECTROGRAM},
    wav::HEADER_LEN,
    EncoderVariant, Result, SampleEncoding, Stage, SynthesisOptions, Synthesizer, TtsError,
    Vocabulary, WhitespacePhonemizer,
};

fn synth(model: MockModel, variant: EncoderVariant, floor: u32) -> Synthesizer<MockModel> {
    Synthesizer::new(
        model,
        WhitespacePhonemizer,
        Vocabulary::builtin().clone(),
        SynthesisOptions::new(variant, floor),
    )
}

#[test]
fn single_chunk_shapes_follow_durations() {
    // 3 phonemes × 2 frames × 4 samples per frame.
    let tts = synth(MockModel::new(EncoderVariant::Prosody), EncoderVariant::Prosody, 1);
    let audio = tts.generate_chunk("k o N").unwrap();

    assert_eq!(audio.sample_rate(), 16_000);
    assert_eq!(audio.channels(), 1);
    assert_eq!(audio.frame_count(), 24);

    // Piecewise constant: each phoneme's 8 samples share one value.
    let s = audio.samples();
    assert!(s[..8].iter().all(|&v| v == s[0]));
    assert!(s[8..16].iter().all(|&v| v == s[8]));
    assert_ne!(s[0], s[8]);
}

#[test]
fn basic_variant_runs_end_to_end() {
    let tts = synth(MockModel::new(EncoderVariant::Basic), EncoderVariant::Basic, 1);
    let audio = tts.generate("HH AH0 L OW1. W ER1 L D").unwrap();
    assert_eq!(audio.frame_count(), (4 + 4) * 2 * 4);
}

#[test]
fn sample_rate_comes_from_the_model() {
    let model = MockModel::new(EncoderVariant::Basic).with_sample_rate(24_000);
    let tts = synth(model, EncoderVariant::Basic, 1);
    assert_eq!(tts.generate_chunk("a").unwrap().sample_rate(), 24_000);
    assert_eq!(tts.generate("").unwrap().sample_rate(), 24_000);
}

#[test]
fn duration_floor_changes_frame_count() {
    // Predicted duration 0.3 frames: vanishes with floor 0, one frame with floor 1.
    let vanishing = synth(
        MockModel::new(EncoderVariant::Prosody).with_frames_per_phoneme(0.3),
        EncoderVariant::Prosody,
        0,
    );
    assert!(matches!(vanishing.generate_chunk("a i u"), Err(TtsError::EmptyExpansion)));

    let audible = synth(
        MockModel::new(EncoderVariant::Prosody).with_frames_per_phoneme(0.3),
        EncoderVariant::Prosody,
        1,
    );
    assert_eq!(audible.generate_chunk("a i u").unwrap().frame_count(), 3 * 4);
}

#[test]
fn floor_above_default_cap_still_synthesises() {
    let tts = synth(MockModel::new(EncoderVariant::Basic), EncoderVariant::Basic, 1_500);
    assert_eq!(tts.generate_chunk("a i").unwrap().frame_count(), 2 * 1_500 * 4);
}

#[test]
fn runaway_duration_fails_before_decoding() {
    let model = MockModel::new(EncoderVariant::Basic).with_frames_per_phoneme(1.0e6);
    let tts = synth(model, EncoderVariant::Basic, 1);
    let err = tts.generate_chunk("a").unwrap_err();
    assert!(matches!(err, TtsError::DurationOverflow { index: 0, .. }), "{err}");
    assert_eq!(tts.model().calls(), vec![Stage::Encode]);
}

#[test]
fn multi_chunk_output_is_ordered_concatenation() {
    let tts = synth(MockModel::new(EncoderVariant::Prosody), EncoderVariant::Prosody, 1);
    let joined = tts.generate("a。i u！e o N").unwrap();

    let parts: Vec<Vec<f32>> = ["a", "i u", "e o N"]
        .iter()
        .map(|c| tts.generate_chunk(c).unwrap().into_samples())
        .collect();
    assert_eq!(joined.frame_count(), (1 + 2 + 3) * 8);
    assert_eq!(joined.samples(), parts.concat().as_slice());
}

#[test]
fn chunk_failure_aborts_whole_request() {
    let model = MockModel::new(EncoderVariant::Prosody).failing_at(Stage::Decode, 1);
    let tts = synth(model, EncoderVariant::Prosody, 1);

    let err = tts.generate("a。i。u").unwrap_err();
    assert_eq!(err.chunk_index(), Some(1));
    assert_eq!(err.stage(), Stage::Decode);

    // Sequential, and nothing runs after the failure.
    assert_eq!(
        tts.model().calls(),
        vec![Stage::Encode, Stage::Decode, Stage::Vocode, Stage::Encode, Stage::Decode]
    );
}

#[test]
fn missing_encoder_output_is_model_error() {
    let model = MockModel::new(EncoderVariant::Prosody).without_output(ENERGY_PREDICTIONS);
    let tts = synth(model, EncoderVariant::Prosody, 1);
    let err = tts.generate_chunk("a").unwrap_err();
    assert!(matches!(err, TtsError::ModelInference { stage: Stage::Encode, .. }), "{err}");
}

#[test]
fn variant_mismatch_is_not_silently_defaulted() {
    // Model only emits the basic outputs but the pipeline expects prosody.
    let tts = synth(MockModel::new(EncoderVariant::Basic), EncoderVariant::Prosody, 1);
    let err = tts.generate_chunk("a").unwrap_err();
    assert_eq!(err.stage(), Stage::Encode);
}

#[test]
fn missing_mel_is_decode_error() {
    let model = MockModel::new(EncoderVariant::Basic).without_output(MEL_SPECTROGRAM);
    let tts = synth(model, EncoderVariant::Basic, 1);
    let err = tts.generate_chunk("a").unwrap_err();
    assert_eq!(err.stage(), Stage::Decode);
}

#[test]
fn loud_model_output_is_clipped() {
    let model = MockModel::new(EncoderVariant::Basic).with_gain(10.0);
    let tts = synth(model, EncoderVariant::Basic, 1);
    let audio = tts.generate_chunk("a i u").unwrap();
    assert!(audio.samples().iter().all(|s| (-1.0..=1.0).contains(s)));
    assert!(audio.samples().iter().any(|&s| s == 1.0));
}

// ─── Empty-input paths ───────────────────────────────────────────────────────

#[test]
fn empty_text_at_top_level_is_empty_success() {
    let tts = synth(MockModel::new(EncoderVariant::Basic), EncoderVariant::Basic, 1);
    let audio = tts.generate("  。！ ").unwrap();
    assert!(audio.is_empty());
    assert!(tts.model().calls().is_empty());
}

#[test]
fn empty_text_for_a_single_pass_is_an_error() {
    let tts = synth(MockModel::new(EncoderVariant::Basic), EncoderVariant::Basic, 1);
    let err = tts.generate_chunk("   ").unwrap_err();
    assert!(matches!(err, TtsError::EmptyInput { stage: Stage::Phonemize }));

    let none: [&str; 0] = [];
    let err = tts.generate_from_phonemes(&none).unwrap_err();
    assert!(matches!(err, TtsError::EmptyInput { stage: Stage::Tokenize }));
}

#[test]
fn chunk_without_phonemes_fails_the_request() {
    let silent_g2p = |_: &str| -> Result<Vec<String>> { Ok(Vec::new()) };
    let tts = Synthesizer::new(
        MockModel::new(EncoderVariant::Basic),
        silent_g2p,
        Vocabulary::builtin().clone(),
        SynthesisOptions::new(EncoderVariant::Basic, 1),
    );
    let err = tts.generate("ええと").unwrap_err();
    assert_eq!(err.chunk_index(), Some(0));
    assert_eq!(err.stage(), Stage::Tokenize);
}

// ─── WAV output ──────────────────────────────────────────────────────────────

#[test]
fn empty_request_serialises_to_bare_header() {
    let tts = synth(MockModel::new(EncoderVariant::Basic), EncoderVariant::Basic, 1);
    let bytes = tts.generate_wav("").unwrap();
    assert_eq!(bytes.len(), HEADER_LEN);
    assert_eq!(&bytes[40..44], &[0, 0, 0, 0]);
    assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 16_000);
}

#[test]
fn wav_output_round_trips_through_hound() {
    let tts = synth(MockModel::new(EncoderVariant::Prosody), EncoderVariant::Prosody, 1);
    let audio = tts.generate("k a。s a").unwrap();
    let bytes = tts.generate_wav("k a。s a").unwrap();
    assert_eq!(bytes.len(), HEADER_LEN + audio.frame_count() * 2);

    let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.len() as usize, audio.frame_count());
}

#[test]
fn float_output_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speech.wav");

    let mut options = SynthesisOptions::new(EncoderVariant::Basic, 1);
    options.encoding = SampleEncoding::Float32;
    let tts = Synthesizer::new(
        MockModel::new(EncoderVariant::Basic),
        WhitespacePhonemizer,
        Vocabulary::builtin().clone(),
        options,
    );
    tts.generate_to_file("a i", &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 3);
    assert_eq!(bytes.len(), HEADER_LEN + 2 * 2 * 4 * 4);
}
