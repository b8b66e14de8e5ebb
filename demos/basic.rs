//! Basic onsei example: runs the whole pipeline against the mock model.
//!
//! Usage:
//!   cargo run --example basic
//!   cargo run --example basic -- --text "k o N n i ch i w a 。 g e N k i d e s u k a" --floor 0
//!
//! No model files are needed: `MockModel` produces deterministic tensors with
//! the same shapes real networks would.

use std::path::Path;

use onsei::{
    mock::MockModel, EncoderVariant, SampleEncoding, SynthesisOptions, Synthesizer, Vocabulary, WavWriter,
    WhitespacePhonemizer,
};

fn main() -> anyhow::Result<()> {
    // ── Parse simple CLI arguments ───────────────────────────────────────────
    let mut args = std::env::args().skip(1);

    let mut text   = "k o N n i ch i w a 。 s a y o n a r a".to_string();
    let mut output = "output.wav".to_string();
    let mut floor  = 1u32;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--text"   => { if let Some(v) = args.next() { text   = v; } }
            "--output" => { if let Some(v) = args.next() { output = v; } }
            "--floor"  => { if let Some(v) = args.next() { floor  = v.parse().unwrap_or(1); } }
            "--help"   => {
                println!("Usage: basic [--text PHONEMES] [--output FILE] [--floor FRAMES]");
                return Ok(());
            }
            _ => {}
        }
    }

    let model = MockModel::new(EncoderVariant::Prosody).with_sample_rate(22_050).with_hop_length(256);
    let tts = Synthesizer::new(
        model,
        WhitespacePhonemizer,
        Vocabulary::builtin().clone(),
        SynthesisOptions::new(EncoderVariant::Prosody, floor),
    );

    println!("Text   : {:?}", text);
    println!("Floor  : {}", floor);
    println!("Output : {}", output);

    let audio = tts.generate(&text)?;
    println!(
        "Synthesised {} frames ({:.2} s) at {} Hz",
        audio.frame_count(),
        audio.duration_secs(),
        audio.sample_rate()
    );

    WavWriter::new(SampleEncoding::Pcm16).write_to_file(&audio, Path::new(&output))?;
    println!("Done!");
    Ok(())
}
