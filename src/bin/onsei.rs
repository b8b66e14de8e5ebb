//! `onsei` — synthesise pre-phonemised text with an ONNX model bundle.
//!
//! Usage:
//!   onsei --config bundle/config.json --text "k o N n i ch i w a 。 s a y o n a r a" --output out.wav
//!   onsei --config bundle/config.json --phonemes "HH AH0 L OW1" --encoding float32
//!
//! Logging is controlled with `RUST_LOG` (default `onsei=info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use onsei::{
    config::ModelConfig, onnx::OrtModel, SampleEncoding, Synthesizer, WavWriter, WhitespacePhonemizer,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Encoding {
    Pcm16,
    Float32,
}

impl From<Encoding> for SampleEncoding {
    fn from(e: Encoding) -> Self {
        match e {
            Encoding::Pcm16 => SampleEncoding::Pcm16,
            Encoding::Float32 => SampleEncoding::Float32,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "onsei", version, about = "Neural TTS synthesis from phoneme input")]
struct Args {
    /// Model bundle config.json.
    #[arg(long)]
    config: PathBuf,

    /// Space-separated phonemes; sentence delimiters split the input into chunks.
    #[arg(long, conflicts_with = "phonemes")]
    text: Option<String>,

    /// Space-separated phonemes synthesised as a single chunk.
    #[arg(long)]
    phonemes: Option<String>,

    /// Output WAV path.
    #[arg(long, default_value = "output.wav")]
    output: PathBuf,

    /// Override the bundle's sample encoding.
    #[arg(long, value_enum)]
    encoding: Option<Encoding>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("onsei=info")),
        )
        .init();

    let args = Args::parse();

    let config = ModelConfig::load(&args.config)?;
    let mut options = config.options();
    if let Some(encoding) = args.encoding {
        options.encoding = encoding.into();
    }
    let writer = WavWriter::new(options.encoding);

    let model = OrtModel::from_config(&config)?;
    let tts = Synthesizer::new(model, WhitespacePhonemizer, config.vocabulary()?, options);

    let audio = match (&args.text, &args.phonemes) {
        (Some(text), _) => tts.generate(text),
        (None, Some(phonemes)) => tts.generate_chunk(phonemes),
        (None, None) => anyhow::bail!("one of --text or --phonemes is required"),
    }
    .context("synthesis failed")?;

    writer
        .write_to_file(&audio, &args.output)
        .with_context(|| format!("Cannot write WAV: {}", args.output.display()))?;
    Ok(())
}
