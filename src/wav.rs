//! RIFF/WAVE serialisation.
//!
//! Layout (all integers little-endian):
//!
//! | Offset | Size | Field                                   |
//! |--------|------|-----------------------------------------|
//! | 0      | 4    | `"RIFF"`                                |
//! | 4      | 4    | chunk size = 36 + data size             |
//! | 8      | 4    | `"WAVE"`                                |
//! | 12     | 4    | `"fmt "`                                |
//! | 16     | 4    | 16                                      |
//! | 20     | 2    | audio format (1 = PCM int, 3 = float)   |
//! | 22     | 2    | channels                                |
//! | 24     | 4    | sample rate                             |
//! | 28     | 4    | byte rate = rate · channels · bits / 8  |
//! | 32     | 2    | block align = channels · bits / 8       |
//! | 34     | 2    | bits per sample                         |
//! | 36     | 4    | `"data"`                                |
//! | 40     | 4    | data size                               |
//! | 44     | …    | interleaved samples                     |

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    audio::{AudioBuffer, AudioFormat},
    error::{Result, TtsError},
};

/// Size of the fixed header preceding the sample data.
pub const HEADER_LEN: usize = 44;

const FORMAT_PCM: u16 = 1;
const FORMAT_IEEE_FLOAT: u16 = 3;

/// On-disk sample representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleEncoding {
    /// 16-bit signed integer PCM.  Plays everywhere, including Android's
    /// `MediaPlayer`, which accepts float WAV headers but renders silence.
    #[default]
    Pcm16,
    /// 32-bit IEEE float.
    Float32,
}

impl SampleEncoding {
    pub fn bits_per_sample(self) -> u16 {
        match self {
            SampleEncoding::Pcm16 => 16,
            SampleEncoding::Float32 => 32,
        }
    }

    fn format_tag(self) -> u16 {
        match self {
            SampleEncoding::Pcm16 => FORMAT_PCM,
            SampleEncoding::Float32 => FORMAT_IEEE_FLOAT,
        }
    }
}

fn oversize(message: String) -> TtsError {
    TtsError::ContainerWrite(io::Error::new(io::ErrorKind::InvalidInput, message))
}

/// Convert f32 [-1.0, 1.0] → i16 [-32767, 32767].
pub fn pcm16(sample: f32) -> i16 {
    (sample * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WavWriter {
    encoding: SampleEncoding,
}

impl WavWriter {
    pub fn new(encoding: SampleEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> SampleEncoding {
        self.encoding
    }

    /// The 44-byte header for `data_size` bytes of samples in `format`.
    ///
    /// Fails when the byte rate or block align of `format` does not fit its
    /// header field.
    pub fn header(&self, format: AudioFormat, data_size: u32) -> Result<[u8; HEADER_LEN]> {
        let bits = self.encoding.bits_per_sample();
        let block_align = u64::from(format.channels) * u64::from(bits / 8);
        let block_align = u16::try_from(block_align)
            .map_err(|_| oversize(format!("block align {block_align} for {format} does not fit 16 bits")))?;
        let byte_rate = u64::from(format.sample_rate) * u64::from(block_align);
        let byte_rate = u32::try_from(byte_rate)
            .map_err(|_| oversize(format!("byte rate {byte_rate} for {format} does not fit 32 bits")))?;
        if data_size > u32::MAX - 36 {
            return Err(oversize(format!("{data_size} bytes of audio exceed the WAV size limit")));
        }

        let mut h = [0u8; HEADER_LEN];
        h[0..4].copy_from_slice(b"RIFF");
        h[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
        h[8..12].copy_from_slice(b"WAVE");
        h[12..16].copy_from_slice(b"fmt ");
        h[16..20].copy_from_slice(&16u32.to_le_bytes());
        h[20..22].copy_from_slice(&self.encoding.format_tag().to_le_bytes());
        h[22..24].copy_from_slice(&format.channels.to_le_bytes());
        h[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
        h[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        h[32..34].copy_from_slice(&block_align.to_le_bytes());
        h[34..36].copy_from_slice(&bits.to_le_bytes());
        h[36..40].copy_from_slice(b"data");
        h[40..44].copy_from_slice(&data_size.to_le_bytes());
        Ok(h)
    }

    /// Header for `buffer`, checked before any byte is written.
    fn prepare(&self, buffer: &AudioBuffer) -> Result<[u8; HEADER_LEN]> {
        let bytes = buffer.samples().len() as u64 * u64::from(self.encoding.bits_per_sample() / 8);
        let data_size = u32::try_from(bytes)
            .map_err(|_| oversize(format!("{bytes} bytes of audio exceed the WAV size limit")))?;
        self.header(buffer.format(), data_size)
    }

    /// Serialise `buffer` to a complete WAV byte vector.
    pub fn write(&self, buffer: &AudioBuffer) -> Result<Vec<u8>> {
        let header = self.prepare(buffer)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + buffer.samples().len() * usize::from(self.encoding.bits_per_sample() / 8));
        self.write_body(&header, buffer, &mut bytes)
            .map_err(TtsError::ContainerWrite)?;
        Ok(bytes)
    }

    /// Serialise `buffer` into any writer.
    pub fn write_to<W: Write>(&self, buffer: &AudioBuffer, out: W) -> Result<()> {
        let header = self.prepare(buffer)?;
        self.write_buffered(&header, buffer, out)
            .map_err(TtsError::ContainerWrite)
    }

    /// Serialise `buffer` to a file at `path`.
    ///
    /// The file is only created once the header is known to be valid, and is
    /// removed again if writing fails part way.
    pub fn write_to_file(&self, buffer: &AudioBuffer, path: &Path) -> Result<()> {
        let header = self.prepare(buffer)?;
        let file = File::create(path).map_err(TtsError::ContainerWrite)?;
        if let Err(e) = self.write_buffered(&header, buffer, file) {
            if let Err(cleanup) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %cleanup, "could not remove partial WAV");
            }
            return Err(TtsError::ContainerWrite(e));
        }
        info!(
            samples = buffer.samples().len(),
            seconds = buffer.duration_secs(),
            path = %path.display(),
            "saved WAV"
        );
        Ok(())
    }

    fn write_buffered<W: Write>(&self, header: &[u8; HEADER_LEN], buffer: &AudioBuffer, out: W) -> io::Result<()> {
        let mut out = BufWriter::new(out);
        self.write_body(header, buffer, &mut out)?;
        out.flush()
    }

    fn write_body<W: Write>(&self, header: &[u8; HEADER_LEN], buffer: &AudioBuffer, out: &mut W) -> io::Result<()> {
        out.write_all(header)?;
        match self.encoding {
            SampleEncoding::Pcm16 => {
                for &s in buffer.samples() {
                    out.write_all(&pcm16(s).to_le_bytes())?;
                }
            }
            SampleEncoding::Float32 => {
                for &s in buffer.samples() {
                    out.write_all(&s.to_le_bytes())?;
                }
            }
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
