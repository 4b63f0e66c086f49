//! WAV ingestion and export.
//!
//! Multi-channel files are reduced to channel 0 at decode time; the store
//! only ever sees mono PCM. Compressed formats are out of scope.

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::path::Path;

use crate::error::Result;

/// Decoded audio ready for ingestion.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub duration_seconds: f64,
}

/// Decode a WAV file, keeping channel 0 and normalizing integer formats
/// to [-1, 1].
pub fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();
    let channels = spec.channels.max(1);

    let interleaved: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let samples: Vec<f32> = interleaved
        .iter()
        .step_by(channels as usize)
        .copied()
        .collect();
    let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channel_count: spec.channels,
        duration_seconds,
    })
}

/// Write mono PCM as a 32-bit float WAV.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut writer = WavWriter::create(path, spec)?;
    for &s in samples {
        writer.write_sample(s)?;
    }
    writer.finalize()?;
    Ok(())
}
