//! Add (ingest) command implementation

use anyhow::Result;
use std::path::Path;
use std::sync::Mutex;

use crate::audio;
use crate::store::{short_hash, SampleBank};

pub fn run(store: &Mutex<SampleBank>, file: &str) -> Result<String> {
    let decoded = audio::decode_wav(Path::new(file))?;

    let hash = store.lock().unwrap().store_sample(
        &decoded.samples,
        Some(file),
        decoded.sample_rate,
        decoded.channel_count,
        decoded.duration_seconds,
    )?;

    println!(
        "{}  {} Hz, {} ch, {:.3}s ({} samples)",
        short_hash(&hash),
        decoded.sample_rate,
        decoded.channel_count,
        decoded.duration_seconds,
        decoded.samples.len(),
    );

    Ok(hash)
}
