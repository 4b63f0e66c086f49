//! List command implementation

use anyhow::Result;
use std::sync::Mutex;

use crate::store::{short_hash, SampleBank};

pub fn run(store: &Mutex<SampleBank>) -> Result<()> {
    let samples = store.lock().unwrap().list_samples()?;

    if samples.is_empty() {
        println!("No samples stored. Run 'unmix add <file.wav>' first.");
        return Ok(());
    }

    println!(
        "{:<10} {:<10} {:<4} {:<10} {}",
        "Hash", "Rate", "Ch", "Duration", "Source"
    );
    println!("{}", "-".repeat(70));

    for sample in samples {
        println!(
            "{:<10} {:<10} {:<4} {:<10} {}",
            short_hash(&sample.hash),
            sample.sample_rate,
            sample.channel_count,
            format!("{:.3}s", sample.duration_seconds),
            sample.source_path.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
