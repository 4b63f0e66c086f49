//! Slices command implementation

use anyhow::Result;
use std::sync::Mutex;

use crate::analysis::FeatureType;
use crate::error::Error;
use crate::session::Session;
use crate::store::{short_hash, SampleBank};

pub fn run(store: &Mutex<SampleBank>, session: &Session, sample: Option<&str>) -> Result<()> {
    let bank = store.lock().unwrap();
    let row = session.resolve(&bank, sample)?;

    let feature = bank
        .latest_feature(Some(&row.hash), Some(FeatureType::OnsetSlice))?
        .ok_or_else(|| Error::NoAnalysisFound {
            sample: row.hash.clone(),
            feature_type: FeatureType::OnsetSlice,
        })?;

    let slices = bank.list_slices(feature.id)?;
    if slices.is_empty() {
        println!(
            "No slices for {} (fewer than two onsets detected).",
            short_hash(&row.hash)
        );
        return Ok(());
    }

    println!("Slices of {} (feature {}):", short_hash(&row.hash), feature.id);
    println!("{:<6} {:<12} {:<12} {}", "Index", "Start", "End", "Length");
    println!("{}", "-".repeat(44));
    for slice in slices {
        println!(
            "{:<6} {:<12} {:<12} {}",
            slice.slice_index,
            slice.start_sample,
            slice.end_sample,
            slice.end_sample - slice.start_sample,
        );
    }

    Ok(())
}
