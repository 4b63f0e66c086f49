//! Analyze command implementation

use anyhow::Result;
use std::sync::Mutex;

use crate::analysis::{AnalysisOptions, Analyzer, NmfPayload, OnsetPayload};
use crate::session::Session;
use crate::store::{short_hash, SampleBank};

pub fn run(
    analyzer: &Analyzer,
    store: &Mutex<SampleBank>,
    session: &Session,
    sample: Option<&str>,
    options: AnalysisOptions,
) -> Result<()> {
    let hash = {
        let bank = store.lock().unwrap();
        session.resolve(&bank, sample)?.hash
    };

    let outcome = analyzer.analyze(&hash, &options)?;
    let feature = &outcome.feature;
    let status = if outcome.cached { "cached" } else { "computed" };

    match options {
        AnalysisOptions::Nmf(_) => {
            let payload: NmfPayload = serde_json::from_str(&feature.payload)?;
            println!(
                "nmf {} on {} ({}): {} components, {} iterations{}",
                short_hash(&feature.feature_hash),
                short_hash(&hash),
                status,
                payload.components,
                payload.iterations,
                if payload.converged { ", converged" } else { "" },
            );
        }
        AnalysisOptions::OnsetSlice(_) => {
            let payload: OnsetPayload = serde_json::from_str(&feature.payload)?;
            let slices = store.lock().unwrap().list_slices(feature.id)?;
            println!(
                "onset-slice {} on {} ({}): {} onsets, {} slices",
                short_hash(&feature.feature_hash),
                short_hash(&hash),
                status,
                payload.positions.len(),
                slices.len(),
            );
        }
    }

    Ok(())
}
