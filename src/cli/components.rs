//! Components command implementation

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
        .latest_feature(Some(&row.hash), Some(FeatureType::Nmf))?
        .ok_or_else(|| Error::NoAnalysisFound {
            sample: row.hash.clone(),
            feature_type: FeatureType::Nmf,
        })?;

    let components = bank.list_components(feature.id)?;
    if components.is_empty() {
        println!(
            "No components stored for {}. Run 'unmix separate' first.",
            short_hash(&row.hash)
        );
        return Ok(());
    }

    println!(
        "Components of {} (feature {}):",
        short_hash(&row.hash),
        feature.id
    );
    println!("{:<6} {:<12} {:<10} {}", "Index", "Samples", "Duration", "Created");
    println!("{}", "-".repeat(50));
    for component in components {
        let seconds = component.sample_count as f64 / row.sample_rate as f64;
        println!(
            "{:<6} {:<12} {:<10} {}",
            component.component_index,
            component.sample_count,
            format!("{:.3}s", seconds),
            component.created_at.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
