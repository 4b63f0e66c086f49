//! Features command implementation

use anyhow::Result;
use std::sync::Mutex;

use crate::session::Session;
use crate::store::{short_hash, SampleBank};

pub fn run(store: &Mutex<SampleBank>, session: &Session, sample: Option<&str>) -> Result<()> {
    let bank = store.lock().unwrap();
    let row = session.resolve(&bank, sample)?;

    let features = bank.list_features(Some(&row.hash))?;
    if features.is_empty() {
        println!(
            "No analyses stored for {}. Run 'unmix analyze nmf' or 'unmix analyze onsets'.",
            short_hash(&row.hash)
        );
        return Ok(());
    }

    println!("Features of {}:", short_hash(&row.hash));
    println!("{:<6} {:<12} {:<10} {}", "Id", "Type", "Hash", "Created");
    println!("{}", "-".repeat(50));
    for feature in features {
        println!(
            "{:<6} {:<12} {:<10} {}",
            feature.id,
            feature.feature_type,
            short_hash(&feature.feature_hash),
            feature.created_at.as_deref().unwrap_or("-"),
        );
    }

    Ok(())
}
