//! Separate command implementation

use anyhow::Result;
use std::path::Path;
use std::sync::Mutex;

use crate::audio;
use crate::error::Error;
use crate::separate::Separator;
use crate::session::Session;
use crate::store::{short_hash, SampleBank};

pub fn run(
    separator: &Separator,
    store: &Mutex<SampleBank>,
    session: &Session,
    sample: Option<&str>,
    component: Option<usize>,
    out_dir: Option<&Path>,
) -> Result<()> {
    let row = {
        let bank = store.lock().unwrap();
        session.resolve(&bank, sample)?
    };

    match component {
        Some(index) => {
            let pcm = separator.separate_component(&row.hash, index)?;
            println!(
                "component {} of {}: {} samples",
                index,
                short_hash(&row.hash),
                pcm.len()
            );
            if let Some(dir) = out_dir {
                let path = export_path(dir, &row.hash, index);
                audio::write_wav(&path, &pcm, row.sample_rate)?;
                println!("wrote {}", path.display());
            }
        }
        None => {
            let outcome = separator.separate_all(&row.hash)?;
            println!(
                "separated {} into {} components (feature {})",
                short_hash(&row.hash),
                outcome.component_ids.len(),
                outcome.feature_id,
            );
            if let Some(dir) = out_dir {
                let bank = store.lock().unwrap();
                for index in 0..outcome.component_ids.len() {
                    let stored = bank
                        .component(outcome.feature_id, index)?
                        .ok_or(Error::ComponentIndexOutOfRange {
                            index,
                            count: outcome.component_ids.len(),
                        })?;
                    let path = export_path(dir, &row.hash, index);
                    audio::write_wav(&path, &stored.pcm, row.sample_rate)?;
                    println!("wrote {}", path.display());
                }
            }
        }
    }

    Ok(())
}

fn export_path(dir: &Path, sample_hash: &str, index: usize) -> std::path::PathBuf {
    dir.join(format!("{}-component-{}.wav", short_hash(sample_hash), index))
}
