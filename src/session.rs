//! Session context: which sample is "active".
//!
//! Commands that omit a sample hash fall back to this context instead of
//! any ambient global. Resolution order: explicit argument, the session's
//! active sample, then the most recently ingested sample.

use crate::error::{Error, Result};
use crate::store::{SampleBank, SampleRow};

#[derive(Debug, Clone, Default)]
pub struct Session {
    active_sample: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a sample as the active one (full hash).
    pub fn set_active(&mut self, hash: String) {
        self.active_sample = Some(hash);
    }

    pub fn active_sample(&self) -> Option<&str> {
        self.active_sample.as_deref()
    }

    /// Resolve the sample an operation should target.
    pub fn resolve(&self, store: &SampleBank, explicit: Option<&str>) -> Result<SampleRow> {
        if let Some(query) = explicit {
            return store.sample_by_prefix(query);
        }

        if let Some(hash) = &self.active_sample {
            if let Some(row) = store.sample(hash)? {
                return Ok(row);
            }
        }

        store.latest_sample()?.ok_or_else(|| Error::SampleNotFound {
            query: "<no active sample>".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank_with(pcms: &[&[f32]]) -> (SampleBank, Vec<String>) {
        let bank = SampleBank::open_in_memory().unwrap();
        let hashes = pcms
            .iter()
            .map(|pcm| bank.store_sample(pcm, None, 44100, 1, 0.001).unwrap())
            .collect();
        (bank, hashes)
    }

    #[test]
    fn test_explicit_prefix_wins() {
        let (bank, hashes) = bank_with(&[&[0.1f32; 16], &[0.2f32; 16]]);
        let mut session = Session::new();
        session.set_active(hashes[1].clone());

        let row = session.resolve(&bank, Some(&hashes[0][..8])).unwrap();
        assert_eq!(row.hash, hashes[0]);
    }

    #[test]
    fn test_active_sample_used_when_no_argument() {
        let (bank, hashes) = bank_with(&[&[0.1f32; 16], &[0.2f32; 16]]);
        let mut session = Session::new();
        session.set_active(hashes[0].clone());

        let row = session.resolve(&bank, None).unwrap();
        assert_eq!(row.hash, hashes[0]);
    }

    #[test]
    fn test_falls_back_to_latest_sample() {
        let (bank, hashes) = bank_with(&[&[0.1f32; 16], &[0.2f32; 16]]);
        let session = Session::new();

        let row = session.resolve(&bank, None).unwrap();
        assert_eq!(row.hash, hashes[1]);
    }

    #[test]
    fn test_empty_store_reports_not_found() {
        let bank = SampleBank::open_in_memory().unwrap();
        let err = Session::new().resolve(&bank, None).unwrap_err();
        assert!(matches!(err, Error::SampleNotFound { .. }));
    }
}
