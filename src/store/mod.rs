//! Content-addressed analysis store backed by SQLite.
//!
//! Samples are keyed by a SHA-256 digest over their PCM bytes, so
//! re-ingesting identical audio is a no-op. Features are keyed by a digest
//! over their serialized result plus options, which is what makes repeated
//! analyses idempotent. Slices and components reference their owning
//! feature by integer id.

mod schema;

use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::analysis::FeatureType;
use crate::error::{Error, Result, MIN_PREFIX_LEN};
use crate::slice;

pub use schema::SCHEMA;

pub struct SampleBank {
    conn: Connection,
}

/// Convert PCM samples to the stored byte representation (f32 LE).
pub fn pcm_to_bytes(pcm: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pcm.len() * 4);
    for s in pcm {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    bytes
}

/// Inverse of [`pcm_to_bytes`]. Trailing partial samples are dropped.
pub fn bytes_to_pcm(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// SHA-256 over the PCM byte representation, lowercase hex.
pub fn content_hash(pcm: &[f32]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(pcm_to_bytes(pcm));
    hex::encode(hasher.finalize())
}

/// Digest identifying a feature: type tag, serialized result, serialized
/// options. Changes if and only if the result or the option set changes.
pub fn feature_hash(feature_type: FeatureType, payload: &str, options: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(feature_type.as_str().as_bytes());
    hasher.update(payload.as_bytes());
    hasher.update(options.as_bytes());
    hex::encode(hasher.finalize())
}

/// Conventional 8-character display form of a full hash.
pub fn short_hash(hash: &str) -> &str {
    &hash[..hash.len().min(8)]
}

impl SampleBank {
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        let bank = Self { conn };
        bank.init_schema()?;
        Ok(bank)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let bank = Self { conn };
        bank.init_schema()?;
        Ok(bank)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ============================================
    // SAMPLES
    // ============================================

    /// Store a sample, returning its content hash. If a row with the same
    /// hash already exists this is a no-op and the existing row is reused.
    pub fn store_sample(
        &self,
        pcm: &[f32],
        source_path: Option<&str>,
        sample_rate: u32,
        channel_count: u16,
        duration_seconds: f64,
    ) -> Result<String> {
        if pcm.is_empty() {
            return Err(Error::EmptySample);
        }

        let hash = content_hash(pcm);
        self.conn.execute(
            "INSERT OR IGNORE INTO samples (hash, source_path, sample_rate, channel_count, duration_seconds, pcm)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                hash,
                source_path,
                sample_rate,
                channel_count,
                duration_seconds,
                pcm_to_bytes(pcm),
            ],
        )?;

        Ok(hash)
    }

    /// Fetch a sample by its full hash.
    pub fn sample(&self, hash: &str) -> Result<Option<SampleRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT hash, source_path, sample_rate, channel_count, duration_seconds, pcm, created_at
                 FROM samples WHERE hash = ?",
                params![hash],
                Self::map_sample,
            )
            .optional()?;
        Ok(row)
    }

    /// Fetch a sample by hash prefix. Prefixes shorter than
    /// [`MIN_PREFIX_LEN`] are rejected, and a prefix matching more than one
    /// sample is an error rather than silently resolving to either.
    pub fn sample_by_prefix(&self, prefix: &str) -> Result<SampleRow> {
        if prefix.len() < MIN_PREFIX_LEN {
            return Err(Error::PrefixTooShort {
                prefix: prefix.to_string(),
            });
        }

        let pattern = format!("{}%", prefix);
        let mut stmt = self.conn.prepare(
            "SELECT hash, source_path, sample_rate, channel_count, duration_seconds, pcm, created_at
             FROM samples WHERE hash LIKE ? ORDER BY hash",
        )?;
        let rows: Vec<SampleRow> = stmt
            .query_map(params![pattern], Self::map_sample)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        match rows.len() {
            0 => Err(Error::SampleNotFound {
                query: prefix.to_string(),
            }),
            1 => Ok(rows.into_iter().next().expect("len checked")),
            n => Err(Error::AmbiguousPrefix {
                prefix: prefix.to_string(),
                matches: n,
            }),
        }
    }

    /// Most recently ingested sample, if any.
    pub fn latest_sample(&self) -> Result<Option<SampleRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT hash, source_path, sample_rate, channel_count, duration_seconds, pcm, created_at
                 FROM samples ORDER BY rowid DESC LIMIT 1",
                [],
                Self::map_sample,
            )
            .optional()?;
        Ok(row)
    }

    pub fn list_samples(&self) -> Result<Vec<SampleSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash, source_path, sample_rate, channel_count, duration_seconds, created_at
             FROM samples ORDER BY rowid DESC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(SampleSummary {
                hash: row.get(0)?,
                source_path: row.get(1)?,
                sample_rate: row.get(2)?,
                channel_count: row.get(3)?,
                duration_seconds: row.get(4)?,
                created_at: row.get(5)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    fn map_sample(row: &rusqlite::Row) -> rusqlite::Result<SampleRow> {
        let pcm_bytes: Vec<u8> = row.get(5)?;
        Ok(SampleRow {
            hash: row.get(0)?,
            source_path: row.get(1)?,
            sample_rate: row.get(2)?,
            channel_count: row.get(3)?,
            duration_seconds: row.get(4)?,
            pcm: bytes_to_pcm(&pcm_bytes),
            created_at: row.get(6)?,
        })
    }

    // ============================================
    // FEATURES
    // ============================================

    /// Store an analysis result. Returns `(feature_id, created)`; when the
    /// same `(sample_hash, feature_hash)` pair already exists, the existing
    /// id is returned with `created = false` and nothing is re-inserted.
    pub fn store_feature(
        &self,
        sample_hash: &str,
        feature_type: FeatureType,
        payload: &str,
        options: &str,
    ) -> Result<(i64, bool)> {
        let fhash = feature_hash(feature_type, payload, options);

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM features WHERE sample_hash = ? AND feature_hash = ?",
                params![sample_hash, fhash],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok((id, false));
        }

        let id: i64 = self.conn.query_row(
            "INSERT INTO features (sample_hash, feature_type, feature_hash, payload, options)
             VALUES (?, ?, ?, ?, ?)
             RETURNING id",
            params![sample_hash, feature_type.as_str(), fhash, payload, options],
            |row| row.get(0),
        )?;

        Ok((id, true))
    }

    pub fn feature(&self, id: i64) -> Result<Option<FeatureRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, sample_hash, feature_type, feature_hash, payload, options, created_at
                 FROM features WHERE id = ?",
                params![id],
                Self::map_feature,
            )
            .optional()?;
        Ok(row)
    }

    /// The cache pre-check: an existing feature for this sample, type, and
    /// exact option serialization, newest first.
    pub fn find_feature_with_options(
        &self,
        sample_hash: &str,
        feature_type: FeatureType,
        options: &str,
    ) -> Result<Option<FeatureRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, sample_hash, feature_type, feature_hash, payload, options, created_at
                 FROM features
                 WHERE sample_hash = ? AND feature_type = ? AND options = ?
                 ORDER BY id DESC LIMIT 1",
                params![sample_hash, feature_type.as_str(), options],
                Self::map_feature,
            )
            .optional()?;
        Ok(row)
    }

    /// Most recent feature by insertion order; both filters optional.
    pub fn latest_feature(
        &self,
        sample_hash: Option<&str>,
        feature_type: Option<FeatureType>,
    ) -> Result<Option<FeatureRow>> {
        let base = "SELECT id, sample_hash, feature_type, feature_hash, payload, options, created_at
                    FROM features";

        let row = match (sample_hash, feature_type) {
            (Some(h), Some(t)) => self
                .conn
                .query_row(
                    &format!(
                        "{} WHERE sample_hash = ? AND feature_type = ? ORDER BY id DESC LIMIT 1",
                        base
                    ),
                    params![h, t.as_str()],
                    Self::map_feature,
                )
                .optional()?,
            (Some(h), None) => self
                .conn
                .query_row(
                    &format!("{} WHERE sample_hash = ? ORDER BY id DESC LIMIT 1", base),
                    params![h],
                    Self::map_feature,
                )
                .optional()?,
            (None, Some(t)) => self
                .conn
                .query_row(
                    &format!("{} WHERE feature_type = ? ORDER BY id DESC LIMIT 1", base),
                    params![t.as_str()],
                    Self::map_feature,
                )
                .optional()?,
            (None, None) => self
                .conn
                .query_row(
                    &format!("{} ORDER BY id DESC LIMIT 1", base),
                    [],
                    Self::map_feature,
                )
                .optional()?,
        };

        Ok(row)
    }

    pub fn list_features(&self, sample_hash: Option<&str>) -> Result<Vec<FeatureRow>> {
        let base = "SELECT id, sample_hash, feature_type, feature_hash, payload, options, created_at
                    FROM features";

        let rows = match sample_hash {
            Some(h) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{} WHERE sample_hash = ? ORDER BY id DESC", base))?;
                let rows = stmt.query_map(params![h], Self::map_feature)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!("{} ORDER BY id DESC", base))?;
                let rows = stmt.query_map([], Self::map_feature)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(rows)
    }

    fn map_feature(row: &rusqlite::Row) -> rusqlite::Result<FeatureRow> {
        let type_str: String = row.get(2)?;
        Ok(FeatureRow {
            id: row.get(0)?,
            sample_hash: row.get(1)?,
            feature_type: FeatureType::parse(&type_str).unwrap_or(FeatureType::Nmf),
            feature_hash: row.get(3)?,
            payload: row.get(4)?,
            options: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    // ============================================
    // SLICES
    // ============================================

    /// Materialize slice rows from an ascending onset-position list.
    /// `n` onsets yield `n - 1` slices; 0 or 1 onsets yield none and are
    /// not an error. Re-materializing the same feature is idempotent.
    pub fn create_slices(
        &mut self,
        sample_hash: &str,
        feature_id: i64,
        onsets: &[u64],
    ) -> Result<Vec<i64>> {
        let intervals = slice::materialize(onsets);

        let tx = self.conn.transaction()?;
        let mut ids = Vec::with_capacity(intervals.len());
        for (index, (start, end)) in intervals.iter().enumerate() {
            let id: i64 = tx.query_row(
                "INSERT INTO slices (sample_hash, feature_id, slice_index, start_sample, end_sample)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(feature_id, slice_index) DO UPDATE SET
                     start_sample = excluded.start_sample,
                     end_sample = excluded.end_sample
                 RETURNING id",
                params![sample_hash, feature_id, index as i64, *start as i64, *end as i64],
                |row| row.get(0),
            )?;
            ids.push(id);
        }
        tx.commit()?;

        Ok(ids)
    }

    pub fn list_slices(&self, feature_id: i64) -> Result<Vec<SliceRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, sample_hash, feature_id, slice_index, start_sample, end_sample
             FROM slices WHERE feature_id = ? ORDER BY slice_index",
        )?;
        let rows = stmt.query_map(params![feature_id], |row| {
            Ok(SliceRow {
                id: row.get(0)?,
                sample_hash: row.get(1)?,
                feature_id: row.get(2)?,
                slice_index: row.get(3)?,
                start_sample: row.get::<_, i64>(4)? as u64,
                end_sample: row.get::<_, i64>(5)? as u64,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }

    // ============================================
    // COMPONENTS
    // ============================================

    /// Store a resynthesized component. Upserts on
    /// `(feature_id, component_index)`.
    pub fn store_component(
        &self,
        sample_hash: &str,
        feature_id: i64,
        component_index: usize,
        pcm: &[f32],
    ) -> Result<i64> {
        let id: i64 = self.conn.query_row(
            "INSERT INTO components (sample_hash, feature_id, component_index, pcm)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(feature_id, component_index) DO UPDATE SET
                 pcm = excluded.pcm
             RETURNING id",
            params![sample_hash, feature_id, component_index as i64, pcm_to_bytes(pcm)],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn component(&self, feature_id: i64, component_index: usize) -> Result<Option<ComponentRow>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, sample_hash, feature_id, component_index, pcm
                 FROM components WHERE feature_id = ? AND component_index = ?",
                params![feature_id, component_index as i64],
                |row| {
                    let pcm_bytes: Vec<u8> = row.get(4)?;
                    Ok(ComponentRow {
                        id: row.get(0)?,
                        sample_hash: row.get(1)?,
                        feature_id: row.get(2)?,
                        component_index: row.get::<_, i64>(3)? as usize,
                        pcm: bytes_to_pcm(&pcm_bytes),
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Summary view over a feature's components: index and sample count,
    /// without loading the PCM blobs.
    pub fn list_components(&self, feature_id: i64) -> Result<Vec<ComponentSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT component_index, LENGTH(pcm) / 4, created_at
             FROM components WHERE feature_id = ? ORDER BY component_index",
        )?;
        let rows = stmt.query_map(params![feature_id], |row| {
            Ok(ComponentSummary {
                component_index: row.get::<_, i64>(0)? as usize,
                sample_count: row.get::<_, i64>(1)? as usize,
                created_at: row.get(2)?,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Into::into)
    }
}

// ============================================
// ROW TYPES
// ============================================

#[derive(Debug, Clone)]
pub struct SampleRow {
    pub hash: String,
    pub source_path: Option<String>,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub duration_seconds: f64,
    pub pcm: Vec<f32>,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SampleSummary {
    pub hash: String,
    pub source_path: Option<String>,
    pub sample_rate: u32,
    pub channel_count: u16,
    pub duration_seconds: f64,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub id: i64,
    pub sample_hash: String,
    pub feature_type: FeatureType,
    pub feature_hash: String,
    pub payload: String,
    pub options: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SliceRow {
    pub id: i64,
    pub sample_hash: String,
    pub feature_id: i64,
    pub slice_index: i64,
    pub start_sample: u64,
    pub end_sample: u64,
}

#[derive(Debug, Clone)]
pub struct ComponentRow {
    pub id: i64,
    pub sample_hash: String,
    pub feature_id: i64,
    pub component_index: usize,
    pub pcm: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ComponentSummary {
    pub component_index: usize,
    pub sample_count: usize,
    pub created_at: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bank() -> SampleBank {
        SampleBank::open_in_memory().unwrap()
    }

    fn tone(len: usize, step: f32) -> Vec<f32> {
        (0..len).map(|i| (i as f32 * step).sin()).collect()
    }

    #[test]
    fn test_store_sample_dedup() {
        let bank = bank();
        let pcm = tone(64, 0.1);

        let h1 = bank.store_sample(&pcm, Some("a.wav"), 44100, 1, 0.0015).unwrap();
        let h2 = bank.store_sample(&pcm, Some("b.wav"), 44100, 1, 0.0015).unwrap();

        assert_eq!(h1, h2);
        assert_eq!(bank.list_samples().unwrap().len(), 1);
        // first ingestion wins; the second is a no-op
        let row = bank.sample(&h1).unwrap().unwrap();
        assert_eq!(row.source_path.as_deref(), Some("a.wav"));
        assert_eq!(row.pcm.len(), 64);
    }

    #[test]
    fn test_empty_sample_rejected() {
        let bank = bank();
        let err = bank.store_sample(&[], None, 44100, 1, 0.0).unwrap_err();
        assert!(matches!(err, Error::EmptySample));
    }

    #[test]
    fn test_prefix_lookup() {
        let bank = bank();
        let hash = bank.store_sample(&tone(32, 0.2), None, 48000, 2, 0.001).unwrap();

        let row = bank.sample_by_prefix(&hash[..8]).unwrap();
        assert_eq!(row.hash, hash);
        assert_eq!(row.sample_rate, 48000);
    }

    #[test]
    fn test_prefix_too_short() {
        let bank = bank();
        let err = bank.sample_by_prefix("abc").unwrap_err();
        assert!(matches!(err, Error::PrefixTooShort { .. }));
    }

    #[test]
    fn test_prefix_not_found() {
        let bank = bank();
        let err = bank.sample_by_prefix("deadbeef").unwrap_err();
        assert!(matches!(err, Error::SampleNotFound { .. }));
    }

    #[test]
    fn test_ambiguous_prefix_rejected() {
        let bank = bank();
        // Two hashes sharing an 8-char prefix cannot be produced on demand
        // from real PCM, so insert the rows directly.
        for suffix in ["aaaa", "bbbb"] {
            bank.conn
                .execute(
                    "INSERT INTO samples (hash, sample_rate, channel_count, duration_seconds, pcm)
                     VALUES (?, 44100, 1, 0.0, ?)",
                    params![format!("deadbeef{}", suffix), pcm_to_bytes(&[0.5f32])],
                )
                .unwrap();
        }

        let err = bank.sample_by_prefix("deadbeef").unwrap_err();
        assert!(matches!(err, Error::AmbiguousPrefix { matches: 2, .. }));
    }

    #[test]
    fn test_feature_idempotence() {
        let bank = bank();
        let hash = bank.store_sample(&tone(32, 0.3), None, 44100, 1, 0.001).unwrap();

        let (id1, created1) = bank
            .store_feature(&hash, FeatureType::Nmf, "{\"k\":2}", "{\"components\":2}")
            .unwrap();
        let (id2, created2) = bank
            .store_feature(&hash, FeatureType::Nmf, "{\"k\":2}", "{\"components\":2}")
            .unwrap();

        assert!(created1);
        assert!(!created2);
        assert_eq!(id1, id2);
        assert_eq!(bank.list_features(Some(&hash)).unwrap().len(), 1);
    }

    #[test]
    fn test_feature_hash_option_sensitivity() {
        let bank = bank();
        let hash = bank.store_sample(&tone(32, 0.3), None, 44100, 1, 0.001).unwrap();

        let (id1, _) = bank
            .store_feature(&hash, FeatureType::Nmf, "{}", "{\"components\":2}")
            .unwrap();
        let (id2, created2) = bank
            .store_feature(&hash, FeatureType::Nmf, "{}", "{\"components\":3}")
            .unwrap();

        assert!(created2);
        assert_ne!(id1, id2);

        let rows = bank.list_features(Some(&hash)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].feature_hash, rows[1].feature_hash);
    }

    #[test]
    fn test_latest_feature_filters() {
        let bank = bank();
        let hash = bank.store_sample(&tone(32, 0.3), None, 44100, 1, 0.001).unwrap();

        bank.store_feature(&hash, FeatureType::Nmf, "{}", "{\"a\":1}").unwrap();
        let (onset_id, _) = bank
            .store_feature(&hash, FeatureType::OnsetSlice, "{}", "{\"b\":2}")
            .unwrap();

        let latest = bank.latest_feature(None, None).unwrap().unwrap();
        assert_eq!(latest.id, onset_id);

        let nmf = bank.latest_feature(Some(&hash), Some(FeatureType::Nmf)).unwrap().unwrap();
        assert_eq!(nmf.feature_type, FeatureType::Nmf);

        assert!(bank.latest_feature(Some("ffffffff"), None).unwrap().is_none());
    }

    #[test]
    fn test_slice_partition() {
        let mut bank = bank();
        let hash = bank.store_sample(&tone(512, 0.1), None, 44100, 1, 0.01).unwrap();
        let (fid, _) = bank
            .store_feature(&hash, FeatureType::OnsetSlice, "{\"positions\":[0,100,250,400]}", "{}")
            .unwrap();

        let ids = bank.create_slices(&hash, fid, &[0, 100, 250, 400]).unwrap();
        assert_eq!(ids.len(), 3);

        let slices = bank.list_slices(fid).unwrap();
        assert_eq!(slices.len(), 3);
        assert_eq!((slices[0].start_sample, slices[0].end_sample), (0, 100));
        assert_eq!((slices[1].start_sample, slices[1].end_sample), (100, 250));
        assert_eq!((slices[2].start_sample, slices[2].end_sample), (250, 400));
        // contiguous, ordered, no trailing slice past the last onset
        for w in slices.windows(2) {
            assert_eq!(w[0].end_sample, w[1].start_sample);
        }
    }

    #[test]
    fn test_too_few_onsets_yield_no_slices() {
        let mut bank = bank();
        let hash = bank.store_sample(&tone(64, 0.1), None, 44100, 1, 0.001).unwrap();
        let (fid, _) = bank
            .store_feature(&hash, FeatureType::OnsetSlice, "{\"positions\":[42]}", "{}")
            .unwrap();

        assert!(bank.create_slices(&hash, fid, &[42]).unwrap().is_empty());
        assert!(bank.create_slices(&hash, fid, &[]).unwrap().is_empty());
    }

    #[test]
    fn test_component_upsert() {
        let bank = bank();
        let pcm = tone(64, 0.1);
        let hash = bank.store_sample(&pcm, None, 44100, 1, 0.001).unwrap();
        let (fid, _) = bank.store_feature(&hash, FeatureType::Nmf, "{}", "{}").unwrap();

        let id1 = bank.store_component(&hash, fid, 0, &pcm).unwrap();
        let id2 = bank.store_component(&hash, fid, 0, &pcm).unwrap();
        assert_eq!(id1, id2);

        let summaries = bank.list_components(fid).unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].sample_count, 64);

        let row = bank.component(fid, 0).unwrap().unwrap();
        assert_eq!(row.pcm.len(), pcm.len());
        assert!(bank.component(fid, 5).unwrap().is_none());
    }

    #[test]
    fn test_pcm_roundtrip() {
        let pcm = vec![0.0f32, -1.0, 0.5, 0.25];
        assert_eq!(bytes_to_pcm(&pcm_to_bytes(&pcm)), pcm);
    }
}
