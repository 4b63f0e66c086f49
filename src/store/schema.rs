//! SQLite schema definition
//!
//! Four relations:
//! - samples: raw PCM keyed by content hash
//! - features: derived analysis results (NMF factorizations, onset lists)
//! - slices: onset-delimited intervals belonging to an onset feature
//! - components: resynthesized audio per NMF component

pub const SCHEMA: &str = r#"
-- ============================================
-- SAMPLES
-- ============================================

-- Raw audio, content-addressed by SHA-256 over the PCM bytes.
-- Re-ingesting identical audio reuses the existing row.
CREATE TABLE IF NOT EXISTS samples (
    hash TEXT PRIMARY KEY,                 -- lowercase hex, full length
    source_path TEXT,                      -- where the audio came from (informational)
    sample_rate INTEGER NOT NULL,
    channel_count INTEGER NOT NULL,
    duration_seconds REAL NOT NULL,
    pcm BLOB NOT NULL,                     -- f32 little-endian, channel 0
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP
);

-- ============================================
-- FEATURES
-- ============================================

-- One row per (sample, analysis result + options) pair.
-- feature_hash = sha256(feature_type || payload || options), so identical
-- analyses dedupe and any option change produces a new row.
CREATE TABLE IF NOT EXISTS features (
    id INTEGER PRIMARY KEY,
    sample_hash TEXT NOT NULL,
    feature_type TEXT NOT NULL,            -- 'nmf' | 'onset-slice'
    feature_hash TEXT NOT NULL,
    payload TEXT NOT NULL,                 -- serialized result, type-specific
    options TEXT NOT NULL,                 -- exact parameter set used
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(sample_hash, feature_hash),
    FOREIGN KEY(sample_hash) REFERENCES samples(hash)
);

-- ============================================
-- SLICES
-- ============================================

-- Contiguous, non-overlapping intervals derived from an onset feature.
-- Playback reads pcm[start_sample..end_sample] from the owning sample;
-- no audio is duplicated here.
CREATE TABLE IF NOT EXISTS slices (
    id INTEGER PRIMARY KEY,
    sample_hash TEXT NOT NULL,
    feature_id INTEGER NOT NULL,
    slice_index INTEGER NOT NULL,          -- 0-based, strictly increasing
    start_sample INTEGER NOT NULL,
    end_sample INTEGER NOT NULL,           -- exclusive; next slice's start
    UNIQUE(feature_id, slice_index),
    FOREIGN KEY(sample_hash) REFERENCES samples(hash),
    FOREIGN KEY(feature_id) REFERENCES features(id) ON DELETE CASCADE
);

-- ============================================
-- COMPONENTS
-- ============================================

-- Resynthesized audio for one NMF component. Same length as the owning
-- sample's PCM.
CREATE TABLE IF NOT EXISTS components (
    id INTEGER PRIMARY KEY,
    sample_hash TEXT NOT NULL,
    feature_id INTEGER NOT NULL,
    component_index INTEGER NOT NULL,      -- 0-based, < component count in options
    pcm BLOB NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    UNIQUE(feature_id, component_index),
    FOREIGN KEY(sample_hash) REFERENCES samples(hash),
    FOREIGN KEY(feature_id) REFERENCES features(id) ON DELETE CASCADE
);

-- ============================================
-- INDEXES
-- ============================================

CREATE INDEX IF NOT EXISTS idx_features_sample ON features(sample_hash);
CREATE INDEX IF NOT EXISTS idx_features_type ON features(feature_type);
CREATE INDEX IF NOT EXISTS idx_slices_feature ON slices(feature_id);
CREATE INDEX IF NOT EXISTS idx_slices_sample ON slices(sample_hash);
CREATE INDEX IF NOT EXISTS idx_components_feature ON components(feature_id);
CREATE INDEX IF NOT EXISTS idx_components_sample ON components(sample_hash);
"#;
