//! Crate-level error type covering store lookups, option validation,
//! and kernel failures.

use crate::analysis::FeatureType;

/// Minimum accepted length for hash-prefix lookups, in hex characters.
pub const MIN_PREFIX_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No stored sample matches the given hash or prefix.
    #[error("no sample matching '{query}'")]
    SampleNotFound { query: String },

    /// A hash prefix matched more than one stored sample.
    #[error("hash prefix '{prefix}' matches {matches} samples, add more characters")]
    AmbiguousPrefix { prefix: String, matches: usize },

    /// A hash prefix is shorter than the accepted minimum.
    #[error("hash prefix '{prefix}' is too short (need at least {MIN_PREFIX_LEN} characters)")]
    PrefixTooShort { prefix: String },

    /// A feature row id does not exist.
    #[error("feature {id} not found")]
    FeatureNotFound { id: i64 },

    /// Storing a sample with no PCM data.
    #[error("sample has no PCM data")]
    EmptySample,

    /// Invalid analysis parameter value.
    #[error("invalid parameter `{name}`: got {value}, {reason}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// Component index outside the factorization's component count.
    #[error("component index {index} out of range for {count} components")]
    ComponentIndexOutOfRange { index: usize, count: usize },

    /// An operation needs a prior analysis that was never run.
    #[error("no {feature_type} analysis found for sample {sample} (run `analyze` first)")]
    NoAnalysisFound {
        sample: String,
        feature_type: FeatureType,
    },

    /// The numeric kernel failed; the underlying message is preserved.
    #[error("{op} failed for sample {sample}: {message}")]
    Computation {
        op: &'static str,
        sample: String,
        message: String,
    },

    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Audio(#[from] hound::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for unmix operations.
pub type Result<T> = std::result::Result<T, Error>;
