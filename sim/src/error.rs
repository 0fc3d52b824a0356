//! Error types for the simulation API.
//!
//! Systems never fail: missing components mean "does not participate this
//! tick". Only the host-facing API (configuration, spawning, lookups by id)
//! returns these errors.

use std::path::PathBuf;

/// Errors surfaced by [`crate::SimWorld`] and [`crate::SimConfig`].
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// A configuration value is outside its valid range.
    #[error("invalid config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read config '{}': {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration text is not valid JSON for [`crate::SimConfig`].
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Every slot of the position pool has been handed out.
    #[error("position pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },

    /// A unit with this id already exists.
    #[error("unit {0} already exists")]
    DuplicateUnit(u32),

    /// No unit with this id exists.
    #[error("unit {0} does not exist")]
    UnknownUnit(u32),
}

pub type SimResult<T> = Result<T, SimError>;
