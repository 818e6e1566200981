//! Error types for zone administration

use thiserror::Error;

/// Errors when registering spawn zones
#[derive(Debug, Error)]
pub enum SpawnError {
    #[error("zone '{id}' already exists")]
    DuplicateZone { id: String },

    #[error("zone '{id}' references unknown world '{world}'")]
    UnknownWorld { id: String, world: String },

    #[error("invalid zone '{id}': {reason}")]
    InvalidZone { id: String, reason: String },
}
