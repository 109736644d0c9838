use std::fmt::Display;

use common::model::ModelError;
use common::store::StoreError;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Missing, expired or destroyed
    #[error("object not found")]
    NotFound,
    /// Password proof missing or wrong
    #[error("password required")]
    Unauthorized,
    /// Admin token missing or wrong
    #[error("admin token required")]
    Forbidden,
    #[error("version conflict: expected {expected}, current {current}")]
    VersionConflict { expected: u64, current: u64 },
    #[error("lifetime of {0}s is not one of the allowed durations")]
    InvalidDuration(u64),
    #[error("{0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable kind, used in error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::NotFound => "not_found",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::Forbidden => "forbidden",
            GatewayError::VersionConflict { .. } => "version_conflict",
            GatewayError::InvalidDuration(_) => "invalid_duration",
            GatewayError::Validation(_) => "validation",
            GatewayError::Internal(_) => "internal",
        }
    }
}

impl<E: Display> From<StoreError<E>> for GatewayError {
    fn from(err: StoreError<E>) -> Self {
        match err {
            StoreError::NotFound => GatewayError::NotFound,
            StoreError::VersionConflict { expected, current } => {
                GatewayError::VersionConflict { expected, current }
            }
            StoreError::Entropy => GatewayError::Internal("entropy source unavailable".into()),
            StoreError::Provider(e) => GatewayError::Internal(e.to_string()),
        }
    }
}

impl From<ModelError> for GatewayError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidDuration(secs) => GatewayError::InvalidDuration(secs),
            // ids come from the URL; a malformed one names nothing
            ModelError::InvalidId(_) => GatewayError::NotFound,
            ModelError::Entropy => GatewayError::Internal(err.to_string()),
            other => GatewayError::Validation(other.to_string()),
        }
    }
}
