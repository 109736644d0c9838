//! Objects, items and the rules tying them together.

mod ids;
mod kind;
mod lifetime;
mod record;

pub use ids::{AdminToken, ItemId, ObjectId, ADMIN_TOKEN_SIZE, OBJECT_ID_SIZE};
pub use kind::{FieldRule, ItemFields, ItemRole, ListPreset, ObjectKind, PollMode, RoleRules};
pub use lifetime::Lifetime;
pub use record::{
    CreatedObject, ItemPatch, ItemRecord, ItemWrite, NewItem, NewObject, ObjectRecord, Snapshot,
};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),
    #[error("lifetime of {0}s is not one of the allowed durations")]
    InvalidDuration(u64),
    #[error("unknown lifetime '{0}', expected one of 5m, 1h, 1d, 7d, 30d")]
    InvalidLifetimeLabel(String),
    #[error("unknown item role: {0}")]
    UnknownRole(String),
    #[error("a {0} does not hold {1} items")]
    RoleNotAllowed(&'static str, ItemRole),
    #[error("field '{0}' is not allowed here")]
    FieldNotAllowed(&'static str),
    #[error("field '{0}' is required")]
    FieldRequired(&'static str),
    #[error("system entropy source unavailable")]
    Entropy,
}
