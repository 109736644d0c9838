/**
 * Time source abstraction so expiry can be
 *  driven deterministically in tests.
 */
pub mod clock;
/**
 * Cryptographic types and operations.
 *  - Client-side content encryption
 *  - Admin token and password commitments
 *  - Share links carrying the key in the fragment
 */
pub mod crypto;
/**
 * Objects, items, lifetimes and the per-kind
 *  rules for what a write may contain.
 */
pub mod model;
/**
 * Debt simplification for expense groups.
 *  Pure and client-side: it only ever sees
 *  decrypted expense payloads.
 */
pub mod settlement;
/**
 * Storage contract for objects and items,
 *  plus an in-memory implementation.
 */
pub mod store;
/**
 * Helper for setting build version information
 *  at compile time.
 */
pub mod version;

pub mod prelude {
    pub use crate::clock::{Clock, SharedClock, SystemClock};
    pub use crate::crypto::{Commitment, PasswordProof, Secret, SecretError, ShareLink};
    pub use crate::model::{
        AdminToken, ItemFields, ItemId, ItemRole, Lifetime, ModelError, ObjectId, ObjectKind,
        Snapshot,
    };
    pub use crate::store::{RecordStore, StoreError};
    pub use crate::version::build_info;
}
