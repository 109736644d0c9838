//! Cryptographic primitives for Ephemera
//!
//! # Security Model
//!
//! ## Content Encryption (client side)
//! Each shared object has one ChaCha20-Poly1305 `Secret`, generated by the
//! creating client. Object structure and item payloads are sealed with it
//! before upload. The key travels only in the URL fragment of a `ShareLink`,
//! never in a request, so the server stores ciphertext it cannot read.
//!
//! ## Capabilities (server side)
//! - Holding the key grants read and participate rights.
//! - Holding the admin token grants owner rights (delete, reconfigure).
//! - An optional password adds a second factor to reads. The client derives a
//!   `PasswordProof`, and the server stores only a `Commitment` to it.

mod commitment;
mod link;
mod proof;
mod secret;

pub use commitment::{Commitment, CommitmentError, COMMITMENT_SIZE};
pub use link::{ShareLink, ShareLinkError};
pub use proof::PasswordProof;
pub use secret::{Secret, SecretError, NONCE_SIZE, SECRET_SIZE};
