//! Digests the server keeps in place of the secrets it checks.
//!
//! Admin tokens and password proofs are never stored; only their BLAKE3
//! digest is, and candidates are compared in constant time.

use std::fmt;
use std::str::FromStr;

use subtle::ConstantTimeEq;

pub const COMMITMENT_SIZE: usize = 32;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Commitment([u8; COMMITMENT_SIZE]);

#[derive(Debug, thiserror::Error)]
#[error("invalid commitment encoding")]
pub struct CommitmentError;

impl Commitment {
    pub fn of(secret: &[u8]) -> Self {
        Self(*blake3::hash(secret).as_bytes())
    }

    /// Constant-time check that `candidate` hashes to this commitment
    pub fn verify(&self, candidate: &[u8]) -> bool {
        let digest = blake3::hash(candidate);
        self.0.ct_eq(digest.as_bytes()).into()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Commitment {
    type Err = CommitmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|_| CommitmentError)?;
        let bytes: [u8; COMMITMENT_SIZE] = bytes.try_into().map_err(|_| CommitmentError)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({}..)", &self.to_hex()[..8])
    }
}
