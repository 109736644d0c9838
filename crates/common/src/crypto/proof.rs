use std::fmt;

const PASSWORD_PROOF_CONTEXT: &str = "ephemera 2024 password proof";

/// Client-side pre-hash of an object password.
///
/// The server only ever receives this proof and stores a commitment to it,
/// so it never learns the password itself.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordProof(String);

impl PasswordProof {
    pub fn derive(password: &str) -> Self {
        Self(hex::encode(blake3::derive_key(
            PASSWORD_PROOF_CONTEXT,
            password.as_bytes(),
        )))
    }

    /// Wrap a proof received over the wire
    pub fn from_wire(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for PasswordProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordProof(..)")
    }
}
