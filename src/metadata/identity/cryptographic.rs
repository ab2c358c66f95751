//! Strong-name identity: a full public key or its 8-byte token.

use sha1::{Digest, Sha1};

use crate::{utils::read_le, Result};

/// The strong-name part of an assembly identity.
///
/// `Assembly` rows carry the full public key, `AssemblyRef` rows usually carry only the token;
/// [`AssemblyRefRow::flags`](crate::metadata::streams::AssemblyRefRow) tells which.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    /// The full RSA public key blob
    PubKey(Vec<u8>),
    /// The public key token, stored so that `to_le_bytes` yields the display order
    Token(u64),
}

impl Identity {
    /// Create an `Identity` from a blob.
    ///
    /// # Arguments
    /// * `data`    - The public key or token bytes
    /// * `is_pub`  - Whether `data` is a full public key
    ///
    /// # Errors
    /// Returns an error if a token blob is shorter than 8 bytes.
    pub fn from(data: &[u8], is_pub: bool) -> Result<Self> {
        Ok(if is_pub {
            Identity::PubKey(data.to_vec())
        } else {
            Identity::Token(read_le::<u64>(data)?)
        })
    }

    /// The public key token.
    ///
    /// For a full key this is the last 8 bytes of its SHA1 hash, in reverse order.
    #[must_use]
    pub fn to_token(&self) -> u64 {
        match self {
            Identity::PubKey(data) => {
                let hash = Sha1::digest(data);
                let mut token = [0u8; 8];
                for (dst, src) in token.iter_mut().zip(hash.iter().rev()) {
                    *dst = *src;
                }
                u64::from_le_bytes(token)
            }
            Identity::Token(token) => *token,
        }
    }

    /// The token bytes in display order
    #[must_use]
    pub fn token_bytes(&self) -> [u8; 8] {
        self.to_token().to_le_bytes()
    }
}
