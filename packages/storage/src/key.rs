use std::fmt;
use std::str::FromStr;

use sha2::{Digest, Sha256};

use crate::error::StorageError;

/// SHA-256 digest identifying a stored file.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileKey([u8; 32]);

impl FileKey {
    /// Hash `data` into its key.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(digest)
    }

    /// Lowercase 64-character hex form, as used in URLs and database rows.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Directory and file name under the store root: `ab/cdef…`.
    pub(crate) fn shard(&self) -> (String, String) {
        (hex::encode(&self.0[..1]), hex::encode(&self.0[1..]))
    }
}

impl FromStr for FileKey {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 64 {
            return Err(StorageError::InvalidKey(format!(
                "expected 64 hex characters, got {}",
                s.len()
            )));
        }
        let mut digest = [0u8; 32];
        hex::decode_to_slice(s, &mut digest)
            .map_err(|e| StorageError::InvalidKey(format!("invalid hex: {e}")))?;
        Ok(Self(digest))
    }
}

impl fmt::Debug for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileKey({})", self.to_hex())
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
