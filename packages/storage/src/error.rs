use thiserror::Error;

/// Errors raised by a [`FileStore`](crate::FileStore).
#[derive(Debug, Error)]
pub enum StorageError {
    /// No file is stored under the given key.
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The key is not a 64-character hex SHA-256 digest.
    #[error("invalid file key: {0}")]
    InvalidKey(String),

    #[error("file exceeds size limit ({actual} > {limit} bytes)")]
    TooLarge { actual: u64, limit: u64 },
}
