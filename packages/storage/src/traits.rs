use std::io::Cursor;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::StorageError;
use crate::key::FileKey;

pub type BoxReader = Box<dyn AsyncRead + Unpin + Send>;

/// Outcome of storing a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoredFile {
    pub key: FileKey,
    pub size: u64,
    /// `false` when identical bytes were already present.
    pub fresh: bool,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, data: &[u8]) -> Result<StoredFile, StorageError> {
        let reader: BoxReader = Box::new(Cursor::new(data.to_vec()));
        self.put_stream(reader).await
    }

    /// Drain `reader` into the store and return the key of its bytes.
    async fn put_stream(&self, reader: BoxReader) -> Result<StoredFile, StorageError>;

    async fn open(&self, key: &FileKey) -> Result<BoxReader, StorageError>;

    async fn read(&self, key: &FileKey) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.open(key).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    /// Returns `false` if nothing was stored under `key`.
    async fn remove(&self, key: &FileKey) -> Result<bool, StorageError>;
}
