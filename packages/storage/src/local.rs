use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::StorageError;
use crate::key::FileKey;
use crate::traits::{BoxReader, FileStore, StoredFile};

const READ_CHUNK: usize = 64 * 1024;

/// [`FileStore`] on the local filesystem.
///
/// Layout is `{root}/{first byte hex}/{remaining hex}`; partial writes go to
/// `{root}/.tmp` and are hard-linked into place once fully hashed.
pub struct LocalFileStore {
    root: PathBuf,
    max_size: u64,
}

impl LocalFileStore {
    pub async fn new(root: impl Into<PathBuf>, max_size: u64) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(root.join(".tmp")).await?;
        Ok(Self { root, max_size })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &FileKey) -> PathBuf {
        let (dir, name) = key.shard();
        self.root.join(dir).join(name)
    }

    fn scratch_path(&self) -> PathBuf {
        self.root.join(".tmp").join(uuid::Uuid::new_v4().to_string())
    }

    /// Hash `reader` into a scratch file, enforcing the size limit.
    async fn spool(
        &self,
        reader: &mut BoxReader,
        scratch: &Path,
    ) -> Result<(FileKey, u64), StorageError> {
        let mut file = fs::File::create(scratch).await?;
        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        let mut buf = vec![0u8; READ_CHUNK];

        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            size += n as u64;
            if size > self.max_size {
                return Err(StorageError::TooLarge {
                    actual: size,
                    limit: self.max_size,
                });
            }
            hasher.update(&buf[..n]);
            file.write_all(&buf[..n]).await?;
        }
        file.flush().await?;

        Ok((FileKey::from_digest(hasher.finalize().into()), size))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put_stream(&self, mut reader: BoxReader) -> Result<StoredFile, StorageError> {
        let scratch = self.scratch_path();

        let (key, size) = match self.spool(&mut reader, &scratch).await {
            Ok(spooled) => spooled,
            Err(e) => {
                let _ = fs::remove_file(&scratch).await;
                return Err(e);
            }
        };

        let target = self.path_for(&key);
        if let Some(parent) = target.parent()
            && let Err(e) = fs::create_dir_all(parent).await
        {
            let _ = fs::remove_file(&scratch).await;
            return Err(e.into());
        }

        // Linking fails if the target exists, so exactly one writer sees `fresh`.
        let claimed = fs::hard_link(&scratch, &target).await;
        let _ = fs::remove_file(&scratch).await;
        let fresh = match claimed {
            Ok(()) => true,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => false,
            Err(e) => return Err(e.into()),
        };

        debug!(%key, size, fresh, "stored file");
        Ok(StoredFile { key, size, fresh })
    }

    async fn open(&self, key: &FileKey) -> Result<BoxReader, StorageError> {
        match fs::File::open(self.path_for(key)).await {
            Ok(file) => Ok(Box::new(BufReader::new(file))),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::NotFound(key.to_hex())),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, key: &FileKey) -> Result<bool, StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
