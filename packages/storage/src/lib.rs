//! Content-addressed storage for uploaded asset files.
//!
//! Files are keyed by the SHA-256 of their bytes, so uploading the same file
//! twice stores it once. Callers keep the key (or a URL derived from it) and
//! read the bytes back through [`FileStore::open`].

mod error;
mod key;
mod traits;

pub mod local;

pub use error::StorageError;
pub use key::FileKey;
pub use local::LocalFileStore;
pub use traits::{BoxReader, FileStore, StoredFile};
