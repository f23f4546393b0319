//! Content store abstraction for quillpub.
//!
//! Posts and media live as files in a Git repository. The [`ContentStore`]
//! trait describes the small protocol the rest of the workspace needs: read a
//! file together with its revision handle, create a file, update or delete a
//! file under optimistic concurrency, and list a directory.
//!
//! Two backends are provided:
//!
//! - [`GitHubStore`]: the GitHub repository contents API.
//! - [`MemoryStore`]: an in-process map using git blob hashes as revision
//!   handles, for tests and local development.

pub mod error;
pub mod github;
pub mod memory;

use std::borrow::Cow;

use async_trait::async_trait;
use bytes::Bytes;

pub use error::{StoreError, StoreResult};
pub use github::{Committer, GitHubStore, GitHubStoreConfig};
pub use memory::MemoryStore;

/// A file read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Repository path of the file.
    pub path: String,
    /// Raw file contents.
    pub content: Bytes,
    /// Revision handle (git blob sha) required for updates and deletes.
    pub sha: String,
}

impl StoredFile {
    /// File contents decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}

/// Result of a successful create or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Repository path that was written.
    pub path: String,
    /// Revision handle of the new content.
    pub sha: String,
}

/// Kind of a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A regular file.
    File,
    /// A subdirectory.
    Dir,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// Final path component.
    pub name: String,
    /// Full repository path.
    pub path: String,
    /// Revision handle of the entry.
    pub sha: String,
    /// Whether the entry is a file or a directory.
    pub kind: EntryKind,
}

/// Git-backed file storage.
#[async_trait]
pub trait ContentStore: Send + Sync + std::fmt::Debug {
    /// Read a file. Returns `Ok(None)` when the path does not exist.
    async fn get_file(&self, path: &str) -> StoreResult<Option<StoredFile>>;

    /// Create a new file. Fails with [`StoreError::AlreadyExists`] if the path is taken.
    async fn create_file(&self, path: &str, content: &[u8], message: &str)
    -> StoreResult<WriteReceipt>;

    /// Replace a file's content. `sha` must be the file's current revision handle,
    /// otherwise the write fails with [`StoreError::Conflict`].
    async fn update_file(
        &self,
        path: &str,
        content: &[u8],
        sha: &str,
        message: &str,
    ) -> StoreResult<WriteReceipt>;

    /// Delete a file at the given revision.
    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> StoreResult<()>;

    /// List a directory. Returns `Ok(None)` when the directory does not exist.
    async fn list_directory(&self, dir: &str) -> StoreResult<Option<Vec<DirEntry>>>;
}

/// Compute the git blob hash of `content` (`sha1("blob <len>\0" + content)`).
#[must_use]
pub fn git_blob_sha(content: &[u8]) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(format!("blob {}\0", content.len()).as_bytes());
    hasher.update(content);
    hex::encode(hasher.finalize())
}
