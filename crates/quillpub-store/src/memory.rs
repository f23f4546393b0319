//! In-memory content store.
//!
//! [`MemoryStore`] keeps files in a [`DashMap`] keyed by repository path and
//! uses git blob hashes as revision handles, so optimistic-concurrency
//! behavior matches the GitHub backend.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::{ContentStore, DirEntry, EntryKind, StoredFile, WriteReceipt, git_blob_sha};

/// A recorded write, kept for inspection in tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRecord {
    /// Path the commit touched.
    pub path: String,
    /// Commit message.
    pub message: String,
}

/// Thread-safe in-memory [`ContentStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: DashMap<String, Bytes>,
    commits: Mutex<Vec<CommitRecord>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a file directly, bypassing revision checks. Returns the new sha.
    pub fn put(&self, path: &str, content: impl Into<Bytes>) -> String {
        let content = content.into();
        let sha = git_blob_sha(&content);
        self.files.insert(normalize(path), content);
        sha
    }

    /// Raw content of a file, if present.
    #[must_use]
    pub fn content(&self, path: &str) -> Option<Bytes> {
        self.files.get(&normalize(path)).map(|v| v.clone())
    }

    /// Content of a file decoded as UTF-8.
    #[must_use]
    pub fn text(&self, path: &str) -> Option<String> {
        self.content(path)
            .map(|b| String::from_utf8_lossy(&b).into_owned())
    }

    /// All stored paths, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Number of stored files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the store holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn record(&self, path: &str, message: &str) {
        self.commits.lock().push(CommitRecord {
            path: path.to_owned(),
            message: message.to_owned(),
        });
    }

    /// Commits made through the [`ContentStore`] interface, oldest first.
    #[must_use]
    pub fn commits(&self) -> Vec<CommitRecord> {
        self.commits.lock().clone()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn get_file(&self, path: &str) -> StoreResult<Option<StoredFile>> {
        let path = normalize(path);
        Ok(self.files.get(&path).map(|content| StoredFile {
            sha: git_blob_sha(&content),
            content: content.clone(),
            path,
        }))
    }

    async fn create_file(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        let path = normalize(path);
        match self.files.entry(path.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists { path }),
            Entry::Vacant(slot) => {
                slot.insert(Bytes::copy_from_slice(content));
                debug!(%path, "memory store created file");
                self.record(&path, message);
                Ok(WriteReceipt {
                    sha: git_blob_sha(content),
                    path,
                })
            }
        }
    }

    async fn update_file(
        &self,
        path: &str,
        content: &[u8],
        sha: &str,
        message: &str,
    ) -> StoreResult<WriteReceipt> {
        let path = normalize(path);
        match self.files.entry(path.clone()) {
            Entry::Vacant(_) => Err(StoreError::NotFound { path }),
            Entry::Occupied(mut slot) => {
                if git_blob_sha(slot.get()) != sha {
                    return Err(StoreError::Conflict {
                        path,
                        sha: sha.to_owned(),
                    });
                }
                slot.insert(Bytes::copy_from_slice(content));
                debug!(%path, "memory store updated file");
                self.record(&path, message);
                Ok(WriteReceipt {
                    sha: git_blob_sha(content),
                    path,
                })
            }
        }
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> StoreResult<()> {
        let path = normalize(path);
        match self.files.entry(path.clone()) {
            Entry::Vacant(_) => Err(StoreError::NotFound { path }),
            Entry::Occupied(slot) => {
                if git_blob_sha(slot.get()) != sha {
                    return Err(StoreError::Conflict {
                        path,
                        sha: sha.to_owned(),
                    });
                }
                slot.remove();
                self.record(&path, message);
                Ok(())
            }
        }
    }

    async fn list_directory(&self, dir: &str) -> StoreResult<Option<Vec<DirEntry>>> {
        let dir = normalize(dir);
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };

        let mut entries: Vec<DirEntry> = Vec::new();
        for item in &self.files {
            let Some(rest) = item.key().strip_prefix(&prefix) else {
                continue;
            };
            let entry = match rest.split_once('/') {
                Some((sub, _)) => DirEntry {
                    name: sub.to_owned(),
                    path: format!("{prefix}{sub}"),
                    sha: String::new(),
                    kind: EntryKind::Dir,
                },
                None => DirEntry {
                    name: rest.to_owned(),
                    path: item.key().clone(),
                    sha: git_blob_sha(item.value()),
                    kind: EntryKind::File,
                },
            };
            if !entries.iter().any(|e| e.path == entry.path) {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            return Ok(None);
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Some(entries))
    }
}

fn normalize(path: &str) -> String {
    path.trim_matches('/').to_owned()
}
