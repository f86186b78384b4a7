//! JSON snapshot persistence on top of [`MemoryBrain`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReactResult;

use super::{Brain, BrainValue, MemoryBrain};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    version: u32,
    saved_at: DateTime<Utc>,
    entries: BTreeMap<String, BrainValue>,
}

/// A [`MemoryBrain`] mirrored to a JSON file.
///
/// With write-through on (the default) every mutation rewrites the file
/// before returning. With it off, mutations only mark the brain dirty and the
/// host calls [`SnapshotBrain::flush`] on its own schedule.
pub struct SnapshotBrain {
    inner: MemoryBrain,
    path: PathBuf,
    write_through: bool,
    dirty: AtomicBool,
}

impl SnapshotBrain {
    /// Open a snapshot, starting empty when the file does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> ReactResult<Self> {
        let path = path.into();
        let entries = if tokio::fs::try_exists(&path).await? {
            let raw = tokio::fs::read_to_string(&path).await?;
            let file: SnapshotFile = serde_json::from_str(&raw)?;
            if file.version != SNAPSHOT_VERSION {
                tracing::warn!(
                    path = %path.display(),
                    version = file.version,
                    "loading snapshot written by a different format version"
                );
            }
            tracing::info!(
                path = %path.display(),
                keys = file.entries.len(),
                saved_at = %file.saved_at,
                "loaded brain snapshot"
            );
            file.entries
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            inner: MemoryBrain::from_entries(entries),
            path,
            write_through: true,
            dirty: AtomicBool::new(false),
        })
    }

    pub fn with_write_through(mut self, write_through: bool) -> Self {
        self.write_through = write_through;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Write the current content to disk if anything changed.
    pub async fn flush(&self) -> ReactResult<()> {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.write_file().await {
            self.dirty.store(true, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    async fn write_file(&self) -> ReactResult<()> {
        let file = SnapshotFile {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            entries: self.inner.entries().await,
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        // Write to a sibling then rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutated(&self) -> ReactResult<()> {
        self.dirty.store(true, Ordering::SeqCst);
        if self.write_through {
            self.flush().await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Brain for SnapshotBrain {
    async fn set(&self, key: &str, value: String) -> ReactResult<()> {
        self.inner.set(key, value).await?;
        self.mutated().await
    }

    async fn get(&self, key: &str) -> ReactResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> ReactResult<()> {
        self.inner.delete(key).await?;
        self.mutated().await
    }

    async fn add_to_set(&self, key: &str, member: String) -> ReactResult<bool> {
        let added = self.inner.add_to_set(key, member).await?;
        if added {
            self.mutated().await?;
        }
        Ok(added)
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> ReactResult<bool> {
        let removed = self.inner.remove_from_set(key, member).await?;
        if removed {
            self.mutated().await?;
        }
        Ok(removed)
    }

    async fn random_member(&self, key: &str) -> ReactResult<Option<String>> {
        self.inner.random_member(key).await
    }

    async fn set_size(&self, key: &str) -> ReactResult<usize> {
        self.inner.set_size(key).await
    }

    async fn set_members(&self, key: &str) -> ReactResult<Vec<String>> {
        self.inner.set_members(key).await
    }

    async fn increment_by(&self, key: &str, by: i64) -> ReactResult<i64> {
        let value = self.inner.increment_by(key, by).await?;
        self.mutated().await?;
        Ok(value)
    }

    async fn keys_matching(&self, pattern: &str) -> ReactResult<Vec<String>> {
        self.inner.keys_matching(pattern).await
    }

    async fn exists(&self, key: &str) -> ReactResult<bool> {
        self.inner.exists(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let brain = SnapshotBrain::open(dir.path().join("brain.json")).await.unwrap();
        assert!(!brain.exists("anything").await.unwrap());
        assert!(!brain.is_dirty());
    }

    #[tokio::test]
    async fn write_through_persists_every_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.json");

        let brain = SnapshotBrain::open(&path).await.unwrap();
        brain.set("greeting", "hi".into()).await.unwrap();
        brain.add_to_set("bucket", "a".into()).await.unwrap();
        brain.increment_by("count", 3).await.unwrap();
        assert!(!brain.is_dirty());

        let reopened = SnapshotBrain::open(&path).await.unwrap();
        assert_eq!(reopened.get("greeting").await.unwrap(), Some("hi".into()));
        assert_eq!(reopened.set_members("bucket").await.unwrap(), vec!["a"]);
        assert_eq!(reopened.increment_by("count", 0).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn deferred_writes_need_flush() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("brain.json");

        let brain = SnapshotBrain::open(&path)
            .await
            .unwrap()
            .with_write_through(false);
        brain.set("k", "v".into()).await.unwrap();
        assert!(brain.is_dirty());
        assert!(!path.exists());

        brain.flush().await.unwrap();
        assert!(!brain.is_dirty());
        assert!(path.exists());

        let reopened = SnapshotBrain::open(&path).await.unwrap();
        assert_eq!(reopened.get("k").await.unwrap(), Some("v".into()));
    }

    #[tokio::test]
    async fn duplicate_set_add_does_not_dirty() {
        let dir = tempfile::tempdir().unwrap();
        let brain = SnapshotBrain::open(dir.path().join("b.json"))
            .await
            .unwrap()
            .with_write_through(false);
        brain.add_to_set("s", "a".into()).await.unwrap();
        brain.flush().await.unwrap();
        brain.add_to_set("s", "a".into()).await.unwrap();
        assert!(!brain.is_dirty());
    }

    #[tokio::test]
    async fn corrupt_snapshot_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.json");
        tokio::fs::write(&path, "not json").await.unwrap();
        let result = SnapshotBrain::open(&path).await;
        assert!(matches!(
            result,
            Err(crate::error::ReactError::Serialization(_))
        ));
    }
}
