//! Brain: The key-value collaborator the engine persists into.
//!
//! The engine never touches storage directly; every read and write goes
//! through the [`Brain`] trait. Ships with [`MemoryBrain`] for in-process use
//! and tests, and [`SnapshotBrain`] (behind the `native` feature, default)
//! which persists a [`MemoryBrain`] to a JSON file.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ReactConfig;
use crate::error::ReactResult;

/// A value held under one brain key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BrainValue {
    Text(String),
    Counter(i64),
    Set(std::collections::BTreeSet<String>),
}

impl BrainValue {
    pub fn kind(&self) -> &'static str {
        match self {
            BrainValue::Text(_) => "text",
            BrainValue::Counter(_) => "counter",
            BrainValue::Set(_) => "set",
        }
    }
}

/// Key-value store contract.
///
/// Keys are flat strings. A key holds a single value kind; using a key as a
/// different kind than it was created with is a store error. Missing keys
/// read as absent / zero / empty.
#[async_trait]
pub trait Brain: Send + Sync {
    async fn set(&self, key: &str, value: String) -> ReactResult<()>;

    async fn get(&self, key: &str) -> ReactResult<Option<String>>;

    /// Remove a key of any kind. Missing keys are fine.
    async fn delete(&self, key: &str) -> ReactResult<()>;

    /// Add a member; returns `true` if it was not already present.
    async fn add_to_set(&self, key: &str, member: String) -> ReactResult<bool>;

    /// Remove a member; returns `true` if it was present. Empty sets vanish.
    async fn remove_from_set(&self, key: &str, member: &str) -> ReactResult<bool>;

    async fn random_member(&self, key: &str) -> ReactResult<Option<String>>;

    async fn set_size(&self, key: &str) -> ReactResult<usize>;

    async fn set_members(&self, key: &str) -> ReactResult<Vec<String>>;

    /// Add `by` to a counter (created at zero) and return the new value.
    async fn increment_by(&self, key: &str, by: i64) -> ReactResult<i64>;

    /// Keys matching a glob where `*` stands for any run of characters.
    async fn keys_matching(&self, pattern: &str) -> ReactResult<Vec<String>>;

    async fn exists(&self, key: &str) -> ReactResult<bool>;
}

/// Glob match supporting `*` only.
pub fn glob_match(pattern: &str, key: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    if parts.len() == 1 {
        return pattern == key;
    }

    let first = parts[0];
    let last = parts[parts.len() - 1];
    if !key.starts_with(first) || key.len() < first.len() + last.len() {
        return false;
    }
    if !key[first.len()..].ends_with(last) {
        return false;
    }

    let mut rest = &key[first.len()..key.len() - last.len()];
    for middle in &parts[1..parts.len() - 1] {
        match rest.find(middle) {
            Some(idx) => rest = &rest[idx + middle.len()..],
            None => return false,
        }
    }
    true
}

// ─── MemoryBrain ────────────────────────────────────────────────────────────

mod memory;
pub use memory::MemoryBrain;

// ─── SnapshotBrain (behind `native` feature, default) ─────────────────────

#[cfg(feature = "native")]
mod snapshot;
#[cfg(feature = "native")]
pub use snapshot::SnapshotBrain;

/// Open the brain `config` asks for: a [`SnapshotBrain`] at
/// `snapshot_path` when one is set, otherwise an empty [`MemoryBrain`].
pub async fn open_configured(config: &ReactConfig) -> ReactResult<Arc<dyn Brain>> {
    match &config.snapshot_path {
        None => Ok(Arc::new(MemoryBrain::new())),
        #[cfg(feature = "native")]
        Some(path) => Ok(Arc::new(SnapshotBrain::open(path.clone()).await?)),
        #[cfg(not(feature = "native"))]
        Some(_) => Err(crate::error::ReactError::Config {
            key: crate::config::ENV_SNAPSHOT_PATH.into(),
            message: "snapshot persistence needs the `native` feature".into(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_configured_defaults_to_memory() {
        let brain = open_configured(&ReactConfig::default()).await.unwrap();
        assert!(brain.keys_matching("*").await.unwrap().is_empty());
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn open_configured_persists_to_snapshot_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("brain.json");
        let config = ReactConfig::default().with_snapshot_path(&path);

        let brain = open_configured(&config).await.unwrap();
        brain.set("greeting", "hi".into()).await.unwrap();
        assert!(path.exists());

        let reopened = open_configured(&config).await.unwrap();
        assert_eq!(reopened.get("greeting").await.unwrap(), Some("hi".into()));
    }

    #[test]
    fn glob_exact() {
        assert!(glob_match("bucket:raw:!!!", "bucket:raw:!!!"));
        assert!(!glob_match("bucket:raw:!!!", "bucket:raw:!!"));
    }

    #[test]
    fn glob_trailing_star() {
        assert!(glob_match("bucket:*", "bucket:stemmed:hello"));
        assert!(glob_match("bucket:*", "bucket:"));
        assert!(!glob_match("bucket:*", "index:stemmed"));
    }

    #[test]
    fn glob_leading_and_middle_star() {
        assert!(glob_match("*:hello", "bucket:stemmed:hello"));
        assert!(glob_match("bucket:*:hello", "bucket:stemmed:hello"));
        assert!(!glob_match("bucket:*:hello", "bucket:stemmed:hell"));
        assert!(glob_match("a*b*c", "a-x-b-y-c"));
        assert!(!glob_match("a*b*c", "a-x-c-y-b"));
    }

    #[test]
    fn glob_star_does_not_overlap_prefix_and_suffix() {
        assert!(!glob_match("ab*ba", "aba"));
        assert!(glob_match("ab*ba", "abba"));
    }

    #[test]
    fn brain_value_kind() {
        assert_eq!(BrainValue::Text("x".into()).kind(), "text");
        assert_eq!(BrainValue::Counter(1).kind(), "counter");
        assert_eq!(BrainValue::Set(Default::default()).kind(), "set");
    }

    #[test]
    fn brain_value_serializes_tagged() {
        let json = serde_json::to_string(&BrainValue::Counter(3)).unwrap();
        assert_eq!(json, r#"{"type":"counter","value":3}"#);
        let back: BrainValue = serde_json::from_str(&json).unwrap();
        assert_eq!(back, BrainValue::Counter(3));
    }
}
