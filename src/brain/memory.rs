//! In-memory brain for single-process hosts and tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use rand::seq::IteratorRandom;
use tokio::sync::RwLock;

use crate::error::{ReactError, ReactResult};

use super::{glob_match, Brain, BrainValue};

/// Brain backed by a `BTreeMap` behind a `tokio::sync::RwLock`.
pub struct MemoryBrain {
    data: RwLock<BTreeMap<String, BrainValue>>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn from_entries(entries: BTreeMap<String, BrainValue>) -> Self {
        Self {
            data: RwLock::new(entries),
        }
    }

    /// Copy of every key and value, for persistence.
    pub async fn entries(&self) -> BTreeMap<String, BrainValue> {
        self.data.read().await.clone()
    }

    /// Replace the whole content.
    pub async fn replace(&self, entries: BTreeMap<String, BrainValue>) {
        *self.data.write().await = entries;
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }

    fn wrong_kind(key: &str, expected: &str, found: &BrainValue) -> ReactError {
        ReactError::store(format!(
            "key {key:?} holds a {}, expected a {expected}",
            found.kind()
        ))
    }

    fn as_set<'a>(key: &str, value: &'a BrainValue) -> ReactResult<&'a BTreeSet<String>> {
        match value {
            BrainValue::Set(set) => Ok(set),
            other => Err(Self::wrong_kind(key, "set", other)),
        }
    }
}

impl Default for MemoryBrain {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn set(&self, key: &str, value: String) -> ReactResult<()> {
        let mut data = self.data.write().await;
        if let Some(existing) = data.get(key) {
            if !matches!(existing, BrainValue::Text(_)) {
                return Err(Self::wrong_kind(key, "text", existing));
            }
        }
        data.insert(key.to_string(), BrainValue::Text(value));
        Ok(())
    }

    async fn get(&self, key: &str) -> ReactResult<Option<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            None => Ok(None),
            Some(BrainValue::Text(text)) => Ok(Some(text.clone())),
            Some(BrainValue::Counter(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(Self::wrong_kind(key, "text", other)),
        }
    }

    async fn delete(&self, key: &str) -> ReactResult<()> {
        self.data.write().await.remove(key);
        Ok(())
    }

    async fn add_to_set(&self, key: &str, member: String) -> ReactResult<bool> {
        let mut data = self.data.write().await;
        let value = data
            .entry(key.to_string())
            .or_insert_with(|| BrainValue::Set(BTreeSet::new()));
        match value {
            BrainValue::Set(set) => Ok(set.insert(member)),
            other => Err(Self::wrong_kind(key, "set", other)),
        }
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> ReactResult<bool> {
        let mut data = self.data.write().await;
        let Some(value) = data.get_mut(key) else {
            return Ok(false);
        };
        let (removed, now_empty) = match value {
            BrainValue::Set(set) => (set.remove(member), set.is_empty()),
            other => return Err(Self::wrong_kind(key, "set", other)),
        };
        if now_empty {
            data.remove(key);
        }
        Ok(removed)
    }

    async fn random_member(&self, key: &str) -> ReactResult<Option<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            None => Ok(None),
            Some(value) => {
                let set = Self::as_set(key, value)?;
                Ok(set.iter().choose(&mut rand::thread_rng()).cloned())
            }
        }
    }

    async fn set_size(&self, key: &str) -> ReactResult<usize> {
        let data = self.data.read().await;
        match data.get(key) {
            None => Ok(0),
            Some(value) => Ok(Self::as_set(key, value)?.len()),
        }
    }

    async fn set_members(&self, key: &str) -> ReactResult<Vec<String>> {
        let data = self.data.read().await;
        match data.get(key) {
            None => Ok(Vec::new()),
            Some(value) => Ok(Self::as_set(key, value)?.iter().cloned().collect()),
        }
    }

    async fn increment_by(&self, key: &str, by: i64) -> ReactResult<i64> {
        let mut data = self.data.write().await;
        let value = data
            .entry(key.to_string())
            .or_insert(BrainValue::Counter(0));
        match value {
            BrainValue::Counter(n) => {
                *n = n.saturating_add(by);
                Ok(*n)
            }
            other => Err(Self::wrong_kind(key, "counter", other)),
        }
    }

    async fn keys_matching(&self, pattern: &str) -> ReactResult<Vec<String>> {
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter(|key| glob_match(pattern, key))
            .cloned()
            .collect())
    }

    async fn exists(&self, key: &str) -> ReactResult<bool> {
        Ok(self.data.read().await.contains_key(key))
    }
}
