//! Term store: Bounded buckets of learned (trigger → response) records.
//!
//! Records live in brain sets (`bucket:<namespace>:<key>`, one JSON-encoded
//! [`TermRecord`] per member). The store keeps its own index next to them so
//! lookups never scan the key space:
//!
//! | Key | Kind | Content |
//! |-----|------|---------|
//! | `index:stemmed` | set | live stemmed bucket keys |
//! | `index:raw` | set | live raw bucket keys |
//! | `index:prefix:<stem>` | set | stemmed keys whose first stem is `<stem>` |
//! | `index:term-sizes` | set | stem counts seen so far |
//! | `term-sizes:<n>` | counter | records whose stem count is `n` |

mod record;

pub use record::{BucketKey, Namespace, TermRecord};

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::brain::Brain;
use crate::error::{ReactError, ReactResult};
use crate::random::RandomSource;
use crate::stemmer::{is_word_like, Stemmer};

const BUCKET_PREFIX: &str = "bucket:";
const INDEX_STEMMED: &str = "index:stemmed";
const INDEX_RAW: &str = "index:raw";
const INDEX_PREFIX: &str = "index:prefix:";
const INDEX_TERM_SIZES: &str = "index:term-sizes";
const TERM_SIZES: &str = "term-sizes:";

fn bucket_storage_key(bucket: &BucketKey) -> String {
    format!("{BUCKET_PREFIX}{bucket}")
}

fn namespace_index(namespace: Namespace) -> &'static str {
    match namespace {
        Namespace::Stemmed => INDEX_STEMMED,
        Namespace::Raw => INDEX_RAW,
    }
}

fn prefix_index(stem: &str) -> String {
    format!("{INDEX_PREFIX}{stem}")
}

fn term_size_key(size: usize) -> String {
    format!("{TERM_SIZES}{size}")
}

pub struct TermStore {
    brain: Arc<dyn Brain>,
    stemmer: Arc<dyn Stemmer>,
    random: Arc<dyn RandomSource>,
    store_size: usize,
}

impl TermStore {
    pub fn new(
        brain: Arc<dyn Brain>,
        stemmer: Arc<dyn Stemmer>,
        random: Arc<dyn RandomSource>,
        store_size: usize,
    ) -> Self {
        Self {
            brain,
            stemmer,
            random,
            store_size,
        }
    }

    pub fn store_size(&self) -> usize {
        self.store_size
    }

    pub fn brain(&self) -> &Arc<dyn Brain> {
        &self.brain
    }

    pub fn stemmer(&self) -> &Arc<dyn Stemmer> {
        &self.stemmer
    }

    /// Classify and stem `term` without storing anything.
    pub fn build_record(&self, term: &str, response: &str) -> ReactResult<TermRecord> {
        let term = term.trim();
        if term.is_empty() {
            return Err(ReactError::TrivialTerm {
                term: term.to_string(),
            });
        }

        let (stems, stem_key) = if is_word_like(term) {
            let stems = self.stemmer.tokenize_and_stem(term);
            if stems.is_empty() {
                return Err(ReactError::TrivialTerm {
                    term: term.to_string(),
                });
            }
            let key = stems.join(",");
            (stems, key)
        } else {
            (Vec::new(), term.to_lowercase())
        };

        Ok(TermRecord {
            term: term.to_string(),
            response: response.to_string(),
            stems,
            stem_key,
        })
    }

    /// Learn a new association, then trim the store back under its bound.
    pub async fn add(&self, term: &str, response: &str) -> ReactResult<TermRecord> {
        let record = self.build_record(term, response)?;
        self.insert(&record).await?;
        self.enforce_bound().await?;
        Ok(record)
    }

    /// Insert without enforcing the bound. Returns `false` for duplicates.
    ///
    /// Index entries go in before the bucket member, so a failure part way
    /// leaves at worst an index entry for an empty bucket and a retry
    /// completes the insert. The size counter is bumped up front and taken
    /// back for duplicates; after a failure it can only overcount.
    async fn insert(&self, record: &TermRecord) -> ReactResult<bool> {
        let bucket = record.bucket_key();
        let member = serde_json::to_string(record)?;
        let size = record.stems.len();

        self.brain
            .add_to_set(namespace_index(bucket.namespace), bucket.key.clone())
            .await?;
        if let Some(first) = record.stems.first() {
            self.brain
                .add_to_set(&prefix_index(first), bucket.key.clone())
                .await?;
        }
        self.brain
            .add_to_set(INDEX_TERM_SIZES, size.to_string())
            .await?;
        self.brain.increment_by(&term_size_key(size), 1).await?;

        let added = self
            .brain
            .add_to_set(&bucket_storage_key(&bucket), member)
            .await?;
        if !added {
            self.brain.increment_by(&term_size_key(size), -1).await?;
            return Ok(false);
        }

        tracing::info!(term = %record.term, bucket = %bucket, "learned term");
        Ok(true)
    }

    /// Forget `record` from both namespaces. Returns whether anything was
    /// removed; removing an unknown record is not an error.
    pub async fn remove(&self, record: &TermRecord) -> ReactResult<bool> {
        let member = serde_json::to_string(record)?;
        let mut removed = false;
        for bucket in [
            BucketKey::stemmed(record.stem_key.clone()),
            BucketKey::raw(record.stem_key.clone()),
        ] {
            if self.remove_member(&bucket, &member).await?.is_some() {
                removed = true;
            }
        }
        Ok(removed)
    }

    /// Remove one encoded member from a bucket and keep the index in step.
    async fn remove_member(
        &self,
        bucket: &BucketKey,
        member: &str,
    ) -> ReactResult<Option<TermRecord>> {
        let storage_key = bucket_storage_key(bucket);
        if !self.brain.remove_from_set(&storage_key, member).await? {
            return Ok(None);
        }

        if self.brain.set_size(&storage_key).await? == 0 {
            self.brain
                .remove_from_set(namespace_index(bucket.namespace), &bucket.key)
                .await?;
            if let Some(first) = bucket.stems().first() {
                self.brain
                    .remove_from_set(&prefix_index(first), &bucket.key)
                    .await?;
            }
        }

        match serde_json::from_str::<TermRecord>(member) {
            Ok(record) => {
                self.brain
                    .increment_by(&term_size_key(record.stems.len()), -1)
                    .await?;
                Ok(Some(record))
            }
            Err(e) => {
                tracing::warn!(bucket = %bucket, error = %e, "removed undecodable record");
                Ok(None)
            }
        }
    }

    /// Evict uniformly random records until the total fits `store_size`.
    ///
    /// Each round picks a random non-empty bucket, then a random record in
    /// it, so old and fresh terms have the same odds. Returns what was
    /// evicted.
    pub async fn enforce_bound(&self) -> ReactResult<Vec<TermRecord>> {
        let mut sizes: Vec<(BucketKey, usize)> = Vec::new();
        for bucket in self.buckets().await? {
            let size = self.brain.set_size(&bucket_storage_key(&bucket)).await?;
            if size > 0 {
                sizes.push((bucket, size));
            }
        }

        let total: usize = sizes.iter().map(|(_, size)| size).sum();
        if total <= self.store_size {
            return Ok(Vec::new());
        }

        let excess = total - self.store_size;
        let mut evicted = Vec::with_capacity(excess);
        let mut removed = 0;
        while removed < excess && !sizes.is_empty() {
            let idx = self.random.index(sizes.len());
            let bucket = sizes[idx].0.clone();
            let members = self.brain.set_members(&bucket_storage_key(&bucket)).await?;
            if members.is_empty() {
                sizes.swap_remove(idx);
                continue;
            }

            let member = &members[self.random.index(members.len())];
            if let Some(record) = self.remove_member(&bucket, member).await? {
                tracing::info!(term = %record.term, bucket = %bucket, "evicted term");
                evicted.push(record);
            }
            removed += 1;

            sizes[idx].1 -= 1;
            if sizes[idx].1 == 0 {
                sizes.swap_remove(idx);
            }
        }

        tracing::debug!(total, limit = self.store_size, evicted = removed, "enforced store bound");
        Ok(evicted)
    }

    /// Record count per stem length (`0` is the raw namespace).
    pub async fn all_term_sizes(&self) -> ReactResult<BTreeMap<usize, i64>> {
        let mut sizes = BTreeMap::new();
        for raw in self.brain.set_members(INDEX_TERM_SIZES).await? {
            let Ok(size) = raw.parse::<usize>() else {
                continue;
            };
            let count = self
                .brain
                .get(&term_size_key(size))
                .await?
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(0);
            sizes.insert(size, count);
        }
        Ok(sizes)
    }

    /// Every live bucket, stemmed first.
    pub async fn buckets(&self) -> ReactResult<Vec<BucketKey>> {
        let mut buckets: Vec<BucketKey> = self
            .brain
            .set_members(INDEX_STEMMED)
            .await?
            .into_iter()
            .map(BucketKey::stemmed)
            .collect();
        buckets.extend(
            self.brain
                .set_members(INDEX_RAW)
                .await?
                .into_iter()
                .map(BucketKey::raw),
        );
        Ok(buckets)
    }

    /// Stemmed bucket keys whose first stem is `stem`.
    pub async fn stemmed_keys_starting_with(&self, stem: &str) -> ReactResult<Vec<String>> {
        self.brain.set_members(&prefix_index(stem)).await
    }

    pub async fn raw_keys(&self) -> ReactResult<Vec<String>> {
        self.brain.set_members(INDEX_RAW).await
    }

    pub async fn bucket_records(&self, bucket: &BucketKey) -> ReactResult<Vec<TermRecord>> {
        let members = self.brain.set_members(&bucket_storage_key(bucket)).await?;
        let mut records = Vec::with_capacity(members.len());
        for member in members {
            match serde_json::from_str::<TermRecord>(&member) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(bucket = %bucket, error = %e, "skipping undecodable record"),
            }
        }
        Ok(records)
    }

    pub async fn total_records(&self) -> ReactResult<usize> {
        let mut total = 0;
        for bucket in self.buckets().await? {
            total += self.brain.set_size(&bucket_storage_key(&bucket)).await?;
        }
        Ok(total)
    }

    /// True when buckets exist but neither namespace index lists any, as
    /// with a brain written before the index existed.
    pub async fn needs_reindex(&self) -> ReactResult<bool> {
        if self.brain.set_size(INDEX_STEMMED).await? > 0 || self.brain.set_size(INDEX_RAW).await? > 0 {
            return Ok(false);
        }
        Ok(!self
            .brain
            .keys_matching(&format!("{BUCKET_PREFIX}*"))
            .await?
            .is_empty())
    }

    /// Rebuild the index from the bucket keys themselves.
    ///
    /// Only needed for brains whose buckets were written without the index
    /// (or whose index was lost). Returns the number of buckets indexed.
    pub async fn rebuild_index(&self) -> ReactResult<usize> {
        for key in self.brain.keys_matching("index:*").await? {
            self.brain.delete(&key).await?;
        }
        for key in self.brain.keys_matching(&format!("{TERM_SIZES}*")).await? {
            self.brain.delete(&key).await?;
        }

        let mut indexed = 0;
        for storage_key in self.brain.keys_matching(&format!("{BUCKET_PREFIX}*")).await? {
            let Some(bucket) = storage_key
                .strip_prefix(BUCKET_PREFIX)
                .and_then(BucketKey::parse)
            else {
                tracing::warn!(key = %storage_key, "ignoring unrecognised bucket key");
                continue;
            };

            let records = self.bucket_records(&bucket).await?;
            if records.is_empty() {
                continue;
            }

            self.brain
                .add_to_set(namespace_index(bucket.namespace), bucket.key.clone())
                .await?;
            if let Some(first) = bucket.stems().first() {
                self.brain
                    .add_to_set(&prefix_index(first), bucket.key.clone())
                    .await?;
            }
            for record in &records {
                let size = record.stems.len();
                self.brain
                    .add_to_set(INDEX_TERM_SIZES, size.to_string())
                    .await?;
                self.brain.increment_by(&term_size_key(size), 1).await?;
            }
            indexed += 1;
        }

        tracing::info!(buckets = indexed, "rebuilt term index");
        Ok(indexed)
    }
}
