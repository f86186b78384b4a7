//! Matcher: Finds the stored terms an incoming message triggers.
//!
//! Two independent branches feed one candidate set:
//!
//! 1. **Stemmed**: the message is stemmed into `S`; for every stem the prefix
//!    index yields the stored keys starting with it, and a key matches when
//!    its whole stem sequence appears contiguously in `S` at that position.
//!    Terms therefore trigger anywhere in a message, not only at its start.
//! 2. **Raw**: every non-word key that is a substring of the lowercased
//!    message.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::ReactResult;
use crate::stemmer::{is_word_like, Stemmer};
use crate::store::{BucketKey, TermStore};

pub struct Matcher {
    stemmer: Arc<dyn Stemmer>,
}

impl Matcher {
    pub fn new(stemmer: Arc<dyn Stemmer>) -> Self {
        Self { stemmer }
    }

    /// Candidate buckets for `text`, sorted and without duplicates.
    pub async fn search(&self, store: &TermStore, text: &str) -> ReactResult<Vec<BucketKey>> {
        let lowered = text.to_lowercase();
        let sizes = store.all_term_sizes().await?;
        let live = |size: usize| sizes.get(&size).copied().unwrap_or(0) > 0;

        let mut found = BTreeSet::new();

        if is_word_like(&lowered) && sizes.iter().any(|(&size, &count)| size > 0 && count > 0) {
            let stems = self.stemmer.tokenize_and_stem(&lowered);
            let mut positions: HashMap<&str, Vec<usize>> = HashMap::new();
            for (i, stem) in stems.iter().enumerate() {
                positions.entry(stem.as_str()).or_default().push(i);
            }

            for (stem, starts) in &positions {
                for key in store.stemmed_keys_starting_with(stem).await? {
                    let bucket = BucketKey::stemmed(key);
                    let key_stems = bucket.stems();
                    if !live(key_stems.len()) {
                        continue;
                    }
                    let hit = starts.iter().any(|&i| {
                        key_stems.len() <= stems.len() - i
                            && stems[i..i + key_stems.len()]
                                .iter()
                                .zip(&key_stems)
                                .all(|(a, b)| a.as_str() == *b)
                    });
                    if hit {
                        found.insert(bucket);
                    }
                }
            }
        }

        if live(0) {
            for key in store.raw_keys().await? {
                if !key.is_empty() && lowered.contains(key.as_str()) {
                    found.insert(BucketKey::raw(key));
                }
            }
        }

        tracing::debug!(candidates = found.len(), "matched message");
        Ok(found.into_iter().collect())
    }
}
