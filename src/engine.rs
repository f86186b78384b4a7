//! Reaction engine: Ties matching, throttling, selection and bookkeeping
//! together, and owns the authoring operations.
//!
//! Every public operation holds one engine-wide lock for its whole duration,
//! so the read-modify-write sequences on the brain (bound enforcement, usage
//! counters, the last-used slot) never interleave.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::brain::{self, Brain};
use crate::clock::{Clock, SystemClock};
use crate::config::ReactConfig;
use crate::error::{ReactError, ReactResult};
use crate::ledger::UsageLedger;
use crate::matcher::Matcher;
use crate::random::{RandomSource, ThreadRandom};
use crate::stemmer::{PorterStemmer, Stemmer};
use crate::store::{BucketKey, TermRecord, TermStore};
use crate::throttle::ThrottlePolicy;

/// Result of a training request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrainOutcome {
    Learned(TermRecord),
    /// The term had no usable stems.
    Rejected { term: String },
}

/// Result of undoing the last reaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    Forgotten(TermRecord),
    NothingToUndo,
}

#[derive(Debug, Default)]
struct EngineState {
    last_used: Option<TermRecord>,
}

pub struct ReactionEngine {
    config: ReactConfig,
    store: TermStore,
    matcher: Matcher,
    ledger: UsageLedger,
    throttle: ThrottlePolicy,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
    state: Mutex<EngineState>,
}

impl ReactionEngine {
    /// Engine with the default stemmer, thread randomness and system clock.
    pub fn new(brain: Arc<dyn Brain>, config: ReactConfig) -> Self {
        EngineBuilder::new(brain).config(config).build()
    }

    /// Open the brain named by `config` (see [`brain::open_configured`]) and
    /// return an initialised engine on it.
    pub async fn open(config: ReactConfig) -> ReactResult<Self> {
        let brain = brain::open_configured(&config).await?;
        let engine = Self::new(brain, config);
        engine.init().await?;
        Ok(engine)
    }

    pub fn builder(brain: Arc<dyn Brain>) -> EngineBuilder {
        EngineBuilder::new(brain)
    }

    pub fn config(&self) -> &ReactConfig {
        &self.config
    }

    pub fn store(&self) -> &TermStore {
        &self.store
    }

    pub fn ledger(&self) -> &UsageLedger {
        &self.ledger
    }

    pub fn throttle(&self) -> &ThrottlePolicy {
        &self.throttle
    }

    pub fn random(&self) -> &Arc<dyn RandomSource> {
        &self.random
    }

    /// Bring a freshly loaded brain back under the configured bound,
    /// rebuilding the term index first when the brain holds buckets that no
    /// index lists. Returns the number of evicted records.
    pub async fn init(&self) -> ReactResult<usize> {
        let _state = self.state.lock().await;
        if self.store.needs_reindex().await? {
            self.store.rebuild_index().await?;
        }
        let evicted = self.store.enforce_bound().await?;
        tracing::info!(
            evicted = evicted.len(),
            store_size = self.config.store_size,
            "reaction engine ready"
        );
        Ok(evicted.len())
    }

    /// Candidate buckets for `text`, without touching any counters.
    pub async fn search(&self, text: &str) -> ReactResult<Vec<BucketKey>> {
        let _state = self.state.lock().await;
        self.matcher.search(&self.store, text).await
    }

    /// Passive path: the response to emit for `text`, if any.
    ///
    /// Failures are logged and produce no reply.
    pub async fn react(&self, text: &str) -> Option<String> {
        match self.try_react(text).await {
            Ok(record) => record.map(|r| r.response),
            Err(e) => {
                tracing::warn!(error = %e, "reaction skipped");
                None
            }
        }
    }

    /// Like [`react`](Self::react) but returns the emitted record and
    /// surfaces store failures.
    pub async fn try_react(&self, text: &str) -> ReactResult<Option<TermRecord>> {
        let mut state = self.state.lock().await;

        let candidates = self.matcher.search(&self.store, text).await?;

        if self.config.count_before_throttle {
            self.count_candidates(&candidates).await?;
        }

        let now = self.clock.now();
        let mut survivors = Vec::with_capacity(candidates.len());
        for candidate in &candidates {
            if !self
                .throttle
                .should_throttle(&self.ledger, &candidate.term_key(), now)
                .await
            {
                survivors.push(candidate.clone());
            }
        }

        if !self.config.count_before_throttle {
            self.count_candidates(&candidates).await?;
        }
        self.ledger.increment_message_count().await?;

        let Some(record) = self.pick(survivors).await? else {
            tracing::debug!(candidates = candidates.len(), "no reaction");
            return Ok(None);
        };

        self.ledger.record_emission(&record, now).await?;
        tracing::debug!(term = %record.term, bucket = %record.bucket_key(), "reacting");
        state.last_used = Some(record.clone());
        Ok(Some(record))
    }

    async fn count_candidates(&self, candidates: &[BucketKey]) -> ReactResult<()> {
        for candidate in candidates {
            self.ledger
                .increment_term_usage(&candidate.term_key())
                .await?;
        }
        Ok(())
    }

    /// Uniform bucket, then a uniform record within it.
    async fn pick(&self, mut buckets: Vec<BucketKey>) -> ReactResult<Option<TermRecord>> {
        while !buckets.is_empty() {
            let idx = self.random.index(buckets.len());
            let records = self.store.bucket_records(&buckets[idx]).await?;
            if records.is_empty() {
                buckets.swap_remove(idx);
                continue;
            }
            let chosen = self.random.index(records.len());
            return Ok(records.into_iter().nth(chosen));
        }
        Ok(None)
    }

    /// Learn to answer `term` with `response`.
    pub async fn train(&self, term: &str, response: &str) -> ReactResult<TrainOutcome> {
        let _state = self.state.lock().await;
        match self.store.add(term, response).await {
            Ok(record) => Ok(TrainOutcome::Learned(record)),
            Err(ReactError::TrivialTerm { term }) => {
                tracing::info!(term = %term, "rejected trivial term");
                Ok(TrainOutcome::Rejected { term })
            }
            Err(e) => Err(e),
        }
    }

    /// Forget the record behind the last reaction.
    ///
    /// On a store failure the slot is kept so the undo can be retried.
    pub async fn undo_last(&self) -> ReactResult<UndoOutcome> {
        let mut state = self.state.lock().await;
        let Some(record) = state.last_used.clone() else {
            return Ok(UndoOutcome::NothingToUndo);
        };
        self.store.remove(&record).await?;
        state.last_used = None;
        tracing::info!(term = %record.term, response = %record.response, "forgot term");
        Ok(UndoOutcome::Forgotten(record))
    }

    /// The record behind the last reaction, if still remembered.
    pub async fn what_was_that(&self) -> Option<TermRecord> {
        self.state.lock().await.last_used.clone()
    }
}

/// Assembles a [`ReactionEngine`] with optional collaborator overrides.
pub struct EngineBuilder {
    brain: Arc<dyn Brain>,
    config: ReactConfig,
    stemmer: Arc<dyn Stemmer>,
    random: Arc<dyn RandomSource>,
    clock: Arc<dyn Clock>,
}

impl EngineBuilder {
    pub fn new(brain: Arc<dyn Brain>) -> Self {
        Self {
            brain,
            config: ReactConfig::default(),
            stemmer: Arc::new(PorterStemmer::new()),
            random: Arc::new(ThreadRandom),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn config(mut self, config: ReactConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stemmer(mut self, stemmer: Arc<dyn Stemmer>) -> Self {
        self.stemmer = stemmer;
        self
    }

    pub fn random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> ReactionEngine {
        let store = TermStore::new(
            self.brain.clone(),
            self.stemmer.clone(),
            self.random.clone(),
            self.config.store_size,
        );
        ReactionEngine {
            matcher: Matcher::new(self.stemmer),
            ledger: UsageLedger::new(self.brain),
            throttle: ThrottlePolicy::from_config(&self.config),
            store,
            random: self.random,
            clock: self.clock,
            config: self.config,
            state: Mutex::new(EngineState::default()),
        }
    }
}
