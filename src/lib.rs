//! # react-core
//!
//! Term-triggered response engine for chat bots: teach it
//! `trigger → response` pairs, feed it chat messages, and it answers when a
//! message contains a known trigger. Replies are throttled per trigger with a
//! cooldown that grows with how often the trigger shows up.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use react_core::brain::MemoryBrain;
//! use react_core::config::ReactConfig;
//! use react_core::engine::ReactionEngine;
//!
//! # async fn example() -> react_core::error::ReactResult<()> {
//! let engine = ReactionEngine::new(Arc::new(MemoryBrain::new()), ReactConfig::from_env()?);
//! engine.init().await?;
//!
//! engine.train("foo bar", "baz").await?;
//! assert_eq!(engine.react("the big foo bar thing").await, Some("baz".into()));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`brain`] | Key-value collaborator trait, in-memory and JSON snapshot backends |
//! | [`stemmer`] | Tokenizing, stopwords, Snowball English stemming, word-like test |
//! | [`store`] | Bounded term buckets with an explicit index and random eviction |
//! | [`ledger`] | Last-used timestamps, usage counters, global message count |
//! | [`matcher`] | Stemmed n-gram matching anywhere in a message plus raw substring matching |
//! | [`throttle`] | Frequency-decayed cooldown per trigger |
//! | [`engine`] | Orchestration, authoring operations, last reaction slot |
//! | [`chat`] | Command parsing, reply templates, transport trait, message routing |
//! | [`config`] | `REACT_*` environment configuration |
//! | [`error`] | Error types with thiserror: TrivialTerm, StoreUnavailable, Config, etc. |
//!
//! ## Matching
//!
//! Word-like triggers (at least one alphanumeric run of two characters) are
//! stored under their comma-joined stems and fire when that stem sequence
//! appears contiguously anywhere in a message. Everything else (`!!!`, `:-)`)
//! is stored raw and fires on a case-insensitive substring match.

pub mod brain;
pub mod chat;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod matcher;
pub mod random;
pub mod stemmer;
pub mod store;
pub mod throttle;

pub use engine::{EngineBuilder, ReactionEngine, TrainOutcome, UndoOutcome};
pub use error::{ReactError, ReactResult};
pub use store::{BucketKey, Namespace, TermRecord};
