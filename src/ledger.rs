//! Usage ledger: When and how often terms and responses were used.
//!
//! Keys written to the brain:
//!
//! - `term-last-used:<term key>`: RFC 3339 timestamp of the last emission
//! - `term-usage:<term key>`: times the term was a match candidate
//! - `response-usage:<term key>:<response>`: times a response was emitted
//! - `message-count`: messages processed

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::brain::Brain;
use crate::error::ReactResult;
use crate::store::TermRecord;

const LAST_USED: &str = "term-last-used:";
const TERM_USAGE: &str = "term-usage:";
const RESPONSE_USAGE: &str = "response-usage:";
const MESSAGE_COUNT: &str = "message-count";

pub struct UsageLedger {
    brain: Arc<dyn Brain>,
}

impl UsageLedger {
    pub fn new(brain: Arc<dyn Brain>) -> Self {
        Self { brain }
    }

    pub async fn last_used(&self, term_key: &str) -> ReactResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.brain.get(&format!("{LAST_USED}{term_key}")).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => Ok(Some(at.with_timezone(&Utc))),
            Err(e) => {
                tracing::warn!(term_key, error = %e, "ignoring malformed last-used timestamp");
                Ok(None)
            }
        }
    }

    pub async fn term_usage(&self, term_key: &str) -> ReactResult<i64> {
        self.counter(&format!("{TERM_USAGE}{term_key}")).await
    }

    pub async fn message_count(&self) -> ReactResult<i64> {
        self.counter(MESSAGE_COUNT).await
    }

    pub async fn response_usage(&self, record: &TermRecord) -> ReactResult<i64> {
        self.counter(&response_usage_key(record)).await
    }

    /// Note that `term_key` appeared as a candidate.
    pub async fn increment_term_usage(&self, term_key: &str) -> ReactResult<i64> {
        self.brain
            .increment_by(&format!("{TERM_USAGE}{term_key}"), 1)
            .await
    }

    pub async fn increment_message_count(&self) -> ReactResult<i64> {
        self.brain.increment_by(MESSAGE_COUNT, 1).await
    }

    /// Stamp the term as just used and count the response.
    pub async fn record_emission(&self, record: &TermRecord, at: DateTime<Utc>) -> ReactResult<()> {
        let term_key = record.bucket_key().term_key();
        self.brain
            .set(&format!("{LAST_USED}{term_key}"), at.to_rfc3339())
            .await?;
        self.brain
            .increment_by(&response_usage_key(record), 1)
            .await?;
        Ok(())
    }

    async fn counter(&self, key: &str) -> ReactResult<i64> {
        Ok(self
            .brain
            .get(key)
            .await?
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(0))
    }
}

fn response_usage_key(record: &TermRecord) -> String {
    format!("{RESPONSE_USAGE}{}:{}", record.bucket_key(), record.response)
}
