//! Throttle policy: Frequency-decayed cooldown per term.
//!
//! ```text
//! multiplier = m ^ ((total + term) / total) - m / 2
//! cooldown   = round(base * multiplier) seconds
//! throttled  = last_used + cooldown > now
//! ```
//!
//! `total` is the global message count and `term` how often the term has been
//! a candidate, so triggers that fire on a large share of traffic earn
//! longer cooldowns while rare ones cool down fast.

use chrono::{DateTime, Duration, Utc};

use crate::config::ReactConfig;
use crate::ledger::UsageLedger;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottlePolicy {
    base_expiration_secs: u64,
    frequency_multiplier: f64,
}

impl ThrottlePolicy {
    pub fn new(base_expiration_secs: u64, frequency_multiplier: f64) -> Self {
        Self {
            base_expiration_secs,
            frequency_multiplier,
        }
    }

    pub fn from_config(config: &ReactConfig) -> Self {
        Self::new(
            config.throttle_base_expiration_secs,
            config.throttle_frequency_multiplier,
        )
    }

    /// Cooldown for a term seen `term_count` times out of `total_count`
    /// messages. Missing or non-positive totals count as one message.
    pub fn cooldown_seconds(&self, total_count: i64, term_count: i64) -> i64 {
        let total = if total_count <= 0 { 1.0 } else { total_count as f64 };
        let term = term_count.max(0) as f64;
        let m = self.frequency_multiplier;
        let multiplier = m.powf((total + term) / total) - m / 2.0;
        let cooldown = (self.base_expiration_secs as f64 * multiplier).round();
        if cooldown.is_finite() {
            cooldown.clamp(i64::MIN as f64, i64::MAX as f64) as i64
        } else if cooldown > 0.0 {
            i64::MAX
        } else {
            0
        }
    }

    /// Pure decision from already-read ledger values.
    pub fn is_throttled(
        &self,
        last_used: Option<DateTime<Utc>>,
        total_count: i64,
        term_count: i64,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last_used) = last_used else {
            return false;
        };
        let cooldown = self.cooldown_seconds(total_count, term_count);
        if cooldown <= 0 {
            return false;
        }
        match Duration::try_seconds(cooldown).and_then(|d| last_used.checked_add_signed(d)) {
            Some(expires) => expires > now,
            // Overflowing cooldowns never expire.
            None => true,
        }
    }

    /// Whether `term_key` is still cooling down. Ledger failures fail open.
    pub async fn should_throttle(
        &self,
        ledger: &UsageLedger,
        term_key: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let reads = async {
            let last_used = ledger.last_used(term_key).await?;
            let total = ledger.message_count().await?;
            let term = ledger.term_usage(term_key).await?;
            Ok::<_, crate::error::ReactError>((last_used, total, term))
        };

        match reads.await {
            Ok((last_used, total, term)) => {
                let throttled = self.is_throttled(last_used, total, term, now);
                tracing::debug!(term_key, total, term, throttled, "throttle check");
                throttled
            }
            Err(e) => {
                tracing::warn!(term_key, error = %e, "throttle check failed, not throttling");
                false
            }
        }
    }
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self::from_config(&ReactConfig::default())
    }
}
