// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Sliding-window rate limiter for form submissions.
//!
//! Each limiter guards one logical action ("checkout", "newsletter",
//! "login") and persists its attempt timestamps in a [`KeyValueStore`] under
//! a namespaced key, so the limit holds across page reloads or process
//! restarts:
//!
//! ```json
//! { "attempts": [1767225600000, 1767225601000] }
//! ```
//!
//! Only timestamps younger than the window count. Stale entries are skipped
//! on read and dropped the next time an attempt is recorded.
//!
//! This is a courtesy control against double-submits and casual abuse, not a
//! security boundary: the store is fully client-controlled. Storage failures
//! therefore fail open. An unreadable or corrupt record reads as empty and a
//! failed write is logged and ignored.
//!
//! Two handles sharing one store (two browser tabs, two processes on one
//! `FileStore`) can both pass the check before either records its attempt,
//! briefly exceeding the limit. There is no cross-handle lock.

use crate::clock::Clock;
use crate::config::RateLimitRule;
use crate::error::StoreError;
use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Namespace applied to limiter keys unless overridden.
pub const DEFAULT_KEY_PREFIX: &str = "rate_limit_";

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitStatus {
    /// Whether another attempt would be admitted
    pub allowed: bool,
    /// Attempts left in the current window
    pub remaining: u32,
    /// Milliseconds until the oldest live attempt leaves the window (0 if none)
    pub reset_in_ms: u64,
}

impl RateLimitStatus {
    /// Time until the oldest live attempt expires.
    pub fn reset_in(&self) -> Duration {
        Duration::from_millis(self.reset_in_ms)
    }

    /// Whole seconds to wait, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        self.reset_in_ms.div_ceil(1_000)
    }

    /// Whole minutes to wait, rounded up. Used for the "try again in N
    /// minutes" banner.
    pub fn retry_after_minutes(&self) -> u64 {
        self.reset_in_ms.div_ceil(60_000)
    }
}

/// Persisted attempt list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitRecord {
    pub attempts: Vec<u64>,
}

impl RateLimitRecord {
    /// Parse a stored record. Anything that is not an object with an
    /// `attempts` array reads as empty; non-integer entries are skipped.
    pub fn parse(raw: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(raw).ok()?;
        let attempts = value.as_object()?.get("attempts")?.as_array()?;
        Some(Self {
            attempts: attempts.iter().filter_map(Value::as_u64).collect(),
        })
    }
}

/// Sliding-window attempt counter for one action.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    key: String,
    storage_key: String,
    rule: RateLimitRule,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter admitting `max_attempts` per `window_ms` for `key`.
    pub fn new(
        key: impl Into<String>,
        max_attempts: u32,
        window_ms: u64,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::from_rule(key, RateLimitRule::new(max_attempts, window_ms), store, clock)
    }

    /// Create a limiter from a configured rule.
    pub fn from_rule(
        key: impl Into<String>,
        rule: RateLimitRule,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let key = key.into();
        Self {
            storage_key: format!("{DEFAULT_KEY_PREFIX}{key}"),
            key,
            rule,
            store,
            clock,
        }
    }

    /// Use a different store namespace than [`DEFAULT_KEY_PREFIX`].
    pub fn with_key_prefix(mut self, prefix: &str) -> Self {
        self.storage_key = format!("{prefix}{}", self.key);
        self
    }

    /// Logical action name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key the record is stored under.
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    /// Report whether an attempt would be admitted. Never writes.
    pub fn check(&self) -> RateLimitStatus {
        let now = self.clock.now_ms();
        let live = self.live_attempts(now);
        self.status(now, &live)
    }

    /// Record an attempt if the window has room. Returns whether the action
    /// is permitted; a refused attempt writes nothing.
    pub fn attempt(&self) -> bool {
        let now = self.clock.now_ms();
        let mut live = self.live_attempts(now);

        if !self.status(now, &live).allowed {
            info!(
                key = %self.key,
                max_attempts = self.rule.max_attempts,
                window_ms = self.rule.window_ms,
                "Rate limit reached"
            );
            return false;
        }

        live.push(now);
        self.save(&RateLimitRecord { attempts: live });
        true
    }

    /// Drop the record for this key.
    pub fn reset(&self) {
        if let Err(e) = self.store.remove(&self.storage_key) {
            warn!(key = %self.storage_key, error = %e, "Failed to clear rate limit record");
        } else {
            debug!(key = %self.storage_key, "Rate limit record cleared");
        }
    }

    fn status(&self, now: u64, live: &[u64]) -> RateLimitStatus {
        let count = u32::try_from(live.len()).unwrap_or(u32::MAX);
        let reset_in_ms = live
            .iter()
            .min()
            .map(|oldest| {
                self.rule
                    .window_ms
                    .saturating_sub(now.saturating_sub(*oldest))
            })
            .unwrap_or(0);

        RateLimitStatus {
            allowed: count < self.rule.max_attempts,
            remaining: self.rule.max_attempts.saturating_sub(count),
            reset_in_ms,
        }
    }

    /// Attempts still inside the window, in stored order.
    fn live_attempts(&self, now: u64) -> Vec<u64> {
        let raw = match self.store.get(&self.storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(key = %self.storage_key, error = %e, "Failed to read rate limit record, treating as empty");
                return Vec::new();
            }
        };

        let Some(record) = RateLimitRecord::parse(&raw) else {
            warn!(key = %self.storage_key, "Corrupt rate limit record, treating as empty");
            return Vec::new();
        };

        record
            .attempts
            .into_iter()
            .filter(|ts| now.saturating_sub(*ts) < self.rule.window_ms)
            .collect()
    }

    fn save(&self, record: &RateLimitRecord) {
        let result = serde_json::to_string(record)
            .map_err(StoreError::from)
            .and_then(|raw| self.store.set(&self.storage_key, &raw));

        match result {
            Ok(()) => debug!(
                key = %self.storage_key,
                live = record.attempts.len(),
                "Attempt recorded"
            ),
            Err(e) => warn!(key = %self.storage_key, error = %e, "Failed to persist attempt, dropping it"),
        }
    }
}
