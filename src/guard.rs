// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Form submission guard.
//!
//! Wires the pieces together in the order a form uses them:
//!
//! 1. every keystroke is screened with [`detect_xss`] and dropped if it trips
//! 2. on submit, a filled honeypot silently discards the submission
//! 3. any string field still carrying an XSS pattern rejects the submission
//! 4. the schema validates and normalizes the data
//! 5. the form's rate limiter records the attempt, or refuses it
//!
//! Guards are built once at startup ([`GuardSet::from_config`]) and handed to
//! the forms that need them.

use crate::clock::Clock;
use crate::config::Config;
use crate::honeypot::Honeypot;
use crate::limiter::{RateLimitStatus, RateLimiter};
use crate::sanitizer::detect_xss;
use crate::schema::{
    checkout_schema, join_path, login_schema, newsletter_schema, validate_form, FieldErrors,
    Schema, ValidationResult, FORM_PATH,
};
use crate::store::KeyValueStore;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The storefront forms that are guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    Newsletter,
    Checkout,
    Login,
}

impl FormKind {
    pub const ALL: [FormKind; 3] = [FormKind::Newsletter, FormKind::Checkout, FormKind::Login];

    /// Logical limiter key.
    pub fn key(&self) -> &'static str {
        match self {
            FormKind::Newsletter => "newsletter",
            FormKind::Checkout => "checkout",
            FormKind::Login => "login",
        }
    }

    fn schema(&self, clock: Arc<dyn Clock>) -> Schema {
        match self {
            FormKind::Newsletter => newsletter_schema(),
            FormKind::Checkout => checkout_schema(clock),
            FormKind::Login => login_schema(),
        }
    }
}

impl fmt::Display for FormKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FormKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormKind::ALL
            .into_iter()
            .find(|kind| kind.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown form {s:?}, expected newsletter, checkout or login"))
    }
}

/// Result of a guarded submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmissionOutcome {
    /// Passed every check; `data` is the normalized form to submit
    Accepted { data: Value },
    /// Honeypot filled. Show success, submit nothing.
    Discarded,
    /// A field carried an XSS pattern
    #[serde(rename_all = "camelCase")]
    Rejected { field: String, message_key: &'static str },
    /// Schema validation failed
    Invalid { errors: FieldErrors },
    /// Too many attempts in the window
    #[serde(rename_all = "camelCase")]
    RateLimited {
        message_key: &'static str,
        retry_after_secs: u64,
        retry_after_minutes: u64,
    },
}

impl SubmissionOutcome {
    /// Whether the user should be shown a success state. True for discarded
    /// bot submissions so the bot learns nothing.
    pub fn appears_successful(&self) -> bool {
        matches!(
            self,
            SubmissionOutcome::Accepted { .. } | SubmissionOutcome::Discarded
        )
    }

    fn rate_limited(status: &RateLimitStatus) -> Self {
        SubmissionOutcome::RateLimited {
            message_key: "errors.rateLimited",
            retry_after_secs: status.retry_after_secs(),
            retry_after_minutes: status.retry_after_minutes(),
        }
    }
}

/// Guard for one form.
#[derive(Debug, Clone)]
pub struct FormGuard {
    name: String,
    schema: Schema,
    limiter: RateLimiter,
    honeypot: Honeypot,
}

impl FormGuard {
    pub fn new(name: impl Into<String>, schema: Schema, limiter: RateLimiter) -> Self {
        Self {
            name: name.into(),
            schema,
            limiter,
            honeypot: Honeypot::new(),
        }
    }

    /// Replace the randomly chosen honeypot.
    pub fn with_honeypot(mut self, honeypot: Honeypot) -> Self {
        self.honeypot = honeypot;
        self
    }

    /// Build the guard for a stock storefront form.
    pub fn for_form(
        kind: FormKind,
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rule = match kind {
            FormKind::Newsletter => config.limits.newsletter,
            FormKind::Checkout => config.limits.checkout,
            FormKind::Login => config.limits.login,
        };
        let limiter = RateLimiter::from_rule(kind.key(), rule, store, clock.clone())
            .with_key_prefix(&config.key_prefix);
        Self::new(kind.key(), kind.schema(clock), limiter)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the hidden decoy input to render.
    pub fn honeypot_field(&self) -> &'static str {
        self.honeypot.field_name()
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Keystroke check: false means the new value must be discarded, not
    /// stored or cleaned.
    pub fn screen_keystroke(&self, field: &str, value: &str) -> bool {
        if detect_xss(value) {
            warn!(form = %self.name, field, "Keystroke rejected: XSS pattern");
            return false;
        }
        true
    }

    /// Run a submission through every check. Only an accepted submission
    /// consumes a rate-limit attempt.
    pub fn submit(&self, form: &Value) -> SubmissionOutcome {
        if !self.honeypot.validate_form(form) {
            info!(form = %self.name, "Honeypot filled, discarding submission");
            return SubmissionOutcome::Discarded;
        }

        if let Some(field) = first_xss_field("", form) {
            warn!(form = %self.name, field = %field, "Submission rejected: XSS pattern");
            return SubmissionOutcome::Rejected {
                field,
                message_key: "validation.invalidCharacters",
            };
        }

        let data = match validate_form(&self.schema, form) {
            ValidationResult::Valid(data) => data,
            ValidationResult::Invalid(errors) => {
                debug!(form = %self.name, failed = errors.len(), "Submission invalid");
                return SubmissionOutcome::Invalid { errors };
            }
        };

        if !self.limiter.attempt() {
            let status = self.limiter.check();
            info!(
                form = %self.name,
                retry_after_secs = status.retry_after_secs(),
                "Submission rate limited"
            );
            return SubmissionOutcome::rate_limited(&status);
        }

        debug!(form = %self.name, "Submission accepted");
        SubmissionOutcome::Accepted { data }
    }

    /// Current limiter state, without consuming an attempt.
    pub fn status(&self) -> RateLimitStatus {
        self.limiter.check()
    }

    /// Clear the limiter record.
    pub fn reset(&self) {
        self.limiter.reset();
    }
}

/// Dotted path of the first string leaf that trips [`detect_xss`].
fn first_xss_field(prefix: &str, value: &Value) -> Option<String> {
    match value {
        Value::String(s) if detect_xss(s) => Some(if prefix.is_empty() {
            FORM_PATH.to_string()
        } else {
            prefix.to_string()
        }),
        Value::Object(map) => map
            .iter()
            .find_map(|(key, v)| first_xss_field(&join_path(prefix, key), v)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .find_map(|(i, v)| first_xss_field(&join_path(prefix, &i.to_string()), v)),
        _ => None,
    }
}

/// The storefront's guards, one per form, sharing a store and clock.
#[derive(Debug, Clone)]
pub struct GuardSet {
    pub newsletter: FormGuard,
    pub checkout: FormGuard,
    pub login: FormGuard,
}

impl GuardSet {
    pub fn from_config(
        config: &Config,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            newsletter: FormGuard::for_form(FormKind::Newsletter, config, store.clone(), clock.clone()),
            checkout: FormGuard::for_form(FormKind::Checkout, config, store.clone(), clock.clone()),
            login: FormGuard::for_form(FormKind::Login, config, store, clock),
        }
    }

    pub fn get(&self, kind: FormKind) -> &FormGuard {
        match kind {
            FormKind::Newsletter => &self.newsletter,
            FormKind::Checkout => &self.checkout,
            FormKind::Login => &self.login,
        }
    }
}
