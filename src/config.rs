// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the storefront form guard.
//!
//! Defaults match the limiters the storefront forms are wired with:
//! newsletter 3 per minute, checkout 3 per five minutes, login 5 per
//! fifteen minutes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path of the file-backed store (default: .storefront-guard/store.json)
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Namespace prepended to every limiter key in the store (default: rate_limit_)
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Per-form rate limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Sliding-window limit for one logical action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitRule {
    /// Attempts allowed inside one window
    pub max_attempts: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
}

/// Limits for the forms the guard protects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Newsletter signup (default: 3 per 60s)
    #[serde(default = "default_newsletter")]
    pub newsletter: RateLimitRule,

    /// Checkout submission (default: 3 per 300s)
    #[serde(default = "default_checkout")]
    pub checkout: RateLimitRule,

    /// Login (default: 5 per 900s)
    #[serde(default = "default_login")]
    pub login: RateLimitRule,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(".storefront-guard/store.json")
}

fn default_key_prefix() -> String {
    "rate_limit_".to_string()
}

fn default_newsletter() -> RateLimitRule {
    RateLimitRule::new(3, 60_000)
}

fn default_checkout() -> RateLimitRule {
    RateLimitRule::new(3, 300_000)
}

fn default_login() -> RateLimitRule {
    RateLimitRule::new(5, 900_000)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            key_prefix: default_key_prefix(),
            limits: LimitsConfig::default(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            newsletter: default_newsletter(),
            checkout: default_checkout(),
            login: default_login(),
        }
    }
}

impl RateLimitRule {
    pub const fn new(max_attempts: u32, window_ms: u64) -> Self {
        Self {
            max_attempts,
            window_ms,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by environment variables.
    ///
    /// - `STOREFRONT_GUARD_STORE_PATH`, `STOREFRONT_GUARD_KEY_PREFIX`
    /// - `NEWSLETTER_MAX_ATTEMPTS`, `NEWSLETTER_WINDOW_MS`
    /// - `CHECKOUT_MAX_ATTEMPTS`, `CHECKOUT_WINDOW_MS`
    /// - `LOGIN_MAX_ATTEMPTS`, `LOGIN_WINDOW_MS`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("STOREFRONT_GUARD_STORE_PATH") {
            self.store_path = PathBuf::from(path);
        }
        if let Some(prefix) = lookup("STOREFRONT_GUARD_KEY_PREFIX") {
            self.key_prefix = prefix;
        }

        override_rule(&mut self.limits.newsletter, "NEWSLETTER", &lookup)?;
        override_rule(&mut self.limits.checkout, "CHECKOUT", &lookup)?;
        override_rule(&mut self.limits.login, "LOGIN", &lookup)?;

        self.validate()?;
        Ok(self)
    }

    /// Reject limits that could never admit a submission.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, rule) in [
            ("newsletter", &self.limits.newsletter),
            ("checkout", &self.limits.checkout),
            ("login", &self.limits.login),
        ] {
            if rule.max_attempts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}: max_attempts must be positive"
                )));
            }
            if rule.window_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{name}: window_ms must be positive"
                )));
            }
        }
        Ok(())
    }
}

fn override_rule<F>(rule: &mut RateLimitRule, prefix: &str, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let attempts_var = format!("{prefix}_MAX_ATTEMPTS");
    if let Some(raw) = lookup(&attempts_var) {
        rule.max_attempts = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{attempts_var}: not an integer: {raw}")))?;
    }

    let window_var = format!("{prefix}_WINDOW_MS");
    if let Some(raw) = lookup(&window_var) {
        rule.window_ms = raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{window_var}: not an integer: {raw}")))?;
    }

    Ok(())
}
