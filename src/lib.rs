// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Storefront Form Guard
//!
//! Abuse protection for the storefront's checkout, newsletter and login
//! forms:
//!
//! - Sliding-window rate limiting per form, persisted in a key-value store
//! - XSS pattern detection on raw input
//! - Input sanitization (entity-encoding and strip-only variants)
//! - Format validators for email, CEP, phone, card number (Luhn), CVV,
//!   expiry and names
//! - Declarative schemas that validate and normalize in one pass
//! - Honeypot fields for bot detection

pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod honeypot;
pub mod limiter;
pub mod sanitizer;
pub mod schema;
pub mod store;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{Config, RateLimitRule};
pub use guard::{FormGuard, FormKind, GuardSet, SubmissionOutcome};
pub use honeypot::Honeypot;
pub use limiter::{RateLimitStatus, RateLimiter};
pub use sanitizer::{detect_xss, sanitize_input, sanitize_string};
pub use schema::{validate_form, FieldErrors, Schema, ValidationResult};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use validator::{luhn_check, FieldError};
