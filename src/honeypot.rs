// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Decoy form field for bot detection.
//!
//! The field is rendered visually hidden. Humans leave it empty; form-filling
//! bots usually do not. A filled honeypot is never reported as an error: the
//! caller pretends the submission succeeded and drops it.

use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

/// Names a decoy field can take. Plausible enough for bots to fill in.
pub const DECOY_FIELDS: &[&str] = &["website", "fax", "company_url", "middle_name", "homepage"];

/// One decoy field, named once at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Honeypot {
    field_name: &'static str,
}

impl Honeypot {
    /// Pick a decoy name at random.
    pub fn new() -> Self {
        Self::with_rng(&mut rand::thread_rng())
    }

    /// Pick a decoy name using `rng`.
    pub fn with_rng<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            field_name: DECOY_FIELDS.choose(rng).copied().unwrap_or("website"),
        }
    }

    /// Name to render the hidden input under.
    pub fn field_name(&self) -> &'static str {
        self.field_name
    }

    /// True (human) iff the decoy is absent or empty.
    pub fn validate(&self, value: Option<&str>) -> bool {
        value.map_or(true, str::is_empty)
    }

    /// [`validate`](Self::validate) over a JSON value: `null`, `false` and
    /// `""` count as empty.
    pub fn validate_value(&self, value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => true,
            Some(Value::String(s)) => s.is_empty(),
            Some(_) => false,
        }
    }

    /// Check the decoy field inside a submitted form object.
    pub fn validate_form(&self, form: &Value) -> bool {
        self.validate_value(form.get(self.field_name))
    }
}

impl Default for Honeypot {
    fn default() -> Self {
        Self::new()
    }
}
