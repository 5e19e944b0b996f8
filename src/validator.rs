// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-field format validators and live input masks.
//!
//! Validators check a raw field value and return the normalized value on
//! success: lowercased email, digits-only CEP/phone/card. Failures are
//! [`FieldError`]s whose [`message_key`](FieldError::message_key) is resolved
//! to display text by the UI's translation layer.
//!
//! Formatters (`format_*`) mask partial input for display on every
//! keystroke. They never fail.

use crate::clock::{Clock, SystemClock};
use crate::sanitizer::{contains_tag, sanitize_string};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::debug;

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());
static CEP: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{5}-?\d{3}$").unwrap());
static PHONE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:\(\d{2}\)|\d{2})\s?\d{4,5}-?\d{4}$").unwrap());
static CVV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{3,4}$").unwrap());
static EXPIRY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{2})/(\d{2})$").unwrap());

const MAX_EMAIL_LEN: usize = 254;
const CARD_DIGITS: usize = 16;
const MIN_NAME_CHARS: usize = 2;

/// Field-level validation failure.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    #[error("Field is required")]
    Required,

    #[error("Unexpected value type")]
    InvalidType,

    #[error("Must be at least {0} characters")]
    TooShort(usize),

    #[error("Must be at most {0} characters")]
    TooLong(usize),

    #[error("Invalid format")]
    InvalidFormat,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid CEP")]
    InvalidCep,

    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Invalid card number")]
    InvalidCardNumber,

    #[error("Invalid CVV")]
    InvalidCvv,

    #[error("Invalid expiry date")]
    InvalidExpiry,

    #[error("Card expired")]
    ExpiredCard,

    #[error("Name too short")]
    NameTooShort,

    #[error("Contains forbidden characters")]
    InvalidCharacters,

    #[error("Must be accepted")]
    MustAccept,

    /// Failure with a caller-supplied message key.
    #[error("{0}")]
    Custom(&'static str),
}

impl FieldError {
    /// Translation key for this failure. Never locale text.
    pub fn message_key(&self) -> &'static str {
        match self {
            Self::Required => "validation.required",
            Self::InvalidType => "validation.invalidType",
            Self::TooShort(_) => "validation.tooShort",
            Self::TooLong(_) => "validation.tooLong",
            Self::InvalidFormat => "validation.invalidFormat",
            Self::InvalidEmail => "validation.email",
            Self::InvalidCep => "validation.cep",
            Self::InvalidPhone => "validation.phone",
            Self::InvalidCardNumber => "validation.cardNumber",
            Self::InvalidCvv => "validation.cvv",
            Self::InvalidExpiry => "validation.expiry",
            Self::ExpiredCard => "validation.cardExpired",
            Self::NameTooShort => "validation.nameTooShort",
            Self::InvalidCharacters => "validation.invalidCharacters",
            Self::MustAccept => "validation.mustAccept",
            Self::Custom(key) => *key,
        }
    }
}

/// Keep only ASCII digits.
pub fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

/// Luhn checksum over a string of ASCII digits.
///
/// Walking right to left, every second digit is doubled (minus 9 when the
/// double exceeds 9); the number is valid when the sum is a multiple of 10.
/// Empty or non-digit input is invalid.
pub fn luhn_check(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();

    sum % 10 == 0
}

/// Email: trimmed and lowercased, `local@domain.tld` shape.
pub fn validate_email(input: &str) -> Result<String, FieldError> {
    let email = input.trim().to_lowercase();
    if email.is_empty() {
        return Err(FieldError::Required);
    }
    if email.len() > MAX_EMAIL_LEN || !EMAIL.is_match(&email) {
        debug!("Email rejected");
        return Err(FieldError::InvalidEmail);
    }
    Ok(email)
}

/// CEP: `NNNNN-NNN` or `NNNNNNNN`, normalized to 8 digits.
pub fn validate_cep(input: &str) -> Result<String, FieldError> {
    let cep = input.trim();
    if !CEP.is_match(cep) {
        return Err(FieldError::InvalidCep);
    }
    Ok(digits_only(cep))
}

/// Phone: `(DD) NNNNN-NNNN`, `(DD) NNNN-NNNN` or bare digits, normalized to
/// 10 or 11 digits.
pub fn validate_phone(input: &str) -> Result<String, FieldError> {
    let phone = input.trim();
    if !PHONE.is_match(phone) {
        return Err(FieldError::InvalidPhone);
    }
    Ok(digits_only(phone))
}

/// Card number: 16 digits, spaces or hyphens allowed, Luhn-valid.
/// Normalized to digits only.
pub fn validate_card_number(input: &str) -> Result<String, FieldError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if compact.len() != CARD_DIGITS || !compact.bytes().all(|b| b.is_ascii_digit()) {
        return Err(FieldError::InvalidCardNumber);
    }
    if !luhn_check(&compact) {
        debug!("Card number failed Luhn check");
        return Err(FieldError::InvalidCardNumber);
    }
    Ok(compact)
}

/// CVV: 3 or 4 digits, returned unchanged.
pub fn validate_cvv(input: &str) -> Result<String, FieldError> {
    if !CVV.is_match(input) {
        return Err(FieldError::InvalidCvv);
    }
    Ok(input.to_string())
}

/// Expiry `MM/YY` against the system clock.
pub fn validate_expiry(input: &str) -> Result<String, FieldError> {
    validate_expiry_with(input, &SystemClock)
}

/// Expiry `MM/YY` against the given clock.
pub fn validate_expiry_with(input: &str, clock: &dyn Clock) -> Result<String, FieldError> {
    let (year, month) = clock.year_month();
    validate_expiry_at(input, year, month)
}

/// Expiry `MM/YY` as of `current_year`/`current_month`.
///
/// The current month is still valid; any earlier month is expired. The value
/// is returned unchanged.
pub fn validate_expiry_at(
    input: &str,
    current_year: i32,
    current_month: u32,
) -> Result<String, FieldError> {
    let caps = EXPIRY.captures(input).ok_or(FieldError::InvalidExpiry)?;
    let month: u32 = caps[1].parse().map_err(|_| FieldError::InvalidExpiry)?;
    let yy: i32 = caps[2].parse().map_err(|_| FieldError::InvalidExpiry)?;

    if !(1..=12).contains(&month) {
        return Err(FieldError::InvalidExpiry);
    }
    if (2000 + yy, month) < (current_year, current_month) {
        return Err(FieldError::ExpiredCard);
    }
    Ok(input.to_string())
}

/// Person name: rejects tag-shaped content, then strips and trims with
/// [`sanitize_string`]. At least two characters must remain.
pub fn validate_name(input: &str) -> Result<String, FieldError> {
    if contains_tag(input) {
        debug!("Name rejected: tag-shaped content");
        return Err(FieldError::InvalidCharacters);
    }
    let name = sanitize_string(input);
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(FieldError::NameTooShort);
    }
    Ok(name)
}

/// Mask a CEP as `NNNNN-NNN`.
pub fn format_cep(input: &str) -> String {
    let digits: String = digits_only(input).chars().take(8).collect();
    if digits.len() > 5 {
        format!("{}-{}", &digits[..5], &digits[5..])
    } else {
        digits
    }
}

/// Mask a phone as `(DD) NNNN-NNNN` or `(DD) NNNNN-NNNN`.
pub fn format_phone(input: &str) -> String {
    let d: String = digits_only(input).chars().take(11).collect();
    match d.len() {
        0 => String::new(),
        1..=2 => format!("({d}"),
        3..=6 => format!("({}) {}", &d[..2], &d[2..]),
        7..=10 => format!("({}) {}-{}", &d[..2], &d[2..6], &d[6..]),
        _ => format!("({}) {}-{}", &d[..2], &d[2..7], &d[7..]),
    }
}

/// Mask a card number in groups of four.
pub fn format_card_number(input: &str) -> String {
    let digits: Vec<char> = digits_only(input).chars().take(CARD_DIGITS).collect();
    digits
        .chunks(4)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Mask an expiry as `MM/YY`.
pub fn format_expiry(input: &str) -> String {
    let digits: String = digits_only(input).chars().take(4).collect();
    if digits.len() > 2 {
        format!("{}/{}", &digits[..2], &digits[2..])
    } else {
        digits
    }
}
