// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Declarative form schemas.
//!
//! A [`Schema`] is plain data: a list of [`FieldSpec`]s (kind, required,
//! preprocessing, rules, transforms) and nested sub-schemas. One routine,
//! [`validate_form`], walks any schema over a JSON form object and either
//! returns the normalized data or a map from dotted field path to message
//! key. Downstream code submits the normalized data, never the raw input.
//!
//! Unknown keys are dropped from the output. Fields are independent: there
//! are no cross-field rules.

use crate::clock::Clock;
use crate::sanitizer::{contains_tag, sanitize_string};
use crate::validator::{
    validate_card_number, validate_cep, validate_cvv, validate_email,
    validate_expiry_with, validate_name, validate_phone, FieldError,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Map from dotted field path to message key.
pub type FieldErrors = BTreeMap<String, String>;

/// Error path used when the form itself is not an object.
pub const FORM_PATH: &str = "_form";

static STATE_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{2}$").unwrap());

/// Outcome of validating a form.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult<T> {
    /// Normalized data, ready to submit
    Valid(T),
    /// Message key per failing field
    Invalid(FieldErrors),
}

impl<T> ValidationResult<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ValidationResult::Valid(data) => Some(data),
            ValidationResult::Invalid(_) => None,
        }
    }

    pub fn errors(&self) -> Option<&FieldErrors> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(errors) => Some(errors),
        }
    }

    pub fn into_result(self) -> Result<T, FieldErrors> {
        match self {
            ValidationResult::Valid(data) => Ok(data),
            ValidationResult::Invalid(errors) => Err(errors),
        }
    }
}

/// Serializes as `{"success": true, "data": ...}` or
/// `{"success": false, "errors": {...}}`.
impl<T: Serialize> Serialize for ValidationResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 2)?;
        match self {
            ValidationResult::Valid(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            ValidationResult::Invalid(errors) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("errors", errors)?;
            }
        }
        state.end()
    }
}

/// Value normalization step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Trim,
    Uppercase,
    /// Strip tags, `javascript:` and event handlers (no entity encoding)
    SanitizeString,
}

impl Transform {
    pub fn apply(&self, input: &str) -> String {
        match self {
            Transform::Trim => input.trim().to_string(),
            Transform::Uppercase => input.to_uppercase(),
            Transform::SanitizeString => sanitize_string(input),
        }
    }
}

/// Validate-and-normalize function, usually one of the `validator` module's.
pub type FormatFn = Arc<dyn Fn(&str) -> Result<String, FieldError> + Send + Sync>;

/// Predicate for a custom refinement.
pub type RefineFn = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Check applied to a text value, in declaration order.
#[derive(Clone)]
pub enum Rule {
    /// At least this many characters
    MinLength(usize),
    /// At most this many characters
    MaxLength(usize),
    /// Must match the regex
    Pattern(Regex, FieldError),
    /// Validate and replace the value with the normalized result
    Format(FormatFn),
    /// Custom predicate
    Refine(RefineFn, FieldError),
    /// Reject anything shaped like a tag
    NoTags,
}

impl Rule {
    pub fn format<F>(f: F) -> Self
    where
        F: Fn(&str) -> Result<String, FieldError> + Send + Sync + 'static,
    {
        Rule::Format(Arc::new(f))
    }

    pub fn refine<F>(f: F, error: FieldError) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Rule::Refine(Arc::new(f), error)
    }

    fn apply(&self, value: String) -> Result<String, FieldError> {
        match self {
            Rule::MinLength(min) if value.chars().count() < *min => Err(FieldError::TooShort(*min)),
            Rule::MaxLength(max) if value.chars().count() > *max => Err(FieldError::TooLong(*max)),
            Rule::Pattern(re, error) if !re.is_match(&value) => Err(*error),
            Rule::Format(f) => f(&value),
            Rule::Refine(f, error) if !f(&value) => Err(*error),
            Rule::NoTags if contains_tag(&value) => Err(FieldError::InvalidCharacters),
            _ => Ok(value),
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::MinLength(n) => write!(f, "MinLength({n})"),
            Rule::MaxLength(n) => write!(f, "MaxLength({n})"),
            Rule::Pattern(re, error) => write!(f, "Pattern({}, {error:?})", re.as_str()),
            Rule::Format(_) => write!(f, "Format(..)"),
            Rule::Refine(_, error) => write!(f, "Refine(.., {error:?})"),
            Rule::NoTags => write!(f, "NoTags"),
        }
    }
}

/// JSON type a field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Flag,
}

/// Declarative description of one form field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    kind: ValueKind,
    required: bool,
    must_be_true: bool,
    preprocess: Vec<Transform>,
    rules: Vec<Rule>,
    transforms: Vec<Transform>,
}

impl FieldSpec {
    /// Optional string field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Text)
    }

    /// Optional boolean field.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, ValueKind::Flag)
    }

    fn new(name: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            must_be_true: false,
            preprocess: Vec::new(),
            rules: Vec::new(),
            transforms: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Flag must be `true` (terms acceptance).
    pub fn accepted(mut self) -> Self {
        self.must_be_true = true;
        self
    }

    /// Normalize before rules run. An empty result counts as missing.
    pub fn preprocess(mut self, transform: Transform) -> Self {
        self.preprocess.push(transform);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Normalize after all rules pass.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `Ok(None)` means an absent optional field.
    fn validate(&self, raw: Option<&Value>) -> Result<Option<Value>, FieldError> {
        match self.kind {
            ValueKind::Text => self.validate_text(raw),
            ValueKind::Flag => self.validate_flag(raw),
        }
    }

    fn validate_text(&self, raw: Option<&Value>) -> Result<Option<Value>, FieldError> {
        let text = match raw {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.as_str()),
            Some(_) => return Err(FieldError::InvalidType),
        };

        let value = text
            .map(|s| {
                self.preprocess
                    .iter()
                    .fold(s.to_string(), |acc, t| t.apply(&acc))
            })
            .filter(|s| !s.is_empty());

        let Some(value) = value else {
            return if self.required {
                Err(FieldError::Required)
            } else {
                Ok(None)
            };
        };

        let value = self
            .rules
            .iter()
            .try_fold(value, |acc, rule| rule.apply(acc))?;
        let value = self
            .transforms
            .iter()
            .fold(value, |acc, t| t.apply(&acc));

        Ok(Some(Value::String(value)))
    }

    fn validate_flag(&self, raw: Option<&Value>) -> Result<Option<Value>, FieldError> {
        match raw {
            None | Some(Value::Null) if self.required => Err(FieldError::Required),
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(false)) if self.must_be_true => Err(FieldError::MustAccept),
            Some(Value::Bool(b)) => Ok(Some(Value::Bool(*b))),
            Some(_) => Err(FieldError::InvalidType),
        }
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Field(FieldSpec),
    Nested(String, Schema),
}

/// Ordered collection of fields and nested schemas.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entries: Vec<Entry>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.entries.push(Entry::Field(spec));
        self
    }

    /// Embed `schema` under the object key `prefix`.
    pub fn nested(mut self, prefix: impl Into<String>, schema: Schema) -> Self {
        self.entries.push(Entry::Nested(prefix.into(), schema));
        self
    }

    /// Shorthand for [`validate_form`].
    pub fn validate(&self, data: &Value) -> ValidationResult<Value> {
        validate_form(self, data)
    }

    fn walk(&self, prefix: &str, input: &Map<String, Value>, errors: &mut FieldErrors) -> Map<String, Value> {
        let mut output = Map::new();

        for entry in &self.entries {
            match entry {
                Entry::Field(spec) => {
                    let path = join_path(prefix, &spec.name);
                    match spec.validate(input.get(&spec.name)) {
                        Ok(Some(value)) => {
                            output.insert(spec.name.clone(), value);
                        }
                        Ok(None) => {}
                        Err(e) => {
                            debug!(field = %path, error = %e, "Field rejected");
                            errors.insert(path, e.message_key().to_string());
                        }
                    }
                }
                Entry::Nested(name, schema) => {
                    let path = join_path(prefix, name);
                    let empty = Map::new();
                    let nested_input = match input.get(name) {
                        None | Some(Value::Null) => &empty,
                        Some(Value::Object(obj)) => obj,
                        Some(_) => {
                            errors.insert(path, FieldError::InvalidType.message_key().to_string());
                            continue;
                        }
                    };
                    let nested = schema.walk(&path, nested_input, errors);
                    output.insert(name.clone(), Value::Object(nested));
                }
            }
        }

        output
    }
}

pub(crate) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Validate `data` against `schema`, normalizing in the same pass.
pub fn validate_form(schema: &Schema, data: &Value) -> ValidationResult<Value> {
    let Some(input) = data.as_object() else {
        let mut errors = FieldErrors::new();
        errors.insert(
            FORM_PATH.to_string(),
            FieldError::InvalidType.message_key().to_string(),
        );
        return ValidationResult::Invalid(errors);
    };

    let mut errors = FieldErrors::new();
    let output = schema.walk("", input, &mut errors);

    if errors.is_empty() {
        ValidationResult::Valid(Value::Object(output))
    } else {
        debug!(failed = errors.len(), "Form validation failed");
        ValidationResult::Invalid(errors)
    }
}

/// Free-text address line: tags stripped first, so bounds apply to what is
/// kept and markup-only input counts as missing.
fn address_line(name: &str, min: usize, max: usize) -> FieldSpec {
    FieldSpec::text(name)
        .required()
        .preprocess(Transform::SanitizeString)
        .rule(Rule::MinLength(min))
        .rule(Rule::MaxLength(max))
}

/// Shipping address step of checkout.
pub fn address_schema() -> Schema {
    Schema::new()
        .field(
            FieldSpec::text("fullName")
                .required()
                .rule(Rule::MaxLength(100))
                .rule(Rule::format(validate_name)),
        )
        .field(FieldSpec::text("email").required().rule(Rule::format(validate_email)))
        .field(FieldSpec::text("phone").required().rule(Rule::format(validate_phone)))
        .field(FieldSpec::text("cep").required().rule(Rule::format(validate_cep)))
        .field(address_line("street", 3, 200))
        .field(
            FieldSpec::text("number")
                .required()
                .preprocess(Transform::Trim)
                .rule(Rule::MaxLength(10))
                .rule(Rule::NoTags),
        )
        .field(
            FieldSpec::text("complement")
                .preprocess(Transform::SanitizeString)
                .rule(Rule::MaxLength(100)),
        )
        .field(address_line("neighborhood", 2, 100))
        .field(address_line("city", 2, 100))
        .field(
            FieldSpec::text("state")
                .required()
                .preprocess(Transform::Trim)
                .preprocess(Transform::Uppercase)
                .rule(Rule::Pattern((*STATE_CODE).clone(), FieldError::InvalidFormat)),
        )
}

/// Card payment step of checkout. Expiry is judged against `clock`.
pub fn payment_schema(clock: Arc<dyn Clock>) -> Schema {
    Schema::new()
        .field(
            FieldSpec::text("cardNumber")
                .required()
                .rule(Rule::format(validate_card_number)),
        )
        .field(
            FieldSpec::text("cardName")
                .required()
                .rule(Rule::MaxLength(100))
                .rule(Rule::format(validate_name))
                .transform(Transform::Uppercase),
        )
        .field(
            FieldSpec::text("expiry")
                .required()
                .preprocess(Transform::Trim)
                .rule(Rule::format(move |s| validate_expiry_with(s, clock.as_ref()))),
        )
        .field(FieldSpec::text("cvv").required().rule(Rule::format(validate_cvv)))
}

/// Full checkout submission: `address.*`, `payment.*` and terms acceptance.
pub fn checkout_schema(clock: Arc<dyn Clock>) -> Schema {
    Schema::new()
        .nested("address", address_schema())
        .nested("payment", payment_schema(clock))
        .field(FieldSpec::flag("acceptTerms").required().accepted())
}

/// Newsletter signup.
pub fn newsletter_schema() -> Schema {
    Schema::new().field(FieldSpec::text("email").required().rule(Rule::format(validate_email)))
}

/// Login. Passwords are length-checked only, never trimmed or rewritten.
pub fn login_schema() -> Schema {
    Schema::new()
        .field(FieldSpec::text("email").required().rule(Rule::format(validate_email)))
        .field(
            FieldSpec::text("password")
                .required()
                .rule(Rule::MinLength(6))
                .rule(Rule::MaxLength(128)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    // 2026-03-15T12:00:00Z
    const MARCH_2026: u64 = 1_773_576_000_000;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(ManualClock::new(MARCH_2026))
    }

    fn address() -> Value {
        json!({
            "fullName": "  Maria da Silva ",
            "email": "Maria@Example.com",
            "phone": "(11) 98765-4321",
            "cep": "01310-100",
            "street": " Avenida Paulista ",
            "number": "1578",
            "neighborhood": "Bela Vista",
            "city": "São Paulo",
            "state": "sp"
        })
    }

    #[test]
    fn test_address_normalized() {
        let result = validate_form(&address_schema(), &address());
        let data = result.data().expect("address should validate");

        assert_eq!(data["fullName"], "Maria da Silva");
        assert_eq!(data["email"], "maria@example.com");
        assert_eq!(data["phone"], "11987654321");
        assert_eq!(data["cep"], "01310100");
        assert_eq!(data["street"], "Avenida Paulista");
        assert_eq!(data["state"], "SP");
        // Optional and absent: omitted
        assert!(data.get("complement").is_none());
    }

    #[test]
    fn test_cep_accepts_both_shapes() {
        for cep in ["01310-100", "01310100"] {
            let mut input = address();
            input["cep"] = json!(cep);
            let result = address_schema().validate(&input);
            assert_eq!(result.data().unwrap()["cep"], "01310100");
        }
    }

    #[test]
    fn test_errors_are_message_keys() {
        let mut input = address();
        input["cep"] = json!("123");
        input["email"] = json!("nope");
        input["state"] = json!("São");
        input.as_object_mut().unwrap().remove("city");

        let errors = address_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors["cep"], "validation.cep");
        assert_eq!(errors["email"], "validation.email");
        assert_eq!(errors["state"], "validation.invalidFormat");
        assert_eq!(errors["city"], "validation.required");
    }

    #[test]
    fn test_whitespace_only_is_missing() {
        let mut input = address();
        input["street"] = json!("   ");
        input["complement"] = json!("   ");

        let errors = address_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors["street"], "validation.required");
        assert!(!errors.contains_key("complement"));
    }

    #[test]
    fn test_type_mismatch() {
        let mut input = address();
        input["number"] = json!(1578);
        let errors = address_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors["number"], "validation.invalidType");

        let result = validate_form(&address_schema(), &json!(["not", "an", "object"]));
        assert_eq!(result.errors().unwrap()[FORM_PATH], "validation.invalidType");
    }

    #[test]
    fn test_length_bounds() {
        let mut input = address();
        input["street"] = json!("Av");
        input["complement"] = json!("x".repeat(101));

        let errors = address_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors["street"], "validation.tooShort");
        assert_eq!(errors["complement"], "validation.tooLong");
    }

    #[test]
    fn test_checkout_nested_paths() {
        let input = json!({
            "address": address(),
            "payment": {
                "cardNumber": "4111 1111 1111 1112",
                "cardName": "Maria Silva",
                "expiry": "02/26",
                "cvv": "12"
            },
            "acceptTerms": false
        });

        let errors = checkout_schema(clock()).validate(&input).into_result().unwrap_err();
        assert_eq!(errors["payment.cardNumber"], "validation.cardNumber");
        assert_eq!(errors["payment.expiry"], "validation.cardExpired");
        assert_eq!(errors["payment.cvv"], "validation.cvv");
        assert_eq!(errors["acceptTerms"], "validation.mustAccept");
        assert!(!errors.contains_key("payment.cardName"));
        assert!(!errors.keys().any(|k| k.starts_with("address.")));
    }

    #[test]
    fn test_checkout_missing_section() {
        let input = json!({ "payment": "card", "acceptTerms": true });
        let errors = checkout_schema(clock()).validate(&input).into_result().unwrap_err();

        assert_eq!(errors["payment"], "validation.invalidType");
        assert_eq!(errors["address.cep"], "validation.required");
        assert_eq!(errors["address.fullName"], "validation.required");
    }

    #[test]
    fn test_checkout_valid() {
        let input = json!({
            "address": address(),
            "payment": {
                "cardNumber": "5500 0000 0000 0004",
                "cardName": "maria silva",
                "expiry": "03/26",
                "cvv": "123"
            },
            "acceptTerms": true,
            "website": ""
        });

        let data = checkout_schema(clock()).validate(&input).into_result().unwrap();
        assert_eq!(data["payment"]["cardNumber"], "5500000000000004");
        assert_eq!(data["payment"]["cardName"], "MARIA SILVA");
        assert_eq!(data["address"]["cep"], "01310100");
        assert_eq!(data["acceptTerms"], true);
        // Unknown keys are dropped
        assert!(data.get("website").is_none());
    }

    #[test]
    fn test_login_password_untouched() {
        let data = login_schema()
            .validate(&json!({"email": "a@b.co", "password": " secret "}))
            .into_result()
            .unwrap();
        assert_eq!(data["password"], " secret ");

        let errors = login_schema()
            .validate(&json!({"email": "a@b.co", "password": "12345"}))
            .into_result()
            .unwrap_err();
        assert_eq!(errors["password"], "validation.tooShort");
    }

    #[test]
    fn test_custom_refinement_and_tags() {
        let schema = Schema::new()
            .field(
                FieldSpec::text("coupon")
                    .preprocess(Transform::Trim)
                    .preprocess(Transform::Uppercase)
                    .rule(Rule::refine(|s| s.starts_with("PROMO"), FieldError::Custom("coupon.invalid"))),
            )
            .field(FieldSpec::text("note").rule(Rule::NoTags));

        let result = schema.validate(&json!({"coupon": " promo10 ", "note": "ok"}));
        assert_eq!(result.data().unwrap()["coupon"], "PROMO10");

        let errors = schema
            .validate(&json!({"coupon": "FREE", "note": "<i>hi</i>"}))
            .into_result()
            .unwrap_err();
        assert_eq!(errors["coupon"], "coupon.invalid");
        assert_eq!(errors["note"], "validation.invalidCharacters");
    }

    #[test]
    fn test_markup_only_address_line_is_missing() {
        let mut input = address();
        input["street"] = json!("<b></b><i></i>");
        input["neighborhood"] = json!("<b></b>");
        input["city"] = json!(" <p></p> ");
        input["complement"] = json!("<br>");

        let errors = address_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors["street"], "validation.required");
        assert_eq!(errors["neighborhood"], "validation.required");
        assert_eq!(errors["city"], "validation.required");
        assert!(!errors.contains_key("complement"));
    }

    #[test]
    fn test_length_judged_after_stripping() {
        let mut input = address();
        input["street"] = json!("<i></i>ab");
        let errors = address_schema().validate(&input).into_result().unwrap_err();
        assert_eq!(errors["street"], "validation.tooShort");

        input["street"] = json!("<b>Rua</b> Augusta");
        input["complement"] = json!("<em>fundos</em>");
        let data = address_schema().validate(&input).into_result().unwrap();
        assert_eq!(data["street"], "Rua Augusta");
        assert_eq!(data["complement"], "fundos");
    }

    #[test]
    fn test_result_serialization() {
        let ok: ValidationResult<Value> = ValidationResult::Valid(json!({"email": "a@b.co"}));
        assert_eq!(
            serde_json::to_value(&ok).unwrap(),
            json!({"success": true, "data": {"email": "a@b.co"}})
        );

        let err = newsletter_schema().validate(&json!({}));
        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({"success": false, "errors": {"email": "validation.required"}})
        );
    }
}
