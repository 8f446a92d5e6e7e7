use std::{collections::HashMap, sync::LazyLock};

use axum::{
    body::{Body, to_bytes},
    extract::{FromRequestParts, Path, Query, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult, AppError};

/// Upper bound on buffered JSON bodies.
const MAX_BODY_BYTES: usize = 1024 * 1024;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// Check
///
/// A single predicate applied to one field. Every predicate other than `Required`
/// fails on an absent value; whether it is consulted at all for an absent value is
/// decided by the owning `FieldRules` (see `FieldRules::optional`).
///
/// Query-string values always arrive as strings, so the numeric and boolean checks
/// accept their textual forms as well.
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Present, not null and (for strings) not blank.
    Required,
    /// A string with at least one non-whitespace character.
    NotBlank,
    Email,
    /// Minimum length in characters. Strings only.
    MinLength(usize),
    MaxLength(usize),
    OneOf(&'static [&'static str]),
    Number,
    Integer,
    /// Numeric and `>=` the bound.
    Min(f64),
    /// Numeric and `<=` the bound.
    Max(f64),
    Boolean,
    Uuid,
    Object,
    /// Array whose every element is a string.
    StringArray,
    /// http:// or https:// URL.
    Url,
}

impl Check {
    /// Evaluates the predicate; `None` means the field is missing or null.
    pub fn passes(&self, value: Option<&Value>) -> bool {
        let Some(value) = value else {
            return false;
        };

        match self {
            Check::Required => match value {
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            },
            Check::NotBlank => value.as_str().is_some_and(|s| !s.trim().is_empty()),
            Check::Email => value.as_str().is_some_and(|s| EMAIL_PATTERN.is_match(s)),
            Check::MinLength(min) => value.as_str().is_some_and(|s| s.chars().count() >= *min),
            Check::MaxLength(max) => value.as_str().is_some_and(|s| s.chars().count() <= *max),
            Check::OneOf(allowed) => value.as_str().is_some_and(|s| allowed.contains(&s)),
            Check::Number => as_number(value).is_some(),
            Check::Integer => as_integer(value).is_some(),
            Check::Min(bound) => as_number(value).is_some_and(|n| n >= *bound),
            Check::Max(bound) => as_number(value).is_some_and(|n| n <= *bound),
            Check::Boolean => match value {
                Value::Bool(_) => true,
                Value::String(s) => s == "true" || s == "false",
                _ => false,
            },
            Check::Uuid => value.as_str().is_some_and(|s| Uuid::parse_str(s).is_ok()),
            Check::Object => value.is_object(),
            Check::StringArray => value
                .as_array()
                .is_some_and(|items| items.iter().all(Value::is_string)),
            Check::Url => value.as_str().is_some_and(|s| {
                s.strip_prefix("https://")
                    .or_else(|| s.strip_prefix("http://"))
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains(char::is_whitespace))
            }),
        }
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// FieldRules
///
/// The ordered predicate list for one named field.
#[derive(Debug, Clone)]
pub struct FieldRules {
    field: &'static str,
    optional: bool,
    checks: Vec<(Check, &'static str)>,
}

impl FieldRules {
    /// A field whose predicates run even when it is absent.
    pub fn field(field: &'static str) -> Self {
        Self {
            field,
            optional: false,
            checks: Vec::new(),
        }
    }

    /// A field whose non-`Required` predicates are skipped when it is absent or null.
    pub fn optional(field: &'static str) -> Self {
        Self {
            optional: true,
            ..Self::field(field)
        }
    }

    pub fn check(mut self, check: Check, message: &'static str) -> Self {
        self.checks.push((check, message));
        self
    }

    pub fn name(&self) -> &'static str {
        self.field
    }

    fn collect(&self, input: &Value, failures: &mut Vec<FieldError>) {
        let value = input.get(self.field).filter(|v| !v.is_null());

        for (check, message) in &self.checks {
            if value.is_none() && self.optional && *check != Check::Required {
                continue;
            }
            if !check.passes(value) {
                failures.push(FieldError {
                    field: self.field,
                    message: *message,
                });
            }
        }
    }
}

/// FieldError
///
/// One entry of a validation result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

/// RuleSet
///
/// The declarative rules for one route. Built once and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    fields: Vec<FieldRules>,
}

impl RuleSet {
    pub fn new(fields: Vec<FieldRules>) -> Self {
        Self { fields }
    }

    /// Evaluates every rule of every field, in declaration order, without short-circuiting.
    /// An empty result means the input is acceptable.
    pub fn evaluate(&self, input: &Value) -> Vec<FieldError> {
        let mut failures = Vec::new();
        for field in &self.fields {
            field.collect(input, &mut failures);
        }
        failures
    }

    /// Runs `evaluate` and converts a non-empty result into a 400 whose message joins
    /// every failure message with ", ".
    pub fn enforce(&self, input: &Value) -> Result<(), AppError> {
        let failures = self.evaluate(input);
        if failures.is_empty() {
            return Ok(());
        }
        let message = failures
            .iter()
            .map(|f| f.message)
            .collect::<Vec<_>>()
            .join(", ");
        Err(AppError::validation(message))
    }
}

/// Schema
///
/// Binds a request type to the rule set guarding it. The rule set is a `'static`
/// built on first use.
pub trait Schema: DeserializeOwned + Clone + Send + Sync + 'static {
    fn rules() -> &'static RuleSet;
}

/// Runs `T`'s rules against raw JSON and, if they pass, builds the typed value.
pub fn parse_checked<T: Schema>(input: Value) -> Result<T, AppError> {
    T::rules().enforce(&input)?;
    serde_json::from_value(input)
        .map_err(|e| AppError::validation(format!("Invalid request body: {e}")))
}

/// Validated
///
/// The typed, already-validated input placed into the request extensions by
/// `validate_body` / `validate_query`.
#[derive(Debug, Clone)]
pub struct Validated<T>(pub T);

impl<S, T> FromRequestParts<S> for Validated<T>
where
    S: Send + Sync,
    T: Clone + Send + Sync + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Missing means the route was registered without its validation layer.
        parts.extensions.remove::<Validated<T>>().ok_or_else(|| {
            ApiError::unexpected(format!(
                "validated input {} missing from request",
                std::any::type_name::<T>()
            ))
        })
    }
}

/// validate_body
///
/// Validation Gate for JSON bodies. Buffers the body, applies `T`'s rule set to the
/// raw JSON, then stores the typed value for the handler. An empty body is treated
/// as `{}` so that "required" messages are reported instead of a parse error.
pub async fn validate_body<T: Schema>(request: Request, next: Next) -> ApiResult<Response> {
    let (mut parts, body) = request.into_parts();

    let bytes = to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|_| AppError::validation("Request body too large or unreadable"))?;

    let raw: Value = if bytes.iter().all(u8::is_ascii_whitespace) {
        Value::Object(Default::default())
    } else {
        serde_json::from_slice(&bytes).map_err(|_| AppError::validation("Invalid JSON payload"))?
    };

    let input = parse_checked::<T>(raw)?;
    parts.extensions.insert(Validated(input));

    Ok(next.run(Request::from_parts(parts, Body::empty())).await)
}

/// validate_query
///
/// Validation Gate for query strings. Every parameter is checked in its textual form,
/// then the typed query is deserialized from the URI.
pub async fn validate_query<T: Schema>(request: Request, next: Next) -> ApiResult<Response> {
    let (mut parts, body) = request.into_parts();

    let Query(params) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
        .map_err(|_| AppError::validation("Invalid query string"))?;
    let raw = Value::Object(
        params
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect(),
    );
    T::rules().enforce(&raw)?;

    let Query(input) = Query::<T>::try_from_uri(&parts.uri)
        .map_err(|e| AppError::validation(format!("Invalid query parameters: {}", e.body_text())))?;
    parts.extensions.insert(Validated(input));

    Ok(next.run(Request::from_parts(parts, body)).await)
}

/// PathParam
///
/// `Path` whose rejection goes through the error normalizer (JSON 400) instead of
/// axum's plain-text default.
#[derive(Debug, Clone, Copy)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(reason = %rejection.body_text(), "path parameter rejected");
                Err(AppError::validation("Invalid path parameter").into())
            }
        }
    }
}
