//! Scalar validators: check a generic JSON value and convert it into the
//! member's type.
//!
//! All integer validators share one policy: a number is accepted only when it
//! denotes an exact integer. Native JSON integers always qualify; a float
//! qualifies when it has no fractional part (`10.0` is `10`, `10.5` is not).
//! Range checks then run on the exact value, so out-of-range input is reported
//! as too small / too large rather than silently truncated.
use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::ValidationError;

pub trait Validator: Send + Sync {
    type Output;

    fn validate(&self, value: &Value) -> Result<Self::Output, ValidationError>;

    /// Whether a validated value should be written to the destination.
    /// Null-tolerant validators return `false` for the values they produce
    /// from `null`, leaving the member as it was.
    fn assigns(&self, _output: &Self::Output) -> bool { true }

    /// Accept JSON `null` as `None`; anything else goes through `self`.
    /// A `None` is never written to the destination, so a `null` input
    /// leaves the member untouched (see [`assigns`](Self::assigns)).
    fn nullable(self) -> Nullable<Self>
    where
        Self: Sized,
    {
        Nullable(self)
    }
}

// -------------------------------- Strings --------------------------------- //

#[derive(Debug, Clone)]
pub struct StringValidator {
    min_len: usize,
    max_len: usize,
    re: Option<Regex>,
    re_err_msg: Option<String>,
}

/// Length bounds are inclusive and counted in characters.
pub fn string(min_len: usize, max_len: usize) -> StringValidator {
    StringValidator { min_len, max_len, re: None, re_err_msg: None }
}

impl StringValidator {
    pub fn regex(mut self, re: Regex) -> Self {
        self.re = Some(re);
        self
    }

    /// Like [`regex`](Self::regex), reporting `message` instead of the pattern.
    pub fn regex_error(mut self, re: Regex, message: impl Into<String>) -> Self {
        self.re = Some(re);
        self.re_err_msg = Some(message.into());
        self
    }

    pub fn validate_str(&self, s: &str) -> Result<String, ValidationError> {
        let len = s.chars().count();
        if len < self.min_len {
            return Err(ValidationError::invalid(format!(
                "too short, must be at least {} characters", self.min_len
            )));
        }
        if len > self.max_len {
            return Err(ValidationError::invalid(format!(
                "too long, may not be more than {} characters", self.max_len
            )));
        }
        if let Some(re) = &self.re {
            if !re.is_match(s) {
                return Err(match &self.re_err_msg {
                    Some(message) => ValidationError::invalid(message.clone()),
                    None => ValidationError::invalid(format!("must match regular expression: {}", re.as_str())),
                });
            }
        }
        Ok(s.to_owned())
    }
}

impl Validator for StringValidator {
    type Output = String;

    fn validate(&self, value: &Value) -> Result<String, ValidationError> {
        let Value::String(s) = value else {
            return Err(ValidationError::invalid("not a string"));
        };
        self.validate_str(s)
    }
}

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
        .unwrap_or_else(|error| panic!("uuid pattern: {error}"))
});

#[derive(Debug, Clone, Copy, Default)]
pub struct UuidStringValidator;

/// A textual RFC 4122 UUID (versions 1 to 5), any letter case.
pub fn uuid_string() -> UuidStringValidator { UuidStringValidator }

impl UuidStringValidator {
    pub fn validate_str(&self, s: &str) -> Result<String, ValidationError> {
        if !UUID_RE.is_match(s) {
            return Err(ValidationError::invalid("not a valid UUID"));
        }
        Ok(s.to_owned())
    }
}

impl Validator for UuidStringValidator {
    type Output = String;

    fn validate(&self, value: &Value) -> Result<String, ValidationError> {
        let Value::String(s) = value else {
            return Err(ValidationError::invalid("not a string"));
        };
        self.validate_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct OneOf {
    allowed: Vec<String>,
    lookup: HashSet<String>,
    message: String,
}

/// Enumerated string values.
pub fn one_of<I, S>(allowed: I) -> OneOf
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let allowed: Vec<String> = allowed.into_iter().map(Into::into).collect();
    let message = format!("Value must be one of: {}", Value::from(allowed.clone()));
    OneOf { lookup: allowed.iter().cloned().collect(), allowed, message }
}

impl OneOf {
    pub fn allowed(&self) -> &[String] { &self.allowed }
}

impl Validator for OneOf {
    type Output = String;

    fn validate(&self, value: &Value) -> Result<String, ValidationError> {
        let Value::String(s) = value else {
            return Err(ValidationError::invalid("not a string"));
        };
        if !self.lookup.contains(s) {
            return Err(ValidationError::invalid(self.message.clone()));
        }
        Ok(s.clone())
    }
}

// -------------------------------- Scalars --------------------------------- //

#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanValidator;

pub fn boolean() -> BooleanValidator { BooleanValidator }

impl Validator for BooleanValidator {
    type Output = bool;

    fn validate(&self, value: &Value) -> Result<bool, ValidationError> {
        value.as_bool().ok_or_else(|| ValidationError::invalid("not a boolean"))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IntegerValidator {
    min: i64,
    max: i64,
}

pub fn integer(min: i64, max: i64) -> IntegerValidator { IntegerValidator { min, max } }

impl Validator for IntegerValidator {
    type Output = i64;

    fn validate(&self, value: &Value) -> Result<i64, ValidationError> {
        let n = exact_integer(value)?;
        check_range(n, self.min.into(), self.max.into())?;
        // In range of two i64 bounds, so this cannot fail.
        i64::try_from(n).map_err(|_| too_large(self.max))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Uint64Validator {
    min: u64,
    max: u64,
}

pub fn uint64(min: u64, max: u64) -> Uint64Validator { Uint64Validator { min, max } }

/// The full `u64` range.
pub fn uint64_any() -> Uint64Validator { uint64(0, u64::MAX) }

impl Uint64Validator {
    pub fn min(mut self, min: u64) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: u64) -> Self {
        self.max = max;
        self
    }
}

impl Validator for Uint64Validator {
    type Output = u64;

    fn validate(&self, value: &Value) -> Result<u64, ValidationError> {
        let n = exact_integer(value)?;
        check_range(n, self.min.into(), self.max.into())?;
        u64::try_from(n).map_err(|_| too_small(self.min))
    }
}

// ------------------------------- Adapters --------------------------------- //

/// Passes the generic value through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyValue;

pub fn any_value() -> AnyValue { AnyValue }

impl Validator for AnyValue {
    type Output = Value;

    fn validate(&self, value: &Value) -> Result<Value, ValidationError> {
        Ok(value.clone())
    }
}

#[derive(Debug, Clone)]
pub struct Nullable<V>(V);

impl<V: Validator> Validator for Nullable<V> {
    type Output = Option<V::Output>;

    fn validate(&self, value: &Value) -> Result<Self::Output, ValidationError> {
        match value {
            Value::Null => Ok(None),
            other => self.0.validate(other).map(Some),
        }
    }

    fn assigns(&self, output: &Self::Output) -> bool { output.is_some() }
}

/// A custom validator from a plain function or closure.
pub struct FnValidator<F>(F);

pub fn validate_with<F, O>(f: F) -> FnValidator<F>
where
    F: Fn(&Value) -> Result<O, ValidationError> + Send + Sync,
{
    FnValidator(f)
}

impl<F, O> Validator for FnValidator<F>
where
    F: Fn(&Value) -> Result<O, ValidationError> + Send + Sync,
{
    type Output = O;

    fn validate(&self, value: &Value) -> Result<O, ValidationError> {
        (self.0)(value)
    }
}

// ------------------------------- Utilities -------------------------------- //

fn exact_integer(value: &Value) -> Result<i128, ValidationError> {
    let not_an_integer = || ValidationError::invalid("not an integer");
    let Value::Number(n) = value else {
        return Err(not_an_integer());
    };
    if let Some(i) = n.as_i64() {
        return Ok(i.into());
    }
    if let Some(u) = n.as_u64() {
        return Ok(u.into());
    }
    match n.as_f64() {
        // `as` saturates, and anything that saturates is out of every range we check.
        Some(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i128),
        _ => Err(not_an_integer()),
    }
}

fn check_range(n: i128, min: i128, max: i128) -> Result<(), ValidationError> {
    if n < min {
        return Err(ValidationError::invalid(format!("too small, must be at least {min}")));
    }
    if n > max {
        return Err(ValidationError::invalid(format!("too large, may not be larger than {max}")));
    }
    Ok(())
}

fn too_small(min: impl std::fmt::Display) -> ValidationError {
    ValidationError::invalid(format!("too small, must be at least {min}"))
}

fn too_large(max: impl std::fmt::Display) -> ValidationError {
    ValidationError::invalid(format!("too large, may not be larger than {max}"))
}

// ------------------------------- Tests ------------------------------------ //
