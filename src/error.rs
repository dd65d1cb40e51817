//! Validation error trees, their flattened `{path, message}` form, and the
//! crate-level error type.
//!
//! Two classes of failure exist. Validation errors depend on the input and
//! are collected into a [`ValidationError`] tree while decoding continues.
//! Faults are broken mapping configurations; they panic through [`fault`]
//! and are never returned as values.
use std::fmt;

use serde::Serialize;

use crate::path::{Path, Segment};
use crate::typemap::render::RenderError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// What went wrong at a node. Callers branch on this only to decide how to
/// present a message; the message text itself is the user-facing part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ExpectedObject,
    ExpectedList,
    ExpectedMap,
    MissingRequiredField,
    /// A scalar validator rejected the value.
    InvalidValue,
    /// A list had too few or too many elements.
    LengthOutOfRange,
    NotAValidTimestamp,
    UnknownDiscriminator,
    MalformedJson,
    /// Carries no message of its own, only nested errors.
    Nested,
}

/// One node of the error tree built bottom-up during decode.
///
/// A node is addressed by an optional path [`Segment`] assigned by whoever
/// owns it (the struct for a field, the list for an index). Nodes are plain
/// values: children are returned up the stack and merged by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    segment: Option<Segment>,
    kind: ErrorKind,
    message: String,
    nested: Vec<ValidationError>,
}

/// A flattened error: where, and what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathError {
    pub path: String,
    pub message: String,
    #[serde(skip)]
    pub kind: ErrorKind,
}

/// The ordered list of every validation failure found in one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("validation errors: {}", join_path_errors(.0))]
pub struct ValidationErrors(Vec<PathError>);

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("getter `{member}` failed")]
    Getter {
        member: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl ValidationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { segment: None, kind, message: message.into(), nested: Vec::new() }
    }

    /// A scalar rejection, the common case for validators.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidValue, message)
    }

    pub fn expected_object() -> Self {
        Self::new(ErrorKind::ExpectedObject, "expected an object")
    }

    pub fn expected_list() -> Self {
        Self::new(ErrorKind::ExpectedList, "expected a list")
    }

    pub fn expected_map() -> Self {
        Self::new(ErrorKind::ExpectedMap, "expected a map")
    }

    pub fn missing_required_field() -> Self {
        Self::new(ErrorKind::MissingRequiredField, "missing required field")
    }

    /// An empty node that only collects children.
    pub fn nested() -> Self {
        Self::new(ErrorKind::Nested, String::new())
    }

    pub fn at(mut self, segment: Segment) -> Self {
        self.segment = Some(segment);
        self
    }

    pub fn push(&mut self, child: ValidationError) {
        self.nested.push(child);
    }

    pub fn kind(&self) -> ErrorKind { self.kind }

    pub fn message(&self) -> &str { &self.message }

    pub fn segment(&self) -> Option<&Segment> { self.segment.as_ref() }

    pub fn nested_errors(&self) -> &[ValidationError] { &self.nested }

    /// `Ok` for a collector that never received a child.
    pub(crate) fn into_result(self) -> Result<(), ValidationError> {
        if self.kind == ErrorKind::Nested && self.message.is_empty() && self.nested.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Depth-first, in the order errors were recorded. Nodes without a
    /// message of their own contribute only their children.
    pub fn flatten(&self) -> ValidationErrors {
        let mut out = Vec::new();
        self.flatten_into(&mut Path::root(), &mut out);
        ValidationErrors(out)
    }

    fn flatten_into(&self, path: &mut Path, out: &mut Vec<PathError>) {
        if let Some(segment) = &self.segment {
            path.push(segment.clone());
        }
        if !self.message.is_empty() {
            out.push(PathError {
                path: path.to_string(),
                message: self.message.clone(),
                kind: self.kind,
            });
        }
        for child in &self.nested {
            child.flatten_into(path, out);
        }
        if self.segment.is_some() {
            path.pop();
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", join_path_errors(&self.flatten().0))
    }
}

impl std::error::Error for ValidationError {}

impl fmt::Display for PathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidationErrors {
    pub fn errors(&self) -> &[PathError] { &self.0 }

    pub fn into_errors(self) -> Vec<PathError> { self.0 }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

impl IntoIterator for ValidationErrors {
    type Item = PathError;
    type IntoIter = std::vec::IntoIter<PathError>;
    fn into_iter(self) -> Self::IntoIter { self.0.into_iter() }
}

impl Error {
    /// The path-qualified messages, if this is a validation failure.
    pub fn validation_errors(&self) -> Option<&[PathError]> {
        match self {
            Self::Validation(errors) => Some(errors.errors()),
            _ => None,
        }
    }

    pub(crate) fn getter(member: &'static str, source: anyhow::Error) -> Self {
        Self::Getter { member, source: source.into() }
    }
}

impl From<ValidationError> for Error {
    fn from(tree: ValidationError) -> Self {
        Self::Validation(tree.flatten())
    }
}

/// Abort on a broken mapping configuration.
#[track_caller]
pub(crate) fn fault(message: impl fmt::Display) -> ! {
    panic!("jsonmap fault: {message}")
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn join_path_errors(errors: &[PathError]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ValidationError {
        let mut inner = ValidationError::nested().at(Segment::Index(0));
        inner.push(ValidationError::invalid("not a string").at(Segment::Field("foo".into())));

        let mut list = ValidationError::nested().at(Segment::Field("inner_things".into()));
        list.push(inner);

        let mut root = ValidationError::nested();
        root.push(ValidationError::missing_required_field().at(Segment::Field("bar".into())));
        root.push(list);
        root
    }

    #[test]
    fn flatten_keeps_record_order_and_paths() {
        let flat = tree().flatten();
        let pairs: Vec<_> = flat.errors().iter().map(|e| (e.path.as_str(), e.message.as_str())).collect();
        assert_eq!(pairs, vec![
            ("/bar", "missing required field"),
            ("/inner_things/0/foo", "not a string"),
        ]);
        assert_eq!(flat.errors()[0].kind, ErrorKind::MissingRequiredField);
    }

    #[test]
    fn root_message_has_empty_path() {
        let flat = ValidationError::expected_object().flatten();
        assert_eq!(flat.errors()[0].path, "");
        assert_eq!(flat.errors()[0].message, "expected an object");
    }

    #[test]
    fn empty_collector_is_ok() {
        assert!(ValidationError::nested().into_result().is_ok());
        assert!(tree().into_result().is_err());
    }

    #[test]
    fn wire_form_is_path_and_message() {
        let flat = ValidationError::invalid("nope").at(Segment::Field("a".into())).flatten();
        let wire = serde_json::to_value(&flat).unwrap();
        assert_eq!(wire, serde_json::json!([{ "path": "/a", "message": "nope" }]));
    }

    #[test]
    fn display_joins_messages() {
        let err = Error::from(tree());
        assert_eq!(
            err.to_string(),
            "validation errors: /bar: missing required field; /inner_things/0/foo: not a string",
        );
        assert_eq!(err.validation_errors().map(<[_]>::len), Some(2));
    }
}
