//! Output-only string fields rendered from a small placeholder template.
//!
//! A template is plain text with `{{ root.key.key }}` placeholders, where
//! `root` is one of `context`, `parent` or `value` (case-insensitive, an
//! optional leading `.` is allowed) and each key walks one level into the
//! serialized JSON of that root. Array elements are addressed by index.
use std::any::{Any, type_name};
use std::marker::PhantomData;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};

use super::{Parent, RawMessage, TypeMap};
use crate::context::Context;
use crate::error::{fault, Error, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    #[error("malformed template at byte {offset}: {template:?}")]
    Malformed { template: String, offset: usize },
    #[error("unknown template root `{0}`, expected context, parent or value")]
    UnknownRoot(String),
    #[error("template placeholder `{0}` does not resolve to a value")]
    MissingKey(String),
}

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*\.?([A-Za-z_]+)((?:\.[^\s.{}]+)*)\s*\}\}")
        .unwrap_or_else(|error| panic!("placeholder pattern: {error}"))
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Context,
    Parent,
    Value,
}

impl Root {
    fn parse(name: &str) -> Result<Self, RenderError> {
        match name.to_ascii_lowercase().as_str() {
            "context" => Ok(Self::Context),
            "parent" => Ok(Self::Parent),
            "value" => Ok(Self::Value),
            _ => Err(RenderError::UnknownRoot(name.to_owned())),
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::Context => "context",
            Self::Parent => "parent",
            Self::Value => "value",
        }
    }
}

#[derive(Debug, Clone)]
enum Piece {
    Text(String),
    Slot { root: Root, keys: Vec<String>, source: String },
}

/// Renders a JSON string from `{context, parent, value}`, where the parent
/// is the owning structure `P`. Decoding is a no-op.
#[derive(Debug, Clone)]
pub struct StringRenderer<P> {
    pieces: Vec<Piece>,
    parent: PhantomData<fn(&P)>,
}

impl<P> StringRenderer<P> {
    pub fn parse(template: &str) -> Result<Self, RenderError> {
        let mut pieces = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(template) {
            let (Some(whole), Some(root)) = (caps.get(0), caps.get(1)) else { continue };
            push_text(&mut pieces, template, last, whole.start())?;
            let keys = caps
                .get(2)
                .map(|m| m.as_str().split('.').filter(|k| !k.is_empty()).map(str::to_owned).collect())
                .unwrap_or_default();
            pieces.push(Piece::Slot {
                root: Root::parse(root.as_str())?,
                keys,
                source: whole.as_str().to_owned(),
            });
            last = whole.end();
        }
        push_text(&mut pieces, template, last, template.len())?;
        Ok(Self { pieces, parent: PhantomData })
    }

    fn render(&self, data: &Value) -> Result<String, RenderError> {
        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Slot { root, keys, source } => {
                    let found = keys
                        .iter()
                        .try_fold(&data[root.key()], |cur, key| lookup(cur, key))
                        .ok_or_else(|| RenderError::MissingKey(source.clone()))?;
                    match found {
                        Value::String(s) => out.push_str(s),
                        other => out.push_str(&other.to_string()),
                    }
                }
            }
        }
        Ok(out)
    }
}

impl<P, V> TypeMap<V> for StringRenderer<P>
where
    P: Serialize + Any,
    V: Serialize,
{
    fn decode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, _raw: &Value, _dst: &mut V) -> Result<(), ValidationError> {
        Ok(())
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &V) -> Result<RawMessage, Error> {
        let Some(owner) = parent.and_then(|parent| parent.downcast_ref::<P>()) else {
            fault(format!("string renderer for {} used on a different parent", type_name::<P>()))
        };
        let data = json!({
            "context": ctx.value(),
            "parent": serde_json::to_value(owner)?,
            "value": serde_json::to_value(src)?,
        });
        RawMessage::of(&self.render(&data)?)
    }
}

// ---------------------------- Internal helpers ---------------------------- //

/// Literal text between placeholders may not contain stray delimiters.
fn push_text(pieces: &mut Vec<Piece>, template: &str, start: usize, end: usize) -> Result<(), RenderError> {
    let text = &template[start..end];
    if let Some(offset) = text.find("{{").or_else(|| text.find("}}")) {
        return Err(RenderError::Malformed { template: template.to_owned(), offset: start + offset });
    }
    if !text.is_empty() {
        pieces.push(Piece::Text(text.to_owned()));
    }
    Ok(())
}

fn lookup<'v>(cur: &'v Value, key: &str) -> Option<&'v Value> {
    match cur {
        Value::Object(map) => map.get(key),
        Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}
