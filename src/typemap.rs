//! The recursive mapping primitives.
//!
//! A [`TypeMap<T>`] knows how to decode a generic JSON value into a `T` and
//! how to encode a `T` back into a pre-rendered JSON fragment. Nodes are
//! immutable once built and are shared freely (`Arc`) across fields and
//! threads. A single node may implement `TypeMap` for several destination
//! types; [`StructMap<T>`](struct_map::StructMap) for instance also maps
//! `Option<T>` and `Box<T>`, and [`Variant`] adapts any node to one arm of a
//! union slot such as [`Dyn`](crate::Dyn).
pub mod discriminator;
pub mod map;
pub mod primitive;
pub mod render;
pub mod slice;
pub mod struct_map;
pub mod time;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::context::Context;
use crate::error::{Error, ValidationError};

pub use discriminator::{Discriminant, Variant, VariableType};
pub use map::{map_of, MapMap, StringMap};
pub use primitive::PrimitiveMap;
pub use render::{RenderError, StringRenderer};
pub use slice::{slice_of, slice_of_max, slice_of_min, slice_of_range, SliceMap};
pub use struct_map::StructMap;
pub use time::{time, TimeMap};

// ------------------------------ Capability ------------------------------- //

pub trait TypeMap<T>: Send + Sync {
    /// Decode `raw` into `dst`. Errors are returned without a path segment;
    /// the caller attaches the field name or index it knows about.
    fn decode(
        &self,
        ctx: &Context,
        parent: Option<Parent<'_>>,
        raw: &Value,
        dst: &mut T,
    ) -> Result<(), ValidationError>;

    fn encode(
        &self,
        ctx: &Context,
        parent: Option<Parent<'_>>,
        src: &T,
    ) -> Result<RawMessage, Error>;

    /// Member name of the parent's discriminator this node switches on.
    fn discriminator(&self) -> Option<&'static str> { None }
}

impl<T, N> TypeMap<T> for Arc<N>
where
    N: TypeMap<T> + ?Sized,
{
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut T) -> Result<(), ValidationError> {
        (**self).decode(ctx, parent, raw, dst)
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &T) -> Result<RawMessage, Error> {
        (**self).encode(ctx, parent, src)
    }

    fn discriminator(&self) -> Option<&'static str> {
        (**self).discriminator()
    }
}

// -------------------------------- Parent --------------------------------- //

/// Looks up the external (JSON) name mapped to an internal member name.
pub trait FieldNames {
    fn external_name(&self, member: &str) -> Option<&str>;
}

/// Read-only view of the structure that owns the value being mapped.
///
/// While a struct decodes one of its fields, that field is detached, so the
/// view shows every sibling decoded so far (declaration order matters).
#[derive(Clone, Copy)]
pub struct Parent<'a> {
    value: &'a dyn Any,
    type_name: &'static str,
    names: &'a dyn FieldNames,
}

impl<'a> Parent<'a> {
    pub fn new<T: Any>(value: &'a T, names: &'a dyn FieldNames) -> Self {
        Self { value, type_name: std::any::type_name::<T>(), names }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&'a T> {
        self.value.downcast_ref()
    }

    pub fn external_name(&self, member: &str) -> Option<&'a str> {
        self.names.external_name(member)
    }

    pub fn type_name(&self) -> &'static str { self.type_name }
}

impl fmt::Debug for Parent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parent").field("type", &self.type_name).finish_non_exhaustive()
    }
}

// ------------------------------ RawMessage ------------------------------- //

/// A pre-rendered, compact JSON fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage(String);

impl RawMessage {
    pub fn null() -> Self { Self("null".to_owned()) }

    /// Default JSON encoding of any serializable value.
    pub fn of<S: Serialize + ?Sized>(value: &S) -> Result<Self, Error> {
        Ok(Self(serde_json::to_string(value)?))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    pub fn into_bytes(self) -> Vec<u8> { self.0.into_bytes() }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Join already-rendered elements into a JSON array.
pub(crate) fn render_array<I>(items: I) -> RawMessage
where
    I: IntoIterator<Item = RawMessage>,
{
    let mut buf = String::from("[");
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 { buf.push(','); }
        buf.push_str(&item.0);
    }
    buf.push(']');
    RawMessage(buf)
}

/// Join `(key, rendered value)` pairs into a JSON object, in iteration order.
pub(crate) fn render_object<'k, I>(entries: I) -> Result<RawMessage, Error>
where
    I: IntoIterator<Item = (&'k str, RawMessage)>,
{
    let mut buf = String::from("{");
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 { buf.push(','); }
        buf.push_str(&serde_json::to_string(key)?);
        buf.push(':');
        buf.push_str(&value.0);
    }
    buf.push('}');
    Ok(RawMessage(buf))
}
