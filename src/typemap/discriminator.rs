//! Discriminated unions: a sibling member selects the node for a field.
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use super::{Parent, RawMessage, StructMap, TypeMap};
use crate::context::{Context, Dyn};
use crate::error::{fault, Error, ErrorKind, ValidationError};
use crate::validators::{one_of, OneOf};

// ------------------------------ Discriminant ----------------------------- //

/// A member usable as a union discriminator: anything with a string form.
///
/// Implement this for enums that name their variants.
pub trait Discriminant {
    fn discriminant(&self) -> Cow<'_, str>;
}

impl Discriminant for str {
    fn discriminant(&self) -> Cow<'_, str> { Cow::Borrowed(self) }
}

impl Discriminant for String {
    fn discriminant(&self) -> Cow<'_, str> { Cow::Borrowed(self) }
}

impl<T: Discriminant + ?Sized> Discriminant for &T {
    fn discriminant(&self) -> Cow<'_, str> { (**self).discriminant() }
}

impl<T: Discriminant + ?Sized> Discriminant for Box<T> {
    fn discriminant(&self) -> Cow<'_, str> { (**self).discriminant() }
}

/// `None` reads as the empty key.
impl<T: Discriminant> Discriminant for Option<T> {
    fn discriminant(&self) -> Cow<'_, str> {
        match self {
            Some(inner) => inner.discriminant(),
            None => Cow::Borrowed(""),
        }
    }
}

// ------------------------------ VariableType ----------------------------- //

type KeyOf = Box<dyn Fn(Parent<'_>) -> Option<String> + Send + Sync>;

/// Maps an `Option<S>` slot whose concrete shape is chosen by the current
/// value of a sibling member of the parent structure.
///
/// The discriminator member must be mapped (and therefore decoded) before
/// the union field; [`StructMap::new`] enforces that order.
pub struct VariableType<S> {
    property: &'static str,
    key: KeyOf,
    mapping: IndexMap<String, Arc<dyn TypeMap<Option<S>>>>,
}

impl<S: 'static> VariableType<S> {
    /// Switch on member `property` of parent type `P`, read through `get`.
    pub fn new<P, K, G>(property: &'static str, get: G) -> Self
    where
        P: Any,
        K: Discriminant + ?Sized,
        G: Fn(&P) -> &K + Send + Sync + 'static,
    {
        let key = move |parent: Parent<'_>| {
            parent.downcast_ref::<P>().map(|owner| get(owner).discriminant().into_owned())
        };
        Self { property, key: Box::new(key), mapping: IndexMap::new() }
    }

    pub fn variant<N>(mut self, key: impl Into<String>, node: N) -> Self
    where
        N: TypeMap<Option<S>> + 'static,
    {
        self.mapping.insert(key.into(), Arc::new(node));
        self
    }

    pub fn property(&self) -> &'static str { self.property }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.mapping.keys().map(String::as_str)
    }

    /// Accepts exactly the keys this union knows, for validating the
    /// discriminator member itself.
    pub fn keys_validator(&self) -> OneOf {
        one_of(self.keys())
    }

    fn pick(&self, parent: Option<Parent<'_>>) -> Result<&dyn TypeMap<Option<S>>, ValidationError> {
        let Some(parent) = parent else {
            fault(format!("union on `{}` used outside of a structure", self.property))
        };
        let Some(key) = (self.key)(parent) else {
            fault(format!(
                "union on `{}` cannot read its discriminator from {}",
                self.property,
                parent.type_name(),
            ))
        };

        if let Some(node) = self.mapping.get(&key) {
            return Ok(node.as_ref());
        }

        let message = if !key.is_empty() {
            format!("invalid type identifier: '{key}'")
        } else if let Some(json_name) = parent.external_name(self.property) {
            format!("cannot validate, invalid input for '{json_name}'")
        } else {
            "invalid type identifier".to_owned()
        };
        Err(ValidationError::new(ErrorKind::UnknownDiscriminator, message))
    }
}

impl VariableType<Dyn> {
    /// Register a structure as one concrete shape of a [`Dyn`] slot.
    pub fn dynamic<T>(self, key: impl Into<String>, node: Arc<StructMap<T>>) -> Self
    where
        T: Any + Default + Send + Sync,
    {
        self.variant(key, Variant::<_, T, Dyn>::dynamic(node))
    }
}

impl<S: 'static> TypeMap<Option<S>> for VariableType<S> {
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<S>) -> Result<(), ValidationError> {
        self.pick(parent)?.decode(ctx, parent, raw, dst)
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &Option<S>) -> Result<RawMessage, Error> {
        if src.is_none() {
            return Ok(RawMessage::null());
        }
        match self.pick(parent) {
            Ok(node) => node.encode(ctx, parent, src),
            Err(err) => fault(format!("union on `{}` holds a value it cannot encode: {err}", self.property)),
        }
    }

    fn discriminator(&self) -> Option<&'static str> { Some(self.property) }
}

impl<S> fmt::Debug for VariableType<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VariableType")
            .field("property", &self.property)
            .field("keys", &self.mapping.keys().collect::<Vec<_>>())
            .finish()
    }
}

// -------------------------------- Variant -------------------------------- //

/// Adapts a node for `T` to one arm of a union slot `Option<S>`, where `S`
/// is typically an enum with one variant per shape, or [`Dyn`].
pub struct Variant<N, T, S> {
    node: N,
    wrap: fn(T) -> S,
    unwrap: fn(&S) -> Option<&T>,
}

impl<N, T, S> Variant<N, T, S>
where
    N: TypeMap<T>,
{
    pub fn new(node: N, wrap: fn(T) -> S, unwrap: fn(&S) -> Option<&T>) -> Self {
        Self { node, wrap, unwrap }
    }
}

impl<N, T> Variant<N, T, Dyn>
where
    N: TypeMap<T>,
    T: Any + Send + Sync,
{
    pub fn dynamic(node: N) -> Self {
        Self { node, wrap: Dyn::new, unwrap: Dyn::downcast_ref }
    }
}

/// Decode always builds a fresh `T`, replacing whatever the slot held.
impl<N, T, S> TypeMap<Option<S>> for Variant<N, T, S>
where
    N: TypeMap<T>,
    T: Default,
{
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<S>) -> Result<(), ValidationError> {
        if raw.is_null() {
            return Ok(());
        }
        let mut value = T::default();
        let result = self.node.decode(ctx, parent, raw, &mut value);
        *dst = Some((self.wrap)(value));
        result
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &Option<S>) -> Result<RawMessage, Error> {
        let Some(held) = src else {
            return Ok(RawMessage::null());
        };
        match (self.unwrap)(held) {
            Some(value) => self.node.encode(ctx, parent, value),
            None => fault(format!("union slot holds a different shape than {}", std::any::type_name::<T>())),
        }
    }

    fn discriminator(&self) -> Option<&'static str> { self.node.discriminator() }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::field::MappedField;
    use crate::member;
    use crate::validators::{integer, string, Validator};

    #[derive(Debug, Default, PartialEq)]
    struct Circle {
        radius: i64,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Label {
        text: String,
    }

    #[derive(Debug, PartialEq)]
    enum Shape {
        Circle(Circle),
        Label(Label),
    }

    #[derive(Debug, Default)]
    struct Drawing {
        kind: String,
        shape: Option<Shape>,
    }

    fn circle_map() -> Arc<StructMap<Circle>> {
        Arc::new(StructMap::new(vec![MappedField::validated("radius", member!(Circle, radius), integer(1, 100))]))
    }

    fn label_map() -> Arc<StructMap<Label>> {
        Arc::new(StructMap::new(vec![MappedField::validated("text", member!(Label, text), string(1, 10))]))
    }

    fn shapes() -> VariableType<Shape> {
        VariableType::new("kind", |d: &Drawing| &d.kind)
            .variant("circle", Variant::new(circle_map(), Shape::Circle, |s| match s {
                Shape::Circle(c) => Some(c),
                _ => None,
            }))
            .variant("label", Variant::new(label_map(), Shape::Label, |s| match s {
                Shape::Label(l) => Some(l),
                _ => None,
            }))
    }

    fn drawing_map() -> StructMap<Drawing> {
        let union = shapes();
        StructMap::new(vec![
            MappedField::validated("type", member!(Drawing, kind), union.keys_validator()),
            MappedField::contains("shape", member!(Drawing, shape), union),
        ])
    }

    #[test]
    fn decodes_the_selected_shape() {
        let map = drawing_map();
        let mut dst = Drawing::default();
        map.decode(&Context::empty(), None, &json!({ "type": "label", "shape": { "text": "hi" } }), &mut dst)
            .unwrap();
        assert_eq!(dst.shape, Some(Shape::Label(Label { text: "hi".into() })));

        let out = map.encode(&Context::empty(), None, &dst).unwrap();
        assert_eq!(out.as_str(), r#"{"type":"label","shape":{"text":"hi"}}"#);
    }

    #[test]
    fn unknown_key_is_reported() {
        let map = StructMap::new(vec![
            MappedField::validated("type", member!(Drawing, kind), string(0, 10)),
            MappedField::contains("shape", member!(Drawing, shape), shapes()),
        ]);
        let mut dst = Drawing::default();
        let err = map
            .decode(&Context::empty(), None, &json!({ "type": "bar", "shape": {} }), &mut dst)
            .unwrap_err();
        let flat = err.flatten();
        assert_eq!(flat.errors()[0].path, "/shape");
        assert_eq!(flat.errors()[0].message, "invalid type identifier: 'bar'");
        assert_eq!(flat.errors()[0].kind, ErrorKind::UnknownDiscriminator);
    }

    #[test]
    fn empty_key_names_the_json_field() {
        let map = StructMap::new(vec![
            MappedField::validated("type", member!(Drawing, kind), string(0, 10)).optional(),
            MappedField::contains("shape", member!(Drawing, shape), shapes()),
        ]);
        let mut dst = Drawing::default();
        let err = map.decode(&Context::empty(), None, &json!({ "shape": {} }), &mut dst).unwrap_err();
        assert_eq!(err.flatten().errors()[0].message, "cannot validate, invalid input for 'type'");
    }

    #[test]
    fn empty_key_without_mapped_discriminator() {
        let map = StructMap::new(vec![MappedField::contains("shape", member!(Drawing, shape), shapes())]);
        let mut dst = Drawing::default();
        let err = map.decode(&Context::empty(), None, &json!({ "shape": {} }), &mut dst).unwrap_err();
        assert_eq!(err.flatten().errors()[0].message, "invalid type identifier");
    }

    #[test]
    fn absent_value_encodes_as_null() {
        let map = drawing_map();
        let out = map.encode(&Context::empty(), None, &Drawing::default()).unwrap();
        assert_eq!(out.as_str(), r#"{"type":"","shape":null}"#);
    }

    #[test]
    fn dynamic_slots_hold_concrete_structures() {
        #[derive(Debug, Default)]
        struct Holder {
            kind: Option<String>,
            body: Option<Dyn>,
        }

        let map = StructMap::new(vec![
            MappedField::validated("kind", member!(Holder, kind), string(1, 10).nullable()),
            MappedField::contains(
                "body",
                member!(Holder, body),
                VariableType::<Dyn>::new("kind", |h: &Holder| &h.kind)
                    .dynamic("circle", circle_map())
                    .dynamic("label", label_map()),
            ),
        ]);

        let mut dst = Holder::default();
        map.decode(&Context::empty(), None, &json!({ "kind": "circle", "body": { "radius": 3 } }), &mut dst)
            .unwrap();
        let body = dst.body.as_ref().unwrap();
        assert_eq!(body.downcast_ref::<Circle>(), Some(&Circle { radius: 3 }));

        let out = map.encode(&Context::empty(), None, &dst).unwrap();
        assert_eq!(out.as_str(), r#"{"kind":"circle","body":{"radius":3}}"#);
    }

    #[test]
    #[should_panic(expected = "jsonmap fault")]
    fn discriminator_must_come_first() {
        StructMap::new(vec![
            MappedField::contains("shape", member!(Drawing, shape), shapes()),
            MappedField::validated("type", member!(Drawing, kind), string(0, 10)),
        ]);
    }

    #[test]
    #[should_panic(expected = "holds a value it cannot encode")]
    fn encoding_an_unresolvable_union_faults() {
        let map = drawing_map();
        let dst = Drawing { kind: "gone".into(), shape: Some(Shape::Circle(Circle { radius: 1 })) };
        let _ = map.encode(&Context::empty(), None, &dst);
    }
}
