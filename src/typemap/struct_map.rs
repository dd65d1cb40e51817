use std::any::{Any, type_name};

use serde_json::Value;

use super::{render_object, FieldNames, Parent, RawMessage, TypeMap};
use crate::context::Context;
use crate::error::{fault, Error, ValidationError};
use crate::field::MappedField;
use crate::path::Segment;

/// Maps a structure to a JSON object through an ordered list of field
/// descriptors. Encoded objects list keys in declaration order.
///
/// Besides `T` itself, the same node maps the nilable forms `Option<T>` and
/// `Option<Box<T>>` (JSON `null` leaves them untouched on decode and is
/// emitted for `None`) and `Box<T>`.
#[derive(Debug)]
pub struct StructMap<T> {
    fields: Vec<MappedField<T>>,
}

impl<T: Any + Default> StructMap<T> {
    /// # Panics
    ///
    /// If a discriminated union field is declared before the field holding
    /// its discriminator: the union would always see an undecoded key.
    pub fn new(fields: Vec<MappedField<T>>) -> Self {
        for (i, field) in fields.iter().enumerate() {
            let Some(property) = field.discriminator() else { continue };
            let keyed_later = fields[i + 1..]
                .iter()
                .any(|later| later.member_name() == property && !later.is_read_only());
            if keyed_later {
                fault(format!(
                    "{}: field `{}` switches on `{property}`, which must be declared before it",
                    type_name::<T>(),
                    field.json_name(),
                ));
            }
        }
        Self { fields }
    }

    pub fn fields(&self) -> &[MappedField<T>] { &self.fields }

    pub fn type_name(&self) -> &'static str { type_name::<T>() }

    /// Decode every writable field, collecting all field errors.
    fn decode_fields(&self, ctx: &Context, raw: &Value, dst: &mut T) -> Result<(), ValidationError> {
        let Value::Object(data) = raw else {
            return Err(ValidationError::expected_object());
        };

        let mut errs = ValidationError::nested();
        for field in &self.fields {
            if field.is_read_only() {
                continue;
            }
            let json_name = field.json_name();
            let val = match data.get(json_name) {
                None if field.is_optional() => continue,
                None => {
                    errs.push(ValidationError::missing_required_field().at(Segment::Field(json_name.to_owned())));
                    continue;
                }
                Some(Value::Null) if field.is_optional() => continue,
                Some(val) => val,
            };
            if let Err(err) = field.decode(ctx, dst, self, val) {
                errs.push(err.at(Segment::Field(json_name.to_owned())));
            }
        }
        errs.into_result()
    }

    fn encode_fields(&self, ctx: &Context, src: &T) -> Result<RawMessage, Error> {
        let mut entries = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            entries.push((field.json_name(), field.encode(ctx, src, self)?));
        }
        render_object(entries)
    }
}

impl<T> FieldNames for StructMap<T> {
    fn external_name(&self, member: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|field| field.member_name() == member)
            .map(|field| field.json_name())
    }
}

// ---------------------------- Destinations ------------------------------- //

impl<T> TypeMap<T> for StructMap<T>
where
    T: Any + Default,
{
    fn decode(&self, ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut T) -> Result<(), ValidationError> {
        self.decode_fields(ctx, raw, dst)
    }

    fn encode(&self, ctx: &Context, _parent: Option<Parent<'_>>, src: &T) -> Result<RawMessage, Error> {
        self.encode_fields(ctx, src)
    }
}

impl<T> TypeMap<Box<T>> for StructMap<T>
where
    T: Any + Default,
{
    fn decode(&self, ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut Box<T>) -> Result<(), ValidationError> {
        self.decode_fields(ctx, raw, dst)
    }

    fn encode(&self, ctx: &Context, _parent: Option<Parent<'_>>, src: &Box<T>) -> Result<RawMessage, Error> {
        self.encode_fields(ctx, src)
    }
}

impl<T> TypeMap<Option<T>> for StructMap<T>
where
    T: Any + Default,
{
    fn decode(&self, ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<T>) -> Result<(), ValidationError> {
        if raw.is_null() {
            return Ok(());
        }
        self.decode_fields(ctx, raw, dst.insert(T::default()))
    }

    fn encode(&self, ctx: &Context, _parent: Option<Parent<'_>>, src: &Option<T>) -> Result<RawMessage, Error> {
        match src {
            Some(value) => self.encode_fields(ctx, value),
            None => Ok(RawMessage::null()),
        }
    }
}

impl<T> TypeMap<Option<Box<T>>> for StructMap<T>
where
    T: Any + Default,
{
    fn decode(&self, ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<Box<T>>) -> Result<(), ValidationError> {
        if raw.is_null() {
            return Ok(());
        }
        self.decode_fields(ctx, raw, dst.insert(Box::default()))
    }

    fn encode(&self, ctx: &Context, _parent: Option<Parent<'_>>, src: &Option<Box<T>>) -> Result<RawMessage, Error> {
        match src {
            Some(value) => self.encode_fields(ctx, value),
            None => Ok(RawMessage::null()),
        }
    }
}

// ------------------------------- Tests ------------------------------------ //

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::field::Member;
    use crate::member;
    use crate::validators::{boolean, integer, string};

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Inner {
        foo: String,
        an_int: i64,
        a_bool: bool,
    }

    #[derive(Debug, Default, PartialEq)]
    struct Outer {
        bar: String,
        inner: Inner,
        next: Option<Box<Outer>>,
        id: String,
    }

    fn inner_map() -> Arc<StructMap<Inner>> {
        Arc::new(StructMap::new(vec![
            MappedField::validated("foo", member!(Inner, foo), string(1, 12)).optional(),
            MappedField::validated("an_int", member!(Inner, an_int), integer(0, 10)).optional(),
            MappedField::validated("a_bool", member!(Inner, a_bool), boolean()).optional(),
        ]))
    }

    fn outer_map() -> Arc<StructMap<Outer>> {
        Arc::new(StructMap::new(vec![
            MappedField::validated("bar", member!(Outer, bar), string(1, 255)),
            MappedField::contains("inner", member!(Outer, inner), inner_map()),
            MappedField::contains("next", member!(Outer, next), Arc::new(StructMap::new(vec![
                MappedField::validated("bar", member!(Outer, bar), string(1, 255)),
            ]))).optional(),
            MappedField::validated("id", member!(Outer, id), string(0, 64)).read_only(),
        ]))
    }

    fn decode<T: Any + Default>(map: &StructMap<T>, raw: serde_json::Value) -> (T, Result<(), ValidationError>) {
        let mut dst = T::default();
        let result = map.decode(&Context::empty(), None, &raw, &mut dst);
        (dst, result)
    }

    #[test]
    fn decodes_nested_structures() {
        let (outer, result) = decode(&outer_map(), json!({
            "bar": "bazam",
            "inner": { "foo": "fooz", "an_int": 10, "a_bool": true },
            "next": { "bar": "again" },
        }));
        result.unwrap();
        assert_eq!(outer.bar, "bazam");
        assert_eq!(outer.inner, Inner { foo: "fooz".into(), an_int: 10, a_bool: true });
        assert_eq!(outer.next.as_ref().map(|next| next.bar.as_str()), Some("again"));
    }

    #[test]
    fn collects_every_field_error() {
        let (_, result) = decode(&outer_map(), json!({
            "inner": { "foo": "", "an_int": 12.5 },
        }));
        let flat = result.unwrap_err().flatten();
        let pairs: Vec<_> = flat.errors().iter().map(|e| (e.path.as_str(), e.message.as_str())).collect();
        assert_eq!(pairs, vec![
            ("/bar", "missing required field"),
            ("/inner/foo", "too short, must be at least 1 characters"),
            ("/inner/an_int", "not an integer"),
        ]);
        assert_eq!(flat.errors()[0].kind, ErrorKind::MissingRequiredField);
    }

    #[test]
    fn non_object_input_is_rejected() {
        for raw in [json!([]), json!("x"), json!(null)] {
            let (_, result) = decode(&inner_map(), raw);
            assert_eq!(result.unwrap_err().kind(), ErrorKind::ExpectedObject);
        }
    }

    #[test]
    fn optional_fields_keep_prior_values() {
        let map = inner_map();
        let mut dst = Inner { foo: "keep".into(), an_int: 3, a_bool: true };
        map.decode(&Context::empty(), None, &json!({ "an_int": null }), &mut dst).unwrap();
        assert_eq!(dst, Inner { foo: "keep".into(), an_int: 3, a_bool: true });
    }

    #[test]
    fn read_only_fields_are_never_decoded_but_always_encoded() {
        let map = outer_map();
        let mut dst = Outer { id: "fixed".into(), ..Outer::default() };
        map.decode(&Context::empty(), None, &json!({ "bar": "b", "inner": {}, "id": "hijack" }), &mut dst).unwrap();
        assert_eq!(dst.id, "fixed");

        let out = TypeMap::<Outer>::encode(&*map, &Context::empty(), None, &dst).unwrap();
        assert_eq!(
            out.as_str(),
            r#"{"bar":"b","inner":{"foo":"","an_int":0,"a_bool":false},"next":null,"id":"fixed"}"#,
        );
    }

    #[test]
    fn nilable_destinations() {
        let map = inner_map();
        let ctx = Context::empty();

        let mut slot: Option<Inner> = None;
        map.decode(&ctx, None, &json!(null), &mut slot).unwrap();
        assert!(slot.is_none());
        assert_eq!(map.encode(&ctx, None, &slot).unwrap(), RawMessage::null());

        map.decode(&ctx, None, &json!({ "foo": "x" }), &mut slot).unwrap();
        assert_eq!(slot.as_ref().map(|s| s.foo.as_str()), Some("x"));

        let mut boxed: Box<Inner> = Box::default();
        map.decode(&ctx, None, &json!({ "an_int": 2 }), &mut boxed).unwrap();
        assert_eq!(boxed.an_int, 2);
    }

    #[test]
    fn getter_fields_are_encoded_and_read_only() {
        let map = StructMap::new(vec![
            MappedField::validated("foo", member!(Inner, foo), string(0, 10)),
            MappedField::validated(
                "shout",
                Member::getter("shout", |inner: &Inner| Ok(inner.foo.to_uppercase())),
                string(0, 10),
            ),
        ]);
        assert!(map.fields()[1].is_read_only());

        let (inner, result) = decode(&map, json!({ "foo": "hi" }));
        result.unwrap();
        let out = map.encode(&Context::empty(), None, &inner).unwrap();
        assert_eq!(out.as_str(), r#"{"foo":"hi","shout":"HI"}"#);
    }

    #[test]
    fn getter_error_aborts_encode() {
        let map = StructMap::new(vec![
            MappedField::validated(
                "broken",
                Member::getter("broken", |_: &Inner| -> anyhow::Result<String> { anyhow::bail!("no value") }),
                string(0, 10),
            ),
        ]);
        let err = map.encode(&Context::empty(), None, &Inner::default()).unwrap_err();
        assert!(matches!(err, Error::Getter { member: "broken", .. }));
    }

    #[test]
    fn external_names_resolve_by_member() {
        let map = inner_map();
        assert_eq!(map.external_name("an_int"), Some("an_int"));
        assert_eq!(map.external_name("missing"), None);
    }
}
