use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use indexmap::IndexMap;
use serde_json::Value;

use super::{render_object, Parent, RawMessage, TypeMap};
use crate::context::Context;
use crate::error::{Error, ValidationError};
use crate::path::Segment;

/// Maps a JSON object with arbitrary keys to a string-keyed map.
#[derive(Debug, Clone)]
pub struct MapMap<N> {
    contains: N,
}

pub fn map_of<N>(elem: N) -> MapMap<N> {
    MapMap { contains: elem }
}

/// String-keyed containers a [`MapMap`] can fill.
pub trait StringMap: Default {
    type Elem: Default;

    fn insert_entry(&mut self, key: String, value: Self::Elem);

    fn entries(&self) -> impl Iterator<Item = (&str, &Self::Elem)>;
}

impl<E: Default, S: BuildHasher + Default> StringMap for HashMap<String, E, S> {
    type Elem = E;

    fn insert_entry(&mut self, key: String, value: E) {
        self.insert(key, value);
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &E)> {
        self.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<E: Default, S: BuildHasher + Default> StringMap for IndexMap<String, E, S> {
    type Elem = E;

    fn insert_entry(&mut self, key: String, value: E) {
        self.insert(key, value);
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &E)> {
        self.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<E: Default> StringMap for BTreeMap<String, E> {
    type Elem = E;

    fn insert_entry(&mut self, key: String, value: E) {
        self.insert(key, value);
    }

    fn entries(&self) -> impl Iterator<Item = (&str, &E)> {
        self.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<N> MapMap<N> {
    /// Build a fresh map from every key that decodes, with the errors of the
    /// keys that did not.
    fn decode_entries<M>(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value) -> (M, Result<(), ValidationError>)
    where
        M: StringMap,
        N: TypeMap<M::Elem>,
    {
        let Value::Object(data) = raw else {
            return (M::default(), Err(ValidationError::expected_map()));
        };

        let mut errs = ValidationError::nested();
        let mut out = M::default();
        for (key, val) in data {
            let mut elem = M::Elem::default();
            match self.contains.decode(ctx, parent, val, &mut elem) {
                Ok(()) => out.insert_entry(key.clone(), elem),
                Err(err) => errs.push(err.at(Segment::Key(key.clone()))),
            }
        }
        (out, errs.into_result())
    }

    fn encode_entries<M>(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &M) -> Result<RawMessage, Error>
    where
        M: StringMap,
        N: TypeMap<M::Elem>,
    {
        let mut entries = Vec::new();
        for (key, elem) in src.entries() {
            entries.push((key, self.contains.encode(ctx, parent, elem)?));
        }
        render_object(entries)
    }
}

/// Decode replaces the destination with a freshly built map (keys in input
/// order where the container keeps order). Encode emits entries in the
/// container's own iteration order, so `HashMap` output order is arbitrary.
impl<M, N> TypeMap<M> for MapMap<N>
where
    M: StringMap,
    N: TypeMap<M::Elem>,
{
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut M) -> Result<(), ValidationError> {
        if !raw.is_object() {
            return Err(ValidationError::expected_map());
        }
        let (out, result) = self.decode_entries(ctx, parent, raw);
        *dst = out;
        result
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &M) -> Result<RawMessage, Error> {
        self.encode_entries(ctx, parent, src)
    }

    fn discriminator(&self) -> Option<&'static str> {
        self.contains.discriminator()
    }
}

/// `None` is the nil map: left alone by a `null` input, encoded as `null`.
impl<M, N> TypeMap<Option<M>> for MapMap<N>
where
    M: StringMap,
    N: TypeMap<M::Elem>,
{
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<M>) -> Result<(), ValidationError> {
        if raw.is_null() {
            return Ok(());
        }
        if !raw.is_object() {
            return Err(ValidationError::expected_map());
        }
        let (out, result) = self.decode_entries(ctx, parent, raw);
        *dst = Some(out);
        result
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &Option<M>) -> Result<RawMessage, Error> {
        match src {
            Some(entries) => self.encode_entries(ctx, parent, entries),
            None => Ok(RawMessage::null()),
        }
    }

    fn discriminator(&self) -> Option<&'static str> {
        self.contains.discriminator()
    }
}
