//! The registry of top-level mappings and the byte-level entry points.
use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use serde_json::Value;
use tracing::{debug, trace};

use crate::context::Context;
use crate::error::{fault, Error, ErrorKind, ValidationError};
use crate::typemap::slice::slice_of;
use crate::typemap::{StructMap, TypeMap};

/// Maps destination types to their registered [`StructMap`].
///
/// Build one at start-up, register every top-level structure, then share it
/// read-only. Registering `T` also makes `Vec<T>`, `Option<T>` and
/// `Box<T>` usable as top-level destinations.
#[derive(Default)]
pub struct TypeMapper {
    maps: IndexMap<TypeId, Entry>,
}

struct Entry {
    type_name: &'static str,
    /// Always an `Arc<dyn TypeMap<X>>` for the `X` keyed by this entry.
    node: Arc<dyn Any + Send + Sync>,
}

impl TypeMapper {
    pub fn new() -> Self { Self::default() }

    pub fn with<T: Any + Default>(mut self, map: Arc<StructMap<T>>) -> Self {
        self.register(map);
        self
    }

    /// Registering a type twice replaces the earlier mapping.
    pub fn register<T: Any + Default>(&mut self, map: Arc<StructMap<T>>) {
        self.insert::<T>(map.clone());
        self.insert::<Vec<T>>(Arc::new(slice_of(map.clone())));
        self.insert::<Option<T>>(map.clone());
        self.insert::<Box<T>>(map);
    }

    pub fn is_registered<T: Any>(&self) -> bool {
        self.maps.contains_key(&TypeId::of::<T>())
    }

    /// Decode `data` into `dst`.
    ///
    /// # Panics
    ///
    /// If no mapping is registered for `D`.
    pub fn unmarshal<D: Any>(&self, ctx: &Context, data: &[u8], dst: &mut D) -> Result<(), Error> {
        let node = self.lookup::<D>();
        trace!(destination = type_name::<D>(), bytes = data.len(), "unmarshal");

        let raw: Value = match serde_json::from_slice(data) {
            Ok(raw) => raw,
            Err(err) if err.is_io() => return Err(err.into()),
            Err(err) => return Err(ValidationError::new(ErrorKind::MalformedJson, err.to_string()).into()),
        };

        let result = node.decode(ctx, None, &raw, dst).map_err(|tree| tree.flatten());
        if let Err(errors) = &result {
            debug!(destination = type_name::<D>(), errors = errors.len(), "unmarshal rejected input");
        }
        trace!(destination = type_name::<D>(), ok = result.is_ok(), "unmarshal done");
        result.map_err(Error::from)
    }

    /// Compact JSON, object keys in field declaration order.
    ///
    /// # Panics
    ///
    /// If no mapping is registered for `S`.
    pub fn marshal<S: Any>(&self, ctx: &Context, src: &S) -> Result<Vec<u8>, Error> {
        let node = self.lookup::<S>();
        trace!(source = type_name::<S>(), "marshal");
        let out = node.encode(ctx, None, src)?;
        trace!(source = type_name::<S>(), bytes = out.as_str().len(), "marshal done");
        Ok(out.into_bytes())
    }

    /// Like [`marshal`](Self::marshal), pretty-printed with `indent` per
    /// nesting level and `prefix` at the start of every line but the first.
    pub fn marshal_indent<S: Any>(&self, ctx: &Context, src: &S, prefix: &str, indent: &str) -> Result<Vec<u8>, Error> {
        let compact = self.marshal(ctx, src)?;
        let value: Value = serde_json::from_slice(&compact)?;

        let mut pretty = Vec::with_capacity(compact.len() * 2);
        let mut ser = Serializer::with_formatter(&mut pretty, PrettyFormatter::with_indent(indent.as_bytes()));
        value.serialize(&mut ser)?;

        if prefix.is_empty() {
            return Ok(pretty);
        }
        let mut out = Vec::with_capacity(pretty.len());
        for byte in pretty {
            out.push(byte);
            if byte == b'\n' {
                out.extend_from_slice(prefix.as_bytes());
            }
        }
        Ok(out)
    }

    fn insert<X: Any>(&mut self, node: Arc<dyn TypeMap<X>>) {
        let entry = Entry { type_name: type_name::<X>(), node: Arc::new(node) };
        if self.maps.insert(TypeId::of::<X>(), entry).is_some() {
            debug!(type_name = type_name::<X>(), "replaced type mapping");
        } else {
            debug!(type_name = type_name::<X>(), "registered type mapping");
        }
    }

    fn lookup<X: Any>(&self) -> &dyn TypeMap<X> {
        let node = self
            .maps
            .get(&TypeId::of::<X>())
            .and_then(|entry| entry.node.downcast_ref::<Arc<dyn TypeMap<X>>>());
        match node {
            Some(node) => &**node,
            None => fault(format!("no TypeMap registered for type: {}", type_name::<X>())),
        }
    }
}

impl fmt::Debug for TypeMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.maps.values().map(|entry| entry.type_name)).finish()
    }
}
