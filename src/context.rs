use std::any::{Any, type_name};
use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Caller-supplied value threaded unchanged through one top-level call.
///
/// The engine never inspects it; string renderers expose it to their
/// templates as `context`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context(Value);

impl Context {
    pub fn empty() -> Self { Self(Value::Null) }

    pub fn new<T: Serialize>(value: T) -> Result<Self, serde_json::Error> {
        Ok(Self(serde_json::to_value(value)?))
    }

    pub fn value(&self) -> &Value { &self.0 }
}

impl From<Value> for Context {
    fn from(value: Value) -> Self { Self(value) }
}

/// An abstract slot: holds some concrete mapped structure whose type is
/// decided at decode time (typically by a discriminated union).
pub struct Dyn {
    inner: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl Dyn {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self { inner: Box::new(value), type_name: type_name::<T>() }
    }

    pub fn is<T: Any>(&self) -> bool { self.inner.is::<T>() }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> { self.inner.downcast_ref() }

    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> { self.inner.downcast_mut() }

    pub fn downcast<T: Any>(self) -> Result<T, Self> {
        let type_name = self.type_name;
        match self.inner.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(inner) => Err(Self { inner, type_name }),
        }
    }

    /// Name of the concrete type held, for diagnostics.
    pub fn type_name(&self) -> &'static str { self.type_name }
}

impl fmt::Debug for Dyn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dyn").field(&self.type_name).finish()
    }
}
