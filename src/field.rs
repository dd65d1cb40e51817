//! Field descriptors: how one member of a structure maps to one JSON key.
use std::any::Any;
use std::fmt;

use serde_json::Value;

use crate::context::Context;
use crate::error::{fault, Error, ValidationError};
use crate::typemap::{FieldNames, Parent, PrimitiveMap, RawMessage, TypeMap};
use crate::validators::Validator;

// ————————————————————————————————————————————————————————————————————————————
// MEMBER ACCESS
// ————————————————————————————————————————————————————————————————————————————

/// Binds a descriptor to a member of `T` holding an `F`, either through a
/// field accessor pair or a fallible getter.
///
/// Prefer the [`member!`](crate::member) macro for plain fields.
pub struct Member<T, F> {
    name: &'static str,
    access: Access<T, F>,
}

type Get<T, F> = Box<dyn Fn(&T) -> &F + Send + Sync>;
type GetMut<T, F> = Box<dyn Fn(&mut T) -> &mut F + Send + Sync>;
type Getter<T, F> = Box<dyn Fn(&T) -> anyhow::Result<F> + Send + Sync>;

enum Access<T, F> {
    Field { get: Get<T, F>, get_mut: GetMut<T, F> },
    Getter(Getter<T, F>),
}

impl<T, F> Member<T, F> {
    pub fn field<G, M>(name: &'static str, get: G, get_mut: M) -> Self
    where
        G: Fn(&T) -> &F + Send + Sync + 'static,
        M: Fn(&mut T) -> &mut F + Send + Sync + 'static,
    {
        Self { name, access: Access::Field { get: Box::new(get), get_mut: Box::new(get_mut) } }
    }

    /// A computed member. Only usable for output: descriptors built from a
    /// getter are always read-only, and a getter error aborts the encode.
    pub fn getter<G>(name: &'static str, call: G) -> Self
    where
        G: Fn(&T) -> anyhow::Result<F> + Send + Sync + 'static,
    {
        Self { name, access: Access::Getter(Box::new(call)) }
    }

    pub fn name(&self) -> &'static str { self.name }

    pub fn is_getter(&self) -> bool { matches!(self.access, Access::Getter(_)) }
}

/// `member!(Type, field)` builds a [`Member`] for a plain struct field.
#[macro_export]
macro_rules! member {
    ($owner:ty, $field:ident) => {
        $crate::Member::field(
            stringify!($field),
            |owner: &$owner| &owner.$field,
            |owner: &mut $owner| &mut owner.$field,
        )
    };
}

// ————————————————————————————————————————————————————————————————————————————
// DESCRIPTOR
// ————————————————————————————————————————————————————————————————————————————

/// One entry of a [`StructMap`](crate::StructMap): external name, member
/// binding, and the node or validator that maps the member's value.
pub struct MappedField<T> {
    json_name: String,
    optional: bool,
    read_only: bool,
    validated: bool,
    binding: Box<dyn Binding<T>>,
}

impl<T: Any> MappedField<T> {
    /// Map the member through a nested node.
    pub fn contains<F, N>(json_name: impl Into<String>, member: Member<T, F>, node: N) -> Self
    where
        F: Default + 'static,
        N: TypeMap<F> + 'static,
    {
        let read_only = member.is_getter();
        Self {
            json_name: json_name.into(),
            optional: false,
            read_only,
            validated: false,
            binding: Box::new(Bound { member, node }),
        }
    }

    /// Map the member through a scalar validator.
    pub fn validated<F, V>(json_name: impl Into<String>, member: Member<T, F>, validator: V) -> Self
    where
        F: Default + 'static,
        V: Validator + 'static,
        PrimitiveMap<V>: TypeMap<F>,
    {
        Self { validated: true, ..Self::contains(json_name, member, PrimitiveMap::new(validator)) }
    }

    /// Absent keys and explicit nulls are skipped on decode.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Never populated by decode, always emitted by encode.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }
}

impl<T> MappedField<T> {
    pub fn json_name(&self) -> &str { &self.json_name }

    pub fn member_name(&self) -> &'static str { self.binding.member_name() }

    pub fn is_optional(&self) -> bool { self.optional }

    pub fn is_read_only(&self) -> bool { self.read_only }

    pub(crate) fn discriminator(&self) -> Option<&'static str> { self.binding.discriminator() }

    pub(crate) fn decode(
        &self,
        ctx: &Context,
        owner: &mut T,
        names: &dyn FieldNames,
        raw: &Value,
    ) -> Result<(), ValidationError> {
        self.binding.decode(ctx, owner, names, raw)
    }

    pub(crate) fn encode(&self, ctx: &Context, owner: &T, names: &dyn FieldNames) -> Result<RawMessage, Error> {
        self.binding.encode(ctx, owner, names)
    }
}

impl<T> fmt::Debug for MappedField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedField")
            .field("json_name", &self.json_name)
            .field("member", &self.binding.member_name())
            .field("validated", &self.validated)
            .field("optional", &self.optional)
            .field("read_only", &self.read_only)
            .finish()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Erases the member type so a struct can hold heterogeneous fields.
trait Binding<T>: Send + Sync {
    fn member_name(&self) -> &'static str;

    fn discriminator(&self) -> Option<&'static str>;

    fn decode(&self, ctx: &Context, owner: &mut T, names: &dyn FieldNames, raw: &Value) -> Result<(), ValidationError>;

    fn encode(&self, ctx: &Context, owner: &T, names: &dyn FieldNames) -> Result<RawMessage, Error>;
}

struct Bound<T, F, N> {
    member: Member<T, F>,
    node: N,
}

impl<T, F, N> Binding<T> for Bound<T, F, N>
where
    T: Any,
    F: Default + 'static,
    N: TypeMap<F>,
{
    fn member_name(&self) -> &'static str { self.member.name }

    fn discriminator(&self) -> Option<&'static str> { self.node.discriminator() }

    fn decode(&self, ctx: &Context, owner: &mut T, names: &dyn FieldNames, raw: &Value) -> Result<(), ValidationError> {
        let Access::Field { get_mut, .. } = &self.member.access else {
            fault(format!("getter-backed member `{}` cannot be decoded", self.member.name))
        };
        // Detach the member so the rest of the owner stays readable as the parent.
        let mut value = std::mem::take(get_mut(owner));
        let result = self.node.decode(ctx, Some(Parent::new(&*owner, names)), raw, &mut value);
        *get_mut(owner) = value;
        result
    }

    fn encode(&self, ctx: &Context, owner: &T, names: &dyn FieldNames) -> Result<RawMessage, Error> {
        let parent = Some(Parent::new(owner, names));
        match &self.member.access {
            Access::Field { get, .. } => self.node.encode(ctx, parent, get(owner)),
            Access::Getter(call) => {
                let value = call(owner).map_err(|source| Error::getter(self.member.name, source))?;
                self.node.encode(ctx, parent, &value)
            }
        }
    }
}
