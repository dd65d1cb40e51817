//! Declarative JSON mapping with path-qualified validation errors.
//!
//! A structure is described once by a [`StructMap`]: an ordered list of
//! [`MappedField`]s, each binding a member to a JSON key and to either a
//! nested node or a scalar validator. Nodes compose (slices, string-keyed
//! maps, discriminated unions, timestamps, rendered strings) and are
//! registered with a [`TypeMapper`], the entry point for `unmarshal`,
//! `marshal` and `marshal_indent`.
//!
//! Decoding never stops at the first bad value. Every failure is recorded
//! in a [`ValidationError`] tree and returned as a flat list of JSON
//! Pointer paths with messages, such as `/inner_things/0/foo: not a string`.
//! A broken mapping configuration (an unregistered type, a union read from
//! the wrong parent, a union declared before its discriminator) is not an
//! input problem and panics instead.
pub mod context;
pub mod error;
pub mod field;
pub mod mapper;
pub mod path;
pub mod typemap;
pub mod validators;

pub use context::{Context, Dyn};
pub use error::{Error, ErrorKind, PathError, ValidationError, ValidationErrors};
pub use field::{MappedField, Member};
pub use mapper::TypeMapper;
pub use path::{Path, Segment};
pub use typemap::discriminator::{Discriminant, Variant, VariableType};
pub use typemap::map::{map_of, MapMap, StringMap};
pub use typemap::primitive::PrimitiveMap;
pub use typemap::render::{RenderError, StringRenderer};
pub use typemap::slice::{slice_of, slice_of_max, slice_of_min, slice_of_range, SliceMap};
pub use typemap::struct_map::StructMap;
pub use typemap::time::{time, TimeMap};
pub use typemap::{FieldNames, Parent, RawMessage, TypeMap};
