use serde_json::Value;

use super::{render_array, Parent, RawMessage, TypeMap};
use crate::context::Context;
use crate::error::{Error, ErrorKind, ValidationError};
use crate::path::Segment;

/// Maps a JSON array to a `Vec`, element by element, with optional
/// inclusive length bounds.
#[derive(Debug, Clone)]
pub struct SliceMap<N> {
    contains: N,
    min_len: Option<usize>,
    max_len: Option<usize>,
}

pub fn slice_of<N>(elem: N) -> SliceMap<N> {
    SliceMap { contains: elem, min_len: None, max_len: None }
}

pub fn slice_of_min<N>(elem: N, min: usize) -> SliceMap<N> {
    SliceMap { min_len: Some(min), ..slice_of(elem) }
}

pub fn slice_of_max<N>(elem: N, max: usize) -> SliceMap<N> {
    SliceMap { max_len: Some(max), ..slice_of(elem) }
}

pub fn slice_of_range<N>(elem: N, min: usize, max: usize) -> SliceMap<N> {
    SliceMap { min_len: Some(min), max_len: Some(max), ..slice_of(elem) }
}

impl<N> SliceMap<N> {
    fn check_len(&self, len: usize) -> Result<(), ValidationError> {
        let message = match (self.min_len, self.max_len) {
            (None, None) => return Ok(()),
            (Some(min), None) if len < min => format!("must have at least {min} elements"),
            (None, Some(max)) if len > max => format!("must have at most {max} elements"),
            (Some(min), Some(max)) if min == max && len != max => format!("must have {max} elements"),
            (Some(min), Some(max)) if len < min || len > max => {
                format!("must have between {min} and {max} elements")
            }
            _ => return Ok(()),
        };
        Err(ValidationError::new(ErrorKind::LengthOutOfRange, message))
    }

    /// Decode every element into a fresh slot. Nothing is returned unless
    /// all elements succeed.
    fn decode_elements<E>(
        &self,
        ctx: &Context,
        parent: Option<Parent<'_>>,
        raw: &Value,
    ) -> Result<Vec<E>, ValidationError>
    where
        E: Default,
        N: TypeMap<E>,
    {
        let Value::Array(data) = raw else {
            return Err(ValidationError::expected_list());
        };
        self.check_len(data.len())?;

        let mut errs = ValidationError::nested();
        let mut out = Vec::with_capacity(data.len());
        for (i, val) in data.iter().enumerate() {
            let mut elem = E::default();
            match self.contains.decode(ctx, parent, val, &mut elem) {
                Ok(()) => out.push(elem),
                Err(err) => errs.push(err.at(Segment::Index(i))),
            }
        }
        errs.into_result().map(|()| out)
    }

    fn encode_elements<E>(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &[E]) -> Result<RawMessage, Error>
    where
        N: TypeMap<E>,
    {
        let items = src
            .iter()
            .map(|elem| self.contains.encode(ctx, parent, elem))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(render_array(items))
    }
}

impl<E, N> TypeMap<Vec<E>> for SliceMap<N>
where
    E: Default,
    N: TypeMap<E>,
{
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut Vec<E>) -> Result<(), ValidationError> {
        *dst = self.decode_elements(ctx, parent, raw)?;
        Ok(())
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &Vec<E>) -> Result<RawMessage, Error> {
        self.encode_elements(ctx, parent, src)
    }

    fn discriminator(&self) -> Option<&'static str> {
        self.contains.discriminator()
    }
}

/// `None` is the nil list: left alone by a `null` input, encoded as `null`.
impl<E, N> TypeMap<Option<Vec<E>>> for SliceMap<N>
where
    E: Default,
    N: TypeMap<E>,
{
    fn decode(&self, ctx: &Context, parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<Vec<E>>) -> Result<(), ValidationError> {
        if raw.is_null() {
            return Ok(());
        }
        *dst = Some(self.decode_elements(ctx, parent, raw)?);
        Ok(())
    }

    fn encode(&self, ctx: &Context, parent: Option<Parent<'_>>, src: &Option<Vec<E>>) -> Result<RawMessage, Error> {
        match src {
            Some(items) => self.encode_elements(ctx, parent, items),
            None => Ok(RawMessage::null()),
        }
    }

    fn discriminator(&self) -> Option<&'static str> {
        self.contains.discriminator()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::typemap::PrimitiveMap;
    use crate::validators::string;

    fn strings(max: usize) -> PrimitiveMap<crate::validators::StringValidator> {
        PrimitiveMap::new(string(1, max))
    }

    #[test]
    fn decodes_in_order() {
        let mut dst: Vec<String> = vec!["old".into()];
        slice_of(strings(5)).decode(&Context::empty(), None, &json!(["a", "b"]), &mut dst).unwrap();
        assert_eq!(dst, vec!["a", "b"]);
    }

    #[test]
    fn element_errors_are_indexed_and_nothing_is_committed() {
        let mut dst: Vec<String> = vec!["old".into()];
        let err = slice_of(strings(3))
            .decode(&Context::empty(), None, &json!(["ok", "too long", 5]), &mut dst)
            .unwrap_err();
        let flat = err.flatten();
        let paths: Vec<_> = flat.errors().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/1", "/2"]);
        assert_eq!(dst, vec!["old"]);
    }

    #[test]
    fn non_list_is_rejected() {
        let mut dst: Vec<String> = Vec::new();
        let err = slice_of(strings(3)).decode(&Context::empty(), None, &json!({}), &mut dst).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExpectedList);
        assert_eq!(err.message(), "expected a list");
    }

    #[test]
    fn length_bounds_run_before_elements() {
        let ctx = Context::empty();
        let mut dst: Vec<String> = Vec::new();
        let cases = [
            (slice_of_min(strings(3), 2), json!([""]), "must have at least 2 elements"),
            (slice_of_max(strings(3), 1), json!(["a", "b"]), "must have at most 1 elements"),
            (slice_of_range(strings(3), 2, 2), json!(["a"]), "must have 2 elements"),
            (slice_of_range(strings(3), 1, 2), json!([]), "must have between 1 and 2 elements"),
        ];
        for (map, raw, expected) in cases {
            let err = map.decode(&ctx, None, &raw, &mut dst).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::LengthOutOfRange);
            assert_eq!(err.message(), expected);
        }
        slice_of_range(strings(3), 1, 2).decode(&ctx, None, &json!(["a", "b"]), &mut dst).unwrap();
    }

    #[test]
    fn nil_list_encodes_as_null() {
        let map = slice_of(strings(3));
        let ctx = Context::empty();
        let mut dst: Option<Vec<String>> = None;
        map.decode(&ctx, None, &json!(null), &mut dst).unwrap();
        assert_eq!(map.encode(&ctx, None, &dst).unwrap(), RawMessage::null());
        dst = Some(vec!["x".into(), "y".into()]);
        assert_eq!(map.encode(&ctx, None, &dst).unwrap().as_str(), r#"["x","y"]"#);
    }
}
