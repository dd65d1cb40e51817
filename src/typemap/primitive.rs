use serde::Serialize;
use serde_json::Value;

use super::{Parent, RawMessage, TypeMap};
use crate::context::Context;
use crate::error::{Error, ValidationError};
use crate::validators::Validator;

/// Leaf node: runs a validator on decode, default JSON encoding on encode.
#[derive(Debug, Clone)]
pub struct PrimitiveMap<V> {
    validator: V,
}

impl<V: Validator> PrimitiveMap<V> {
    pub fn new(validator: V) -> Self { Self { validator } }

    pub fn validator(&self) -> &V { &self.validator }
}

impl<V> TypeMap<V::Output> for PrimitiveMap<V>
where
    V: Validator,
    V::Output: Serialize,
{
    fn decode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut V::Output) -> Result<(), ValidationError> {
        let value = self.validator.validate(raw)?;
        if self.validator.assigns(&value) {
            *dst = value;
        }
        Ok(())
    }

    fn encode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, src: &V::Output) -> Result<RawMessage, Error> {
        RawMessage::of(src)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::validators::{any_value, integer, string};

    #[test]
    fn assigns_only_on_success() {
        let map = PrimitiveMap::new(integer(0, 10));
        let ctx = Context::empty();
        let mut dst = 4_i64;
        map.decode(&ctx, None, &json!(7), &mut dst).unwrap();
        assert_eq!(dst, 7);
        assert!(map.decode(&ctx, None, &json!(70), &mut dst).is_err());
        assert_eq!(dst, 7);
    }

    #[test]
    fn null_from_a_nullable_validator_is_not_assigned() {
        let map = PrimitiveMap::new(string(0, 10).nullable());
        let mut dst = Some("prior".to_owned());
        map.decode(&Context::empty(), None, &json!(null), &mut dst).unwrap();
        assert_eq!(dst.as_deref(), Some("prior"));
        map.decode(&Context::empty(), None, &json!("next"), &mut dst).unwrap();
        assert_eq!(dst.as_deref(), Some("next"));
    }

    #[test]
    fn encodes_with_default_json() {
        let ctx = Context::empty();
        let strings = PrimitiveMap::new(string(0, 10).nullable());
        assert_eq!(strings.encode(&ctx, None, &Some("a\"b".to_owned())).unwrap().as_str(), r#""a\"b""#);
        assert_eq!(strings.encode(&ctx, None, &None).unwrap(), RawMessage::null());

        let anything = PrimitiveMap::new(any_value());
        assert_eq!(anything.encode(&ctx, None, &json!({ "k": [1, 2] })).unwrap().as_str(), r#"{"k":[1,2]}"#);
    }
}
