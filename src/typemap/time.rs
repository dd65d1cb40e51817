use chrono::{DateTime, FixedOffset, SecondsFormat, TimeZone, Utc};
use serde_json::Value;

use super::{Parent, RawMessage, TypeMap};
use crate::context::Context;
use crate::error::{Error, ErrorKind, ValidationError};

/// RFC 3339 timestamps. Encoded with `Z` for UTC and only as many
/// fractional digits as the value needs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeMap;

pub fn time() -> TimeMap { TimeMap }

fn parse(raw: &Value) -> Result<DateTime<FixedOffset>, ValidationError> {
    let Value::String(text) = raw else {
        return Err(ValidationError::invalid("not a string"));
    };
    DateTime::parse_from_rfc3339(text)
        .map_err(|_| ValidationError::new(ErrorKind::NotAValidTimestamp, "not a valid RFC 3339 time value"))
}

fn render<Tz: TimeZone>(value: &DateTime<Tz>) -> Result<RawMessage, Error>
where
    Tz::Offset: std::fmt::Display,
{
    RawMessage::of(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

impl TypeMap<DateTime<Utc>> for TimeMap {
    fn decode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut DateTime<Utc>) -> Result<(), ValidationError> {
        *dst = parse(raw)?.with_timezone(&Utc);
        Ok(())
    }

    fn encode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, src: &DateTime<Utc>) -> Result<RawMessage, Error> {
        render(src)
    }
}

impl TypeMap<DateTime<FixedOffset>> for TimeMap {
    fn decode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut DateTime<FixedOffset>) -> Result<(), ValidationError> {
        *dst = parse(raw)?;
        Ok(())
    }

    fn encode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, src: &DateTime<FixedOffset>) -> Result<RawMessage, Error> {
        render(src)
    }
}

impl TypeMap<Option<DateTime<Utc>>> for TimeMap {
    fn decode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<DateTime<Utc>>) -> Result<(), ValidationError> {
        if !raw.is_null() {
            *dst = Some(parse(raw)?.with_timezone(&Utc));
        }
        Ok(())
    }

    fn encode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, src: &Option<DateTime<Utc>>) -> Result<RawMessage, Error> {
        src.as_ref().map_or_else(|| Ok(RawMessage::null()), render)
    }
}

impl TypeMap<Option<DateTime<FixedOffset>>> for TimeMap {
    fn decode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, raw: &Value, dst: &mut Option<DateTime<FixedOffset>>) -> Result<(), ValidationError> {
        if !raw.is_null() {
            *dst = Some(parse(raw)?);
        }
        Ok(())
    }

    fn encode(&self, _ctx: &Context, _parent: Option<Parent<'_>>, src: &Option<DateTime<FixedOffset>>) -> Result<RawMessage, Error> {
        src.as_ref().map_or_else(|| Ok(RawMessage::null()), render)
    }
}
