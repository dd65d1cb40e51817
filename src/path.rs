//! JSON Pointer style paths for reporting where a validation error occurred.
use std::fmt;

/// One step from a JSON value into one of its children.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapped struct field, by its external (JSON) name.
    Field(String),
    /// A zero-based list index.
    Index(usize),
    /// A key of a JSON object decoded as a map.
    Key(String),
}

impl Segment {
    fn token(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Field(name) | Self::Key(name) => escape_token(name),
            Self::Index(ix) => ix.to_string().into(),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token())
    }
}

/// Path from the document root to a node. Renders as an RFC 6901 JSON
/// Pointer; the root is the empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    pub fn root() -> Self { Self::default() }

    pub fn is_root(&self) -> bool { self.segments.is_empty() }

    pub fn segments(&self) -> &[Segment] { &self.segments }

    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    pub fn pop(&mut self) -> Option<Segment> {
        self.segments.pop()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            write!(f, "/{segment}")?;
        }
        Ok(())
    }
}

impl FromIterator<Segment> for Path {
    fn from_iter<I: IntoIterator<Item = Segment>>(iter: I) -> Self {
        Self { segments: iter.into_iter().collect() }
    }
}

// `~` must be escaped before `/`, otherwise "/" -> "~1" -> "~01".
fn escape_token(raw: &str) -> std::borrow::Cow<'_, str> {
    if raw.contains(['~', '/']) {
        raw.replace('~', "~0").replace('/', "~1").into()
    } else {
        raw.into()
    }
}
