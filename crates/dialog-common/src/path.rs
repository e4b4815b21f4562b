//! Addresses into nested settings documents.
//!
//! A [`DocPath`] is an ordered list of object keys and array indices. Dotted
//! strings such as `model.rows.0.name` parse into paths, numeric segments
//! becoming indices.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One step into a document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Segment {
    /// Object member.
    Key(String),
    /// Array element.
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => f.write_str(key),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// Path into a JSON-like document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    segments: Vec<Segment>,
}

impl DocPath {
    /// The empty path, addressing the document root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parse a dotted path. Segments made only of ASCII digits become indices.
    pub fn parse_dotted(value: &str) -> Self {
        let segments = value
            .split('.')
            .filter(|part| !part.is_empty())
            .map(|part| match part.parse::<usize>() {
                Ok(index) if part.bytes().all(|b| b.is_ascii_digit()) => Segment::Index(index),
                _ => Segment::Key(part.to_string()),
            })
            .collect();
        Self { segments }
    }

    #[must_use]
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    #[must_use]
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    pub fn push_key(&mut self, key: impl Into<String>) {
        self.segments.push(Segment::Key(key.into()));
    }

    pub fn push_index(&mut self, index: usize) {
        self.segments.push(Segment::Index(index));
    }

    /// Append all segments of `other`.
    #[must_use]
    pub fn join(mut self, other: &DocPath) -> Self {
        self.segments.extend(other.segments.iter().cloned());
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn first(&self) -> Option<&Segment> {
        self.segments.first()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Path without its last segment; `None` for the root.
    pub fn parent(&self) -> Option<DocPath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Path without its first segment.
    pub fn tail(&self) -> DocPath {
        Self {
            segments: self.segments.iter().skip(1).cloned().collect(),
        }
    }

    pub fn starts_with(&self, prefix: &DocPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    /// Dotted rendering, the inverse of [`DocPath::parse_dotted`].
    pub fn to_dotted(&self) -> String {
        self.segments
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

impl FromStr for DocPath {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_dotted(s))
    }
}

impl From<&str> for DocPath {
    fn from(value: &str) -> Self {
        Self::parse_dotted(value)
    }
}

impl From<Vec<Segment>> for DocPath {
    fn from(segments: Vec<Segment>) -> Self {
        Self { segments }
    }
}

impl Serialize for DocPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_dotted())
    }
}

impl<'de> Deserialize<'de> for DocPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse_dotted(&raw))
    }
}
