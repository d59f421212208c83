//! Parcel identifiers, attribute values and materialized features.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use crate::geometry::CanonicalGeometry;

/// Opaque identifier of a parcel within one listing.
///
/// The remote service may send identifiers as strings or numbers. Both are
/// kept in their textual form and compare by that text; the numeric flag
/// only decides how the identifier is sent back to the service.
#[derive(Debug, Clone)]
pub struct ParcelId {
    text: String,
    numeric: bool,
}

impl ParcelId {
    /// Identifier that arrived as a JSON string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            text: value.into(),
            numeric: false,
        }
    }

    /// Identifier that arrived as a JSON number, given in its textual form.
    #[must_use]
    pub fn numeric(value: impl Into<String>) -> Self {
        Self {
            text: value.into(),
            numeric: true,
        }
    }

    /// Whether the service sent this identifier as a number.
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.numeric
    }

    /// Textual form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.text
    }
}

impl PartialEq for ParcelId {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for ParcelId {}

impl Hash for ParcelId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl PartialOrd for ParcelId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ParcelId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.text.cmp(&other.text)
    }
}

impl Deref for ParcelId {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.text
    }
}

impl AsRef<str> for ParcelId {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for ParcelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl From<&str> for ParcelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ParcelId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<u64> for ParcelId {
    fn from(value: u64) -> Self {
        Self::numeric(value.to_string())
    }
}

/// A scalar attribute carried by a detail record.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    /// Text, including nested values flattened to compact JSON.
    Text(String),
}

impl FieldValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Attribute map of a detail record, ordered by field name.
pub type Attributes = BTreeMap<String, FieldValue>;

/// A fully materialized parcel handed to a feature sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelFeature {
    pub id: ParcelId,
    pub attributes: Attributes,
    pub geometry: CanonicalGeometry,
}

impl ParcelFeature {
    #[must_use]
    pub const fn new(id: ParcelId, attributes: Attributes, geometry: CanonicalGeometry) -> Self {
        Self {
            id,
            attributes,
            geometry,
        }
    }
}
