//! Parcel geometry in its raw wire encodings and its canonical validated form.
//!
//! Detail records carry their boundary in one of three encodings: a
//! GeoJSON-style coordinate nesting, hexadecimal well-known binary, or
//! well-known text. [`RawGeometry`] captures which one arrived, decided once
//! when the payload is decoded. [`normalize`] turns any of them into a
//! [`CanonicalGeometry`], which is always a non-empty, valid polygon or
//! multi-polygon.
//!
//! # Examples
//!
//! ```
//! use parcel_core::geometry::{RawGeometry, normalize};
//!
//! let raw = RawGeometry::GeoJsonPolygon(vec![vec![
//!     vec![0.0, 0.0],
//!     vec![1.0, 0.0],
//!     vec![1.0, 1.0],
//!     vec![0.0, 1.0],
//!     vec![0.0, 0.0],
//! ]]);
//! let geometry = normalize(&raw)?;
//! assert_eq!(geometry.polygon_count(), 1);
//! assert_eq!(geometry.point_count(), 5);
//! # Ok::<(), parcel_core::geometry::GeometryError>(())
//! ```

mod canonical;
mod error;
mod normalize;
mod wkb;

pub use canonical::CanonicalGeometry;
pub use error::GeometryError;
pub use normalize::{MIN_RING_POSITIONS, normalize};
pub use wkb::decode_wkb;

/// Strings longer than this that consist solely of hex digits are WKB.
pub const WKB_HEX_MIN_LEN: usize = 20;

/// A GeoJSON position: `[x, y]`, optionally followed by further ordinates.
pub type RawPosition = Vec<f64>;

/// A GeoJSON linear ring as received.
pub type RawRing = Vec<RawPosition>;

/// Geometry exactly as a detail record carried it.
#[derive(Debug, Clone, PartialEq)]
pub enum RawGeometry {
    /// GeoJSON `Polygon` coordinates: exterior ring first, then holes.
    GeoJsonPolygon(Vec<RawRing>),
    /// GeoJSON `MultiPolygon` coordinates: one ring list per member polygon.
    GeoJsonMultiPolygon(Vec<Vec<RawRing>>),
    /// Hex-encoded WKB or EWKB.
    WkbHex(String),
    /// Well-known text, optionally with an EWKT `SRID=...;` prefix.
    Wkt(String),
}

impl RawGeometry {
    /// Classify a textual geometry as hex WKB or WKT.
    ///
    /// ```
    /// use parcel_core::geometry::RawGeometry;
    ///
    /// let wkb = RawGeometry::classify_text("0103000000010000000400000000000000");
    /// assert!(matches!(wkb, RawGeometry::WkbHex(_)));
    /// let wkt = RawGeometry::classify_text("POLYGON((0 0,1 0,1 1,0 0))");
    /// assert!(matches!(wkt, RawGeometry::Wkt(_)));
    /// ```
    #[must_use]
    pub fn classify_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if looks_like_wkb_hex(&text) {
            Self::WkbHex(text.trim().to_owned())
        } else {
            Self::Wkt(text)
        }
    }

    /// Short label for diagnostics.
    #[must_use]
    pub const fn encoding(&self) -> &'static str {
        match self {
            Self::GeoJsonPolygon(_) => "geojson-polygon",
            Self::GeoJsonMultiPolygon(_) => "geojson-multipolygon",
            Self::WkbHex(_) => "wkb-hex",
            Self::Wkt(_) => "wkt",
        }
    }
}

/// Whether `text` should be treated as hex-encoded WKB.
#[must_use]
pub fn looks_like_wkb_hex(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.len() > WKB_HEX_MIN_LEN && trimmed.bytes().all(|byte| byte.is_ascii_hexdigit())
}
