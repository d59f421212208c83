use thiserror::Error;

/// Reasons a raw geometry could not become a [`super::CanonicalGeometry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// Every ring was shorter than the closed-ring minimum or malformed.
    #[error("no ring with at least {minimum} valid positions remained")]
    NoValidRings {
        /// Minimum positions required per ring.
        minimum: usize,
    },
    /// The WKB string was not valid hexadecimal.
    #[error("invalid WKB hex string: {message}")]
    Hex {
        /// Decoder message.
        message: String,
    },
    /// The WKB payload could not be parsed.
    #[error("invalid WKB: {message}")]
    Wkb {
        /// Decoder message.
        message: String,
    },
    /// The WKT payload could not be parsed.
    #[error("invalid WKT: {message}")]
    Wkt {
        /// Parser message.
        message: String,
    },
    /// The decoded geometry was not polygonal.
    #[error("expected a polygon or multi-polygon, found {found}")]
    NotPolygonal {
        /// Geometry type that was decoded instead.
        found: &'static str,
    },
    /// The geometry had no coordinates.
    #[error("geometry is empty")]
    Empty,
    /// The geometry failed the topological validity check.
    #[error("geometry is not valid: {reason}")]
    Invalid {
        /// First reported validation problem.
        reason: String,
    },
}
