use geo::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use wkt::TryFromWkt;

use super::{CanonicalGeometry, GeometryError, RawGeometry, RawRing, decode_wkb};

/// Fewest positions a GeoJSON ring may carry and still be kept.
pub const MIN_RING_POSITIONS: usize = 4;

/// Convert a raw geometry into its canonical form.
///
/// GeoJSON rings shorter than [`MIN_RING_POSITIONS`] or holding a position
/// with fewer than two finite ordinates are dropped. The first surviving
/// ring becomes the exterior. Multi-polygon members left without rings are
/// dropped and the result stays a multi-polygon.
///
/// # Errors
///
/// Returns [`GeometryError`] when nothing usable remains, when a binary or
/// text payload cannot be decoded, or when the decoded shape is not a
/// valid polygonal geometry.
pub fn normalize(raw: &RawGeometry) -> Result<CanonicalGeometry, GeometryError> {
    let geometry = match raw {
        RawGeometry::GeoJsonPolygon(rings) => {
            Geometry::Polygon(polygon_from_rings(rings).ok_or_else(no_valid_rings)?)
        }
        RawGeometry::GeoJsonMultiPolygon(members) => {
            let polygons: Vec<Polygon<f64>> = members
                .iter()
                .filter_map(|rings| polygon_from_rings(rings))
                .collect();
            if polygons.is_empty() {
                return Err(no_valid_rings());
            }
            Geometry::MultiPolygon(MultiPolygon::new(polygons))
        }
        RawGeometry::WkbHex(text) => {
            let bytes = hex::decode(text.trim()).map_err(|err| GeometryError::Hex {
                message: err.to_string(),
            })?;
            decode_wkb(&bytes)?
        }
        RawGeometry::Wkt(text) => parse_wkt(text)?,
    };
    CanonicalGeometry::try_from(geometry)
}

const fn no_valid_rings() -> GeometryError {
    GeometryError::NoValidRings {
        minimum: MIN_RING_POSITIONS,
    }
}

fn polygon_from_rings(rings: &[RawRing]) -> Option<Polygon<f64>> {
    let mut kept = rings.iter().filter_map(|ring| ring_from_positions(ring));
    let exterior = kept.next()?;
    Some(Polygon::new(exterior, kept.collect()))
}

fn ring_from_positions(ring: &RawRing) -> Option<LineString<f64>> {
    if ring.len() < MIN_RING_POSITIONS {
        return None;
    }
    ring.iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] if x.is_finite() && y.is_finite() => Some(Coord { x: *x, y: *y }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}

/// Parse WKT, tolerating an EWKT `SRID=<n>;` prefix.
fn parse_wkt(text: &str) -> Result<Geometry<f64>, GeometryError> {
    let trimmed = text.trim();
    let body = match trimmed.split_once(';') {
        Some((prefix, rest)) if prefix.trim_start().to_ascii_uppercase().starts_with("SRID=") => {
            rest
        }
        _ => trimmed,
    };
    Geometry::<f64>::try_from_wkt_str(body).map_err(|err| GeometryError::Wkt {
        message: err.to_string(),
    })
}
