//! WKB and EWKB decoding through `geozero`.
//!
//! ISO payloads (including the 1000/2000/3000 dimension offsets) go through
//! the plain WKB reader. Payloads whose type word carries a PostGIS flag bit
//! go through the EWKB reader, which also skips the SRID. Extra ordinates are
//! dropped by the `geo` writer.

use std::io::Cursor;

use geo::Geometry;
use geozero::geo_types::GeoWriter;
use geozero::wkb::{process_ewkb_geom, process_wkb_geom};

use super::GeometryError;

/// Mask over the high byte of the type word holding the Z, M and SRID flags.
const EWKB_FLAG_BITS: u8 = 0xE0;

/// Whether the type word of `bytes` carries any PostGIS EWKB flag.
///
/// The flags live in the most significant byte of the type word, which is
/// the first type byte in big-endian payloads and the last in little-endian.
fn has_ewkb_flags(bytes: &[u8]) -> bool {
    let high_byte = match bytes.first() {
        Some(0) => bytes.get(1),
        Some(_) => bytes.get(4),
        None => None,
    };
    high_byte.is_some_and(|byte| byte & EWKB_FLAG_BITS != 0)
}

fn wkb_error(message: impl Into<String>) -> GeometryError {
    GeometryError::Wkb {
        message: message.into(),
    }
}

/// Decode a WKB or EWKB payload into a `geo` geometry.
///
/// Any geometry type is returned; polygonal checks happen when the result
/// becomes a [`super::CanonicalGeometry`].
///
/// # Errors
///
/// Returns [`GeometryError::Wkb`] when the payload is truncated, names an
/// unknown geometry type, or carries bytes after the geometry.
pub fn decode_wkb(bytes: &[u8]) -> Result<Geometry<f64>, GeometryError> {
    let mut cursor = Cursor::new(bytes);
    let mut writer = GeoWriter::new();
    let processed = if has_ewkb_flags(bytes) {
        process_ewkb_geom(&mut cursor, &mut writer)
    } else {
        process_wkb_geom(&mut cursor, &mut writer)
    };
    processed.map_err(|err| wkb_error(err.to_string()))?;

    let consumed = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
    let remaining = bytes.len().saturating_sub(consumed);
    if remaining > 0 {
        return Err(wkb_error(format!(
            "{remaining} trailing bytes after the geometry"
        )));
    }
    writer
        .take_geometry()
        .ok_or_else(|| wkb_error("payload produced no geometry"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Coord, polygon};
    use geozero::{CoordDimensions, ToWkb};
    use rstest::rstest;

    /// `ST_AsBinary('POLYGON((0 0,4 0,4 4,0 4,0 0))')`, little-endian.
    const SQUARE_LE: &str = concat!(
        "01030000000100000005000000000000000000000000000000000000000000000000001040000000",
        "00000000000000000000001040000000000000104000000000000000000000000000001040000000",
        "00000000000000000000000000",
    );

    /// `ST_AsBinary('POLYGON((0 0,1 0,0 1,0 0))', 'XDR')`.
    const TRIANGLE_BE: &str = concat!(
        "00000000030000000100000004000000000000000000000000000000003FF0000000000000000000",
        "000000000000000000000000003FF000000000000000000000000000000000000000000000",
    );

    /// `ST_AsEWKB('SRID=4326;MULTIPOLYGON Z (((0 0 12.5,1 0 12.5,0 1 12.5,0 0 12.5)))')`.
    const TRIANGLE_EWKB_Z: &str = concat!(
        "01060000A0E610000001000000010300008001000000040000000000000000000000000000000000",
        "00000000000000002940000000000000F03F00000000000000000000000000002940000000000000",
        "0000000000000000F03F000000000000294000000000000000000000000000000000000000000000",
        "2940",
    );

    /// ISO `POLYGON Z ((0 0 0,2 0 0,0 2 0,0 0 0))`, type code 1003.
    const TRIANGLE_ISO_Z: &str = concat!(
        "01EB0300000100000004000000000000000000000000000000000000000000000000000000000000",
        "00000000400000000000000000000000000000000000000000000000000000000000000040000000",
        "0000000000000000000000000000000000000000000000000000000000",
    );

    /// `ST_AsBinary('POINT(3 4)')`.
    const POINT_LE: &str = "010100000000000000000008400000000000001040";

    fn bytes(text: &str) -> Vec<u8> {
        hex::decode(text).expect("fixture hex is valid")
    }

    fn exterior_len(geometry: &Geometry<f64>) -> usize {
        match geometry {
            Geometry::Polygon(polygon) => polygon.exterior().0.len(),
            Geometry::MultiPolygon(multi) => multi.0.first().map_or(0, |p| p.exterior().0.len()),
            other => panic!("expected a polygonal geometry, got {other:?}"),
        }
    }

    #[rstest]
    fn decodes_little_endian_polygon() {
        let decoded = decode_wkb(&bytes(SQUARE_LE)).expect("polygon should decode");
        let expected = polygon![
            (x: 0.0, y: 0.0),
            (x: 4.0, y: 0.0),
            (x: 4.0, y: 4.0),
            (x: 0.0, y: 4.0),
            (x: 0.0, y: 0.0),
        ];
        assert_eq!(decoded, Geometry::Polygon(expected));
    }

    #[rstest]
    #[case::big_endian(TRIANGLE_BE)]
    #[case::iso_z(TRIANGLE_ISO_Z)]
    fn decodes_other_wkb_flavours(#[case] text: &str) {
        let decoded = decode_wkb(&bytes(text)).expect("polygon should decode");
        assert!(matches!(decoded, Geometry::Polygon(_)));
        assert_eq!(exterior_len(&decoded), 4);
    }

    #[rstest]
    fn decodes_ewkb_with_srid_and_z() {
        let decoded = decode_wkb(&bytes(TRIANGLE_EWKB_Z)).expect("EWKB should decode");
        match decoded {
            Geometry::MultiPolygon(multi) => {
                assert_eq!(multi.0.len(), 1);
                assert_eq!(
                    multi.0.first().map(|p| p.exterior().0[1]),
                    Some(Coord { x: 1.0, y: 0.0 })
                );
            }
            other => panic!("expected multi-polygon, got {other:?}"),
        }
    }

    #[rstest]
    fn points_decode_and_are_left_to_the_caller() {
        let decoded = decode_wkb(&bytes(POINT_LE)).expect("point should decode");
        assert!(matches!(decoded, Geometry::Point(_)));
    }

    #[rstest]
    fn writer_output_reads_back() {
        let source = Geometry::Polygon(polygon![
            (x: 11.0, y: 45.0),
            (x: 11.001, y: 45.0),
            (x: 11.001, y: 45.001),
            (x: 11.0, y: 45.0),
        ]);
        let encoded = source.to_wkb(CoordDimensions::xy()).expect("polygon encodes");
        assert_eq!(decode_wkb(&encoded).expect("polygon decodes"), source);
    }

    #[rstest]
    fn rejects_truncated_input() {
        let full = bytes(SQUARE_LE);
        let err = decode_wkb(&full[..full.len() - 3]).expect_err("truncated payload");
        assert!(matches!(err, GeometryError::Wkb { .. }));
    }

    #[rstest]
    fn rejects_unknown_geometry_type() {
        let err = decode_wkb(&bytes("0163000000010000000000000000")).expect_err("type 99");
        assert!(matches!(err, GeometryError::Wkb { .. }));
    }

    #[rstest]
    fn rejects_trailing_bytes() {
        let mut payload = bytes(SQUARE_LE);
        payload.extend_from_slice(&[0, 0]);
        let err = decode_wkb(&payload).expect_err("trailing bytes");
        assert_eq!(
            err,
            GeometryError::Wkb {
                message: "2 trailing bytes after the geometry".to_owned(),
            }
        );
    }

    #[rstest]
    fn rejects_empty_input() {
        assert!(matches!(decode_wkb(&[]), Err(GeometryError::Wkb { .. })));
    }

    #[rstest]
    #[case::little_endian_plain(&[1, 3, 0, 0, 0], false)]
    #[case::little_endian_srid(&[1, 6, 0, 0, 0x20], true)]
    #[case::big_endian_z(&[0, 0x80, 0, 0, 3], true)]
    #[case::big_endian_plain(&[0, 0, 0, 0, 3], false)]
    #[case::too_short(&[1, 3], false)]
    fn detects_ewkb_flags(#[case] header: &[u8], #[case] expected: bool) {
        assert_eq!(has_ewkb_flags(header), expected);
    }
}
