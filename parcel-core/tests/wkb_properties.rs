//! Property-based tests for the WKB branch of the geometry normalizer.
//!
//! # Invariants tested
//!
//! - **Structure preservation:** hex WKB of a valid multi-polygon normalizes
//!   to the same polygon, ring and point counts.
//! - **Coordinate fidelity:** decoded coordinates are bit-identical to the
//!   encoded ones.
//! - **Truncation:** any strict prefix of a valid payload is rejected.

use std::f64::consts::TAU;

use geo::{Coord, CoordsIter, Geometry, LineString, MultiPolygon, Polygon};
use geozero::{CoordDimensions, ToWkb};
use parcel_core::geometry::{decode_wkb, normalize};
use parcel_core::RawGeometry;
use proptest::prelude::*;

/// Little-endian ISO WKB for `geometry`, as written by `geozero`.
fn encode(geometry: &Geometry<f64>) -> Vec<u8> {
    geometry
        .to_wkb(CoordDimensions::xy())
        .expect("polygonal geometry encodes")
}

/// Regular polygon ring around `centre`, closed.
fn regular_ring(centre: Coord<f64>, radius: f64, sides: usize, turn: f64) -> LineString<f64> {
    let step = TAU / sides as f64;
    let mut coords: Vec<Coord<f64>> = (0..sides)
        .map(|k| {
            let angle = turn + step * k as f64;
            Coord {
                x: centre.x + radius * angle.cos(),
                y: centre.y + radius * angle.sin(),
            }
        })
        .collect();
    coords.push(coords[0]);
    LineString::new(coords)
}

/// One member polygon per entry, spaced far enough apart to stay disjoint.
fn multi_polygon_strategy() -> impl Strategy<Value = MultiPolygon<f64>> {
    prop::collection::vec(
        (3_usize..12, 1.0_f64..4.0, 0.0_f64..TAU, any::<bool>()),
        1..5,
    )
    .prop_map(|members| {
        let polygons = members
            .into_iter()
            .enumerate()
            .map(|(index, (sides, radius, turn, holed))| {
                let centre = Coord {
                    x: 10.0 * index as f64,
                    y: 0.0,
                };
                let exterior = regular_ring(centre, radius, sides, turn);
                let interiors = if holed {
                    vec![regular_ring(centre, radius / 4.0, 3, turn)]
                } else {
                    Vec::new()
                };
                Polygon::new(exterior, interiors)
            })
            .collect();
        MultiPolygon::new(polygons)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Property: hex WKB keeps polygon, ring and point counts.
    #[test]
    fn hex_wkb_preserves_structure(multi in multi_polygon_strategy(), upper in any::<bool>()) {
        let bytes = encode(&Geometry::MultiPolygon(multi.clone()));
        let text = if upper { hex::encode_upper(&bytes) } else { hex::encode(&bytes) };
        let raw = RawGeometry::classify_text(text);
        prop_assert!(matches!(raw, RawGeometry::WkbHex(_)));

        let canonical = normalize(&raw).expect("generated polygons are valid");
        let expected_rings: usize = multi.0.iter().map(|p| 1 + p.interiors().len()).sum();
        prop_assert!(canonical.is_multi());
        prop_assert_eq!(canonical.polygon_count(), multi.0.len());
        prop_assert_eq!(canonical.ring_count(), expected_rings);
        prop_assert_eq!(canonical.point_count(), multi.coords_count());
    }

    /// Property: coordinates survive decoding exactly.
    #[test]
    fn decoded_coordinates_match(multi in multi_polygon_strategy()) {
        let source = Geometry::MultiPolygon(multi);
        let decoded = decode_wkb(&encode(&source)).expect("encoded WKB decodes");
        prop_assert_eq!(decoded, source);
    }

    /// Property: every strict prefix of a payload is rejected.
    #[test]
    fn truncated_payloads_fail(multi in multi_polygon_strategy(), cut in any::<prop::sample::Index>()) {
        let bytes = encode(&Geometry::MultiPolygon(multi));
        let len = cut.index(bytes.len());
        prop_assert!(decode_wkb(&bytes[..len]).is_err());
    }
}
