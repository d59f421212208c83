use geo::{Geometry, HasDimensions, MultiPolygon, Polygon, Validation};

use super::GeometryError;

/// A non-empty, topologically valid polygon or multi-polygon.
///
/// The only way to obtain one is through [`TryFrom`] (or
/// [`super::normalize`]), so holders can rely on the invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGeometry {
    inner: Geometry<f64>,
}

impl CanonicalGeometry {
    /// Member polygons: one for a polygon, all members for a multi-polygon.
    #[must_use]
    pub fn polygons(&self) -> &[Polygon<f64>] {
        match &self.inner {
            Geometry::Polygon(polygon) => std::slice::from_ref(polygon),
            Geometry::MultiPolygon(multi) => &multi.0,
            _ => &[],
        }
    }

    /// Member polygons; a single polygon counts as one.
    #[must_use]
    pub fn polygon_count(&self) -> usize {
        self.polygons().len()
    }

    /// Exterior plus interior rings across all member polygons.
    #[must_use]
    pub fn ring_count(&self) -> usize {
        self.polygons()
            .iter()
            .map(|polygon| 1 + polygon.interiors().len())
            .sum()
    }

    /// Stored coordinates across all rings, closing points included.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.polygons()
            .iter()
            .map(|polygon| {
                polygon.exterior().0.len()
                    + polygon
                        .interiors()
                        .iter()
                        .map(|ring| ring.0.len())
                        .sum::<usize>()
            })
            .sum()
    }

    /// Whether the geometry arrived as a multi-polygon.
    #[must_use]
    pub const fn is_multi(&self) -> bool {
        matches!(self.inner, Geometry::MultiPolygon(_))
    }

    /// Borrow the validated `geo` geometry.
    #[must_use]
    pub const fn as_geometry(&self) -> &Geometry<f64> {
        &self.inner
    }

    /// Take the validated `geo` geometry.
    #[must_use]
    pub fn into_geometry(self) -> Geometry<f64> {
        self.inner
    }

    /// Widen to a multi-polygon, wrapping a single polygon if needed.
    #[must_use]
    pub fn into_multi_polygon(self) -> MultiPolygon<f64> {
        match self.inner {
            Geometry::MultiPolygon(multi) => multi,
            Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon]),
            _ => MultiPolygon::new(Vec::new()),
        }
    }
}

impl TryFrom<Geometry<f64>> for CanonicalGeometry {
    type Error = GeometryError;

    fn try_from(geometry: Geometry<f64>) -> Result<Self, Self::Error> {
        let found = geometry_name(&geometry);
        if !matches!(geometry, Geometry::Polygon(_) | Geometry::MultiPolygon(_)) {
            return Err(GeometryError::NotPolygonal { found });
        }
        if geometry.is_empty() {
            return Err(GeometryError::Empty);
        }
        geometry
            .check_validation()
            .map_err(|err| GeometryError::Invalid {
                reason: err.to_string(),
            })?;
        Ok(Self { inner: geometry })
    }
}

impl TryFrom<Polygon<f64>> for CanonicalGeometry {
    type Error = GeometryError;

    fn try_from(polygon: Polygon<f64>) -> Result<Self, Self::Error> {
        Self::try_from(Geometry::Polygon(polygon))
    }
}

impl TryFrom<MultiPolygon<f64>> for CanonicalGeometry {
    type Error = GeometryError;

    fn try_from(multi: MultiPolygon<f64>) -> Result<Self, Self::Error> {
        Self::try_from(Geometry::MultiPolygon(multi))
    }
}

impl From<CanonicalGeometry> for Geometry<f64> {
    fn from(value: CanonicalGeometry) -> Self {
        value.into_geometry()
    }
}

const fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
