//! Streaming GeoJSON `FeatureCollection` writer used as the download sink.

use std::io::{self, BufWriter, Write};

use camino::Utf8Path;
use cap_std::fs_utf8::File;
use geo::orient::{Direction, Orient};
use geo::{LineString, Polygon};
use parcel_core::{CanonicalGeometry, FeatureSink, FieldValue, ParcelFeature, SinkError};
use serde_json::{Map, Value, json};

/// Property holding the parcel identifier on every feature.
pub(crate) const ID_PROPERTY: &str = "parcel_id";

/// Writes features as they arrive; [`GeoJsonSink::finish`] closes the collection.
///
/// Rings follow RFC 7946 winding: exteriors counter-clockwise, holes
/// clockwise. Coordinates are EPSG:4326 longitude/latitude.
pub(crate) struct GeoJsonSink<W: Write> {
    writer: W,
    written: usize,
}

impl GeoJsonSink<BufWriter<File>> {
    /// Create (or truncate) the output file and write the collection header.
    pub(crate) fn create(path: &Utf8Path) -> io::Result<Self> {
        let file = parcel_fs::create_file(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write> GeoJsonSink<W> {
    pub(crate) fn new(mut writer: W) -> io::Result<Self> {
        writer.write_all(br#"{"type":"FeatureCollection","features":["#)?;
        Ok(Self { writer, written: 0 })
    }

    /// Features written so far.
    pub(crate) const fn written(&self) -> usize {
        self.written
    }

    /// Close the collection and flush, returning the writer.
    pub(crate) fn finish(mut self) -> io::Result<W> {
        self.writer.write_all(b"]}\n")?;
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn write_feature(&mut self, feature: &Value) -> io::Result<()> {
        if self.written > 0 {
            self.writer.write_all(b",")?;
        }
        serde_json::to_writer(&mut self.writer, feature)?;
        self.written += 1;
        Ok(())
    }
}

impl<W: Write> FeatureSink for GeoJsonSink<W> {
    fn add_feature(&mut self, feature: ParcelFeature) -> Result<(), SinkError> {
        let value = feature_json(&feature);
        self.write_feature(&value).map_err(|source| SinkError::Io {
            id: feature.id,
            source,
        })
    }
}

/// GeoJSON `Feature` for one parcel.
pub(crate) fn feature_json(feature: &ParcelFeature) -> Value {
    let mut properties: Map<String, Value> = feature
        .attributes
        .iter()
        .map(|(key, value)| (key.clone(), property_value(value)))
        .collect();
    properties.insert(ID_PROPERTY.to_owned(), Value::from(feature.id.as_str()));
    json!({
        "type": "Feature",
        "id": feature.id.as_str(),
        "geometry": geometry_json(&feature.geometry),
        "properties": properties,
    })
}

fn property_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Bool(*flag),
        FieldValue::Integer(number) => Value::from(*number),
        FieldValue::Float(number) => serde_json::Number::from_f64(*number)
            .map_or(Value::Null, Value::Number),
        FieldValue::Text(text) => Value::String(text.clone()),
    }
}

fn geometry_json(geometry: &CanonicalGeometry) -> Value {
    let polygons: Vec<Value> = geometry
        .polygons()
        .iter()
        .map(|polygon| polygon_coordinates(&polygon.orient(Direction::Default)))
        .collect();
    if geometry.is_multi() {
        json!({"type": "MultiPolygon", "coordinates": polygons})
    } else {
        let coordinates = polygons.into_iter().next().unwrap_or(Value::Array(Vec::new()));
        json!({"type": "Polygon", "coordinates": coordinates})
    }
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Value {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(ring_coordinates)
        .collect()
}

fn ring_coordinates(ring: &LineString<f64>) -> Value {
    ring.coords()
        .map(|coord| json!([coord.x, coord.y]))
        .collect()
}
