//! Decoding of detail records into fields plus raw geometry.

use parcel_core::geometry::{RawGeometry, RawPosition, RawRing};
use parcel_core::{Attributes, FieldValue, ParcelDetail, SourceError};
use serde_json::{Map, Value};

use super::{ApiEnvelope, json_kind};

/// Geometry keys in order of preference.
const GEOMETRY_KEYS: [&str; 2] = ["geom", "geometry"];

/// Turn a detail envelope into a [`ParcelDetail`].
///
/// `data` may be the record itself or a one-element array holding it. Every
/// key other than the geometry becomes an attribute.
///
/// # Errors
///
/// Returns [`SourceError::Service`] when the service declared failure,
/// [`SourceError::InvalidGeometry`] for GeoJSON of an unsupported type, and
/// [`SourceError::MalformedResponse`] for any other unexpected shape,
/// including a record without geometry.
pub fn decode_detail(envelope: ApiEnvelope, url: &str) -> Result<ParcelDetail, SourceError> {
    envelope.ensure_success(url)?;
    let mut record = match envelope.data {
        Some(Value::Object(map)) => map,
        Some(Value::Array(items)) => single_record(items, url)?,
        Some(other) => {
            return Err(SourceError::malformed(
                url,
                format!("expected a parcel record, found {}", json_kind(&other)),
            ));
        }
        None => return Err(SourceError::malformed(url, "response carried no parcel record")),
    };

    let geometry_value = GEOMETRY_KEYS
        .iter()
        .filter_map(|key| record.remove(*key))
        .find(|value| !value.is_null())
        .ok_or_else(|| SourceError::malformed(url, "parcel record has no geometry"))?;
    for key in GEOMETRY_KEYS {
        record.remove(key);
    }

    let geometry = raw_geometry(geometry_value, url)?;
    let fields: Attributes = record
        .into_iter()
        .map(|(key, value)| (key, field_value(value)))
        .collect();
    Ok(ParcelDetail { fields, geometry })
}

fn single_record(items: Vec<Value>, url: &str) -> Result<Map<String, Value>, SourceError> {
    let count = items.len();
    let mut iter = items.into_iter();
    match (iter.next(), count) {
        (Some(Value::Object(map)), 1) => Ok(map),
        (None, _) => Err(SourceError::malformed(url, "response carried no parcel record")),
        (Some(_), 1) => Err(SourceError::malformed(url, "parcel record is not an object")),
        (Some(_), _) => Err(SourceError::malformed(
            url,
            format!("expected one parcel record, found {count}"),
        )),
    }
}

/// Convert a JSON attribute to a scalar field; nested values become compact JSON text.
#[must_use]
pub fn field_value(value: Value) -> FieldValue {
    match value {
        Value::Null => FieldValue::Null,
        Value::Bool(flag) => FieldValue::Bool(flag),
        Value::Number(number) => number.as_i64().map_or_else(
            || number.as_f64().map_or_else(|| FieldValue::Text(number.to_string()), FieldValue::Float),
            FieldValue::Integer,
        ),
        Value::String(text) => FieldValue::Text(text),
        nested @ (Value::Array(_) | Value::Object(_)) => FieldValue::Text(nested.to_string()),
    }
}

fn raw_geometry(value: Value, url: &str) -> Result<RawGeometry, SourceError> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim_start();
            if trimmed.starts_with('{') {
                let parsed: Value = serde_json::from_str(trimmed).map_err(|err| {
                    SourceError::malformed(url, format!("geometry string is not JSON: {err}"))
                })?;
                geojson_geometry(parsed, url)
            } else {
                Ok(RawGeometry::classify_text(text))
            }
        }
        object @ Value::Object(_) => geojson_geometry(object, url),
        other => Err(SourceError::malformed(
            url,
            format!("geometry is {}", json_kind(&other)),
        )),
    }
}

fn geojson_geometry(value: Value, url: &str) -> Result<RawGeometry, SourceError> {
    let Value::Object(mut object) = value else {
        return Err(SourceError::malformed(url, "GeoJSON geometry is not an object"));
    };
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| SourceError::malformed(url, "GeoJSON geometry has no type"))?;
    let coordinates = object
        .remove("coordinates")
        .ok_or_else(|| SourceError::malformed(url, "GeoJSON geometry has no coordinates"))?;
    let items = match coordinates {
        Value::Array(items) => items,
        other => {
            return Err(SourceError::malformed(
                url,
                format!("{kind} coordinates are {}", json_kind(&other)),
            ));
        }
    };
    match kind.as_str() {
        "Polygon" => Ok(RawGeometry::GeoJsonPolygon(rings(items))),
        "MultiPolygon" => Ok(RawGeometry::GeoJsonMultiPolygon(
            items.into_iter().map(|member| rings(array_items(member))).collect(),
        )),
        other => Err(SourceError::InvalidGeometry {
            message: format!("unsupported GeoJSON geometry type {other}"),
        }),
    }
}

/// Elements of a JSON array; any other value yields nothing.
fn array_items(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}

/// Rings as received. Malformed rings and positions are kept in a shape the
/// normalizer drops, so one bad hole does not cost the whole record.
fn rings(items: Vec<Value>) -> Vec<RawRing> {
    items
        .into_iter()
        .map(|ring| array_items(ring).into_iter().map(position).collect())
        .collect()
}

/// Ordinates of one position; a non-numeric ordinate becomes NaN.
fn position(value: Value) -> RawPosition {
    array_items(value)
        .iter()
        .map(|ordinate| ordinate.as_f64().unwrap_or(f64::NAN))
        .collect()
}
