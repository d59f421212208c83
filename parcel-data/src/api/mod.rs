//! Request and response payloads of the cadastral parcel API.
//!
//! Both endpoints accept a `{"queryType": ..., "params": [...]}` body and
//! answer with an envelope of the form `{"success": bool, "data": ...,
//! "message": ...}`. The listing puts identifiers (or objects carrying an
//! `id`) in `data`; the detail endpoint puts a single record there.

mod detail;

use parcel_core::{BoundingBox, ParcelId, SourceError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use detail::{decode_detail, field_value};

/// Body sent to either endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRequest {
    #[serde(rename = "queryType")]
    pub query_type: &'static str,
    pub params: Vec<Value>,
}

impl QueryRequest {
    /// Region query: `{"queryType": "bbox", "params": [min_x, min_y, max_x, max_y]}`.
    #[must_use]
    pub fn bbox(region: &BoundingBox) -> Self {
        Self {
            query_type: "bbox",
            params: region.to_params().into_iter().map(Value::from).collect(),
        }
    }

    /// Detail query: `{"queryType": "id", "params": [id]}`.
    ///
    /// Identifiers the listing sent as numbers are echoed as numbers.
    #[must_use]
    pub fn id(id: &ParcelId) -> Self {
        let param = if id.is_numeric() {
            id.as_str()
                .parse::<serde_json::Number>()
                .map_or_else(|_| Value::from(id.as_str()), Value::Number)
        } else {
            Value::from(id.as_str())
        };
        Self {
            query_type: "id",
            params: vec![param],
        }
    }
}

/// Response envelope shared by both endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ApiEnvelope {
    /// Fail with [`SourceError::Service`] unless the service declared success.
    ///
    /// # Errors
    ///
    /// Returns the remote message when `success` is false or missing.
    pub fn ensure_success(&self, url: &str) -> Result<(), SourceError> {
        if self.success == Some(true) {
            return Ok(());
        }
        Err(SourceError::Service {
            url: url.to_owned(),
            status: None,
            message: self.remote_message(),
        })
    }

    /// Best available explanation from the service.
    #[must_use]
    pub fn remote_message(&self) -> String {
        self.message
            .as_deref()
            .or(self.error.as_deref())
            .unwrap_or("unknown error")
            .to_owned()
    }
}

/// Extract the identifier list from a listing envelope.
///
/// `data` may hold bare identifiers (strings or numbers) or objects with an
/// `id` field. A missing or null `data` means the region is empty.
///
/// # Errors
///
/// Returns [`SourceError::Service`] when the service declared failure and
/// [`SourceError::MalformedResponse`] for any other shape.
pub fn decode_identifiers(envelope: ApiEnvelope, url: &str) -> Result<Vec<ParcelId>, SourceError> {
    envelope.ensure_success(url)?;
    let items = match envelope.data {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(SourceError::malformed(
                url,
                format!("expected an identifier array, found {}", json_kind(&other)),
            ));
        }
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            parcel_id(item).ok_or_else(|| {
                SourceError::malformed(url, format!("entry {index} does not carry an identifier"))
            })
        })
        .collect()
}

/// Identifier from a bare value or an object's `id` field.
fn parcel_id(value: &Value) -> Option<ParcelId> {
    match value {
        Value::String(text) if !text.is_empty() => Some(ParcelId::new(text.as_str())),
        Value::Number(number) => Some(ParcelId::numeric(number.to_string())),
        Value::Object(map) => map.get("id").and_then(|id| match id {
            Value::Object(_) => None,
            other => parcel_id(other),
        }),
        _ => None,
    }
}

/// Short JSON type name for diagnostics.
pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
