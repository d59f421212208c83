//! Credential persistence and verification.

mod codec;
mod file;

use log::debug;

use parcel_core::{BoundingBox, CredentialCheck, ParcelSource, SourceError};

pub use codec::{deobfuscate, obfuscate};
pub use file::FileCredentialStore;

/// Small area near Verona listed to check that credentials work.
pub const CHECK_REGION: [f64; 4] = [11.0, 45.0, 11.005, 45.005];

/// Check the credentials with a tiny listing and classify the answer.
///
/// The verdict message is meant for people; rate limiting is kept apart
/// because it says nothing about whether the credentials are wrong.
pub async fn validate_credentials<S>(source: &S) -> CredentialCheck
where
    S: ParcelSource + ?Sized,
{
    let [min_x, min_y, max_x, max_y] = CHECK_REGION;
    let region = match BoundingBox::new(min_x, min_y, max_x, max_y) {
        Ok(region) => region,
        Err(err) => {
            return CredentialCheck::Invalid {
                message: err.to_string(),
            };
        }
    };
    match source.list_identifiers(&region).await {
        Ok(ids) => CredentialCheck::Valid { parcels: ids.len() },
        Err(err) => {
            debug!("credential check failed: {err}");
            verdict(&err)
        }
    }
}

fn verdict(error: &SourceError) -> CredentialCheck {
    let message = match error {
        SourceError::Authentication { status: 403, .. } => {
            "Access forbidden - check subscription".to_owned()
        }
        SourceError::Authentication { .. } => "Invalid credentials".to_owned(),
        SourceError::RateLimited { .. } => {
            return CredentialCheck::RateLimited {
                message: "Rate limited (credentials may be valid)".to_owned(),
            };
        }
        SourceError::Timeout { .. } => "Request timeout".to_owned(),
        SourceError::Connection { message, .. } => format!("Connection error: {message}"),
        SourceError::Service {
            status: Some(status),
            message,
            ..
        } => format!("HTTP {status}: {message}"),
        SourceError::Service { message, .. } => format!("API Error: {message}"),
        SourceError::MalformedResponse { .. } | SourceError::InvalidGeometry { .. } => {
            "Invalid response from API".to_owned()
        }
    };
    CredentialCheck::Invalid { message }
}
