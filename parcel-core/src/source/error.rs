use thiserror::Error;

use crate::outcome::ErrorKind;

/// Errors raised while talking to the parcel service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The service rejected the credentials.
    #[error("authentication rejected by {url} (HTTP {status}): {message}")]
    Authentication {
        url: String,
        status: u16,
        message: String,
    },
    /// The service throttled the request.
    #[error("rate limited by {url}: {message}")]
    RateLimited { url: String, message: String },
    /// The request exceeded its time ceiling.
    #[error("request to {url} timed out")]
    Timeout { url: String },
    /// The transport failed before a response was received.
    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },
    /// The service returned a failure status or declared the call failed.
    #[error("service error from {url}{}: {message}", status_suffix(.status))]
    Service {
        url: String,
        status: Option<u16>,
        message: String,
    },
    /// The response could not be decoded into the expected shape.
    #[error("malformed response from {url}: {message}")]
    MalformedResponse { url: String, message: String },
    /// The record carried a geometry of a kind that cannot be used.
    #[error("unusable geometry: {message}")]
    InvalidGeometry { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|code| format!(" (HTTP {code})")).unwrap_or_default()
}

impl SourceError {
    /// Budget classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Authentication { .. } => ErrorKind::Authentication,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Connection { .. } => ErrorKind::Connection,
            Self::Service { .. } => ErrorKind::Service,
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::InvalidGeometry { .. } => ErrorKind::InvalidGeometry,
        }
    }

    /// Convenience constructor for payload decoding failures.
    #[must_use]
    pub fn malformed(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            url: url.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn service_display_includes_optional_status() {
        let with_status = SourceError::Service {
            url: "https://api.test".into(),
            status: Some(500),
            message: "boom".into(),
        };
        assert_eq!(
            with_status.to_string(),
            "service error from https://api.test (HTTP 500): boom"
        );
        let declared = SourceError::Service {
            url: "https://api.test".into(),
            status: None,
            message: "no parcel".into(),
        };
        assert_eq!(
            declared.to_string(),
            "service error from https://api.test: no parcel"
        );
    }

    #[rstest]
    #[case(SourceError::Timeout { url: String::new() }, ErrorKind::Timeout)]
    #[case(SourceError::RateLimited { url: String::new(), message: String::new() }, ErrorKind::RateLimited)]
    #[case(SourceError::malformed("u", "m"), ErrorKind::MalformedResponse)]
    fn classifies_kind(#[case] error: SourceError, #[case] expected: ErrorKind) {
        assert_eq!(error.kind(), expected);
    }
}
