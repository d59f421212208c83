//! Per-identifier results of the detail fetch.

use std::fmt;

use crate::geometry::RawGeometry;
use crate::parcel::{Attributes, ParcelId};

/// Classification of a failed request or rejected record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Credentials were rejected.
    Authentication,
    /// The service throttled the caller.
    RateLimited,
    /// A request exceeded its time ceiling.
    Timeout,
    /// The transport failed before a response arrived.
    Connection,
    /// The service answered with a payload that could not be decoded.
    MalformedResponse,
    /// The service reported a failure or answered with an unexpected status.
    Service,
    /// The geometry decoded but could not be normalized.
    InvalidGeometry,
}

impl ErrorKind {
    /// Whether this kind ends the whole job.
    ///
    /// ```
    /// use parcel_core::ErrorKind;
    ///
    /// assert!(ErrorKind::Authentication.is_fatal());
    /// assert!(!ErrorKind::Timeout.is_fatal());
    /// ```
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self, Self::Authentication | Self::RateLimited)
    }

    /// Whether a failure of this kind is charged to the error budget.
    #[must_use]
    pub const fn counts_against_budget(self) -> bool {
        !self.is_fatal()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Authentication => "authentication",
            Self::RateLimited => "rate-limited",
            Self::Timeout => "timeout",
            Self::Connection => "connection",
            Self::MalformedResponse => "malformed-response",
            Self::Service => "service",
            Self::InvalidGeometry => "invalid-geometry",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded detail record before geometry normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelDetail {
    pub fields: Attributes,
    pub geometry: RawGeometry,
}

/// Result of attempting one identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailFetchOutcome {
    Success {
        id: ParcelId,
        fields: Attributes,
        geometry: RawGeometry,
    },
    Failure {
        id: ParcelId,
        kind: ErrorKind,
        message: String,
    },
}

impl DetailFetchOutcome {
    #[must_use]
    pub fn success(id: ParcelId, detail: ParcelDetail) -> Self {
        Self::Success {
            id,
            fields: detail.fields,
            geometry: detail.geometry,
        }
    }

    #[must_use]
    pub fn failure(id: ParcelId, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failure {
            id,
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> &ParcelId {
        match self {
            Self::Success { id, .. } | Self::Failure { id, .. } => id,
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure kind, or `None` for a success.
    #[must_use]
    pub const fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { kind, .. } => Some(*kind),
        }
    }
}
