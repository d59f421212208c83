//! API credentials and where they are kept between runs.

use std::fmt;

use thiserror::Error;

/// Key under which credentials are stored.
pub const CREDENTIAL_NAMESPACE: &str = "ZornadeParcelDownloader";

/// Secret pair sent with every request.
///
/// `Debug` and `Display` only show masked forms.
///
/// ```
/// use parcel_core::Credentials;
///
/// let creds = Credentials::new("abcdefgh12345678", "token-value-xyz9");
/// assert_eq!(creds.to_string(), "api key abcdefgh...5678, bearer token token-va...xyz9");
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    bearer_token: String,
}

impl Credentials {
    #[must_use]
    pub fn new(api_key: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            bearer_token: bearer_token.into(),
        }
    }

    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    #[must_use]
    pub fn bearer_token(&self) -> &str {
        &self.bearer_token
    }

    /// Both secrets are present after trimming.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.bearer_token.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &mask_secret(&self.api_key))
            .field("bearer_token", &mask_secret(&self.bearer_token))
            .finish()
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "api key {}, bearer token {}",
            mask_secret(&self.api_key),
            mask_secret(&self.bearer_token)
        )
    }
}

/// Show the first eight and last four characters of a secret.
///
/// Secrets of twelve characters or fewer are fully hidden.
///
/// ```
/// use parcel_core::credentials::mask_secret;
///
/// assert_eq!(mask_secret("0123456789abcdef"), "01234567...cdef");
/// assert_eq!(mask_secret("short"), "***");
/// ```
#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 12 {
        return "***".to_owned();
    }
    let head: String = chars.iter().take(8).collect();
    let tail: String = chars.iter().skip(chars.len() - 4).collect();
    format!("{head}...{tail}")
}

/// Errors raised by a [`CredentialStore`].
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// Reading or writing the backing storage failed.
    #[error("credential storage at {location} failed")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    /// The credentials could not be serialized.
    #[error("failed to encode credentials: {message}")]
    Encode { message: String },
}

/// Persistent home for [`Credentials`].
pub trait CredentialStore {
    /// Previously saved credentials, or `None` if nothing usable is stored.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the storage cannot be read.
    /// Unreadable content is not an error and yields `None`.
    fn load(&self) -> Result<Option<Credentials>, CredentialStoreError>;

    /// Replace the stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the storage cannot be written.
    fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError>;

    /// Remove any stored credentials.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialStoreError`] when the storage cannot be modified.
    fn clear(&self) -> Result<(), CredentialStoreError>;
}

/// Verdict of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialCheck {
    /// The check listing succeeded and returned `parcels` identifiers.
    Valid { parcels: usize },
    Invalid { message: String },
    RateLimited { message: String },
}

impl CredentialCheck {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

impl fmt::Display for CredentialCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Valid { parcels } => {
                write!(f, "credentials are valid ({parcels} parcels in test area)")
            }
            Self::Invalid { message } | Self::RateLimited { message } => f.write_str(message),
        }
    }
}
