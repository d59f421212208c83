//! `ParcelSource` backed by the RapidAPI cadastral parcel endpoints.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue};
use reqwest::{Client, StatusCode};
use url::Url;

use parcel_core::{BoundingBox, Credentials, ParcelDetail, ParcelId, ParcelSource, SourceError};

use crate::api::{ApiEnvelope, QueryRequest, decode_detail, decode_identifiers};

/// Error type for [`HttpParcelSource`] construction failures.
#[derive(Debug)]
pub enum ProviderBuildError {
    /// Failed to build the HTTP client.
    HttpClient(reqwest::Error),
    /// An endpoint URL could not be parsed.
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    /// The base URL has no host to send as `X-RapidAPI-Host`.
    MissingHost { url: String },
    /// A credential cannot be sent as an HTTP header value.
    InvalidHeader {
        name: &'static str,
        source: InvalidHeaderValue,
    },
    /// The API key or bearer token is empty.
    MissingCredentials,
}

impl std::fmt::Display for ProviderBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HttpClient(err) => write!(f, "failed to build HTTP client: {err}"),
            Self::InvalidUrl { url, source } => write!(f, "invalid endpoint URL {url}: {source}"),
            Self::MissingHost { url } => write!(f, "base URL {url} has no host"),
            Self::InvalidHeader { name, .. } => {
                write!(f, "value for header {name} contains invalid characters")
            }
            Self::MissingCredentials => f.write_str("both an API key and a bearer token are required"),
        }
    }
}

impl std::error::Error for ProviderBuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::HttpClient(err) => Some(err),
            Self::InvalidUrl { source, .. } => Some(source),
            Self::InvalidHeader { source, .. } => Some(source),
            Self::MissingHost { .. } | Self::MissingCredentials => None,
        }
    }
}

/// Default base URL of the RapidAPI-hosted service.
pub const DEFAULT_BASE_URL: &str = "https://enriched-cadastral-parcels-for-italy.p.rapidapi.com";

/// Path of the region listing endpoint.
pub const DEFAULT_LIST_PATH: &str = "/functions/v1/get-parcels";

/// Path of the per-parcel detail endpoint.
pub const DEFAULT_DETAIL_PATH: &str = "/functions/v1/get-parcel-details";

/// Default user agent for API requests.
pub const DEFAULT_USER_AGENT: &str = "parcel-downloader/0.1";

/// Default client-wide request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const RAPIDAPI_KEY: HeaderName = HeaderName::from_static("x-rapidapi-key");
const RAPIDAPI_HOST: HeaderName = HeaderName::from_static("x-rapidapi-host");

/// Configuration for [`HttpParcelSource`].
#[derive(Debug, Clone)]
pub struct HttpParcelSourceConfig {
    /// Scheme and host of the service, without a trailing path.
    pub base_url: String,
    /// Key and bearer token sent with every request.
    pub credentials: Credentials,
    /// Ceiling applied by the HTTP client to every request.
    pub timeout: Duration,
    /// `User-Agent` header value.
    pub user_agent: String,
    /// Path of the listing endpoint, joined onto `base_url`.
    pub list_path: String,
    /// Path of the detail endpoint, joined onto `base_url`.
    pub detail_path: String,
}

impl HttpParcelSourceConfig {
    /// Create a configuration for the default service with the given credentials.
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            credentials,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            list_path: DEFAULT_LIST_PATH.to_owned(),
            detail_path: DEFAULT_DETAIL_PATH.to_owned(),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Override the listing and detail endpoint paths.
    #[must_use]
    pub fn with_paths(mut self, list_path: impl Into<String>, detail_path: impl Into<String>) -> Self {
        self.list_path = list_path.into();
        self.detail_path = detail_path.into();
        self
    }
}

/// HTTP implementation of [`ParcelSource`].
///
/// Each call issues exactly one `POST`; nothing is retried. The detail
/// timeout enforced by the batch fetcher is usually tighter than the
/// client-wide [`HttpParcelSourceConfig::timeout`].
#[derive(Debug)]
pub struct HttpParcelSource {
    client: Client,
    list_url: Url,
    detail_url: Url,
}

impl HttpParcelSource {
    /// Create a source for the default service.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are unusable or the HTTP client
    /// fails to build.
    pub fn new(credentials: Credentials) -> Result<Self, ProviderBuildError> {
        Self::with_config(HttpParcelSourceConfig::new(credentials))
    }

    /// Create a source with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are incomplete or not valid
    /// header values, if an endpoint URL does not parse, or if the HTTP
    /// client fails to build.
    pub fn with_config(config: HttpParcelSourceConfig) -> Result<Self, ProviderBuildError> {
        if !config.credentials.is_complete() {
            return Err(ProviderBuildError::MissingCredentials);
        }
        let list_url = endpoint_url(&config.base_url, &config.list_path)?;
        let detail_url = endpoint_url(&config.base_url, &config.detail_path)?;
        let host = list_url
            .host_str()
            .ok_or_else(|| ProviderBuildError::MissingHost {
                url: config.base_url.clone(),
            })?
            .to_owned();

        let client = Client::builder()
            .user_agent(&config.user_agent)
            .default_headers(auth_headers(&config.credentials, &host)?)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(ProviderBuildError::HttpClient)?;
        Ok(Self {
            client,
            list_url,
            detail_url,
        })
    }

    #[must_use]
    pub const fn list_url(&self) -> &Url {
        &self.list_url
    }

    #[must_use]
    pub const fn detail_url(&self) -> &Url {
        &self.detail_url
    }

    async fn post(&self, url: &Url, body: &QueryRequest) -> Result<ApiEnvelope, SourceError> {
        let url_text = url.as_str();
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|err| convert_reqwest_error(&err, url_text))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| convert_reqwest_error(&err, url_text))?;
        if !status.is_success() {
            return Err(status_error(status, &text, url_text));
        }
        serde_json::from_str(&text).map_err(|err| SourceError::malformed(url_text, err.to_string()))
    }
}

#[async_trait]
impl ParcelSource for HttpParcelSource {
    async fn list_identifiers(&self, region: &BoundingBox) -> Result<Vec<ParcelId>, SourceError> {
        debug!("listing parcels in {region}");
        let envelope = self.post(&self.list_url, &QueryRequest::bbox(region)).await?;
        decode_identifiers(envelope, self.list_url.as_str())
    }

    async fn fetch_detail(&self, id: &ParcelId) -> Result<ParcelDetail, SourceError> {
        let envelope = self.post(&self.detail_url, &QueryRequest::id(id)).await?;
        decode_detail(envelope, self.detail_url.as_str())
    }
}

fn endpoint_url(base_url: &str, path: &str) -> Result<Url, ProviderBuildError> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined).map_err(|source| ProviderBuildError::InvalidUrl {
        url: joined,
        source,
    })
}

fn auth_headers(credentials: &Credentials, host: &str) -> Result<HeaderMap, ProviderBuildError> {
    let sensitive = |name: &'static str, value: &str| {
        HeaderValue::from_str(value.trim())
            .map(|mut header| {
                header.set_sensitive(true);
                header
            })
            .map_err(|source| ProviderBuildError::InvalidHeader { name, source })
    };
    let mut headers = HeaderMap::new();
    headers.insert(
        RAPIDAPI_KEY,
        sensitive("X-RapidAPI-Key", credentials.api_key())?,
    );
    headers.insert(
        RAPIDAPI_HOST,
        HeaderValue::from_str(host).map_err(|source| ProviderBuildError::InvalidHeader {
            name: "X-RapidAPI-Host",
            source,
        })?,
    );
    headers.insert(
        AUTHORIZATION,
        sensitive(
            "Authorization",
            &format!("Bearer {}", credentials.bearer_token().trim()),
        )?,
    );
    Ok(headers)
}

/// Convert a reqwest error to a `SourceError`.
fn convert_reqwest_error(error: &reqwest::Error, url: &str) -> SourceError {
    if error.is_timeout() {
        return SourceError::Timeout {
            url: url.to_owned(),
        };
    }

    if let Some(status) = error.status() {
        return SourceError::Service {
            url: url.to_owned(),
            status: Some(status.as_u16()),
            message: error.to_string(),
        };
    }

    if error.is_decode() {
        return SourceError::malformed(url, error.to_string());
    }

    SourceError::Connection {
        url: url.to_owned(),
        message: error.to_string(),
    }
}

/// Map a non-success status to the matching `SourceError`.
fn status_error(status: StatusCode, body: &str, url: &str) -> SourceError {
    let remote = serde_json::from_str::<ApiEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.message.or(envelope.error));
    let reason = status.canonical_reason().unwrap_or("unexpected status");
    let message = remote.unwrap_or_else(|| reason.to_owned());
    match status {
        StatusCode::UNAUTHORIZED => SourceError::Authentication {
            url: url.to_owned(),
            status: status.as_u16(),
            message: format!("invalid credentials: {message}"),
        },
        StatusCode::FORBIDDEN => SourceError::Authentication {
            url: url.to_owned(),
            status: status.as_u16(),
            message: format!("access forbidden, check subscription: {message}"),
        },
        StatusCode::TOO_MANY_REQUESTS => SourceError::RateLimited {
            url: url.to_owned(),
            message,
        },
        _ => SourceError::Service {
            url: url.to_owned(),
            status: Some(status.as_u16()),
            message,
        },
    }
}
