//! HTTP access to the cadastral parcel API.
//!
//! [`HttpParcelSource`] implements [`parcel_core::ParcelSource`] over the
//! RapidAPI-hosted listing and detail endpoints. Every request carries the
//! RapidAPI key and host headers plus a bearer token.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use parcel_core::{BoundingBox, Credentials, ParcelSource};
//! use parcel_data::http::{HttpParcelSource, HttpParcelSourceConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = HttpParcelSourceConfig::new(Credentials::new("key", "token"))
//!     .with_timeout(Duration::from_secs(15))
//!     .with_user_agent("my-app/1.0");
//! let source = HttpParcelSource::with_config(config)?;
//!
//! let region: BoundingBox = "11.0,45.0,11.005,45.005".parse()?;
//! let ids = source.list_identifiers(&region).await?;
//! println!("{} parcels", ids.len());
//! # Ok(())
//! # }
//! ```

mod provider;

pub use provider::{
    DEFAULT_BASE_URL, DEFAULT_DETAIL_PATH, DEFAULT_LIST_PATH, DEFAULT_USER_AGENT,
    HttpParcelSource, HttpParcelSourceConfig, ProviderBuildError,
};
