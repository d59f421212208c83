//! Parcel source trait for the region listing and detail endpoints.

use async_trait::async_trait;

use crate::outcome::ParcelDetail;
use crate::parcel::ParcelId;
use crate::region::BoundingBox;

use super::error::SourceError;

/// Remote service that lists and describes parcels.
///
/// Implementations issue exactly one request per call and never retry.
///
/// # Examples
///
/// ```rust
/// use async_trait::async_trait;
/// use parcel_core::{BoundingBox, ParcelDetail, ParcelId, ParcelSource, SourceError};
///
/// struct Nothing;
///
/// #[async_trait]
/// impl ParcelSource for Nothing {
///     async fn list_identifiers(
///         &self,
///         _region: &BoundingBox,
///     ) -> Result<Vec<ParcelId>, SourceError> {
///         Ok(Vec::new())
///     }
///
///     async fn fetch_detail(&self, id: &ParcelId) -> Result<ParcelDetail, SourceError> {
///         Err(SourceError::malformed("memory", format!("no record for {id}")))
///     }
/// }
/// ```
#[async_trait]
pub trait ParcelSource: Send + Sync {
    /// Identifiers of parcels intersecting `region`, in service order.
    ///
    /// An empty vector means the region holds no parcels.
    async fn list_identifiers(&self, region: &BoundingBox) -> Result<Vec<ParcelId>, SourceError>;

    /// Attribute fields and raw geometry of one parcel.
    async fn fetch_detail(&self, id: &ParcelId) -> Result<ParcelDetail, SourceError>;
}
