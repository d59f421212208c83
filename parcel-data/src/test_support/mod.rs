//! Scripted collaborators for exercising the fetch pipeline without a network.

mod server;

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use parcel_core::{BoundingBox, ParcelDetail, ParcelId, ParcelSource, SourceError};

pub use server::{CannedResponse, CannedServer, RecordedRequest};

/// How [`StubParcelSource`] answers one detail request.
#[derive(Debug, Clone)]
pub enum StubReply {
    Detail(ParcelDetail),
    Error(SourceError),
    /// Answer with the inner reply once the delay has elapsed.
    Delayed(Duration, Box<StubReply>),
    /// Cancel the token, then never answer.
    CancelAndHang(CancellationToken),
    /// Never answer.
    Hang,
}

impl StubReply {
    #[must_use]
    pub fn delayed(delay: Duration, reply: Self) -> Self {
        Self::Delayed(delay, Box::new(reply))
    }
}

/// [`ParcelSource`] answering from a script and counting its calls.
#[derive(Debug)]
pub struct StubParcelSource {
    listing: Result<Vec<ParcelId>, SourceError>,
    replies: HashMap<ParcelId, StubReply>,
    fallback: StubReply,
    list_calls: AtomicUsize,
    detail_calls: Mutex<Vec<ParcelId>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl StubParcelSource {
    /// Source listing `ids` and answering every detail request with `fallback`.
    #[must_use]
    pub fn new(ids: Vec<ParcelId>, fallback: StubReply) -> Self {
        Self {
            listing: Ok(ids),
            replies: HashMap::new(),
            fallback,
            list_calls: AtomicUsize::new(0),
            detail_calls: Mutex::default(),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    /// Source whose listing fails with `error`.
    #[must_use]
    pub fn failing_listing(error: SourceError) -> Self {
        let mut source = Self::new(Vec::new(), StubReply::Hang);
        source.listing = Err(error);
        source
    }

    /// Script the reply for one identifier.
    #[must_use]
    pub fn with_reply(mut self, id: impl Into<ParcelId>, reply: StubReply) -> Self {
        self.replies.insert(id.into(), reply);
        self
    }

    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Identifiers requested so far, in call order.
    #[must_use]
    pub fn detail_calls(&self) -> Vec<ParcelId> {
        self.detail_calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Highest number of detail requests that were running at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn answer(reply: StubReply) -> Result<ParcelDetail, SourceError> {
        let mut reply = reply;
        loop {
            match reply {
                StubReply::Detail(detail) => return Ok(detail),
                StubReply::Error(error) => return Err(error),
                StubReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
                StubReply::CancelAndHang(token) => {
                    token.cancel();
                    return std::future::pending().await;
                }
                StubReply::Hang => return std::future::pending().await,
            }
        }
    }
}

/// Decrements the in-flight gauge when a request finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ParcelSource for StubParcelSource {
    async fn list_identifiers(&self, _region: &BoundingBox) -> Result<Vec<ParcelId>, SourceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.listing.clone()
    }

    async fn fetch_detail(&self, id: &ParcelId) -> Result<ParcelDetail, SourceError> {
        if let Ok(mut calls) = self.detail_calls.lock() {
            calls.push(id.clone());
        }
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let reply = self.replies.get(id).unwrap_or(&self.fallback).clone();
        Self::answer(reply).await
    }
}
