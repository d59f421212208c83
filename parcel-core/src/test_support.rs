//! Test doubles and fixtures shared by unit and behaviour tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::geometry::{RawGeometry, RawRing};
use crate::{
    CredentialStore, CredentialStoreError, Credentials, FeatureSink, FieldValue, JobHost,
    ParcelDetail, ParcelFeature, ParcelId, ProgressSink, SinkError,
};

/// Closed square ring with its lower-left corner at `(x, y)`.
#[must_use]
pub fn square_ring(x: f64, y: f64, side: f64) -> RawRing {
    vec![
        vec![x, y],
        vec![x + side, y],
        vec![x + side, y + side],
        vec![x, y + side],
        vec![x, y],
    ]
}

/// GeoJSON polygon of a single square.
#[must_use]
pub fn square_polygon(x: f64, y: f64, side: f64) -> RawGeometry {
    RawGeometry::GeoJsonPolygon(vec![square_ring(x, y, side)])
}

/// Multi-polygon with one member: a five-point square and a four-point hole.
#[must_use]
pub fn holed_multi_polygon() -> RawGeometry {
    let hole = vec![
        vec![2.0, 2.0],
        vec![4.0, 2.0],
        vec![3.0, 4.0],
        vec![2.0, 2.0],
    ];
    RawGeometry::GeoJsonMultiPolygon(vec![vec![square_ring(0.0, 0.0, 10.0), hole]])
}

/// Detail record carrying a valid square and a single `name` field.
#[must_use]
pub fn square_detail(name: &str) -> ParcelDetail {
    let mut fields = BTreeMap::new();
    fields.insert("name".to_owned(), FieldValue::from(name));
    ParcelDetail {
        fields,
        geometry: square_polygon(11.0, 45.0, 0.001),
    }
}

/// Build identifiers `"1"..="n"`.
#[must_use]
pub fn numbered_ids(count: usize) -> Vec<ParcelId> {
    (1..=count).map(|n| ParcelId::new(n.to_string())).collect()
}

/// In-memory [`CredentialStore`].
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    stored: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn with_credentials(credentials: Credentials) -> Self {
        Self {
            stored: Mutex::new(Some(credentials)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credentials>, CredentialStoreError> {
        Ok(self
            .stored
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default())
    }

    fn save(&self, credentials: &Credentials) -> Result<(), CredentialStoreError> {
        if let Ok(mut guard) = self.stored.lock() {
            *guard = Some(credentials.clone());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialStoreError> {
        if let Ok(mut guard) = self.stored.lock() {
            *guard = None;
        }
        Ok(())
    }
}

/// Progress sink remembering every `(processed, total)` pair.
#[derive(Debug, Default, Clone)]
pub struct RecordingProgress {
    pub updates: Vec<(usize, usize)>,
}

impl ProgressSink for RecordingProgress {
    fn batch_completed(&mut self, processed: usize, total: usize) {
        self.updates.push((processed, total));
    }
}

/// Feature sink that fails once it holds `capacity` features.
#[derive(Debug, Default)]
pub struct BoundedSink {
    pub features: Vec<ParcelFeature>,
    pub capacity: usize,
}

impl BoundedSink {
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            features: Vec::new(),
            capacity,
        }
    }
}

impl FeatureSink for BoundedSink {
    fn add_feature(&mut self, feature: ParcelFeature) -> Result<(), SinkError> {
        if self.features.len() >= self.capacity {
            return Err(SinkError::Rejected {
                id: feature.id,
                message: "sink is full".to_owned(),
            });
        }
        self.features.push(feature);
        Ok(())
    }
}

/// Message captured by [`RecordingHost`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    Progress(u8),
    Error { message: String, fatal: bool },
    Info(String),
}

/// [`JobHost`] that records every call and can pretend the user cancelled.
#[derive(Debug, Default)]
pub struct RecordingHost {
    events: Mutex<Vec<HostEvent>>,
    cancelled: AtomicBool,
}

impl RecordingHost {
    /// Host that reports cancellation from the start.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            events: Mutex::default(),
            cancelled: AtomicBool::new(true),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn events(&self) -> Vec<HostEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded error messages flagged as fatal.
    #[must_use]
    pub fn fatal_errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::Error {
                    message,
                    fatal: true,
                } => Some(message),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn progress(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                HostEvent::Progress(percent) => Some(percent),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: HostEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl JobHost for RecordingHost {
    fn report_progress(&self, percent: u8) {
        self.push(HostEvent::Progress(percent));
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn report_error(&self, message: &str, fatal: bool) {
        self.push(HostEvent::Error {
            message: message.to_owned(),
            fatal,
        });
    }

    fn report_info(&self, message: &str) {
        self.push(HostEvent::Info(message.to_owned()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::normalize;
    use rstest::rstest;

    #[rstest]
    fn fixtures_normalize() {
        assert_eq!(
            normalize(&square_polygon(0.0, 0.0, 1.0))
                .expect("square normalizes")
                .point_count(),
            5
        );
        let holed = normalize(&holed_multi_polygon()).expect("holed polygon normalizes");
        assert_eq!(holed.polygon_count(), 1);
        assert_eq!(holed.ring_count(), 2);
    }

    #[rstest]
    fn memory_store_round_trips() {
        let store = MemoryCredentialStore::default();
        assert_eq!(store.load().expect("load"), None);
        let creds = Credentials::new("key", "token");
        store.save(&creds).expect("save");
        assert_eq!(store.load().expect("load"), Some(creds));
        store.clear().expect("clear");
        assert_eq!(store.load().expect("load"), None);
    }
}
