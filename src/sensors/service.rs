use chrono::Utc;
use tracing::info;

use crate::{
    db::{models::Reading, ReadingFilter, SharedStore, SortOrder},
    error::Result,
};

use super::{aggregate::AggregateResult, ingest::NewReading};

/// Ingestion, device listing and aggregation over an injected store.
///
/// Cheap to clone; clones share the same store handle.
#[derive(Clone)]
pub struct SensorService {
    store: SharedStore,
    order: SortOrder,
    default_uploader: String,
}

impl SensorService {
    pub fn new(store: SharedStore, order: SortOrder, default_uploader: impl Into<String>) -> Self {
        Self {
            store,
            order,
            default_uploader: default_uploader.into(),
        }
    }

    /// Normalizes `payload` and persists it with a single insert.
    ///
    /// `request_uploader` is the request-derived attribution used when the
    /// payload carries no `uploaded_by`.
    pub async fn ingest(
        &self,
        payload: NewReading,
        request_uploader: Option<&str>,
    ) -> Result<Reading> {
        let reading = payload.into_reading(Utc::now(), request_uploader, &self.default_uploader)?;

        self.store.create(&reading).await?;

        info!(
            id = %reading.id,
            device_id = %reading.device_id,
            created_at = reading.created_at.timestamp(),
            "Reading persisted"
        );
        Ok(reading)
    }

    /// Every distinct device id seen so far.
    pub async fn list_devices(&self) -> Result<Vec<String>> {
        let devices = self.store.distinct_device_ids().await?;
        info!(count = devices.len(), "Listed devices");
        Ok(devices)
    }

    /// Fetches readings matching `filter` in the configured order and
    /// averages them. No matches is a successful, all-zero result.
    pub async fn query(&self, filter: &ReadingFilter) -> Result<AggregateResult> {
        let readings = self.store.find(filter, self.order).await?;
        info!(
            device_id = filter.device_id.as_deref().unwrap_or("*"),
            start = ?filter.start_time.map(|t| t.timestamp()),
            end = ?filter.end_time.map(|t| t.timestamp()),
            count = readings.len(),
            "Queried readings"
        );
        Ok(AggregateResult::from(readings))
    }
}
