use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{models::Reading, ReadingFilter, ReadingStore, SortOrder, StoreError};

/// In-process reading store. Nothing survives a restart.
///
/// Wrapped in `Arc` so it can be cheaply cloned and shared across tasks;
/// clones see the same rows. `set_unavailable(true)` makes every call fail,
/// which lets tests exercise the store-failure paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    rows: Arc<RwLock<Vec<Reading>>>,
    unavailable: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("memory store marked unavailable".to_owned()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for MemoryStore {
    async fn create(&self, reading: &Reading) -> Result<(), StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().await;
        if rows.iter().any(|r| r.id == reading.id) {
            return Err(StoreError::DuplicateId(reading.id.clone()));
        }
        rows.push(reading.clone());
        Ok(())
    }

    async fn find(
        &self,
        filter: &ReadingFilter,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        self.check_available()?;
        let mut found: Vec<Reading> = self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        // Stable sorts keep insertion order among equal timestamps.
        match order {
            SortOrder::Descending => found.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Ascending => found.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortOrder::Unsorted => {}
        }
        Ok(found)
    }

    async fn distinct_device_ids(&self) -> Result<Vec<String>, StoreError> {
        self.check_available()?;
        let ids: BTreeSet<String> = self
            .rows
            .read()
            .await
            .iter()
            .map(|r| r.device_id.clone())
            .collect();
        Ok(ids.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;

    fn make_reading(id: &str, device_id: &str, secs: i64) -> Reading {
        Reading {
            id: id.to_owned(),
            device_id: device_id.to_owned(),
            is_backed_up: false,
            temperature: 20.0,
            humidity: 50.0,
            ethylene_level: 1.0,
            uploaded_by: "test".to_owned(),
            created_at: DateTime::from_timestamp(secs, 0).unwrap(),
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store.create(&make_reading("a", "dev1", 100)).await.unwrap();
        store.create(&make_reading("b", "dev2", 300)).await.unwrap();
        store.create(&make_reading("c", "dev1", 200)).await.unwrap();
        store
    }

    fn ids(rows: &[Reading]) -> Vec<&str> {
        rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn empty_store_returns_nothing() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        let rows = store.find(&ReadingFilter::default(), SortOrder::Descending).await.unwrap();
        assert!(rows.is_empty());
        assert!(store.distinct_device_ids().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn find_orders_by_created_at() {
        let store = seeded().await;
        let filter = ReadingFilter::default();

        let desc = store.find(&filter, SortOrder::Descending).await.unwrap();
        assert_eq!(ids(&desc), ["b", "c", "a"]);

        let asc = store.find(&filter, SortOrder::Ascending).await.unwrap();
        assert_eq!(ids(&asc), ["a", "c", "b"]);

        let unsorted = store.find(&filter, SortOrder::Unsorted).await.unwrap();
        assert_eq!(ids(&unsorted), ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn find_applies_time_range() {
        let store = seeded().await;
        let filter = ReadingFilter {
            device_id: None,
            start_time: DateTime::from_timestamp(150, 0),
            end_time: DateTime::from_timestamp(250, 0),
        };
        let rows = store.find(&filter, SortOrder::Descending).await.unwrap();
        assert_eq!(ids(&rows), ["c"]);
    }

    #[tokio::test]
    async fn find_applies_device_filter() {
        let store = seeded().await;
        let filter = ReadingFilter {
            device_id: Some("dev1".to_owned()),
            ..Default::default()
        };
        let rows = store.find(&filter, SortOrder::Descending).await.unwrap();
        assert_eq!(ids(&rows), ["c", "a"]);
    }

    #[tokio::test]
    async fn distinct_device_ids_are_unique() {
        let store = seeded().await;
        let mut devices = store.distinct_device_ids().await.unwrap();
        devices.sort();
        assert_eq!(devices, ["dev1", "dev2"]);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected() {
        let store = MemoryStore::new();
        store.create(&make_reading("a", "dev1", 100)).await.unwrap();
        assert!(store.create(&make_reading("a", "dev2", 200)).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = seeded().await;
        store.set_unavailable(true);

        assert!(store.create(&make_reading("d", "dev3", 400)).await.is_err());
        assert!(store.find(&ReadingFilter::default(), SortOrder::Descending).await.is_err());
        assert!(store.distinct_device_ids().await.is_err());

        store.set_unavailable(false);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn clone_shares_state() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.create(&make_reading("a", "dev1", 100)).await.unwrap();
        assert_eq!(clone.len().await, 1);
    }
}
