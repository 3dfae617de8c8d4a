pub mod memory;
pub mod models;
pub mod postgres;
pub mod sqlite;

use std::{str::FromStr, sync::Arc};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use self::{memory::MemoryStore, models::Reading, postgres::PgStore, sqlite::SqliteStore};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("duplicate reading id: {0}")]
    DuplicateId(String),

    #[error("stored timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Filter and ordering
// ---------------------------------------------------------------------------

/// Conjunctive filter over readings. `None` fields impose no constraint.
/// Both time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadingFilter {
    pub device_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

impl ReadingFilter {
    pub fn matches(&self, reading: &Reading) -> bool {
        self.device_id
            .as_deref()
            .map_or(true, |d| reading.device_id == d)
            && self.start_time.map_or(true, |t| reading.created_at >= t)
            && self.end_time.map_or(true, |t| reading.created_at <= t)
    }
}

/// Result ordering by `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
    /// Whatever order the backend yields.
    Unsorted,
}

impl FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "desc" => Ok(Self::Descending),
            "asc" => Ok(Self::Ascending),
            "none" => Ok(Self::Unsorted),
            other => Err(anyhow::anyhow!("unknown sort order: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Store capability
// ---------------------------------------------------------------------------

/// Persistence capabilities needed by the sensor service. Every call is a
/// single round trip to the backend.
#[async_trait]
pub trait ReadingStore: Send + Sync {
    /// Insert one reading.
    async fn create(&self, reading: &Reading) -> Result<(), StoreError>;

    /// Fetch every reading matching `filter`, ordered by `order`.
    async fn find(&self, filter: &ReadingFilter, order: SortOrder)
        -> Result<Vec<Reading>, StoreError>;

    /// Distinct `device_id` values across all readings, in no particular order.
    async fn distinct_device_ids(&self) -> Result<Vec<String>, StoreError>;
}

pub type SharedStore = Arc<dyn ReadingStore>;

// ---------------------------------------------------------------------------
// Backend selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Postgres,
    Sqlite,
    Memory,
}

impl Backend {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Self::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Self::Sqlite)
        } else if url.starts_with("memory:") {
            Ok(Self::Memory)
        } else {
            Err(anyhow::anyhow!(
                "DATABASE_URL must start with postgres://, sqlite: or memory:"
            ))
        }
    }
}

/// Connect to the backend named by `database_url` and bring its schema up
/// to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<SharedStore> {
    let backend = Backend::from_url(database_url)?;

    let store: SharedStore = match backend {
        Backend::Postgres => {
            let store = PgStore::connect(database_url, max_connections)
                .await
                .context("failed to connect to Postgres")?;
            store.run_migrations().await.context("Postgres migrations failed")?;
            Arc::new(store)
        }
        Backend::Sqlite => {
            let store = SqliteStore::connect(database_url, max_connections)
                .await
                .context("failed to open SQLite database")?;
            store.run_migrations().await.context("SQLite migrations failed")?;
            Arc::new(store)
        }
        Backend::Memory => Arc::new(MemoryStore::new()),
    };

    info!(backend = ?backend, "Reading store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading_at(device_id: &str, secs: i64) -> Reading {
        Reading {
            id: format!("{device_id}-{secs}"),
            device_id: device_id.to_owned(),
            is_backed_up: false,
            temperature: 0.0,
            humidity: 0.0,
            ethylene_level: 0.0,
            uploaded_by: "test".to_owned(),
            created_at: DateTime::from_timestamp(secs, 0).unwrap(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let f = ReadingFilter::default();
        assert!(f.matches(&reading_at("dev1", 100)));
        assert!(f.matches(&reading_at("", 0)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let f = ReadingFilter {
            device_id: None,
            start_time: DateTime::from_timestamp(100, 0),
            end_time: DateTime::from_timestamp(200, 0),
        };
        assert!(f.matches(&reading_at("dev1", 100)));
        assert!(f.matches(&reading_at("dev1", 200)));
        assert!(!f.matches(&reading_at("dev1", 99)));
        assert!(!f.matches(&reading_at("dev1", 201)));
    }

    #[test]
    fn all_predicates_must_hold() {
        let f = ReadingFilter {
            device_id: Some("dev1".to_owned()),
            start_time: DateTime::from_timestamp(150, 0),
            end_time: None,
        };
        assert!(f.matches(&reading_at("dev1", 200)));
        assert!(!f.matches(&reading_at("dev2", 200)));
        assert!(!f.matches(&reading_at("dev1", 100)));
    }

    #[test]
    fn sort_order_from_str() {
        assert_eq!("desc".parse::<SortOrder>().unwrap(), SortOrder::Descending);
        assert_eq!("asc".parse::<SortOrder>().unwrap(), SortOrder::Ascending);
        assert_eq!("none".parse::<SortOrder>().unwrap(), SortOrder::Unsorted);
        assert!("random".parse::<SortOrder>().is_err());
    }

    #[test]
    fn backend_from_url() {
        assert_eq!(Backend::from_url("postgres://u:p@h/db").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_url("postgresql://h/db").unwrap(), Backend::Postgres);
        assert_eq!(Backend::from_url("sqlite://readings.db").unwrap(), Backend::Sqlite);
        assert_eq!(Backend::from_url("sqlite::memory:").unwrap(), Backend::Sqlite);
        assert_eq!(Backend::from_url("memory:").unwrap(), Backend::Memory);
        assert!(Backend::from_url("mysql://h/db").is_err());
    }
}
