use async_trait::async_trait;
use chrono::DateTime;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, QueryBuilder, Sqlite, SqlitePool};

use super::{models::Reading, ReadingFilter, ReadingStore, SortOrder, StoreError};

const SELECT_READINGS: &str = "SELECT id, device_id, is_backed_up, temperature, humidity, \
     ethylene_level, uploaded_by, created_at FROM sensor_readings WHERE 1 = 1";

/// Row as laid out in SQLite, where `created_at` is epoch milliseconds.
#[derive(Debug, FromRow)]
struct SqliteReadingRow {
    id: String,
    device_id: String,
    is_backed_up: bool,
    temperature: f64,
    humidity: f64,
    ethylene_level: f64,
    uploaded_by: String,
    created_at: i64,
}

impl TryFrom<SqliteReadingRow> for Reading {
    type Error = StoreError;

    fn try_from(row: SqliteReadingRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::from_timestamp_millis(row.created_at)
            .ok_or(StoreError::InvalidTimestamp(row.created_at))?;
        Ok(Self {
            id: row.id,
            device_id: row.device_id,
            is_backed_up: row.is_backed_up,
            temperature: row.temperature,
            humidity: row.humidity,
            ethylene_level: row.ethylene_level,
            uploaded_by: row.uploaded_by,
            created_at,
        })
    }
}

/// Reading store backed by an embedded SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `database_url`.
    ///
    /// An in-memory database lives only as long as its connection, so
    /// `sqlite::memory:` gets a single connection that is never recycled.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        let options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections)
        };

        let connect_options = database_url
            .parse::<sqlx::sqlite::SqliteConnectOptions>()?
            .create_if_missing(true);
        let pool = options.connect_with(connect_options).await?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations/sqlite").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for SqliteStore {
    async fn create(&self, reading: &Reading) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sensor_readings
                (id, device_id, is_backed_up, temperature, humidity,
                 ethylene_level, uploaded_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&reading.id)
        .bind(&reading.device_id)
        .bind(reading.is_backed_up)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.ethylene_level)
        .bind(&reading.uploaded_by)
        .bind(reading.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        filter: &ReadingFilter,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT_READINGS);
        if let Some(device_id) = &filter.device_id {
            qb.push(" AND device_id = ").push_bind(device_id.clone());
        }
        if let Some(start) = filter.start_time {
            qb.push(" AND created_at >= ").push_bind(start.timestamp_millis());
        }
        if let Some(end) = filter.end_time {
            qb.push(" AND created_at <= ").push_bind(end.timestamp_millis());
        }
        match order {
            SortOrder::Descending => {
                qb.push(" ORDER BY created_at DESC");
            }
            SortOrder::Ascending => {
                qb.push(" ORDER BY created_at ASC");
            }
            SortOrder::Unsorted => {}
        }

        qb.build_query_as::<SqliteReadingRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Reading::try_from)
            .collect()
    }

    async fn distinct_device_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT device_id FROM sensor_readings")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}
