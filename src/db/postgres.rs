use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, QueryBuilder};

use super::{models::Reading, ReadingFilter, ReadingStore, SortOrder, StoreError};

const SELECT_READINGS: &str = "SELECT id, device_id, is_backed_up, temperature, humidity, \
     ethylene_level, uploaded_by, created_at FROM sensor_readings WHERE TRUE";

/// Reading store backed by a Postgres connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations/postgres").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl ReadingStore for PgStore {
    async fn create(&self, reading: &Reading) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sensor_readings
                (id, device_id, is_backed_up, temperature, humidity,
                 ethylene_level, uploaded_by, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&reading.id)
        .bind(&reading.device_id)
        .bind(reading.is_backed_up)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.ethylene_level)
        .bind(&reading.uploaded_by)
        .bind(reading.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(
        &self,
        filter: &ReadingFilter,
        order: SortOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_READINGS);
        if let Some(device_id) = &filter.device_id {
            qb.push(" AND device_id = ").push_bind(device_id.clone());
        }
        if let Some(start) = filter.start_time {
            qb.push(" AND created_at >= ").push_bind(start);
        }
        if let Some(end) = filter.end_time {
            qb.push(" AND created_at <= ").push_bind(end);
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

        let rows = qb.build_query_as::<Reading>().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn distinct_device_ids(&self) -> Result<Vec<String>, StoreError> {
        let ids = sqlx::query_scalar::<_, String>("SELECT DISTINCT device_id FROM sensor_readings")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
