use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One persisted sensor measurement. Rows are written once and never
/// updated or deleted.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Reading {
    pub id: String,
    /// Opaque device identifier; devices exist only as values of this column.
    pub device_id: String,
    pub is_backed_up: bool,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Parts per million
    pub ethylene_level: f64,
    pub uploaded_by: String,
    pub created_at: DateTime<Utc>,
}
