use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{db::models::Reading, sensors::aggregate::AggregateResult};

/// Presentation form of a reading: `created_at` is Unix epoch seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadingDto {
    pub id: String,
    pub device_id: String,
    pub is_backed_up: bool,
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    pub ethylene_level: f64,
    pub uploaded_by: String,
    /// Unix epoch seconds
    pub created_at: i64,
}

impl From<Reading> for ReadingDto {
    fn from(r: Reading) -> Self {
        Self {
            id: r.id,
            device_id: r.device_id,
            is_backed_up: r.is_backed_up,
            temperature: r.temperature,
            humidity: r.humidity,
            ethylene_level: r.ethylene_level,
            uploaded_by: r.uploaded_by,
            created_at: r.created_at.timestamp(),
        }
    }
}

/// Response for the aggregation query endpoint. Averages are `0` when
/// `data` is empty.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueryResponse {
    pub average_temperature: f64,
    pub average_humidity: f64,
    pub average_ethylene_level: f64,
    /// Matching readings, newest first unless configured otherwise.
    pub data: Vec<ReadingDto>,
}

impl From<AggregateResult> for QueryResponse {
    fn from(result: AggregateResult) -> Self {
        Self {
            average_temperature: result.averages.temperature,
            average_humidity: result.averages.humidity,
            average_ethylene_level: result.averages.ethylene_level,
            data: result.readings.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DevicesResponse {
    pub devices: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}
