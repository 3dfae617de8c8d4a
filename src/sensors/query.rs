use chrono::DateTime;
use serde::Deserialize;
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::{db::ReadingFilter, error::Error};

/// Filter parameters as they arrive in the query string.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QueryParams {
    /// Exact device id. Empty means all devices.
    pub device_id: Option<String>,
    /// Inclusive lower bound, Unix epoch seconds. `0` or non-numeric means unbounded.
    pub start_time: Option<String>,
    /// Inclusive upper bound, Unix epoch seconds. `0` or non-numeric means unbounded.
    pub end_time: Option<String>,
}

/// Filter parameters sent as a JSON body. Times may be numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct QueryBody {
    pub device_id: Option<String>,
    #[schema(value_type = Option<i64>)]
    pub start_time: Option<Value>,
    #[schema(value_type = Option<i64>)]
    pub end_time: Option<Value>,
}

impl QueryParams {
    pub fn into_filter(self) -> ReadingFilter {
        build_filter(
            self.device_id,
            self.start_time.as_deref().and_then(parse_epoch),
            self.end_time.as_deref().and_then(parse_epoch),
        )
    }
}

impl QueryBody {
    /// Parse a request body. An empty body means no filters.
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| Error::Client(e.to_string()))
    }

    pub fn into_filter(self) -> ReadingFilter {
        build_filter(
            self.device_id,
            self.start_time.as_ref().and_then(epoch_from_json),
            self.end_time.as_ref().and_then(epoch_from_json),
        )
    }
}

/// Parse epoch seconds. Zero and non-numeric input both mean "no bound".
pub fn parse_epoch(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|&secs| secs != 0)
}

fn epoch_from_json(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().filter(|&secs| secs != 0),
        Value::String(s) => parse_epoch(s),
        _ => None,
    }
}

/// Combine the parsed inputs into a conjunctive filter. Empty device ids and
/// timestamps outside the representable range impose no constraint.
pub fn build_filter(
    device_id: Option<String>,
    start_secs: Option<i64>,
    end_secs: Option<i64>,
) -> ReadingFilter {
    ReadingFilter {
        device_id: device_id.filter(|d| !d.is_empty()),
        start_time: start_secs.and_then(|s| DateTime::from_timestamp(s, 0)),
        end_time: end_secs.and_then(|s| DateTime::from_timestamp(s, 0)),
    }
}
