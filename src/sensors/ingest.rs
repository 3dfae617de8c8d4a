use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Deserializer};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{db::models::Reading, error::Error};

/// Candidate reading as uploaded by a device. Omitted numeric fields are zero.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, ToSchema)]
#[serde(default)]
pub struct NewReading {
    #[serde(deserialize_with = "null_as_default")]
    pub device_id: String,
    #[serde(alias = "is_backedup", deserialize_with = "null_as_default")]
    pub is_backed_up: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub temperature: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub humidity: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub ethylene_level: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub uploaded_by: String,
    /// Unix epoch seconds. Absent or `0` means "now".
    pub created_at: Option<i64>,
}

impl NewReading {
    /// Parse a request body. Any syntax or shape error is a client error.
    pub fn from_json(body: &[u8]) -> Result<Self, Error> {
        serde_json::from_slice(body).map_err(|e| Error::Client(e.to_string()))
    }

    /// Resolve identity, timestamp and attribution into a storable reading.
    ///
    /// The server clock is truncated to whole seconds so stored timestamps
    /// match the epoch seconds clients see and filter on.
    ///
    /// `uploaded_by` falls back to `request_uploader` (typically the
    /// User-Agent) and then to `default_uploader`; empty strings count as
    /// absent at every step.
    pub fn into_reading(
        self,
        now: DateTime<Utc>,
        request_uploader: Option<&str>,
        default_uploader: &str,
    ) -> Result<Reading, Error> {
        let created_at = match self.created_at {
            Some(secs) if secs != 0 => DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| Error::Client(format!("created_at out of range: {secs}")))?,
            _ => now.trunc_subsecs(0),
        };

        let uploaded_by = if !self.uploaded_by.is_empty() {
            self.uploaded_by
        } else {
            request_uploader
                .filter(|u| !u.is_empty())
                .unwrap_or(default_uploader)
                .to_owned()
        };

        Ok(Reading {
            id: new_reading_id(),
            device_id: self.device_id,
            is_backed_up: self.is_backed_up,
            temperature: self.temperature,
            humidity: self.humidity,
            ethylene_level: self.ethylene_level,
            uploaded_by,
            created_at,
        })
    }
}

/// JSON `null` reads the same as an omitted field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Time-ordered unique id (UUIDv7).
pub fn new_reading_id() -> String {
    Uuid::now_v7().to_string()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap()
    }

    #[test]
    fn from_json_accepts_full_payload() {
        let body = br#"{
            "device_id": "dev1",
            "is_backed_up": true,
            "temperature": 21.5,
            "humidity": 60.0,
            "ethylene_level": 0.3,
            "uploaded_by": "gateway-7",
            "created_at": 1700000100
        }"#;
        let r = NewReading::from_json(body).unwrap();
        assert_eq!(r.device_id, "dev1");
        assert!(r.is_backed_up);
        assert_eq!(r.temperature, 21.5);
        assert_eq!(r.humidity, 60.0);
        assert_eq!(r.ethylene_level, 0.3);
        assert_eq!(r.uploaded_by, "gateway-7");
        assert_eq!(r.created_at, Some(1_700_000_100));
    }

    #[test]
    fn from_json_defaults_missing_fields() {
        let r = NewReading::from_json(b"{}").unwrap();
        assert_eq!(r, NewReading::default());
        assert_eq!(r.device_id, "");
        assert_eq!(r.temperature, 0.0);
        assert_eq!(r.created_at, None);
    }

    #[test]
    fn from_json_treats_null_as_absent() {
        let body = br#"{
            "device_id": null,
            "is_backed_up": null,
            "temperature": null,
            "humidity": null,
            "ethylene_level": null,
            "uploaded_by": null,
            "created_at": null
        }"#;
        assert_eq!(NewReading::from_json(body).unwrap(), NewReading::default());
    }

    #[test]
    fn from_json_accepts_is_backedup_alias() {
        let r = NewReading::from_json(br#"{"is_backedup": true}"#).unwrap();
        assert!(r.is_backed_up);
    }

    #[test]
    fn from_json_rejects_malformed_body() {
        let err = NewReading::from_json(b"{not json").unwrap_err();
        assert!(matches!(err, Error::Client(_)));
    }

    #[test]
    fn from_json_rejects_wrong_field_type() {
        let err = NewReading::from_json(br#"{"temperature": "hot"}"#).unwrap_err();
        assert!(matches!(err, Error::Client(ref msg) if msg.contains("invalid type")));
    }

    #[test]
    fn supplied_created_at_is_used() {
        let r = NewReading {
            created_at: Some(1_600_000_000),
            ..Default::default()
        };
        let reading = r.into_reading(now(), None, "unknown").unwrap();
        assert_eq!(reading.created_at.timestamp(), 1_600_000_000);
    }

    #[test]
    fn zero_or_absent_created_at_uses_clock() {
        let whole = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let zero = NewReading {
            created_at: Some(0),
            ..Default::default()
        };
        assert_eq!(zero.into_reading(now(), None, "unknown").unwrap().created_at, whole);

        let absent = NewReading::default();
        assert_eq!(absent.into_reading(now(), None, "unknown").unwrap().created_at, whole);
    }

    #[test]
    fn out_of_range_created_at_is_client_error() {
        let r = NewReading {
            created_at: Some(i64::MAX),
            ..Default::default()
        };
        let err = r.into_reading(now(), None, "unknown").unwrap_err();
        assert!(matches!(err, Error::Client(_)));
    }

    #[test]
    fn client_uploader_wins_over_header() {
        let r = NewReading {
            uploaded_by: "gateway-7".to_owned(),
            ..Default::default()
        };
        let reading = r.into_reading(now(), Some("curl/8.0"), "unknown").unwrap();
        assert_eq!(reading.uploaded_by, "gateway-7");
    }

    #[test]
    fn empty_uploader_falls_back_to_header_then_default() {
        let reading = NewReading::default()
            .into_reading(now(), Some("curl/8.0"), "unknown")
            .unwrap();
        assert_eq!(reading.uploaded_by, "curl/8.0");

        let reading = NewReading::default()
            .into_reading(now(), Some(""), "unknown")
            .unwrap();
        assert_eq!(reading.uploaded_by, "unknown");

        let reading = NewReading::default()
            .into_reading(now(), None, "unknown")
            .unwrap();
        assert_eq!(reading.uploaded_by, "unknown");
    }

    #[test]
    fn measurements_are_copied_verbatim() {
        let r = NewReading {
            device_id: "dev9".to_owned(),
            is_backed_up: true,
            temperature: -12.25,
            humidity: 101.0,
            ethylene_level: 9999.0,
            ..Default::default()
        };
        let reading = r.into_reading(now(), None, "unknown").unwrap();
        assert_eq!(reading.device_id, "dev9");
        assert!(reading.is_backed_up);
        assert_eq!(reading.temperature, -12.25);
        assert_eq!(reading.humidity, 101.0);
        assert_eq!(reading.ethylene_level, 9999.0);
    }

    #[test]
    fn ids_are_non_empty_and_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| new_reading_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| !id.is_empty()));
    }
}
