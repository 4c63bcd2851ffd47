//! Wire and domain types for the location backend.
//!
//! Field names follow the backend's JSON (camelCase). Cloud Endpoints encodes
//! 64-bit integers as decimal strings, so timestamps accept either form.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};

/// A single recorded position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    /// Radius of the fix in meters.
    #[serde(default)]
    pub accuracy: f64,
    #[serde(alias = "timeStampMs", deserialize_with = "int64_lenient")]
    pub timestamp_ms: i64,
}

/// Offsets used to turn a record timestamp into the wall-clock time shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneInfo {
    #[serde(rename = "rawOffset", default)]
    pub raw_offset_seconds: i64,
    #[serde(rename = "dstOffset", default)]
    pub dst_offset_seconds: i64,
    #[serde(rename = "timeZoneId", default)]
    pub id: String,
    #[serde(rename = "timeZoneName", default)]
    pub name: String,
}

impl TimezoneInfo {
    pub fn utc() -> Self {
        Self {
            raw_offset_seconds: 0,
            dst_offset_seconds: 0,
            id: "UTC".to_string(),
            name: "Coordinated Universal Time".to_string(),
        }
    }
}

impl Default for TimezoneInfo {
    fn default() -> Self {
        Self::utc()
    }
}

/// Payload of the history call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRequest {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl From<NaiveDate> for DayRequest {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
        }
    }
}

/// Successful body of the history call.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    #[serde(default)]
    pub locations: Vec<LocationRecord>,
    #[serde(default, deserialize_with = "optional_int64_lenient")]
    pub total_locations: Option<i64>,
    #[serde(default)]
    pub time_zone: Option<TimezoneInfo>,
    #[serde(default)]
    pub date: Option<DayRequest>,
}

/// Successful body of the latest call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LatestResponse {
    #[serde(default)]
    pub location: Option<LocationRecord>,
}

/// One day of history as displayed. Replaced wholesale on every fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryDay {
    pub date: NaiveDate,
    pub locations: Vec<LocationRecord>,
    pub timezone: TimezoneInfo,
}

impl HistoryDay {
    pub fn from_response(date: NaiveDate, response: HistoryResponse) -> Self {
        let mut locations = response.locations;
        if let Some(total) = response.total_locations {
            let total = usize::try_from(total).unwrap_or(0);
            if total < locations.len() {
                tracing::warn!(
                    "History for {} reports {} locations but carries {}; truncating",
                    date,
                    total,
                    locations.len()
                );
                locations.truncate(total);
            }
        }

        Self {
            date,
            locations,
            timezone: response.time_zone.unwrap_or_default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// OAuth2 userinfo result. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl UserProfile {
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or("Signed in")
    }
}

/// Token object handed to the authorize callback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default, deserialize_with = "optional_string_lenient")]
    pub expires_in: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(i64),
    Float(f64),
    Text(String),
}

fn int64_lenient<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Float(f) => Ok(f as i64),
        NumberOrText::Text(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| serde::de::Error::custom(format!("invalid int64 '{}': {}", s, e))),
    }
}

fn optional_int64_lenient<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Float(f)) => Ok(Some(f as i64)),
        Some(NumberOrText::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|e| serde::de::Error::custom(format!("invalid int64 '{}': {}", s, e))),
    }
}

fn optional_string_lenient<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(
        Option::<NumberOrText>::deserialize(deserializer)?.map(|v| match v {
            NumberOrText::Number(n) => n.to_string(),
            NumberOrText::Float(f) => f.to_string(),
            NumberOrText::Text(s) => s,
        }),
    )
}
