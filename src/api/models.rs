use crate::auth::models::Role;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A medical document as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default)]
    pub id: Option<i64>,
    pub filename: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub upload_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub ai_analysis: Option<serde_json::Value>,
}

impl DocumentInfo {
    /// The AI analysis as a JSON value.
    ///
    /// Some endpoints send the stored analysis as a JSON-encoded string rather than an
    /// object; both forms are accepted here.
    pub fn analysis(&self) -> Option<serde_json::Value> {
        match self.ai_analysis.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(raw) => serde_json::from_str(raw).ok(),
            other => Some(other.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessCode {
    pub access_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkOutcome {
    pub message: String,
}

// The backend emits naive ISO-8601 timestamps for some rows and offset-aware ones for others.
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(serde::de::Error::custom)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .map_err(|e| format!("invalid timestamp '{}': {}", raw, e))
}
