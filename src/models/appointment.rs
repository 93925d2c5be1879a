use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ==================================================================================================
// Appointment (sObject: Event)
// ==================================================================================================

/// Fields required to create an Event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct NewAppointment {
    pub subject: String,
    /// ISO-8601 with timezone offset
    pub start_date_time: DateTime<FixedOffset>,
    pub end_date_time: DateTime<FixedOffset>,
    /// Contact the event is linked to
    pub who_id: String,
}

/// Partial Event update
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct AppointmentUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who_id: Option<String>,
}

/// Event as returned by Salesforce
///
/// Timestamps are kept as strings; Salesforce renders them as
/// `2024-05-01T15:00:00.000+0000`, which is not strict RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Appointment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub start_date_time: Option<String>,
    #[serde(default)]
    pub end_date_time: Option<String>,
    #[serde(default)]
    pub who_id: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}
