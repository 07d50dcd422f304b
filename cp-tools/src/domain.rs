use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Agency client. Optional fields are frequently absent in real data; every
/// reader must tolerate that.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub segment: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Scheduled meeting, joined with its client's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meeting {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    #[serde(default)]
    pub contact_name: Option<String>,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// `HH:MM`.
    pub time: String,
    pub meeting_type: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    pub priority: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub client_id: String,
    pub client_name: String,
    pub amount: f64,
    /// `YYYY-MM-DD`.
    pub due_date: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Zero when not yet due.
    #[serde(default)]
    pub days_overdue: i64,
}
