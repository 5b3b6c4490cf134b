use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: Uuid,
    pub ip: String,
    #[serde(default)]
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub email: String,
    pub project_type: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Contact form body as posted by the site. Every field is optional here so
/// that missing ones surface as a validation error rather than a parse error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub project_type: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitOutcome {
    Counted(Uuid),
    /// The same address was seen inside the window.
    AlreadyRecorded,
}

/// On-disk layout of the records file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordDatabase {
    #[serde(default)]
    pub visitors: Vec<Visitor>,
    #[serde(default)]
    pub contacts: Vec<ContactRequest>,
}
