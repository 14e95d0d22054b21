use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Transport-level identity shared by applicants and administrators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier wrapper for stored applications; assigned monotonically by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub u64);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque address used to deliver notifications back to the applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContactChannelId(pub i64);

/// High level status tracked throughout the membership application workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Declined,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Declined => "declined",
        }
    }
}

/// Applicant metadata supplied by the front-end transport when a survey starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantIdentity {
    pub applicant_id: UserId,
    pub contact_channel_id: ContactChannelId,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// A stored membership application. Never deleted; retained as an audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub applicant_id: UserId,
    pub contact_channel_id: ContactChannelId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    /// Question-key to free-text answer; immutable after submission.
    pub answers: BTreeMap<String, String>,
    pub status: ApplicationStatus,
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// One-way false -> true, set only after a confirmed knowledge-base push.
    pub synced: bool,
}

impl Application {
    /// Name used when addressing the applicant in notifications and sync rows.
    pub fn addressed_name(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("there")
    }

    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            applicant_id: self.applicant_id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            status: self.status.label(),
            synced: self.synced,
            answers: self.answers.clone(),
            submitted_at: self.created_at,
        }
    }

    pub fn history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            id: self.id,
            status: self.status.label(),
            submitted_at: self.created_at,
        }
    }
}

/// Sanitized per-application view handed to the admin front-end.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationSummary {
    pub id: ApplicationId,
    pub applicant_id: UserId,
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub status: &'static str,
    pub synced: bool,
    pub answers: BTreeMap<String, String>,
    pub submitted_at: DateTime<Utc>,
}

/// One line of an applicant's submission history.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: ApplicationId,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
}

/// Latest-status report for the `applicant_status` operation.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub application_id: ApplicationId,
    pub status: &'static str,
    pub submitted_at: DateTime<Utc>,
}
