use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::models::status::InstallationStatus;

/// Prefix of the note entry older records used to carry the rejection history.
pub const LEGACY_REJECTION_MARKER: &str = "rejected_installers:";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

/// Installers that declined a job, in the order they declined it.
///
/// Membership is unique: recording the same installer twice is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RejectionHistory(Vec<Uuid>);

impl RejectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the installer was not already present.
    pub fn record(&mut self, installer_id: Uuid) -> bool {
        if self.contains(&installer_id) {
            return false;
        }
        self.0.push(installer_id);
        true
    }

    pub fn contains(&self, installer_id: &Uuid) -> bool {
        self.0.contains(installer_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.0.iter()
    }

    /// Pulls legacy rejection markers out of `notes`, returning the decoded
    /// history and the notes that remain.
    ///
    /// Entries that are not valid UUIDs are dropped.
    pub fn extract_from_notes(
        notes: Vec<String>,
    ) -> Result<(Self, Vec<String>), serde_json::Error> {
        let mut history = Self::new();
        let mut remaining = Vec::with_capacity(notes.len());

        for note in notes {
            match note.strip_prefix(LEGACY_REJECTION_MARKER) {
                Some(payload) => {
                    let ids: Vec<String> = serde_json::from_str(payload.trim())?;
                    for id in ids.iter().filter_map(|raw| Uuid::parse_str(raw).ok()) {
                        history.record(id);
                    }
                }
                None => remaining.push(note),
            }
        }

        Ok((history, remaining))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installation {
    pub id: Uuid,
    pub status: InstallationStatus,
    pub priority: Priority,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub address: String,
    pub postal_code: String,
    pub charger_type: String,
    pub location: Option<GeoPoint>,
    pub assigned_installer: Option<Uuid>,
    pub notes: Vec<String>,
    pub rejected_installers: RejectionHistory,
    pub assigned_at: Option<DateTime<Utc>>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
