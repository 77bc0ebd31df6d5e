use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    #[default]
    Photo,
    Certificate,
    Invoice,
    Other,
}

/// Metadata of a file attached to an installation. The bytes live elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub installation_id: Uuid,
    pub document_type: DocumentType,
    pub file_name: String,
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
}
