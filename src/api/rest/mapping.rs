//! Translation between the internal snake_case model and the camelCase JSON
//! contract the frontend speaks. Status values leave the service in their
//! hyphenated display form.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::recommendation::ScoredInstaller;
use crate::error::AppError;
use crate::geo::GeoPoint;
use crate::models::actor::Actor;
use crate::models::audit::{AuditAction, AuditEntry};
use crate::models::document::{Document, DocumentType};
use crate::models::installation::{Installation, Priority};
use crate::models::installer::{Availability, Installer, JobCounts};
use crate::models::status::InstallationStatus;

pub fn display_status(status: InstallationStatus) -> String {
    status.as_str().replace('_', "-")
}

/// Builds a location from separately supplied coordinates. Both or neither must be set.
pub fn location_from(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, AppError> {
    match (latitude, longitude) {
        (Some(lat), Some(lng)) => Ok(Some(GeoPoint::new(lat, lng)?)),
        (None, None) => Ok(None),
        _ => Err(AppError::BadRequest(
            "latitude and longitude must be provided together".to_string(),
        )),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallerView {
    pub id: Uuid,
    pub company: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub coverage: Vec<String>,
    pub specialties: Vec<String>,
    pub certifications: Vec<String>,
    pub availability: Availability,
    pub active_jobs_count: u32,
    pub pending_jobs_count: u32,
    pub completed_jobs_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InstallerView {
    pub fn new(installer: &Installer, counts: JobCounts) -> Self {
        Self {
            id: installer.id,
            company: installer.company.clone(),
            name: installer.name.clone(),
            email: installer.email.clone(),
            phone: installer.phone.clone(),
            address: installer.address.clone(),
            latitude: installer.location.map(|p| p.lat),
            longitude: installer.location.map(|p| p.lng),
            coverage: installer.coverage.iter().cloned().collect(),
            specialties: installer.specialties.clone(),
            certifications: installer.certifications.clone(),
            availability: installer.availability,
            active_jobs_count: counts.active,
            pending_jobs_count: counts.pending,
            completed_jobs_count: counts.completed,
            created_at: installer.created_at,
            updated_at: installer.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    pub installer: InstallerView,
    pub distance: f64,
    pub distance_score: f64,
    pub availability_score: f64,
    pub workload_score: f64,
    pub total_score: f64,
    pub explanation: String,
}

impl From<ScoredInstaller> for RecommendationView {
    fn from(scored: ScoredInstaller) -> Self {
        Self {
            installer: InstallerView::new(&scored.installer, scored.job_counts),
            distance: scored.distance_km,
            distance_score: scored.breakdown.distance_score,
            availability_score: scored.breakdown.availability_score,
            workload_score: scored.breakdown.workload_score,
            total_score: scored.total_score,
            explanation: scored.explanation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub recommendations: Vec<RecommendationView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerView {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignedInstallerView {
    pub id: Uuid,
    pub company: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallationView {
    pub id: Uuid,
    pub status: String,
    pub priority: Priority,
    pub customer: CustomerView,
    pub address: String,
    pub postal_code: String,
    pub charger_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub assigned_installer: Option<AssignedInstallerView>,
    pub notes: Vec<String>,
    pub rejected_installers: Vec<Uuid>,
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

impl InstallationView {
    /// `installer` is the record behind `assigned_installer`, when it still exists.
    pub fn new(installation: &Installation, installer: Option<&Installer>) -> Self {
        Self {
            id: installation.id,
            status: display_status(installation.status),
            priority: installation.priority,
            customer: CustomerView {
                name: installation.customer_name.clone(),
                email: installation.customer_email.clone(),
                phone: installation.customer_phone.clone(),
            },
            address: installation.address.clone(),
            postal_code: installation.postal_code.clone(),
            charger_type: installation.charger_type.clone(),
            latitude: installation.location.map(|p| p.lat),
            longitude: installation.location.map(|p| p.lng),
            assigned_installer: installation.assigned_installer.map(|id| AssignedInstallerView {
                id,
                company: installer.map(|i| i.company.clone()),
                name: installer.map(|i| i.name.clone()),
            }),
            notes: installation.notes.clone(),
            rejected_installers: installation.rejected_installers.iter().copied().collect(),
            assigned_at: installation.assigned_at,
            accepted_at: installation.accepted_at,
            scheduled_at: installation.scheduled_at,
            started_at: installation.started_at,
            completed_at: installation.completed_at,
            approved_at: installation.approved_at,
            version: installation.version,
            created_at: installation.created_at,
            updated_at: installation.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WorkflowResponse {
    pub id: Uuid,
    pub status: String,
    pub message: String,
}

impl WorkflowResponse {
    pub fn new(installation: &Installation, message: impl Into<String>) -> Self {
        Self {
            id: installation.id,
            status: display_status(installation.status),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentView {
    pub id: Uuid,
    pub installation_id: Uuid,
    pub document_type: DocumentType,
    pub file_name: String,
    pub description: String,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentView {
    fn from(document: &Document) -> Self {
        Self {
            id: document.id,
            installation_id: document.installation_id,
            document_type: document.document_type,
            file_name: document.file_name.clone(),
            description: document.description.clone(),
            uploaded_at: document.uploaded_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntryView {
    pub id: Uuid,
    pub actor: Actor,
    pub action: AuditAction,
    pub model_name: String,
    pub object_id: Uuid,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<&AuditEntry> for AuditEntryView {
    fn from(entry: &AuditEntry) -> Self {
        Self {
            id: entry.id,
            actor: entry.actor,
            action: entry.action,
            model_name: entry.model_name.clone(),
            object_id: entry.object_id,
            details: entry.details.clone(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallerRequest {
    pub company: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub coverage: Vec<String>,
    #[serde(default)]
    pub specialties: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    pub availability: Option<Availability>,
}

/// Entries stay raw JSON so that one malformed entry is reported against its
/// index instead of failing the whole request.
#[derive(Debug, Deserialize)]
pub struct BulkImportRequest {
    #[serde(default)]
    pub installers: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct BulkImportError {
    pub index: usize,
    pub data: serde_json::Value,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkImportResponse {
    pub created: usize,
    pub errors: usize,
    pub installers: Vec<InstallerView>,
    pub error_details: Vec<BulkImportError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInstallerRequest {
    pub company: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub coverage: Option<Vec<String>>,
    pub specialties: Option<Vec<String>>,
    pub certifications: Option<Vec<String>>,
    pub availability: Option<Availability>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallationRequest {
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
    #[serde(default)]
    pub charger_type: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub priority: Option<Priority>,
    #[serde(default)]
    pub notes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignRequest {
    pub installer_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachDocumentRequest {
    #[serde(default)]
    pub document_type: DocumentType,
    pub file_name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationQuery {
    #[serde(alias = "latitude")]
    pub lat: Option<String>,
    #[serde(alias = "longitude")]
    pub lng: Option<String>,
    pub radius: Option<String>,
    pub installation_id: Option<Uuid>,
}
