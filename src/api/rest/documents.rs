use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::rest::mapping::{AttachDocumentRequest, DocumentView};
use crate::engine::policy::{authorize, Action, Resource};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::audit::AuditAction;
use crate::models::document::Document;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/installations/:id/documents", post(attach_document))
        .route("/files", get(list_documents))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListDocumentsQuery {
    pub installation_id: Option<Uuid>,
}

async fn attach_document(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(installation_id): Path<Uuid>,
    Json(payload): Json<AttachDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentView>), AppError> {
    {
        let installation = state.installations.get(&installation_id).ok_or_else(|| {
            AppError::NotFound(format!("installation {installation_id} not found"))
        })?;
        authorize(
            &actor,
            Action::AttachDocument,
            Resource::Installation(installation.value()),
        )?;
    }

    if payload.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("fileName cannot be empty".to_string()));
    }

    let document = Document {
        id: Uuid::new_v4(),
        installation_id,
        document_type: payload.document_type,
        file_name: payload.file_name,
        description: payload.description,
        uploaded_at: Utc::now(),
    };

    state.documents.insert(document.id, document.clone());
    state.record_audit(
        actor,
        AuditAction::Create,
        "document",
        document.id,
        json!({ "installation_id": installation_id, "file_name": document.file_name }),
    );

    Ok((StatusCode::CREATED, Json(DocumentView::from(&document))))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<ListDocumentsQuery>,
) -> Json<Vec<DocumentView>> {
    let mut documents: Vec<Document> = state
        .documents
        .iter()
        .filter(|entry| {
            query
                .installation_id
                .map_or(true, |id| entry.installation_id == id)
        })
        .map(|entry| entry.value().clone())
        .collect();

    documents.retain(|document| {
        state
            .installations
            .get(&document.installation_id)
            .is_some_and(|installation| {
                authorize(
                    &actor,
                    Action::ViewInstallation,
                    Resource::Installation(installation.value()),
                )
                .is_ok()
            })
    });
    documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));

    Json(documents.iter().map(DocumentView::from).collect())
}
