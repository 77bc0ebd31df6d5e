use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::Json;
use axum::Router;

use crate::api::rest::mapping::AuditEntryView;
use crate::engine::policy::{authorize, Action, Resource};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/audit-logs", get(list_audit_logs))
}

async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<AuditEntryView>>, AppError> {
    authorize(&actor, Action::ViewAuditLog, Resource::Global)?;

    let mut entries: Vec<AuditEntryView> = state
        .audit_log
        .iter()
        .map(|entry| AuditEntryView::from(entry.value()))
        .collect();
    entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(entries))
}
