use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::api::rest::mapping::{
    display_status, location_from, AssignRequest, CreateInstallationRequest, InstallationView,
    StatusRequest, WorkflowResponse,
};
use crate::engine::policy::{authorize, Action, Resource};
use crate::engine::workflow::{self, Command};
use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::audit::AuditAction;
use crate::models::installation::{Installation, Priority, RejectionHistory};
use crate::models::status::InstallationStatus;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/installations",
            get(list_installations).post(create_installation),
        )
        .route("/installations/:id", get(get_installation))
        .route("/installations/:id/assign", post(assign_installer))
        .route("/installations/:id/accept", post(accept_installation))
        .route("/installations/:id/reject", post(reject_installation))
        .route("/installations/:id/status", patch(update_status))
}

#[derive(Deserialize)]
pub struct ListInstallationsQuery {
    pub status: Option<String>,
}

async fn create_installation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateInstallationRequest>,
) -> Result<(StatusCode, Json<InstallationView>), AppError> {
    authorize(&actor, Action::CreateInstallation, Resource::Global)?;

    if payload.customer_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "customerName cannot be empty".to_string(),
        ));
    }
    if !payload.customer_email.contains('@') {
        return Err(AppError::BadRequest(format!(
            "invalid customerEmail: {}",
            payload.customer_email
        )));
    }

    let location = location_from(payload.latitude, payload.longitude)?;
    let (rejected_installers, notes) = RejectionHistory::extract_from_notes(payload.notes)
        .map_err(|err| AppError::BadRequest(format!("invalid rejection note: {err}")))?;

    let now = Utc::now();
    let installation = Installation {
        id: Uuid::new_v4(),
        status: InstallationStatus::PendingAssignment,
        priority: payload.priority.unwrap_or(Priority::Medium),
        customer_name: payload.customer_name,
        customer_email: payload.customer_email,
        customer_phone: payload.customer_phone,
        address: payload.address,
        postal_code: payload.postal_code,
        charger_type: payload.charger_type,
        location,
        assigned_installer: None,
        notes,
        rejected_installers,
        assigned_at: None,
        accepted_at: None,
        scheduled_at: None,
        started_at: None,
        completed_at: None,
        approved_at: None,
        version: 0,
        created_at: now,
        updated_at: now,
    };

    state
        .installations
        .insert(installation.id, installation.clone());
    state.record_audit(
        actor,
        AuditAction::Create,
        "installation",
        installation.id,
        json!({ "customer_name": installation.customer_name }),
    );
    info!(installation_id = %installation.id, "installation created");

    Ok((
        StatusCode::CREATED,
        Json(InstallationView::new(&installation, None)),
    ))
}

async fn list_installations(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<ListInstallationsQuery>,
) -> Result<Json<Vec<InstallationView>>, AppError> {
    let status_filter = query
        .status
        .as_deref()
        .filter(|raw| !raw.trim().is_empty())
        .map(str::parse::<InstallationStatus>)
        .transpose()?;

    let mut installations: Vec<Installation> = state
        .installations
        .iter()
        .filter(|entry| status_filter.map_or(true, |status| entry.status == status))
        .filter(|entry| {
            authorize(
                &actor,
                Action::ViewInstallation,
                Resource::Installation(entry.value()),
            )
            .is_ok()
        })
        .map(|entry| entry.value().clone())
        .collect();
    installations.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(
        installations
            .iter()
            .map(|installation| view(&state, installation))
            .collect(),
    ))
}

async fn get_installation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<InstallationView>, AppError> {
    let installation = state
        .installations
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("installation {id} not found")))?;

    authorize(
        &actor,
        Action::ViewInstallation,
        Resource::Installation(&installation),
    )?;

    Ok(Json(view(&state, &installation)))
}

async fn assign_installer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignRequest>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let result = assign(&state, &actor, id, payload.installer_id);

    finish_command(
        &state,
        actor,
        Command::Assign,
        id,
        result,
        "Installer assigned, awaiting acceptance",
    )
}

async fn accept_installation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let result = respond(&state, &actor, id, |current, installer_id, now| {
        workflow::accept(current, installer_id, now)
    });

    finish_command(
        &state,
        actor,
        Command::Accept,
        id,
        result,
        "Installation accepted",
    )
}

async fn reject_installation(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let result = respond(&state, &actor, id, |current, installer_id, now| {
        workflow::reject(current, installer_id, now)
    });

    finish_command(
        &state,
        actor,
        Command::Reject,
        id,
        result,
        "Installation rejected and returned for reassignment",
    )
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusRequest>,
) -> Result<Json<WorkflowResponse>, AppError> {
    let result = change_status(&state, &actor, id, payload.status.as_deref());

    let message = match &result {
        Ok((_, next)) => format!("Status updated to {}", display_status(next.status)),
        Err(_) => String::new(),
    };
    finish_command(&state, actor, Command::SetStatus, id, result, message)
}

fn assign(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    installer_id: Option<Uuid>,
) -> Result<(Installation, Installation), AppError> {
    authorize(actor, Action::AssignInstaller, Resource::Global)?;
    let installer_id =
        installer_id.ok_or_else(|| AppError::BadRequest("installerId is required".to_string()))?;
    // Held until the assignment commits so the installer cannot be deleted in between.
    let _installer = state
        .installers
        .get(&installer_id)
        .ok_or_else(|| AppError::NotFound(format!("installer {installer_id} not found")))?;

    let now = Utc::now();
    state.update_installation(id, |current| {
        Ok(workflow::assign_installer(current, installer_id, now))
    })
}

fn change_status(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    raw_status: Option<&str>,
) -> Result<(Installation, Installation), AppError> {
    let status = raw_status
        .ok_or_else(|| AppError::BadRequest("status is required".to_string()))?
        .parse::<InstallationStatus>()?;

    let now = Utc::now();
    state.update_installation(id, |current| {
        authorize(actor, Action::UpdateStatus, Resource::Installation(current))?;
        Ok(workflow::set_status(current, status, now)?)
    })
}

/// Runs an installer's answer to an assignment against the stored record.
fn respond<F>(
    state: &AppState,
    actor: &Actor,
    id: Uuid,
    answer: F,
) -> Result<(Installation, Installation), AppError>
where
    F: FnOnce(
        &Installation,
        Uuid,
        chrono::DateTime<Utc>,
    ) -> Result<Installation, workflow::WorkflowError>,
{
    authorize(actor, Action::RespondToAssignment, Resource::Global)?;
    let installer_id = actor
        .installer_id()
        .ok_or_else(|| AppError::Forbidden("only installers may answer assignments".to_string()))?;

    let now = Utc::now();
    state.update_installation(id, |current| Ok(answer(current, installer_id, now)?))
}

/// Records the outcome of a workflow command and shapes its response.
fn finish_command(
    state: &AppState,
    actor: Actor,
    command: Command,
    id: Uuid,
    result: Result<(Installation, Installation), AppError>,
    message: impl Into<String>,
) -> Result<Json<WorkflowResponse>, AppError> {
    state
        .metrics
        .record_command(command.as_str(), result.is_ok());

    let (previous, next) = match result {
        Ok(transition) => transition,
        Err(err) => {
            warn!(installation_id = %id, command = %command, error = %err, "workflow command refused");
            return Err(err);
        }
    };

    for installer_id in [previous.assigned_installer, next.assigned_installer]
        .into_iter()
        .flatten()
    {
        state.refresh_installer_gauge(installer_id);
    }

    let action = match command {
        Command::Assign => AuditAction::Assign,
        Command::Accept | Command::Reject | Command::SetStatus => AuditAction::StatusChange,
    };
    state.record_audit(
        actor,
        action,
        "installation",
        id,
        json!({
            "command": command.as_str(),
            "from": previous.status,
            "to": next.status,
            "installer_id": previous.assigned_installer.or(next.assigned_installer),
        }),
    );

    info!(
        installation_id = %id,
        command = %command,
        from = %previous.status,
        to = %next.status,
        version = next.version,
        "workflow command applied"
    );

    Ok(Json(WorkflowResponse::new(&next, message)))
}

fn view(state: &AppState, installation: &Installation) -> InstallationView {
    let installer = installation
        .assigned_installer
        .and_then(|installer_id| state.installers.get(&installer_id))
        .map(|entry| entry.value().clone());

    InstallationView::new(installation, installer.as_ref())
}
