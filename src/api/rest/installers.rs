use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::api::rest::mapping::{
    location_from, BulkImportError, BulkImportRequest, BulkImportResponse,
    CreateInstallerRequest, InstallerView, RecommendationQuery, RecommendationView,
    RecommendationsResponse, UpdateInstallerRequest,
};
use crate::engine::policy::{authorize, Action, Resource};
use crate::engine::recommendation::{recommend, Candidate};
use crate::engine::workflow::detach_installer;
use crate::error::AppError;
use crate::geo::{validate_radius, GeoPoint};
use crate::models::actor::Actor;
use crate::models::audit::AuditAction;
use crate::models::installer::{Availability, Installer};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/installers", get(list_installers).post(create_installer))
        .route("/installers/recommendations", get(recommendations))
        .route("/installers/bulk-import", post(bulk_import_installers))
        .route(
            "/installers/:id",
            get(get_installer)
                .patch(update_installer)
                .delete(delete_installer),
        )
}

#[derive(Deserialize)]
pub struct ListInstallersQuery {
    pub coverage: Option<String>,
}

async fn create_installer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<CreateInstallerRequest>,
) -> Result<(StatusCode, Json<InstallerView>), AppError> {
    authorize(&actor, Action::ManageInstallers, Resource::Global)?;

    let installer = build_installer(payload, Utc::now())?;
    store_installer(&state, actor, &installer);

    Ok((
        StatusCode::CREATED,
        Json(InstallerView::new(&installer, Default::default())),
    ))
}

async fn bulk_import_installers(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<BulkImportRequest>,
) -> Result<(StatusCode, Json<BulkImportResponse>), AppError> {
    authorize(&actor, Action::ManageInstallers, Resource::Global)?;

    if payload.installers.is_empty() {
        return Err(AppError::BadRequest(
            "installers array is required".to_string(),
        ));
    }

    let now = Utc::now();
    let mut installers = Vec::new();
    let mut error_details = Vec::new();

    for (index, data) in payload.installers.into_iter().enumerate() {
        let built = serde_json::from_value::<CreateInstallerRequest>(data.clone())
            .map_err(|err| AppError::BadRequest(err.to_string()))
            .and_then(|request| build_installer(request, now));

        match built {
            Ok(installer) => {
                store_installer(&state, actor, &installer);
                installers.push(InstallerView::new(&installer, Default::default()));
            }
            Err(err) => error_details.push(BulkImportError {
                index,
                data,
                error: err.to_string(),
            }),
        }
    }

    info!(
        created = installers.len(),
        errors = error_details.len(),
        "installers imported"
    );

    Ok((
        StatusCode::CREATED,
        Json(BulkImportResponse {
            created: installers.len(),
            errors: error_details.len(),
            installers,
            error_details,
        }),
    ))
}

fn build_installer(
    payload: CreateInstallerRequest,
    now: DateTime<Utc>,
) -> Result<Installer, AppError> {
    if payload.company.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "company and name cannot be empty".to_string(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(AppError::BadRequest(format!(
            "invalid email: {}",
            payload.email
        )));
    }

    Ok(Installer {
        id: Uuid::new_v4(),
        company: payload.company,
        name: payload.name,
        email: payload.email,
        phone: payload.phone,
        address: payload.address,
        location: location_from(payload.latitude, payload.longitude)?,
        coverage: payload.coverage.into_iter().collect(),
        specialties: payload.specialties,
        certifications: payload.certifications,
        availability: payload.availability.unwrap_or(Availability::Available),
        created_at: now,
        updated_at: now,
    })
}

fn store_installer(state: &AppState, actor: Actor, installer: &Installer) {
    state.installers.insert(installer.id, installer.clone());
    state.record_audit(
        actor,
        AuditAction::Create,
        "installer",
        installer.id,
        json!({ "company": installer.company }),
    );
    info!(installer_id = %installer.id, "installer created");
}

async fn list_installers(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<ListInstallersQuery>,
) -> Json<Vec<InstallerView>> {
    let counts = state.job_counts_by_installer();

    let mut installers: Vec<Installer> = state
        .installers
        .iter()
        .filter(|entry| {
            authorize(&actor, Action::ViewInstaller, Resource::Installer(entry.id)).is_ok()
        })
        .filter(|entry| {
            query
                .coverage
                .as_deref()
                .map_or(true, |region| entry.covers(region))
        })
        .map(|entry| entry.value().clone())
        .collect();
    installers.sort_by(|a, b| a.company.cmp(&b.company).then(a.name.cmp(&b.name)));

    Json(
        installers
            .iter()
            .map(|installer| {
                InstallerView::new(installer, counts.get(&installer.id).copied().unwrap_or_default())
            })
            .collect(),
    )
}

async fn get_installer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<InstallerView>, AppError> {
    authorize(&actor, Action::ViewInstaller, Resource::Installer(id))?;

    let installer = state
        .installers
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("installer {id} not found")))?;

    Ok(Json(InstallerView::new(&installer, state.job_counts(id))))
}

async fn update_installer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInstallerRequest>,
) -> Result<Json<InstallerView>, AppError> {
    authorize(&actor, Action::UpdateInstaller, Resource::Installer(id))?;

    let location = location_from(payload.latitude, payload.longitude)?;

    let updated = {
        let mut installer = state
            .installers
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("installer {id} not found")))?;

        if let Some(company) = payload.company {
            installer.company = company;
        }
        if let Some(name) = payload.name {
            installer.name = name;
        }
        if let Some(phone) = payload.phone {
            installer.phone = phone;
        }
        if let Some(address) = payload.address {
            installer.address = address;
        }
        if location.is_some() {
            installer.location = location;
        }
        if let Some(coverage) = payload.coverage {
            installer.coverage = coverage.into_iter().collect::<BTreeSet<_>>();
        }
        if let Some(specialties) = payload.specialties {
            installer.specialties = specialties;
        }
        if let Some(certifications) = payload.certifications {
            installer.certifications = certifications;
        }
        if let Some(availability) = payload.availability {
            installer.availability = availability;
        }
        installer.updated_at = Utc::now();

        installer.clone()
    };

    state.record_audit(
        actor,
        AuditAction::Update,
        "installer",
        id,
        json!({ "availability": updated.availability }),
    );

    Ok(Json(InstallerView::new(&updated, state.job_counts(id))))
}

async fn delete_installer(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    authorize(&actor, Action::ManageInstallers, Resource::Installer(id))?;

    state
        .installers
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("installer {id} not found")))?;

    let affected: Vec<Uuid> = state
        .installations
        .iter()
        .filter(|entry| entry.assigned_installer == Some(id))
        .map(|entry| entry.id)
        .collect();

    for installation_id in &affected {
        let now = Utc::now();
        state.update_installation(*installation_id, |current| {
            if current.assigned_installer == Some(id) {
                Ok(detach_installer(current, now))
            } else {
                Ok(current.clone())
            }
        })?;
    }

    let _ = state
        .metrics
        .installer_active_jobs
        .remove_label_values(&[&id.to_string()]);
    state.record_audit(
        actor,
        AuditAction::Delete,
        "installer",
        id,
        json!({ "detached_installations": affected }),
    );
    info!(installer_id = %id, detached = affected.len(), "installer deleted");

    Ok(StatusCode::NO_CONTENT)
}

async fn recommendations(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Query(query): Query<RecommendationQuery>,
) -> Result<Json<RecommendationsResponse>, AppError> {
    authorize(&actor, Action::Recommend, Resource::Global)?;

    let origin = GeoPoint::new(
        parse_number(query.lat.as_deref(), "latitude")?,
        parse_number(query.lng.as_deref(), "longitude")?,
    )?;
    let radius_km = match query.radius.as_deref().map(str::trim) {
        None | Some("") => state.default_radius_km,
        Some(raw) => validate_radius(parse_number(Some(raw), "radius")?)?,
    };

    let excluded = match query.installation_id {
        Some(installation_id) => state
            .installations
            .get(&installation_id)
            .map(|entry| entry.rejected_installers.clone())
            .ok_or_else(|| {
                AppError::NotFound(format!("installation {installation_id} not found"))
            })?,
        None => Default::default(),
    };

    let start = Instant::now();
    let counts = state.job_counts_by_installer();
    let candidates: Vec<Candidate> = state
        .installers
        .iter()
        .filter(|entry| !excluded.contains(&entry.id))
        .map(|entry| Candidate {
            installer: entry.value().clone(),
            job_counts: counts.get(&entry.id).copied().unwrap_or_default(),
        })
        .collect();
    let candidate_count = candidates.len();

    let ranked = recommend(&origin, radius_km, candidates);

    state
        .metrics
        .recommendation_latency_seconds
        .observe(start.elapsed().as_secs_f64());
    state
        .metrics
        .recommendations_returned
        .observe(ranked.len() as f64);
    debug!(
        lat = origin.lat,
        lng = origin.lng,
        radius_km,
        candidates = candidate_count,
        returned = ranked.len(),
        "recommendations computed"
    );

    Ok(Json(RecommendationsResponse {
        recommendations: ranked.into_iter().map(RecommendationView::from).collect(),
    }))
}

fn parse_number(raw: Option<&str>, name: &str) -> Result<f64, AppError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::BadRequest("latitude and longitude are required".to_string()))?;

    raw.parse::<f64>()
        .map_err(|_| AppError::BadRequest(format!("invalid {name}: {raw}")))
}
