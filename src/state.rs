use std::collections::HashMap;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::audit::{AuditAction, AuditEntry};
use crate::models::document::Document;
use crate::models::installation::Installation;
use crate::models::installer::{Installer, JobCounts};
use crate::models::status::JobCategory;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub installers: DashMap<Uuid, Installer>,
    pub installations: DashMap<Uuid, Installation>,
    pub documents: DashMap<Uuid, Document>,
    pub audit_log: DashMap<Uuid, AuditEntry>,
    pub audit_events_tx: broadcast::Sender<AuditEntry>,
    pub default_radius_km: f64,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize, default_radius_km: f64) -> Self {
        let (audit_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            installers: DashMap::new(),
            installations: DashMap::new(),
            documents: DashMap::new(),
            audit_log: DashMap::new(),
            audit_events_tx,
            default_radius_km,
            metrics: Metrics::new(),
        }
    }

    /// Applies `apply` to the stored installation while holding its write
    /// guard, so concurrent commands on the same record run one at a time.
    ///
    /// The record is replaced only when `apply` succeeds. Returns the previous
    /// and the new value.
    pub fn update_installation<F>(
        &self,
        id: Uuid,
        apply: F,
    ) -> Result<(Installation, Installation), AppError>
    where
        F: FnOnce(&Installation) -> Result<Installation, AppError>,
    {
        let mut entry = self
            .installations
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("installation {id} not found")))?;

        let next = apply(entry.value())?;
        let previous = std::mem::replace(entry.value_mut(), next.clone());
        Ok((previous, next))
    }

    /// Derives job counts from the installations referencing `installer_id`.
    ///
    /// Must not be called while holding a guard into `installations`.
    pub fn job_counts(&self, installer_id: Uuid) -> JobCounts {
        self.installations
            .iter()
            .filter(|entry| entry.assigned_installer == Some(installer_id))
            .fold(JobCounts::default(), |mut counts, entry| {
                tally(&mut counts, entry.status.job_category());
                counts
            })
    }

    /// Job counts for every installer with at least one installation, in one pass.
    pub fn job_counts_by_installer(&self) -> HashMap<Uuid, JobCounts> {
        let mut counts: HashMap<Uuid, JobCounts> = HashMap::new();
        for entry in self.installations.iter() {
            if let Some(installer_id) = entry.assigned_installer {
                tally(
                    counts.entry(installer_id).or_default(),
                    entry.status.job_category(),
                );
            }
        }
        counts
    }

    pub fn refresh_installer_gauge(&self, installer_id: Uuid) {
        let active = self.job_counts(installer_id).active;
        self.metrics
            .installer_active_jobs
            .with_label_values(&[&installer_id.to_string()])
            .set(f64::from(active));
    }

    pub fn record_audit(
        &self,
        actor: Actor,
        action: AuditAction,
        model_name: &str,
        object_id: Uuid,
        details: serde_json::Value,
    ) -> AuditEntry {
        let entry = AuditEntry {
            id: Uuid::new_v4(),
            actor,
            action,
            model_name: model_name.to_string(),
            object_id,
            details,
            created_at: Utc::now(),
        };

        self.audit_log.insert(entry.id, entry.clone());
        let _ = self.audit_events_tx.send(entry.clone());
        entry
    }
}

fn tally(counts: &mut JobCounts, category: Option<JobCategory>) {
    match category {
        Some(JobCategory::Active) => counts.active += 1,
        Some(JobCategory::Pending) => counts.pending += 1,
        Some(JobCategory::Completed) => counts.completed += 1,
        None => {}
    }
}
