//! Installation workflow state machine.
//!
//! Every command takes the current record and returns the next one. Nothing is
//! written until a command has fully validated, so a rejected command leaves
//! the stored installation untouched.

use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::installation::Installation;
use crate::models::status::{InstallationStatus, JobCategory, Milestone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Assign,
    Accept,
    Reject,
    SetStatus,
}

impl Command {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Assign => "assign",
            Self::Accept => "accept",
            Self::Reject => "reject",
            Self::SetStatus => "set_status",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("only the assigned installer may {command} this installation")]
    NotAssignedInstaller { command: Command },

    #[error("cannot {command} an installation in status {status}")]
    InvalidState {
        command: Command,
        status: InstallationStatus,
    },

    #[error("status {status} is kept for old records and cannot be set")]
    LegacyStatus { status: InstallationStatus },

    #[error("cannot move to {status} without an assigned installer")]
    NoInstallerAssigned { status: InstallationStatus },
}

/// Hands the job to `installer_id` and waits for the installer's answer.
///
/// The caller is responsible for checking that the installer exists.
pub fn assign_installer(
    current: &Installation,
    installer_id: Uuid,
    now: DateTime<Utc>,
) -> Installation {
    let mut next = current.clone();
    next.assigned_installer = Some(installer_id);
    next.status = InstallationStatus::PendingAcceptance;
    stamp(&mut next, Milestone::Assigned, now);
    commit(next, now)
}

pub fn accept(
    current: &Installation,
    installer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Installation, WorkflowError> {
    ensure_pending_answer(current, installer_id, Command::Accept)?;

    let mut next = current.clone();
    next.status = InstallationStatus::Accepted;
    stamp(&mut next, Milestone::Accepted, now);
    Ok(commit(next, now))
}

pub fn reject(
    current: &Installation,
    installer_id: Uuid,
    now: DateTime<Utc>,
) -> Result<Installation, WorkflowError> {
    ensure_pending_answer(current, installer_id, Command::Reject)?;

    let mut next = current.clone();
    release(&mut next);
    Ok(commit(next, now))
}

/// Moves the installation to `status` directly.
///
/// `rejected_by_installer` is treated as a rejection on behalf of whoever is
/// currently assigned and lands in `pending_assignment`. Leaving the set of
/// installer-holding statuses drops the assignment. Legacy statuses are never
/// a valid target, and `pending_acceptance` needs someone to accept.
pub fn set_status(
    current: &Installation,
    status: InstallationStatus,
    now: DateTime<Utc>,
) -> Result<Installation, WorkflowError> {
    if status.is_legacy() {
        return Err(WorkflowError::LegacyStatus { status });
    }
    if status == InstallationStatus::PendingAcceptance && current.assigned_installer.is_none() {
        return Err(WorkflowError::NoInstallerAssigned { status });
    }

    let mut next = current.clone();

    if status == InstallationStatus::RejectedByInstaller {
        release(&mut next);
        return Ok(commit(next, now));
    }

    next.status = status;
    if let Some(milestone) = status.milestone() {
        stamp(&mut next, milestone, now);
    }
    if !status.holds_installer() {
        clear_assignment(&mut next);
    }

    Ok(commit(next, now))
}

/// Drops a reference to an installer that no longer exists. Unfinished jobs go
/// back to `pending_assignment`; finished ones keep their status.
pub fn detach_installer(current: &Installation, now: DateTime<Utc>) -> Installation {
    let mut next = current.clone();
    if matches!(
        next.status.job_category(),
        Some(JobCategory::Active | JobCategory::Pending)
    ) {
        next.status = InstallationStatus::PendingAssignment;
    }
    clear_assignment(&mut next);
    commit(next, now)
}

fn ensure_pending_answer(
    current: &Installation,
    installer_id: Uuid,
    command: Command,
) -> Result<(), WorkflowError> {
    if current.assigned_installer != Some(installer_id) {
        return Err(WorkflowError::NotAssignedInstaller { command });
    }
    if current.status != InstallationStatus::PendingAcceptance {
        return Err(WorkflowError::InvalidState {
            command,
            status: current.status,
        });
    }
    Ok(())
}

/// Records the assigned installer as having declined and reopens the job.
fn release(installation: &mut Installation) {
    if let Some(installer_id) = installation.assigned_installer {
        installation.rejected_installers.record(installer_id);
    }
    installation.status = InstallationStatus::PendingAssignment;
    clear_assignment(installation);
}

fn clear_assignment(installation: &mut Installation) {
    installation.assigned_installer = None;
    installation.assigned_at = None;
}

fn stamp(installation: &mut Installation, milestone: Milestone, now: DateTime<Utc>) {
    let slot = match milestone {
        Milestone::Assigned => &mut installation.assigned_at,
        Milestone::Accepted => &mut installation.accepted_at,
        Milestone::Scheduled => &mut installation.scheduled_at,
        Milestone::Started => &mut installation.started_at,
        Milestone::Completed => {
            installation.completed_at = Some(now);
            return;
        }
        Milestone::Approved => &mut installation.approved_at,
    };
    slot.get_or_insert(now);
}

fn commit(mut installation: Installation, now: DateTime<Utc>) -> Installation {
    installation.version += 1;
    installation.updated_at = now;
    installation
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    use super::{
        accept, assign_installer, detach_installer, reject, set_status, Command, WorkflowError,
    };
    use crate::models::installation::{Installation, Priority, RejectionHistory};
    use crate::models::status::InstallationStatus;

    fn installation() -> Installation {
        let created = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        Installation {
            id: Uuid::from_u128(100),
            status: InstallationStatus::PendingAssignment,
            priority: Priority::Medium,
            customer_name: "Aisyah".to_string(),
            customer_email: "aisyah@example.com".to_string(),
            customer_phone: "012-0000000".to_string(),
            address: "Jalan Ampang".to_string(),
            postal_code: "50450".to_string(),
            charger_type: "7kW AC".to_string(),
            location: None,
            assigned_installer: None,
            notes: Vec::new(),
            rejected_installers: RejectionHistory::new(),
            assigned_at: None,
            accepted_at: None,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            approved_at: None,
            version: 0,
            created_at: created,
            updated_at: created,
        }
    }

    fn t(minutes: i64) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 6, 9, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    #[test]
    fn assignment_waits_for_acceptance() {
        let installer = Uuid::from_u128(1);
        let next = assign_installer(&installation(), installer, t(0));

        assert_eq!(next.status, InstallationStatus::PendingAcceptance);
        assert_eq!(next.assigned_installer, Some(installer));
        assert_eq!(next.assigned_at, Some(t(0)));
        assert_eq!(next.version, 1);
    }

    #[test]
    fn reassignment_keeps_first_assigned_at() {
        let first = assign_installer(&installation(), Uuid::from_u128(1), t(0));
        let second = assign_installer(&first, Uuid::from_u128(2), t(30));

        assert_eq!(second.assigned_installer, Some(Uuid::from_u128(2)));
        assert_eq!(second.assigned_at, Some(t(0)));
    }

    #[test]
    fn assigned_installer_can_accept() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let accepted = accept(&assigned, installer, t(5)).unwrap();

        assert_eq!(accepted.status, InstallationStatus::Accepted);
        assert_eq!(accepted.accepted_at, Some(t(5)));
        assert_eq!(accepted.assigned_installer, Some(installer));
    }

    #[test]
    fn other_installer_cannot_accept() {
        let assigned = assign_installer(&installation(), Uuid::from_u128(1), t(0));
        let err = accept(&assigned, Uuid::from_u128(2), t(5)).unwrap_err();

        assert_eq!(
            err,
            WorkflowError::NotAssignedInstaller {
                command: Command::Accept
            }
        );
    }

    #[test]
    fn rejection_reopens_job_and_records_installer() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let rejected = reject(&assigned, installer, t(5)).unwrap();

        assert_eq!(rejected.status, InstallationStatus::PendingAssignment);
        assert_eq!(rejected.assigned_installer, None);
        assert_eq!(rejected.assigned_at, None);
        assert!(rejected.rejected_installers.contains(&installer));
    }

    #[test]
    fn repeated_rejection_does_not_duplicate_history() {
        let installer = Uuid::from_u128(1);
        let mut current = installation();

        for round in 0..2 {
            let assigned = assign_installer(&current, installer, t(round * 10));
            current = reject(&assigned, installer, t(round * 10 + 1)).unwrap();
        }

        assert_eq!(current.rejected_installers.len(), 1);
        // A fresh assignment after a rejection gets a fresh timestamp.
        let again = assign_installer(&current, installer, t(60));
        assert_eq!(again.assigned_at, Some(t(60)));
    }

    #[test]
    fn reject_after_accepting_is_refused() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let accepted = accept(&assigned, installer, t(5)).unwrap();

        let err = reject(&accepted, installer, t(6)).unwrap_err();

        assert_eq!(
            err,
            WorkflowError::InvalidState {
                command: Command::Reject,
                status: InstallationStatus::Accepted,
            }
        );
        assert_eq!(accepted.status, InstallationStatus::Accepted);
        assert!(accepted.rejected_installers.is_empty());
    }

    #[test]
    fn milestones_are_recorded_once() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let accepted = accept(&assigned, installer, t(1)).unwrap();
        let scheduled = set_status(&accepted, InstallationStatus::Scheduled, t(2)).unwrap();
        let on_hold = set_status(&scheduled, InstallationStatus::OnHold, t(3)).unwrap();
        let rescheduled = set_status(&on_hold, InstallationStatus::Scheduled, t(4)).unwrap();
        let started = set_status(&rescheduled, InstallationStatus::InProgress, t(5)).unwrap();

        assert_eq!(rescheduled.scheduled_at, Some(t(2)));
        assert_eq!(started.started_at, Some(t(5)));
        assert_eq!(started.assigned_installer, Some(installer));
    }

    #[test]
    fn completed_at_is_refreshed_on_every_entry() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let completed = set_status(&assigned, InstallationStatus::Completed, t(10)).unwrap();
        let review = set_status(&completed, InstallationStatus::UnderAdminReview, t(11)).unwrap();
        let redone = set_status(&review, InstallationStatus::Completed, t(20)).unwrap();

        assert_eq!(completed.completed_at, Some(t(10)));
        assert_eq!(redone.completed_at, Some(t(20)));
    }

    #[test]
    fn approved_sets_approved_at() {
        let assigned = assign_installer(&installation(), Uuid::from_u128(1), t(0));
        let approved = set_status(&assigned, InstallationStatus::Approved, t(9)).unwrap();

        assert_eq!(approved.approved_at, Some(t(9)));
    }

    #[test]
    fn status_rejection_acts_as_reject_for_current_installer() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let accepted = accept(&assigned, installer, t(1)).unwrap();

        let next = set_status(&accepted, InstallationStatus::RejectedByInstaller, t(2)).unwrap();

        assert_eq!(next.status, InstallationStatus::PendingAssignment);
        assert_eq!(next.assigned_installer, None);
        assert!(next.rejected_installers.contains(&installer));
    }

    #[test]
    fn status_rejection_without_installer_only_reopens() {
        let next =
            set_status(&installation(), InstallationStatus::RejectedByInstaller, t(0)).unwrap();

        assert_eq!(next.status, InstallationStatus::PendingAssignment);
        assert!(next.rejected_installers.is_empty());
    }

    #[test]
    fn leaving_holding_statuses_drops_installer() {
        let assigned = assign_installer(&installation(), Uuid::from_u128(1), t(0));
        let failed = set_status(&assigned, InstallationStatus::Failed, t(1)).unwrap();

        assert_eq!(failed.assigned_installer, None);
        assert_eq!(failed.assigned_at, None);
    }

    #[test]
    fn detaching_reopens_unfinished_jobs_only() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let accepted = accept(&assigned, installer, t(1)).unwrap();
        let completed = set_status(&accepted, InstallationStatus::Completed, t(2)).unwrap();

        let reopened = detach_installer(&accepted, t(3));
        let finished = detach_installer(&completed, t(3));

        assert_eq!(reopened.status, InstallationStatus::PendingAssignment);
        assert_eq!(reopened.assigned_installer, None);
        assert_eq!(finished.status, InstallationStatus::Completed);
        assert_eq!(finished.assigned_installer, None);
        assert!(finished.rejected_installers.is_empty());
    }

    #[test]
    fn legacy_statuses_cannot_be_set() {
        let assigned = assign_installer(&installation(), Uuid::from_u128(1), t(0));

        for status in [
            InstallationStatus::Pending,
            InstallationStatus::Assigned,
            InstallationStatus::Cancelled,
            InstallationStatus::Declined,
        ] {
            assert_eq!(
                set_status(&assigned, status, t(1)).unwrap_err(),
                WorkflowError::LegacyStatus { status }
            );
        }
    }

    #[test]
    fn pending_acceptance_needs_an_installer() {
        let err = set_status(&installation(), InstallationStatus::PendingAcceptance, t(0))
            .unwrap_err();

        assert_eq!(
            err,
            WorkflowError::NoInstallerAssigned {
                status: InstallationStatus::PendingAcceptance
            }
        );

        let assigned = assign_installer(&installation(), Uuid::from_u128(1), t(0));
        let on_hold = set_status(&assigned, InstallationStatus::OnHold, t(1)).unwrap();
        let back = set_status(&on_hold, InstallationStatus::PendingAcceptance, t(2)).unwrap();
        assert_eq!(back.assigned_at, Some(t(0)));
    }

    #[test]
    fn survey_stages_release_the_installer() {
        let installer = Uuid::from_u128(1);
        let assigned = assign_installer(&installation(), installer, t(0));
        let accepted = accept(&assigned, installer, t(1)).unwrap();

        let survey = set_status(&accepted, InstallationStatus::SurveyInProgress, t(2)).unwrap();

        assert_eq!(survey.assigned_installer, None);
        assert_eq!(survey.status.job_category(), None);
    }
}
