//! Installation workflow vocabulary.
//!
//! Statuses are stored and serialized in snake_case. The hyphenated display
//! form is produced only at the HTTP boundary.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid status: {0}")]
pub struct InvalidStatus(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationStatus {
    PendingAssignment,
    PendingAcceptance,
    Accepted,
    RejectedByInstaller,
    SurveyInProgress,
    PendingCustomerApproval,
    ApprovedForInstallation,
    Scheduled,
    InProgress,
    Testing,
    Completed,
    UnderAdminReview,
    Approved,
    Failed,
    OnHold,
    // Legacy values kept so older records still parse.
    Pending,
    Assigned,
    Cancelled,
    Declined,
}

/// Which derived job counter an installation contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobCategory {
    Active,
    Pending,
    Completed,
}

/// Milestone timestamp recorded when a status is first entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    Assigned,
    Accepted,
    Scheduled,
    Started,
    Completed,
    Approved,
}

impl InstallationStatus {
    pub const ALL: [Self; 19] = [
        Self::PendingAssignment,
        Self::PendingAcceptance,
        Self::Accepted,
        Self::RejectedByInstaller,
        Self::SurveyInProgress,
        Self::PendingCustomerApproval,
        Self::ApprovedForInstallation,
        Self::Scheduled,
        Self::InProgress,
        Self::Testing,
        Self::Completed,
        Self::UnderAdminReview,
        Self::Approved,
        Self::Failed,
        Self::OnHold,
        Self::Pending,
        Self::Assigned,
        Self::Cancelled,
        Self::Declined,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PendingAssignment => "pending_assignment",
            Self::PendingAcceptance => "pending_acceptance",
            Self::Accepted => "accepted",
            Self::RejectedByInstaller => "rejected_by_installer",
            Self::SurveyInProgress => "survey_in_progress",
            Self::PendingCustomerApproval => "pending_customer_approval",
            Self::ApprovedForInstallation => "approved_for_installation",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Testing => "testing",
            Self::Completed => "completed",
            Self::UnderAdminReview => "under_admin_review",
            Self::Approved => "approved",
            Self::Failed => "failed",
            Self::OnHold => "on_hold",
            Self::Pending => "pending",
            Self::Assigned => "assigned",
            Self::Cancelled => "cancelled",
            Self::Declined => "declined",
        }
    }

    /// True for statuses in which an installation may reference an installer.
    pub const fn holds_installer(&self) -> bool {
        matches!(
            self,
            Self::PendingAcceptance
                | Self::Accepted
                | Self::Scheduled
                | Self::InProgress
                | Self::Testing
                | Self::Completed
                | Self::UnderAdminReview
                | Self::Approved
                | Self::OnHold
                | Self::Assigned
        )
    }

    /// Aliases that stored records may still carry but no command may set.
    pub const fn is_legacy(&self) -> bool {
        matches!(
            self,
            Self::Pending | Self::Assigned | Self::Cancelled | Self::Declined
        )
    }

    /// Only installer-holding statuses contribute to an installer's counts.
    pub const fn job_category(&self) -> Option<JobCategory> {
        match self {
            Self::Accepted
            | Self::Assigned
            | Self::Scheduled
            | Self::InProgress
            | Self::Testing => Some(JobCategory::Active),
            Self::PendingAcceptance | Self::OnHold => Some(JobCategory::Pending),
            Self::Completed | Self::UnderAdminReview | Self::Approved => {
                Some(JobCategory::Completed)
            }
            Self::PendingAssignment
            | Self::RejectedByInstaller
            | Self::SurveyInProgress
            | Self::PendingCustomerApproval
            | Self::ApprovedForInstallation
            | Self::Failed
            | Self::Pending
            | Self::Cancelled
            | Self::Declined => None,
        }
    }

    pub const fn milestone(&self) -> Option<Milestone> {
        match self {
            Self::PendingAcceptance | Self::Assigned => Some(Milestone::Assigned),
            Self::Accepted => Some(Milestone::Accepted),
            Self::Scheduled => Some(Milestone::Scheduled),
            Self::InProgress => Some(Milestone::Started),
            Self::Completed => Some(Milestone::Completed),
            Self::Approved => Some(Milestone::Approved),
            _ => None,
        }
    }
}

impl fmt::Display for InstallationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InstallationStatus {
    type Err = InvalidStatus;

    /// Accepts both the stored underscore form and the hyphenated display form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| InvalidStatus(s.to_string()))
    }
}
