//! Role-based authorization.
//!
//! Admins may do anything except answer an assignment on an installer's
//! behalf. Installers see and act on their own profile and on installations
//! currently assigned to them.

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::models::actor::Actor;
use crate::models::installation::Installation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ManageInstallers,
    ViewInstaller,
    UpdateInstaller,
    Recommend,
    CreateInstallation,
    ViewInstallation,
    AssignInstaller,
    RespondToAssignment,
    UpdateStatus,
    AttachDocument,
    ViewAuditLog,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ManageInstallers => "manage installers",
            Self::ViewInstaller => "view installer",
            Self::UpdateInstaller => "update installer",
            Self::Recommend => "request recommendations",
            Self::CreateInstallation => "create installation",
            Self::ViewInstallation => "view installation",
            Self::AssignInstaller => "assign installer",
            Self::RespondToAssignment => "respond to assignment",
            Self::UpdateStatus => "update status",
            Self::AttachDocument => "attach document",
            Self::ViewAuditLog => "view audit log",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Global,
    Installer(Uuid),
    Installation(&'a Installation),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("only admins may {0}")]
    AdminOnly(Action),

    #[error("only installers may {0}")]
    InstallerOnly(Action),

    #[error("not permitted to {0} for this resource")]
    NotOwner(Action),
}

pub fn authorize(actor: &Actor, action: Action, resource: Resource<'_>) -> Result<(), PolicyError> {
    match (actor, action) {
        (Actor::Admin { .. }, Action::RespondToAssignment) => {
            Err(PolicyError::InstallerOnly(action))
        }
        (Actor::Admin { .. }, _) => Ok(()),
        (Actor::Installer { .. }, Action::Recommend | Action::RespondToAssignment) => Ok(()),
        (
            Actor::Installer { .. },
            Action::ManageInstallers
            | Action::CreateInstallation
            | Action::AssignInstaller
            | Action::ViewAuditLog,
        ) => Err(PolicyError::AdminOnly(action)),
        (Actor::Installer { installer_id }, _) => {
            if owns(*installer_id, resource) {
                Ok(())
            } else {
                Err(PolicyError::NotOwner(action))
            }
        }
    }
}

fn owns(installer_id: Uuid, resource: Resource<'_>) -> bool {
    match resource {
        Resource::Global => false,
        Resource::Installer(id) => id == installer_id,
        Resource::Installation(installation) => {
            installation.assigned_installer == Some(installer_id)
        }
    }
}
