use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The caller of a request, as established by the authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Actor {
    Admin { user_id: Option<Uuid> },
    Installer { installer_id: Uuid },
}

impl Actor {
    pub const fn installer_id(&self) -> Option<Uuid> {
        match self {
            Self::Installer { installer_id } => Some(*installer_id),
            Self::Admin { .. } => None,
        }
    }
}
