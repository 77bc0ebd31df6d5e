use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Busy,
    Unavailable,
}

impl Availability {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Busy => "busy",
            Self::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Installer {
    pub id: Uuid,
    pub company: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub location: Option<GeoPoint>,
    pub coverage: BTreeSet<String>,
    pub specialties: Vec<String>,
    pub certifications: Vec<String>,
    pub availability: Availability,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Installer {
    pub fn covers(&self, region: &str) -> bool {
        self.coverage.contains(region)
    }
}

/// Counts derived from the installations referencing an installer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobCounts {
    pub active: u32,
    pub pending: u32,
    pub completed: u32,
}
