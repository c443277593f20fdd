//! Building entities and their construction state.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::island::PortId;

/// Building identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub i32);

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A building on an island.
///
/// `under_construction` covers both first construction and upgrades; the
/// `upgrading` flag tells them apart so that completion knows whether the
/// level must be bumped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub port_id: PortId,
    #[serde(rename = "type")]
    pub building_type: String,
    pub level: u32,
    pub under_construction: bool,
    #[serde(default)]
    pub upgrading: bool,
    pub construction_complete_at: Option<DateTime<Utc>>,
    pub last_production_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Lifecycle state derived from the stored flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum BuildingStatus {
    UnderConstruction { complete_at: Option<DateTime<Utc>> },
    Upgrading { to_level: u32, complete_at: Option<DateTime<Utc>> },
    Active,
}

impl Building {
    pub fn status(&self) -> BuildingStatus {
        match (self.under_construction, self.upgrading) {
            (false, _) => BuildingStatus::Active,
            (true, false) => BuildingStatus::UnderConstruction {
                complete_at: self.construction_complete_at,
            },
            (true, true) => BuildingStatus::Upgrading {
                to_level: self.level + 1,
                complete_at: self.construction_complete_at,
            },
        }
    }

    /// Whether a completion sweep at `now` should finish this building.
    pub fn is_construction_due(&self, now: DateTime<Utc>) -> bool {
        self.under_construction
            && self
                .construction_complete_at
                .is_some_and(|complete_at| complete_at <= now)
    }

    /// Whether a production sweep with the given cutoff may credit this
    /// building.
    pub fn is_production_due(&self, cutoff: DateTime<Utc>) -> bool {
        !self.under_construction && self.last_production_at <= cutoff
    }
}
