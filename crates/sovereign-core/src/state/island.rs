//! Islands (ports) and their identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::building::Building;
use super::resources::ResourceBundle;

/// Port (island) identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub i32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Player identifier. Players themselves live outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub i32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A player's island together with its resource ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub player_id: PlayerId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub resources: ResourceBundle,
    pub created_at: DateTime<Utc>,
}

/// Everything a player sees when looking at their island.
#[derive(Debug, Clone, Serialize)]
pub struct IslandOverview {
    pub port: Port,
    pub buildings: Vec<Building>,
}

impl IslandOverview {
    pub fn active_buildings(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter().filter(|b| !b.under_construction)
    }

    pub fn buildings_under_construction(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter().filter(|b| b.under_construction)
    }
}
