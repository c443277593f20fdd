//! Deferred game events and their wire encoding.
//!
//! Events are stored as JSON objects of the form
//! `{"event_type": <int>, "port_id": <int32>, "building_type": <string>}`
//! where `event_type` is 0 (port building), 1 (resource collect) or
//! 2 (ship construct).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::state::PortId;

/// Kind of deferred work. Encoded as an integer on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum GameEventType {
    PortBuilding,
    ResourceCollect,
    ShipConstruct,
}

impl GameEventType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PortBuilding => "port_building",
            Self::ResourceCollect => "resource_collect",
            Self::ShipConstruct => "ship_construct",
        }
    }
}

impl fmt::Display for GameEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<GameEventType> for u8 {
    fn from(kind: GameEventType) -> Self {
        match kind {
            GameEventType::PortBuilding => 0,
            GameEventType::ResourceCollect => 1,
            GameEventType::ShipConstruct => 2,
        }
    }
}

impl TryFrom<u8> for GameEventType {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::PortBuilding),
            1 => Ok(Self::ResourceCollect),
            2 => Ok(Self::ShipConstruct),
            other => Err(format!("unknown event type {other}")),
        }
    }
}

/// A unit of deferred work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    pub event_type: GameEventType,
    pub port_id: PortId,
    #[serde(default)]
    pub building_type: String,
}

impl GameEvent {
    /// A request to place a building of `building_type` on a port.
    pub fn port_building(port_id: PortId, building_type: impl Into<String>) -> Self {
        Self {
            event_type: GameEventType::PortBuilding,
            port_id,
            building_type: building_type.into(),
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
