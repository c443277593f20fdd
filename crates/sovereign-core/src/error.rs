//! Error taxonomy for the engine and its collaborators.

use thiserror::Error;

use crate::state::{BuildingId, PortId};

/// Failures reported by the deferred event store or the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Coarse classification of a [`GameError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad caller input; nothing was mutated.
    Validation,
    /// A referenced entity does not exist.
    NotFound,
    /// The island cannot afford the requested action.
    InsufficientResources,
    /// The entity is in a state that forbids the action.
    StateConflict,
    /// Transient infrastructure failure.
    StoreUnavailable,
}

/// Errors produced by game operations.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("invalid building type: {0}")]
    InvalidBuildingType(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("insufficient resources on port {port_id}: missing {missing}")]
    InsufficientResources { port_id: PortId, missing: String },

    #[error("building {0} is already under construction")]
    AlreadyUnderConstruction(BuildingId),

    #[error("port {port_id} already has a {building_type}")]
    BuildingExists { port_id: PortId, building_type: String },

    #[error("building {building_id} is already at maximum level {max_level}")]
    MaxLevelReached { building_id: BuildingId, max_level: u32 },

    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::InvalidBuildingType(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InsufficientResources { .. } => ErrorKind::InsufficientResources,
            Self::AlreadyUnderConstruction(_)
            | Self::BuildingExists { .. }
            | Self::MaxLevelReached { .. } => ErrorKind::StateConflict,
            Self::StoreUnavailable(_) => ErrorKind::StoreUnavailable,
        }
    }

    pub(crate) fn port_not_found(port_id: PortId) -> Self {
        Self::NotFound {
            entity: "port",
            id: i64::from(port_id.0),
        }
    }

    pub(crate) fn building_not_found(building_id: BuildingId) -> Self {
        Self::NotFound {
            entity: "building",
            id: i64::from(building_id.0),
        }
    }
}
