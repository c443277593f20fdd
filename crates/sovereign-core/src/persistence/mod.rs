//! Persistence - the relational store the engine reads and mutates.
//!
//! Every method is a single atomic read-modify-write against the store.
//! Multi-step operations (check, deduct, insert) are composed by the callers
//! and are not transactional as a whole.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::GameError;
use crate::state::{
    Building, BuildingId, BuildingType, ConstructionCost, PlayerId, Port, PortId,
    ProductionRate, ResourceAvailability, ResourceBundle,
};

pub use memory::MemoryRepository;

/// Fields of a port to be created.
#[derive(Debug, Clone)]
pub struct NewPort {
    pub player_id: PlayerId,
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub resources: ResourceBundle,
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn create_port(&self, port: NewPort, now: DateTime<Utc>) -> Result<Port, GameError>;

    async fn get_port(&self, port_id: PortId) -> Result<Port, GameError>;

    async fn get_port_buildings(&self, port_id: PortId) -> Result<Vec<Building>, GameError>;

    /// Which gated resources the port can cover.
    async fn check_resource_availability(
        &self,
        port_id: PortId,
        cost: &ConstructionCost,
    ) -> Result<ResourceAvailability, GameError>;

    /// Subtract `cost`; fails without mutation if any counter would go
    /// negative.
    async fn consume_resources_from_port(
        &self,
        port_id: PortId,
        cost: &ConstructionCost,
    ) -> Result<(), GameError>;

    /// Add every counter of `delta` to the port's ledger.
    async fn add_resources_to_port(
        &self,
        port_id: PortId,
        delta: &ResourceBundle,
    ) -> Result<(), GameError>;

    async fn get_building(&self, building_id: BuildingId) -> Result<Building, GameError>;

    async fn get_building_by_port_and_type(
        &self,
        port_id: PortId,
        building_type: &str,
    ) -> Result<Option<Building>, GameError>;

    /// Insert an active level 1 building.
    async fn create_building(
        &self,
        port_id: PortId,
        building_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Building, GameError>;

    /// Insert a level 1 building under construction until `complete_at`.
    async fn create_building_construction(
        &self,
        port_id: PortId,
        building_type: &str,
        complete_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Building, GameError>;

    /// Put a building under construction for an upgrade to the next level.
    async fn upgrade_building(
        &self,
        building_id: BuildingId,
        complete_at: DateTime<Utc>,
    ) -> Result<(), GameError>;

    /// Finish construction: clear the flag and, for upgrades, bump the
    /// level. Returns the updated row, or `None` when the building was not
    /// under construction.
    async fn complete_building_construction(
        &self,
        building_id: BuildingId,
    ) -> Result<Option<Building>, GameError>;

    /// Active buildings whose last production is at or before `cutoff`.
    async fn get_buildings_ready_for_production(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Building>, GameError>;

    /// Buildings under construction whose timer has elapsed at `now`.
    async fn get_buildings_under_construction(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Building>, GameError>;

    async fn update_building_last_production(
        &self,
        building_id: BuildingId,
        at: DateTime<Utc>,
    ) -> Result<(), GameError>;

    async fn get_building_type_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BuildingType>, GameError>;

    async fn get_production_rates_for_building(
        &self,
        building_type: &str,
        level: u32,
    ) -> Result<Vec<ProductionRate>, GameError>;

    async fn list_building_types(&self) -> Result<Vec<BuildingType>, GameError>;

    async fn list_production_for_type(
        &self,
        building_type: &str,
    ) -> Result<Vec<ProductionRate>, GameError>;
}
