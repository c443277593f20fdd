//! In-memory repository.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{GameRepository, NewPort};
use crate::error::{GameError, StoreError};
use crate::state::{
    Building, BuildingId, BuildingType, Catalog, ConstructionCost, Port, PortId, ProductionRate,
    ResourceAvailability, ResourceBundle,
};

#[derive(Debug, Default)]
struct Tables {
    ports: BTreeMap<PortId, Port>,
    buildings: BTreeMap<BuildingId, Building>,
    next_port_id: i32,
    next_building_id: i32,
}

impl Tables {
    fn port_mut(&mut self, port_id: PortId) -> Result<&mut Port, GameError> {
        self.ports
            .get_mut(&port_id)
            .ok_or_else(|| GameError::port_not_found(port_id))
    }

    fn building_mut(&mut self, building_id: BuildingId) -> Result<&mut Building, GameError> {
        self.buildings
            .get_mut(&building_id)
            .ok_or_else(|| GameError::building_not_found(building_id))
    }

    fn insert_building(
        &mut self,
        port_id: PortId,
        building_type: &str,
        complete_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Building, GameError> {
        if !self.ports.contains_key(&port_id) {
            return Err(GameError::port_not_found(port_id));
        }
        self.next_building_id += 1;
        let building = Building {
            id: BuildingId(self.next_building_id),
            port_id,
            building_type: building_type.to_string(),
            level: 1,
            under_construction: complete_at.is_some(),
            upgrading: false,
            construction_complete_at: complete_at,
            last_production_at: now,
            created_at: now,
        };
        self.buildings.insert(building.id, building.clone());
        Ok(building)
    }
}

/// Injected failures, for exercising the engine's per-item error policy.
#[derive(Debug, Default)]
struct Faults {
    credit_ports: HashSet<PortId>,
    completion_buildings: HashSet<BuildingId>,
    production_stamp_buildings: HashSet<BuildingId>,
}

/// Repository holding every table in memory behind one lock.
#[derive(Debug)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    catalog: Catalog,
    faults: Mutex<Faults>,
}

impl MemoryRepository {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            catalog,
            faults: Mutex::new(Faults::default()),
        }
    }

    /// Make ledger credits to `port_id` fail until faults are cleared.
    pub fn fail_credits_for(&self, port_id: PortId) {
        self.faults().credit_ports.insert(port_id);
    }

    /// Make construction completion of `building_id` fail.
    pub fn fail_completions_for(&self, building_id: BuildingId) {
        self.faults().completion_buildings.insert(building_id);
    }

    /// Make last-production updates of `building_id` fail.
    pub fn fail_production_stamp_for(&self, building_id: BuildingId) {
        self.faults().production_stamp_buildings.insert(building_id);
    }

    pub fn clear_faults(&self) {
        *self.faults() = Faults::default();
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, GameError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("repository lock poisoned".into()).into())
    }

    fn faults(&self) -> MutexGuard<'_, Faults> {
        self.faults.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn injected(what: &str) -> GameError {
        StoreError::Unavailable(format!("injected failure: {what}")).into()
    }
}

#[async_trait]
impl GameRepository for MemoryRepository {
    async fn create_port(&self, port: NewPort, now: DateTime<Utc>) -> Result<Port, GameError> {
        let mut tables = self.tables()?;
        tables.next_port_id += 1;
        let port = Port {
            id: PortId(tables.next_port_id),
            player_id: port.player_id,
            name: port.name,
            x: port.x,
            y: port.y,
            resources: port.resources,
            created_at: now,
        };
        tables.ports.insert(port.id, port.clone());
        Ok(port)
    }

    async fn get_port(&self, port_id: PortId) -> Result<Port, GameError> {
        self.tables()?
            .ports
            .get(&port_id)
            .cloned()
            .ok_or_else(|| GameError::port_not_found(port_id))
    }

    async fn get_port_buildings(&self, port_id: PortId) -> Result<Vec<Building>, GameError> {
        let tables = self.tables()?;
        if !tables.ports.contains_key(&port_id) {
            return Err(GameError::port_not_found(port_id));
        }
        Ok(tables
            .buildings
            .values()
            .filter(|b| b.port_id == port_id)
            .cloned()
            .collect())
    }

    async fn check_resource_availability(
        &self,
        port_id: PortId,
        cost: &ConstructionCost,
    ) -> Result<ResourceAvailability, GameError> {
        let mut tables = self.tables()?;
        let port = tables.port_mut(port_id)?;
        Ok(cost.availability(&port.resources))
    }

    async fn consume_resources_from_port(
        &self,
        port_id: PortId,
        cost: &ConstructionCost,
    ) -> Result<(), GameError> {
        let mut tables = self.tables()?;
        let port = tables.port_mut(port_id)?;
        let availability = cost.availability(&port.resources);
        if !availability.is_sufficient() {
            return Err(GameError::InsufficientResources {
                port_id,
                missing: availability.describe_missing(),
            });
        }
        port.resources.wood -= cost.wood;
        port.resources.iron -= cost.iron;
        port.resources.gold -= cost.gold;
        Ok(())
    }

    async fn add_resources_to_port(
        &self,
        port_id: PortId,
        delta: &ResourceBundle,
    ) -> Result<(), GameError> {
        if self.faults().credit_ports.contains(&port_id) {
            return Err(Self::injected("ledger credit"));
        }
        let mut tables = self.tables()?;
        tables.port_mut(port_id)?.resources.merge(delta);
        Ok(())
    }

    async fn get_building(&self, building_id: BuildingId) -> Result<Building, GameError> {
        self.tables()?
            .buildings
            .get(&building_id)
            .cloned()
            .ok_or_else(|| GameError::building_not_found(building_id))
    }

    async fn get_building_by_port_and_type(
        &self,
        port_id: PortId,
        building_type: &str,
    ) -> Result<Option<Building>, GameError> {
        Ok(self
            .tables()?
            .buildings
            .values()
            .find(|b| b.port_id == port_id && b.building_type == building_type)
            .cloned())
    }

    async fn create_building(
        &self,
        port_id: PortId,
        building_type: &str,
        now: DateTime<Utc>,
    ) -> Result<Building, GameError> {
        self.tables()?.insert_building(port_id, building_type, None, now)
    }

    async fn create_building_construction(
        &self,
        port_id: PortId,
        building_type: &str,
        complete_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Building, GameError> {
        self.tables()?
            .insert_building(port_id, building_type, Some(complete_at), now)
    }

    async fn upgrade_building(
        &self,
        building_id: BuildingId,
        complete_at: DateTime<Utc>,
    ) -> Result<(), GameError> {
        let mut tables = self.tables()?;
        let building = tables.building_mut(building_id)?;
        building.under_construction = true;
        building.upgrading = true;
        building.construction_complete_at = Some(complete_at);
        Ok(())
    }

    async fn complete_building_construction(
        &self,
        building_id: BuildingId,
    ) -> Result<Option<Building>, GameError> {
        if self.faults().completion_buildings.contains(&building_id) {
            return Err(Self::injected("construction completion"));
        }
        let mut tables = self.tables()?;
        let building = tables.building_mut(building_id)?;
        if !building.under_construction {
            return Ok(None);
        }
        if building.upgrading {
            building.level += 1;
        }
        building.under_construction = false;
        building.upgrading = false;
        building.construction_complete_at = None;
        Ok(Some(building.clone()))
    }

    async fn get_buildings_ready_for_production(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Building>, GameError> {
        Ok(self
            .tables()?
            .buildings
            .values()
            .filter(|b| b.is_production_due(cutoff))
            .cloned()
            .collect())
    }

    async fn get_buildings_under_construction(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Building>, GameError> {
        Ok(self
            .tables()?
            .buildings
            .values()
            .filter(|b| b.is_construction_due(now))
            .cloned()
            .collect())
    }

    async fn update_building_last_production(
        &self,
        building_id: BuildingId,
        at: DateTime<Utc>,
    ) -> Result<(), GameError> {
        if self.faults().production_stamp_buildings.contains(&building_id) {
            return Err(Self::injected("last production update"));
        }
        let mut tables = self.tables()?;
        tables.building_mut(building_id)?.last_production_at = at;
        Ok(())
    }

    async fn get_building_type_by_name(
        &self,
        name: &str,
    ) -> Result<Option<BuildingType>, GameError> {
        Ok(self.catalog.building_type(name).cloned())
    }

    async fn get_production_rates_for_building(
        &self,
        building_type: &str,
        level: u32,
    ) -> Result<Vec<ProductionRate>, GameError> {
        Ok(self.catalog.production_for(building_type, level))
    }

    async fn list_building_types(&self) -> Result<Vec<BuildingType>, GameError> {
        Ok(self.catalog.building_types.clone())
    }

    async fn list_production_for_type(
        &self,
        building_type: &str,
    ) -> Result<Vec<ProductionRate>, GameError> {
        Ok(self.catalog.production_for_type(building_type))
    }
}
