//! Island service - request-path operations for players.
//!
//! Sits beside the tick engine and shares its collaborators. Nothing here
//! runs on a timer; every call is driven by a player action.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::GameError;
use crate::events::GameEvent;
use crate::kernel::ConstructionService;
use crate::persistence::{GameRepository, NewPort};
use crate::state::{
    Building, BuildingId, BuildingType, IslandOverview, PlayerId, Port, PortId, ProductionRate,
    ResourceBundle,
};
use crate::store::EventQueue;

pub struct IslandService {
    repo: Arc<dyn GameRepository>,
    construction: Arc<ConstructionService>,
    queue: EventQueue,
    clock: Arc<dyn Clock>,
    starting_resources: ResourceBundle,
    map_size: i32,
}

impl IslandService {
    pub fn new(
        repo: Arc<dyn GameRepository>,
        construction: Arc<ConstructionService>,
        queue: EventQueue,
        clock: Arc<dyn Clock>,
        starting_resources: ResourceBundle,
        map_size: i32,
    ) -> Self {
        Self {
            repo,
            construction,
            queue,
            clock,
            starting_resources,
            map_size,
        }
    }

    /// Found a new island for a player at a random spot on the map, stocked
    /// with the starting resources.
    pub async fn found_island(&self, player_id: PlayerId, name: &str) -> Result<Port, GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::Validation("island name is required".into()));
        }

        let (x, y) = {
            let mut rng = rand::thread_rng();
            let bound = self.map_size.max(1);
            (rng.gen_range(0..bound), rng.gen_range(0..bound))
        };

        let port = self
            .repo
            .create_port(
                NewPort {
                    player_id,
                    name: name.to_string(),
                    x,
                    y,
                    resources: self.starting_resources,
                },
                self.clock.now(),
            )
            .await?;

        info!(
            port_id = %port.id,
            player_id = %player_id,
            x,
            y,
            "Island founded"
        );
        Ok(port)
    }

    pub async fn island_overview(&self, port_id: PortId) -> Result<IslandOverview, GameError> {
        let port = self.repo.get_port(port_id).await?;
        let buildings = self.repo.get_port_buildings(port_id).await?;
        Ok(IslandOverview { port, buildings })
    }

    pub async fn construct_building(
        &self,
        port_id: PortId,
        building_type: &str,
    ) -> Result<Building, GameError> {
        self.construction
            .construct_building(port_id, building_type)
            .await
    }

    pub async fn upgrade_building(
        &self,
        building_id: BuildingId,
    ) -> Result<DateTime<Utc>, GameError> {
        self.construction.upgrade_building(building_id).await
    }

    /// Pay for a building now and have it delivered `delay` later by the
    /// tick engine. Returns the delivery time.
    ///
    /// Delivery only ever adds a building the port lacks, so a port that
    /// already has one of the type is refused before paying. If the event
    /// cannot be queued the charge is refunded.
    pub async fn schedule_building(
        &self,
        port_id: PortId,
        building_type: &str,
        delay: Duration,
    ) -> Result<DateTime<Utc>, GameError> {
        if delay < Duration::zero() {
            return Err(GameError::Validation("delay must not be negative".into()));
        }
        let due_at = self
            .clock
            .now()
            .checked_add_signed(delay)
            .ok_or_else(|| GameError::Validation("delay out of range".into()))?;

        let building_type = self.construction.building_type(building_type).await?;
        if self
            .construction
            .find_building(port_id, &building_type.name)
            .await?
            .is_some()
        {
            return Err(GameError::BuildingExists {
                port_id,
                building_type: building_type.name,
            });
        }
        self.construction
            .charge(port_id, &building_type.base_cost)
            .await?;

        let event = GameEvent::port_building(port_id, building_type.name.clone());
        if let Err(e) = self.queue.enqueue(&event, due_at.timestamp()).await {
            warn!(port_id = %port_id, error = %e, "Failed to queue building, refunding");
            let refund = ResourceBundle::from(building_type.base_cost);
            if let Err(refund_err) = self.repo.add_resources_to_port(port_id, &refund).await {
                warn!(port_id = %port_id, error = %refund_err, "Refund failed");
            }
            return Err(e.into());
        }

        info!(
            port_id = %port_id,
            building_type = %building_type.name,
            due_at = %due_at,
            "Building scheduled"
        );
        Ok(due_at)
    }

    pub async fn building_types(&self) -> Result<Vec<BuildingType>, GameError> {
        self.repo.list_building_types().await
    }

    /// Production rows of a type, one per level and resource.
    pub async fn building_production(
        &self,
        building_type: &str,
    ) -> Result<Vec<ProductionRate>, GameError> {
        let building_type = self.construction.building_type(building_type).await?;
        self.repo.list_production_for_type(&building_type.name).await
    }
}
