//! Construction lifecycle - building creation, upgrades and timer completion.
//!
//! A building moves `UnderConstruction -> Active` when its timer elapses and
//! may cycle back through `UnderConstruction` for each upgrade up to the
//! type's max level. Levels are bumped when an upgrade completes, never when
//! it starts.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::GameError;
use crate::persistence::GameRepository;
use crate::state::{Building, BuildingId, BuildingType, ConstructionCost, PortId};

/// Outcome of a completion sweep.
#[derive(Debug, Default)]
pub struct CompletionReport {
    /// Buildings that left construction, with their new state.
    pub completed: Vec<Building>,
    /// Buildings that could not be completed; they stay under construction.
    pub failed: usize,
}

/// Owns the building state machine.
pub struct ConstructionService {
    repo: Arc<dyn GameRepository>,
    clock: Arc<dyn Clock>,
}

impl ConstructionService {
    pub fn new(repo: Arc<dyn GameRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Start building `building_type` on a port, paying the base cost.
    ///
    /// Not idempotent: each successful call creates a new building.
    pub async fn construct_building(
        &self,
        port_id: PortId,
        building_type: &str,
    ) -> Result<Building, GameError> {
        let building_type = self.building_type(building_type).await?;

        let now = self.clock.now();
        let complete_at = completion_time(now, Some(building_type.build_time()))?;

        self.charge(port_id, &building_type.base_cost).await?;

        let building = self
            .repo
            .create_building_construction(port_id, &building_type.name, complete_at, now)
            .await?;

        info!(
            port_id = %port_id,
            building_id = %building.id,
            building_type = %building.building_type,
            complete_at = %complete_at,
            "Construction started"
        );

        Ok(building)
    }

    /// Start upgrading a building to the next level. Returns when the
    /// upgrade will complete.
    pub async fn upgrade_building(
        &self,
        building_id: BuildingId,
    ) -> Result<DateTime<Utc>, GameError> {
        let building = self.repo.get_building(building_id).await?;

        if building.under_construction {
            return Err(GameError::AlreadyUnderConstruction(building_id));
        }

        let building_type = self.building_type(&building.building_type).await?;

        if building.level >= building_type.max_level {
            return Err(GameError::MaxLevelReached {
                building_id,
                max_level: building_type.max_level,
            });
        }

        let complete_at = completion_time(
            self.clock.now(),
            building_type.upgrade_time(building.level),
        )?;

        let cost = building_type.upgrade_cost(building.level);
        self.charge(building.port_id, &cost).await?;

        self.repo.upgrade_building(building_id, complete_at).await?;

        info!(
            port_id = %building.port_id,
            building_id = %building_id,
            to_level = building.level + 1,
            complete_at = %complete_at,
            "Upgrade started"
        );

        Ok(complete_at)
    }

    /// Finish every building whose timer has elapsed at `now`.
    ///
    /// Failures are logged per building; those buildings remain under
    /// construction and are retried on the next sweep.
    pub async fn complete_constructions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<CompletionReport, GameError> {
        let due = self.repo.get_buildings_under_construction(now).await?;
        let mut report = CompletionReport::default();

        for building in due {
            match self.repo.complete_building_construction(building.id).await {
                Ok(Some(done)) => {
                    info!(
                        port_id = %done.port_id,
                        building_id = %done.id,
                        building_type = %done.building_type,
                        level = done.level,
                        "Construction complete"
                    );
                    report.completed.push(done);
                }
                // Completed concurrently; nothing left to do.
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        building_id = %building.id,
                        error = %e,
                        "Failed to complete construction"
                    );
                    report.failed += 1;
                }
            }
        }

        Ok(report)
    }

    /// Existing building of a type on a port, if any.
    pub async fn find_building(
        &self,
        port_id: PortId,
        building_type: &str,
    ) -> Result<Option<Building>, GameError> {
        self.repo
            .get_building_by_port_and_type(port_id, building_type)
            .await
    }

    /// Insert an active building without charging for it. Used to fulfil
    /// work that was paid for when it was scheduled.
    pub async fn place_building(
        &self,
        port_id: PortId,
        building_type: &str,
    ) -> Result<Building, GameError> {
        self.repo
            .create_building(port_id, building_type, self.clock.now())
            .await
    }

    /// Resolve a catalog entry.
    pub async fn building_type(&self, name: &str) -> Result<BuildingType, GameError> {
        if name.trim().is_empty() {
            return Err(GameError::Validation("building type is required".into()));
        }
        self.repo
            .get_building_type_by_name(name)
            .await?
            .ok_or_else(|| GameError::InvalidBuildingType(name.to_string()))
    }

    /// Check that the port can pay `cost`, then deduct it.
    pub(crate) async fn charge(
        &self,
        port_id: PortId,
        cost: &ConstructionCost,
    ) -> Result<(), GameError> {
        let availability = self.repo.check_resource_availability(port_id, cost).await?;
        if !availability.is_sufficient() {
            return Err(GameError::InsufficientResources {
                port_id,
                missing: availability.describe_missing(),
            });
        }
        self.repo.consume_resources_from_port(port_id, cost).await
    }
}

/// `now + duration`, rejecting build times that overflow the calendar.
fn completion_time(
    now: DateTime<Utc>,
    duration: Option<Duration>,
) -> Result<DateTime<Utc>, GameError> {
    duration
        .and_then(|d| now.checked_add_signed(d))
        .ok_or_else(|| GameError::Validation("build time out of range".into()))
}
