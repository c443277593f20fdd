//! Production engine - periodic resource yield for active buildings.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, error, warn};

use crate::error::GameError;
use crate::persistence::GameRepository;
use crate::state::{sum_production, Building, BuildingId, PortId, ResourceBundle};

/// One building's yield credited during a sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credit {
    pub building_id: BuildingId,
    pub port_id: PortId,
    pub amount: ResourceBundle,
}

/// Outcome of a production sweep.
#[derive(Debug, Default)]
pub struct ProductionReport {
    pub credited: Vec<Credit>,
    /// Eligible buildings whose type produces nothing at their level.
    pub idle: usize,
    /// Buildings whose credit failed; they stay eligible.
    pub failed: usize,
}

/// Credits each eligible building's yield to its island once per interval.
pub struct ProductionEngine {
    repo: Arc<dyn GameRepository>,
    interval: Duration,
}

impl ProductionEngine {
    pub fn new(repo: Arc<dyn GameRepository>, interval: Duration) -> Self {
        Self { repo, interval }
    }

    /// Credit every active building whose last production is at least one
    /// interval before `now`.
    ///
    /// A failing building is logged and skipped without touching its
    /// production timestamp, so it is picked up again by the next sweep.
    /// If the credit lands but the timestamp update fails the building will
    /// be credited again next sweep.
    pub async fn process_resource_generation(
        &self,
        now: DateTime<Utc>,
    ) -> Result<ProductionReport, GameError> {
        let cutoff = now - self.interval;
        let buildings = self.repo.get_buildings_ready_for_production(cutoff).await?;
        let mut report = ProductionReport::default();

        for building in buildings {
            match self.produce(&building).await {
                Ok(Some(amount)) => {
                    debug!(
                        building_id = %building.id,
                        port_id = %building.port_id,
                        amount = %amount,
                        "Credited production"
                    );
                    report.credited.push(Credit {
                        building_id: building.id,
                        port_id: building.port_id,
                        amount,
                    });
                }
                Ok(None) => report.idle += 1,
                Err(e) => {
                    warn!(
                        building_id = %building.id,
                        port_id = %building.port_id,
                        error = %e,
                        "Failed to process production"
                    );
                    report.failed += 1;
                    continue;
                }
            }

            if let Err(e) = self
                .repo
                .update_building_last_production(building.id, now)
                .await
            {
                error!(
                    building_id = %building.id,
                    error = %e,
                    "Failed to update last production time"
                );
            }
        }

        Ok(report)
    }

    /// Credit one building. `None` when it has no production at its level.
    async fn produce(&self, building: &Building) -> Result<Option<ResourceBundle>, GameError> {
        let rates = self
            .repo
            .get_production_rates_for_building(&building.building_type, building.level)
            .await?;
        if rates.is_empty() {
            return Ok(None);
        }

        let amount = sum_production(&rates);
        self.repo
            .add_resources_to_port(building.port_id, &amount)
            .await?;
        Ok(Some(amount))
    }
}
