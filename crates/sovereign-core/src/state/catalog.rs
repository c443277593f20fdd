//! Static building catalog: costs, build times, level caps and production.

use std::collections::HashSet;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use super::resources::{Amount, ConstructionCost, ResourceBundle, ResourceKind};

/// Catalog entry for one category of building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingType {
    pub name: String,
    #[serde(default)]
    pub base_cost: ConstructionCost,
    /// Seconds to build level 1.
    pub base_build_time_secs: u32,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
}

fn default_max_level() -> u32 {
    5
}

/// Upper bound on the longest build a type can require (its last upgrade),
/// about ten years.
const MAX_TOTAL_BUILD_SECS: u64 = 315_360_000;

impl BuildingType {
    pub fn build_time(&self) -> Duration {
        Duration::seconds(i64::from(self.base_build_time_secs))
    }

    /// Price of taking a building from `current_level` to the next level.
    pub fn upgrade_cost(&self, current_level: u32) -> ConstructionCost {
        self.base_cost.scaled(Amount::from(current_level) + 1)
    }

    /// Time to take a building from `current_level` to the next level, or
    /// `None` if it does not fit in a duration.
    pub fn upgrade_time(&self, current_level: u32) -> Option<Duration> {
        let secs = i64::from(self.base_build_time_secs)
            .checked_mul(i64::from(current_level).checked_add(1)?)?;
        Duration::try_seconds(secs)
    }
}

/// Yield of one resource for a building type at a given level, per tick
/// interval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionRate {
    pub building_type: String,
    pub level: u32,
    pub resource: ResourceKind,
    pub rate: Amount,
}

/// Sum production rows into a single ledger delta.
pub fn sum_production(rates: &[ProductionRate]) -> ResourceBundle {
    let mut total = ResourceBundle::default();
    for row in rates {
        total.add(row.resource, row.rate);
    }
    total
}

/// The full static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub building_types: Vec<BuildingType>,
    #[serde(default)]
    pub production: Vec<ProductionRate>,
}

impl Catalog {
    pub fn building_type(&self, name: &str) -> Option<&BuildingType> {
        self.building_types.iter().find(|t| t.name == name)
    }

    pub fn production_for(&self, building_type: &str, level: u32) -> Vec<ProductionRate> {
        self.production
            .iter()
            .filter(|row| row.building_type == building_type && row.level == level)
            .cloned()
            .collect()
    }

    /// Every production row for a type, all levels.
    pub fn production_for_type(&self, building_type: &str) -> Vec<ProductionRate> {
        let mut rows: Vec<ProductionRate> = self
            .production
            .iter()
            .filter(|row| row.building_type == building_type)
            .cloned()
            .collect();
        rows.sort_by_key(|row| (row.level, row.resource));
        rows
    }

    /// Check internal consistency, returning every problem found.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for building_type in &self.building_types {
            if building_type.name.trim().is_empty() {
                problems.push("building type with empty name".to_string());
            }
            if !seen.insert(building_type.name.as_str()) {
                problems.push(format!("duplicate building type '{}'", building_type.name));
            }
            if building_type.base_cost.is_negative() {
                problems.push(format!("'{}' has a negative base cost", building_type.name));
            }
            if building_type.max_level == 0 {
                problems.push(format!("'{}' has max_level 0", building_type.name));
            }
            let longest = u64::from(building_type.base_build_time_secs)
                .saturating_mul(u64::from(building_type.max_level));
            if longest > MAX_TOTAL_BUILD_SECS {
                problems.push(format!(
                    "'{}' needs {}s to reach max level, more than {}s",
                    building_type.name, longest, MAX_TOTAL_BUILD_SECS
                ));
            }
        }

        for row in &self.production {
            match self.building_type(&row.building_type) {
                None => problems.push(format!(
                    "production row references unknown building type '{}'",
                    row.building_type
                )),
                Some(t) if row.level == 0 || row.level > t.max_level => problems.push(format!(
                    "production row for '{}' has level {} outside 1..={}",
                    row.building_type, row.level, t.max_level
                )),
                Some(_) => {}
            }
            if row.rate < 0 {
                problems.push(format!(
                    "production row for '{}' has a negative rate",
                    row.building_type
                ));
            }
        }

        problems
    }
}

impl Default for Catalog {
    fn default() -> Self {
        let types = [
            ("dock", (50, 10, 20), 10, 5),
            ("trade_office", (80, 10, 40), 30, 5),
            ("lumber_mill", (30, 5, 10), 20, 10),
            ("iron_mine", (60, 0, 20), 30, 10),
            ("farm", (20, 0, 5), 15, 10),
            ("sugar_plantation", (40, 5, 15), 25, 8),
            ("rum_distillery", (60, 15, 30), 40, 8),
            ("fort", (100, 50, 40), 60, 3),
        ];
        let building_types = types
            .into_iter()
            .map(|(name, (wood, iron, gold), secs, max_level)| BuildingType {
                name: name.to_string(),
                base_cost: ConstructionCost::new(wood, iron, gold),
                base_build_time_secs: secs,
                max_level,
            })
            .collect::<Vec<_>>();

        // Linear yields per level; the fort produces nothing.
        let yields: [(&str, &[(ResourceKind, Amount)]); 7] = [
            ("dock", &[(ResourceKind::Gold, 1)]),
            ("trade_office", &[(ResourceKind::Gold, 2), (ResourceKind::Silver, 1)]),
            ("lumber_mill", &[(ResourceKind::Wood, 3)]),
            ("iron_mine", &[(ResourceKind::Iron, 2)]),
            ("farm", &[(ResourceKind::Grain, 3)]),
            ("sugar_plantation", &[(ResourceKind::Sugar, 2)]),
            ("rum_distillery", &[(ResourceKind::Rum, 1)]),
        ];
        let mut production = Vec::new();
        for (name, per_level) in yields {
            let max_level = building_types
                .iter()
                .find(|t| t.name == name)
                .map_or(1, |t| t.max_level);
            for level in 1..=max_level {
                for (resource, rate) in per_level {
                    production.push(ProductionRate {
                        building_type: name.to_string(),
                        level,
                        resource: *resource,
                        rate: rate * Amount::from(level),
                    });
                }
            }
        }

        Self {
            building_types,
            production,
        }
    }
}
