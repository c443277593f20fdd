//! Game state - islands, buildings, resources and the static catalog.

mod building;
mod catalog;
mod island;
mod resources;

pub use building::{Building, BuildingId, BuildingStatus};
pub use catalog::{sum_production, BuildingType, Catalog, ProductionRate};
pub use island::{IslandOverview, PlayerId, Port, PortId};
pub use resources::{
    Amount, ConstructionCost, ResourceAvailability, ResourceBundle, ResourceKind,
};
