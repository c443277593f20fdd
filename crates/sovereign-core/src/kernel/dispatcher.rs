//! Dispatcher - routes deferred events to their handlers.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::construction::ConstructionService;
use crate::events::{GameEvent, GameEventType};
use crate::state::{Building, BuildingId};

/// What happened to a delivered event. Every outcome counts as delivered;
/// nothing is redelivered.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A building was created to fulfil the event.
    Created(Building),
    /// The building already existed, so nothing changed.
    AlreadyPresent(BuildingId),
    /// The handler ran but could not create the building.
    Failed(String),
    /// The event cannot be handled and was dropped.
    Unrecoverable(String),
}

impl DispatchOutcome {
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, Self::Unrecoverable(_))
    }
}

/// Dispatcher maps events to handlers by kind.
pub struct Dispatcher {
    construction: Arc<ConstructionService>,
}

impl Dispatcher {
    pub fn new(construction: Arc<ConstructionService>) -> Self {
        Self { construction }
    }

    /// Decode a raw payload and dispatch it.
    pub async fn dispatch_raw(&self, raw: &str) -> DispatchOutcome {
        match GameEvent::decode(raw) {
            Ok(event) => self.dispatch(&event).await,
            Err(e) => DispatchOutcome::Unrecoverable(format!("malformed payload: {e}")),
        }
    }

    pub async fn dispatch(&self, event: &GameEvent) -> DispatchOutcome {
        debug!(
            event_type = %event.event_type,
            port_id = %event.port_id,
            building_type = %event.building_type,
            "Handling event"
        );

        match event.event_type {
            GameEventType::PortBuilding if !event.building_type.trim().is_empty() => {
                self.handle_port_building(event).await
            }
            GameEventType::PortBuilding => {
                DispatchOutcome::Unrecoverable("port building event without building type".into())
            }
            other => DispatchOutcome::Unrecoverable(format!("no handler for {other} events")),
        }
    }

    async fn handle_port_building(&self, event: &GameEvent) -> DispatchOutcome {
        match self
            .construction
            .find_building(event.port_id, &event.building_type)
            .await
        {
            Ok(Some(existing)) => {
                debug!(
                    building_id = %existing.id,
                    "Building already present, skipping"
                );
                return DispatchOutcome::AlreadyPresent(existing.id);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(port_id = %event.port_id, error = %e, "Failed to look up building");
                return DispatchOutcome::Failed(e.to_string());
            }
        }

        match self
            .construction
            .place_building(event.port_id, &event.building_type)
            .await
        {
            Ok(building) => {
                info!(
                    port_id = %event.port_id,
                    building_id = %building.id,
                    building_type = %building.building_type,
                    "Building delivered"
                );
                DispatchOutcome::Created(building)
            }
            Err(e) => {
                warn!(
                    port_id = %event.port_id,
                    building_type = %event.building_type,
                    error = %e,
                    "Failed to create building"
                );
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::persistence::{GameRepository, MemoryRepository, NewPort};
    use crate::state::{Catalog, PlayerId, PortId, ResourceBundle};

    async fn setup() -> (Arc<MemoryRepository>, Dispatcher, PortId) {
        let repo = Arc::new(MemoryRepository::new(Catalog::default()));
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp(0, 0).unwrap()));
        let port = repo
            .create_port(
                NewPort {
                    player_id: PlayerId(1),
                    name: "Havana".into(),
                    x: 0,
                    y: 0,
                    resources: ResourceBundle::default(),
                },
                clock.now(),
            )
            .await
            .unwrap();
        let construction = Arc::new(ConstructionService::new(repo.clone(), clock));
        (repo, Dispatcher::new(construction), port.id)
    }

    #[tokio::test]
    async fn building_event_creates_once() {
        let (repo, dispatcher, port_id) = setup().await;
        let event = GameEvent::port_building(port_id, "trade_office");

        let first = dispatcher.dispatch(&event).await;
        let DispatchOutcome::Created(building) = first else {
            panic!("expected creation, got {first:?}");
        };

        let second = dispatcher.dispatch(&event).await;
        assert_eq!(second, DispatchOutcome::AlreadyPresent(building.id));
        assert_eq!(repo.get_port_buildings(port_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_port_fails_without_panicking() {
        let (_repo, dispatcher, _) = setup().await;
        let outcome = dispatcher
            .dispatch(&GameEvent::port_building(PortId(77), "dock"))
            .await;
        assert!(matches!(outcome, DispatchOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn unusable_events_are_unrecoverable() {
        let (_repo, dispatcher, port_id) = setup().await;

        let empty = GameEvent::port_building(port_id, "");
        assert!(dispatcher.dispatch(&empty).await.is_unrecoverable());

        let collect = GameEvent {
            event_type: GameEventType::ResourceCollect,
            port_id,
            building_type: String::new(),
        };
        assert!(dispatcher.dispatch(&collect).await.is_unrecoverable());

        assert!(dispatcher.dispatch_raw("{broken").await.is_unrecoverable());
    }
}
