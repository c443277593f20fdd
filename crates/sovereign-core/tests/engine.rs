//! Integration tests for the tick engine.
//!
//! Drives the wired engine through the request path and the scheduler the
//! way a game server would, against the in-memory collaborators.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration};

use sovereign_core::observability::Journal;
use sovereign_core::persistence::{GameRepository, MemoryRepository};
use sovereign_core::state::{
    BuildingStatus, BuildingType, Catalog, ConstructionCost, PlayerId, Port, ResourceBundle,
};
use sovereign_core::store::{MemoryScoredSet, ScoredSet};
use sovereign_core::{
    Clock, Engine, EngineConfig, ErrorKind, GameError, GameEvent, ManualClock,
};

struct Harness {
    engine: Engine,
    repo: Arc<MemoryRepository>,
    store: Arc<MemoryScoredSet>,
    clock: Arc<ManualClock>,
}

impl Harness {
    fn new() -> Self {
        Self::with_catalog(Catalog::default())
    }

    fn with_catalog(catalog: Catalog) -> Self {
        Self::build(EngineConfig::default(), catalog)
    }

    fn build(config: EngineConfig, catalog: Catalog) -> Self {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let repo = Arc::new(MemoryRepository::new(catalog));
        let store = Arc::new(MemoryScoredSet::new());
        let engine = Engine::new(config, repo.clone(), store.clone(), clock.clone())
            .with_journal(Journal::disabled());
        Self {
            engine,
            repo,
            store,
            clock,
        }
    }

    async fn island(&self, name: &str) -> Port {
        self.engine
            .islands()
            .found_island(PlayerId(1), name)
            .await
            .unwrap()
    }

    async fn ledger(&self, port: &Port) -> ResourceBundle {
        self.repo.get_port(port.id).await.unwrap().resources
    }
}

/// Dock scenario: construction deducts exactly the base cost and the
/// building goes active once its timer elapses.
#[tokio::test]
async fn dock_construction_lifecycle() {
    let h = Harness::new();
    let port = h.island("Port Royal").await;
    let started = h.clock.now();

    let dock = h
        .engine
        .islands()
        .construct_building(port.id, "dock")
        .await
        .unwrap();

    assert!(dock.under_construction);
    assert_eq!(dock.level, 1);
    assert_eq!(dock.construction_complete_at, Some(started + Duration::seconds(10)));

    let ledger = h.ledger(&port).await;
    assert_eq!((ledger.wood, ledger.iron, ledger.gold), (50, 10, 30));

    // Not yet due
    h.clock.advance(Duration::seconds(5));
    let scheduler = h.engine.scheduler();
    let report = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(report.constructions_completed, 0);
    assert_eq!(report.buildings_credited, 0);

    h.clock.advance(Duration::seconds(5));
    let report = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(report.constructions_completed, 1);

    let dock = h.repo.get_building(dock.id).await.unwrap();
    assert!(!dock.under_construction);
    assert_eq!(dock.status(), BuildingStatus::Active);
    assert_eq!(dock.level, 1);
}

#[tokio::test]
async fn construction_requires_every_gated_resource() {
    let h = Harness::new();
    let port = h.island("Tortuga").await;
    let before = h.ledger(&port).await;

    // fort needs 50 iron, the island has 20
    let err = h
        .engine
        .islands()
        .construct_building(port.id, "fort")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InsufficientResources);
    assert_eq!(h.ledger(&port).await, before);
    assert!(h.repo.get_port_buildings(port.id).await.unwrap().is_empty());

    let err = h
        .engine
        .islands()
        .construct_building(port.id, "castle")
        .await
        .unwrap_err();
    assert!(matches!(err, GameError::InvalidBuildingType(_)));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn construct_is_not_idempotent() {
    let h = Harness::new();
    let port = h.island("Nassau").await;
    let islands = h.engine.islands();

    islands.construct_building(port.id, "farm").await.unwrap();
    islands.construct_building(port.id, "farm").await.unwrap();

    assert_eq!(h.repo.get_port_buildings(port.id).await.unwrap().len(), 2);
    let ledger = h.ledger(&port).await;
    assert_eq!((ledger.wood, ledger.gold), (60, 40));
}

#[tokio::test]
async fn upgrade_while_under_construction_changes_nothing() {
    let h = Harness::new();
    let port = h.island("Havana").await;
    let islands = h.engine.islands();
    let mill = islands
        .construct_building(port.id, "lumber_mill")
        .await
        .unwrap();
    let before = h.ledger(&port).await;

    let err = islands.upgrade_building(mill.id).await.unwrap_err();

    assert!(matches!(err, GameError::AlreadyUnderConstruction(_)));
    assert_eq!(err.kind(), ErrorKind::StateConflict);
    assert_eq!(h.ledger(&port).await, before);
}

#[tokio::test]
async fn upgrade_at_max_level_changes_nothing() {
    let catalog = Catalog {
        building_types: vec![BuildingType {
            name: "watchtower".into(),
            base_cost: ConstructionCost::new(10, 0, 0),
            base_build_time_secs: 5,
            max_level: 1,
        }],
        production: Vec::new(),
    };
    let h = Harness::with_catalog(catalog);
    let port = h.island("Bridgetown").await;
    let tower = h
        .repo
        .create_building(port.id, "watchtower", h.clock.now())
        .await
        .unwrap();
    let before = h.ledger(&port).await;

    let err = h
        .engine
        .islands()
        .upgrade_building(tower.id)
        .await
        .unwrap_err();

    assert!(matches!(err, GameError::MaxLevelReached { max_level: 1, .. }));
    assert_eq!(h.ledger(&port).await, before);
}

/// Upgrades charge base cost times the target level and bump the level only
/// when the timer completes. A second completion sweep is a no-op.
#[tokio::test]
async fn upgrade_levels_up_on_completion_once() {
    let h = Harness::new();
    let port = h.island("Santo Domingo").await;
    let dock = h
        .repo
        .create_building(port.id, "dock", h.clock.now())
        .await
        .unwrap();

    let complete_at = h.engine.islands().upgrade_building(dock.id).await.unwrap();
    assert_eq!(complete_at, h.clock.now() + Duration::seconds(20));

    let ledger = h.ledger(&port).await;
    assert_eq!((ledger.wood, ledger.iron, ledger.gold), (0, 0, 10));

    let upgrading = h.repo.get_building(dock.id).await.unwrap();
    assert_eq!(upgrading.level, 1);
    assert!(matches!(
        upgrading.status(),
        BuildingStatus::Upgrading { to_level: 2, .. }
    ));

    h.clock.set(complete_at);
    let scheduler = h.engine.scheduler();
    let first = scheduler.run_tick(h.clock.now()).await;
    let second = scheduler.run_tick(h.clock.now()).await;

    assert_eq!(first.constructions_completed, 1);
    assert_eq!(second.constructions_completed, 0);
    let dock = h.repo.get_building(dock.id).await.unwrap();
    assert_eq!(dock.level, 2);
    assert!(!dock.under_construction);
    assert_eq!(h.ledger(&port).await.gold, 10 + 2);
}

#[tokio::test]
async fn buildings_under_construction_never_produce() {
    let h = Harness::new();
    let port = h.island("Cartagena").await;
    h.engine
        .islands()
        .construct_building(port.id, "lumber_mill")
        .await
        .unwrap();
    let before = h.ledger(&port).await;

    h.clock.advance(Duration::seconds(5));
    let report = h.engine.scheduler().run_tick(h.clock.now()).await;

    assert_eq!(report.buildings_credited, 0);
    assert_eq!(h.ledger(&port).await, before);
}

#[tokio::test]
async fn production_credits_once_per_interval() {
    let h = Harness::new();
    let port = h.island("Campeche").await;
    h.repo
        .create_building(port.id, "lumber_mill", h.clock.now())
        .await
        .unwrap();
    h.repo
        .create_building(port.id, "trade_office", h.clock.now())
        .await
        .unwrap();

    h.clock.advance(Duration::seconds(5));
    let scheduler = h.engine.scheduler();
    let first = scheduler.run_tick(h.clock.now()).await;
    let second = scheduler.run_tick(h.clock.now()).await;

    assert_eq!(first.buildings_credited, 2);
    assert_eq!(second.buildings_credited, 0);
    let ledger = h.ledger(&port).await;
    assert_eq!(ledger.wood, 103);
    assert_eq!(ledger.gold, 52);
    assert_eq!(ledger.silver, 1);
}

#[tokio::test]
async fn failed_credit_does_not_block_other_islands() {
    let h = Harness::new();
    let broken = h.island("Veracruz").await;
    let healthy = h.island("Portobelo").await;
    for port in [&broken, &healthy] {
        h.repo
            .create_building(port.id, "farm", h.clock.now())
            .await
            .unwrap();
    }
    h.repo.fail_credits_for(broken.id);

    h.clock.advance(Duration::seconds(5));
    let scheduler = h.engine.scheduler();
    let report = scheduler.run_tick(h.clock.now()).await;

    assert_eq!(report.buildings_credited, 1);
    assert_eq!(report.production_failures, 1);
    assert_eq!(h.ledger(&broken).await.grain, 25);
    assert_eq!(h.ledger(&healthy).await.grain, 28);

    // The failed building stays eligible and is credited once the ledger
    // recovers, without waiting for a new interval.
    h.repo.clear_faults();
    let retry = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(retry.buildings_credited, 1);
    assert_eq!(h.ledger(&broken).await.grain, 28);
    assert_eq!(h.ledger(&healthy).await.grain, 28);
}

#[tokio::test]
async fn failed_completion_is_retried_next_sweep() {
    let h = Harness::new();
    let port = h.island("Maracaibo").await;
    let farm = h
        .engine
        .islands()
        .construct_building(port.id, "farm")
        .await
        .unwrap();
    h.repo.fail_completions_for(farm.id);

    h.clock.advance(Duration::seconds(15));
    let scheduler = h.engine.scheduler();
    let report = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(report.completion_failures, 1);
    assert!(h.repo.get_building(farm.id).await.unwrap().under_construction);

    h.repo.clear_faults();
    let ledger = h.ledger(&port).await;
    let report = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(report.constructions_completed, 1);
    assert!(!h.repo.get_building(farm.id).await.unwrap().under_construction);
    assert_eq!(h.ledger(&port).await, ledger);
}

#[tokio::test]
async fn due_events_become_visible_at_their_score() {
    let h = Harness::new();
    let queue = h.engine.queue();
    let due = h.clock.now().timestamp() + 30;
    queue
        .enqueue(&GameEvent::port_building(sovereign_core::state::PortId(4), "dock"), due)
        .await
        .unwrap();

    assert!(queue.fetch_due(due - 1, 50).await.unwrap().is_empty());

    let entries = queue.fetch_due(due, 50).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(queue.remove(&entries[0]).await.unwrap());

    assert!(queue.fetch_due(due, 50).await.unwrap().is_empty());
}

/// A scheduled building is paid for up front and delivered by the tick
/// that reaches its due time.
#[tokio::test]
async fn scheduled_building_is_delivered_when_due() {
    let h = Harness::new();
    let port = h.island("Port Royal").await;
    let islands = h.engine.islands();

    let due = islands
        .schedule_building(port.id, "trade_office", Duration::seconds(10))
        .await
        .unwrap();
    let ledger = h.ledger(&port).await;
    assert_eq!((ledger.wood, ledger.iron, ledger.gold), (20, 10, 10));

    let scheduler = h.engine.scheduler();
    h.clock.advance(Duration::seconds(5));
    let early = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(early.events_fetched, 0);

    h.clock.set(due);
    let report = scheduler.run_tick(h.clock.now()).await;
    assert_eq!(report.events_dispatched, 1);

    let overview = islands.island_overview(port.id).await.unwrap();
    assert_eq!(overview.buildings.len(), 1);
    assert_eq!(overview.buildings[0].building_type, "trade_office");
    assert_eq!(overview.active_buildings().count(), 1);
    assert_eq!(h.ledger(&port).await, ledger);
    assert_eq!(h.engine.queue().pending().await.unwrap(), 0);
}

/// Paying for a building the island already owns would buy nothing, since
/// delivery never duplicates a type.
#[tokio::test]
async fn scheduling_an_owned_building_is_refused_before_payment() {
    let h = Harness::new();
    let port = h.island("Port Royal").await;
    h.repo
        .create_building(port.id, "dock", h.clock.now())
        .await
        .unwrap();
    let before = h.ledger(&port).await;

    let err = h
        .engine
        .islands()
        .schedule_building(port.id, "dock", Duration::seconds(1))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StateConflict);

    h.clock.advance(Duration::seconds(1));
    let report = h.engine.scheduler().run_tick(h.clock.now()).await;

    assert_eq!(report.events_fetched, 0);
    assert_eq!(h.ledger(&port).await, before);
    assert_eq!(h.repo.get_port_buildings(port.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn store_outage_does_not_stop_production() {
    let h = Harness::new();
    let port = h.island("Kingston").await;
    h.repo
        .create_building(port.id, "iron_mine", h.clock.now())
        .await
        .unwrap();
    h.store.set_offline(true);

    h.clock.advance(Duration::seconds(5));
    let report = h.engine.scheduler().run_tick(h.clock.now()).await;

    assert!(report.event_phase_skipped);
    assert_eq!(report.buildings_credited, 1);
    assert_eq!(h.ledger(&port).await.iron, 22);
}

#[tokio::test]
async fn unrecoverable_events_are_journaled() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::new(dir.path().join("events.jsonl"));
    let h = Harness::new();
    let engine = Engine::new(
        EngineConfig::default(),
        h.repo.clone(),
        h.store.clone(),
        h.clock.clone(),
    )
    .with_journal(journal.clone());

    let due = h.clock.now().timestamp();
    h.store
        .add("game_events", "garbage".into(), due)
        .await
        .unwrap();
    h.store
        .add(
            "game_events",
            r#"{"event_type":2,"port_id":9,"building_type":"sloop"}"#.into(),
            due,
        )
        .await
        .unwrap();
    h.clock.advance(Duration::seconds(90));
    let report = engine.scheduler().run_tick(h.clock.now()).await;

    assert_eq!(report.events_unrecoverable, 2);
    assert_eq!(h.store.count("game_events").await.unwrap(), 0);
    let recent = journal.read_recent(10);
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|e| e.event_type == "event_unrecoverable"));
    // Stamped with the engine clock, not the wall clock.
    assert!(recent.iter().all(|e| e.timestamp == h.clock.now()));
    assert_eq!(recent[0].metadata["payload"], "garbage");
    assert_eq!(recent[0].port_id, None);
    assert_eq!(recent[1].port_id, Some(sovereign_core::state::PortId(9)));
}

#[tokio::test]
async fn started_scheduler_ticks_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let journal = Journal::new(dir.path().join("events.jsonl"));
    let config = EngineConfig {
        tick_interval_secs: 1,
        ..Default::default()
    };
    let h = Harness::build(config.clone(), Catalog::default());
    let engine = Engine::new(config, h.repo.clone(), h.store.clone(), h.clock.clone())
        .with_journal(journal.clone());
    let metrics = engine.metrics();

    let handle = engine.scheduler().start();
    tokio::time::sleep(StdDuration::from_millis(1_500)).await;
    assert!(!handle.is_finished());
    let summary = handle.stop().await.unwrap();

    assert!(summary.ticks >= 1);
    assert_eq!(metrics.snapshot().ticks, summary.ticks);
    let kinds: Vec<String> = journal
        .read_recent(10)
        .into_iter()
        .map(|e| e.event_type)
        .collect();
    assert_eq!(kinds, vec!["engine_start", "engine_stop"]);
}
