//! Engine - wires the collaborators together from configuration.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::kernel::{ConstructionService, Dispatcher, ProductionEngine, TickScheduler};
use crate::observability::{EngineMetrics, Journal};
use crate::persistence::{GameRepository, MemoryRepository};
use crate::service::IslandService;
use crate::store::{EventQueue, MemoryScoredSet, ScoredSet};

/// A fully wired game engine. Cheap to share behind an `Arc`; every
/// component it hands out uses the same store, repository and clock.
pub struct Engine {
    config: EngineConfig,
    repo: Arc<dyn GameRepository>,
    queue: EventQueue,
    clock: Arc<dyn Clock>,
    construction: Arc<ConstructionService>,
    metrics: Arc<EngineMetrics>,
    journal: Journal,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        repo: Arc<dyn GameRepository>,
        store: Arc<dyn ScoredSet>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let queue = EventQueue::new(store, config.events_key.clone());
        let construction = Arc::new(ConstructionService::new(repo.clone(), clock.clone()));
        let journal = Journal::new(config.journal_path.clone());
        Self {
            config,
            repo,
            queue,
            clock,
            construction,
            metrics: Arc::new(EngineMetrics::new()),
            journal,
        }
    }

    /// Engine backed by the in-memory store and repository, seeded with the
    /// configured catalog.
    pub fn in_memory(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let repo = Arc::new(MemoryRepository::new(config.catalog.clone()));
        let store = Arc::new(MemoryScoredSet::new());
        Self::new(config, repo, store, clock)
    }

    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = journal;
        self
    }

    pub fn metrics(&self) -> Arc<EngineMetrics> {
        self.metrics.clone()
    }

    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    pub fn islands(&self) -> IslandService {
        IslandService::new(
            self.repo.clone(),
            self.construction.clone(),
            self.queue.clone(),
            self.clock.clone(),
            self.config.starting_resources,
            self.config.map_size,
        )
    }

    /// A scheduler over this engine's collaborators. Not started.
    pub fn scheduler(&self) -> TickScheduler {
        TickScheduler::new(
            self.queue.clone(),
            Dispatcher::new(self.construction.clone()),
            ProductionEngine::new(self.repo.clone(), self.config.production_interval()),
            self.construction.clone(),
            self.clock.clone(),
            self.metrics.clone(),
            self.journal.clone(),
            self.config.tick_interval(),
            self.config.event_batch_limit,
        )
    }
}
