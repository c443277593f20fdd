//! Tick scheduler - the fixed-interval loop driving the simulation.
//!
//! Each tick runs, in order: the deferred event drain, the production sweep
//! and the construction completion sweep. Failures inside a phase are
//! isolated per item; a failing phase never stops the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::json;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::construction::ConstructionService;
use super::dispatcher::{DispatchOutcome, Dispatcher};
use super::production::ProductionEngine;
use crate::clock::Clock;
use crate::events::GameEvent;
use crate::observability::{EngineEvent, EngineMetrics, Journal};
use crate::store::{EventQueue, ScoredEntry};

/// Result of one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// The event phase was skipped because the store was unavailable
    pub event_phase_skipped: bool,
    /// Due events pulled from the store
    pub events_fetched: usize,
    /// Events handed to a handler
    pub events_dispatched: usize,
    /// Events dropped as unrecoverable
    pub events_unrecoverable: usize,
    /// Buildings whose yield was credited
    pub buildings_credited: usize,
    /// Buildings whose credit failed
    pub production_failures: usize,
    /// Buildings that finished construction
    pub constructions_completed: usize,
    /// Buildings whose completion failed
    pub completion_failures: usize,
}

impl TickReport {
    pub fn summary(&self) -> String {
        format!(
            "Events: {} fetched, {} dispatched, {} dropped; Credited: {}; Completed: {}; Failures: {}",
            self.events_fetched,
            self.events_dispatched,
            self.events_unrecoverable,
            self.buildings_credited,
            self.constructions_completed,
            self.production_failures + self.completion_failures
        )
    }
}

/// Returned when the loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSummary {
    pub ticks: u64,
}

/// Handle to a running scheduler task.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<SchedulerSummary>,
}

impl SchedulerHandle {
    /// Signal cancellation and wait for the loop to exit. A tick already in
    /// progress runs to completion first.
    pub async fn stop(self) -> Result<SchedulerSummary, JoinError> {
        let _ = self.shutdown.send(true);
        self.task.await
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// The simulation's top-level loop.
pub struct TickScheduler {
    queue: EventQueue,
    dispatcher: Dispatcher,
    production: ProductionEngine,
    construction: Arc<ConstructionService>,
    clock: Arc<dyn Clock>,
    metrics: Arc<EngineMetrics>,
    journal: Journal,
    interval: Duration,
    batch_limit: usize,
}

impl TickScheduler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: EventQueue,
        dispatcher: Dispatcher,
        production: ProductionEngine,
        construction: Arc<ConstructionService>,
        clock: Arc<dyn Clock>,
        metrics: Arc<EngineMetrics>,
        journal: Journal,
        interval: Duration,
        batch_limit: usize,
    ) -> Self {
        Self {
            queue,
            dispatcher,
            production,
            construction,
            clock,
            metrics,
            journal,
            interval,
            batch_limit,
        }
    }

    /// Spawn the loop on the tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run_until(shutdown_rx));
        SchedulerHandle { shutdown, task }
    }

    /// Run ticks until `shutdown` turns true or its sender is dropped. The
    /// first tick fires one interval after the call.
    pub async fn run_until(self, mut shutdown: watch::Receiver<bool>) -> SchedulerSummary {
        info!(interval_secs = self.interval.as_secs_f64(), "Starting tick engine");
        self.journal.record(
            EngineEvent::new(self.clock.now(), "engine_start", "Tick engine started")
                .with_metadata(json!({ "interval_secs": self.interval.as_secs_f64() })),
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.run_tick(self.clock.now()).await;
                    ticks += 1;
                    debug!(tick = ticks, summary = %report.summary(), "Tick complete");
                }
            }
        }

        info!(ticks, "Tick engine stopping");
        self.journal.record(
            EngineEvent::new(self.clock.now(), "engine_stop", "Tick engine stopped")
                .with_metadata(json!({ "ticks": ticks })),
        );
        SchedulerSummary { ticks }
    }

    /// Run one full tick at `now`.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        self.metrics.record_tick();
        let mut report = TickReport::default();

        self.process_due_events(now, &mut report).await;

        debug!("Processing resource generation");
        match self.production.process_resource_generation(now).await {
            Ok(production) => {
                report.buildings_credited = production.credited.len();
                report.production_failures = production.failed;
            }
            Err(e) => error!(error = %e, "Error processing resource generation"),
        }
        self.metrics
            .record_production(report.buildings_credited, report.production_failures);

        debug!("Processing completed constructions");
        match self.construction.complete_constructions(now).await {
            Ok(completion) => {
                report.constructions_completed = completion.completed.len();
                report.completion_failures = completion.failed;
            }
            Err(e) => error!(error = %e, "Error processing completed constructions"),
        }
        self.metrics
            .record_completions(report.constructions_completed, report.completion_failures);

        report
    }

    async fn process_due_events(&self, now: DateTime<Utc>, report: &mut TickReport) {
        debug!("Processing due events");
        let entries = match self.queue.fetch_due(now.timestamp(), self.batch_limit).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "Skipping event phase");
                self.metrics.record_event_phase_skipped();
                report.event_phase_skipped = true;
                return;
            }
        };

        debug!(count = entries.len(), "Collected events");
        self.metrics.record_fetched(entries.len());
        report.events_fetched = entries.len();
        if entries.len() >= self.batch_limit {
            warn!(
                count = entries.len(),
                limit = self.batch_limit,
                "Event batch limit reached, backlog remains"
            );
        }

        for entry in entries {
            let outcome = self.dispatcher.dispatch_raw(&entry.member).await;
            if let DispatchOutcome::Unrecoverable(reason) = &outcome {
                self.record_unrecoverable(&entry, reason, now);
                report.events_unrecoverable += 1;
            } else {
                self.metrics.record_dispatched();
                report.events_dispatched += 1;
            }

            match self.queue.remove(&entry).await {
                Ok(true) => {}
                Ok(false) => debug!(score = entry.score, "Event already removed"),
                Err(e) => warn!(score = entry.score, error = %e, "Failed to remove event"),
            }
        }
    }

    fn record_unrecoverable(&self, entry: &ScoredEntry, reason: &str, now: DateTime<Utc>) {
        warn!(score = entry.score, reason, "Dropping unrecoverable event");
        self.metrics.record_unrecoverable();

        let mut event = EngineEvent::new(now, "event_unrecoverable", reason)
            .with_metadata(json!({ "payload": entry.member, "due_at": entry.score }));
        if let Ok(decoded) = GameEvent::decode(&entry.member) {
            event = event.with_port(decoded.port_id);
        }
        self.journal.record(event);
    }
}
