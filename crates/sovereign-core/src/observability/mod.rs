//! Observability - engine counters and the JSON-lines journal.

use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::PortId;

/// An engine event recorded in the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineEvent {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub port_id: Option<PortId>,
    pub message: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl EngineEvent {
    pub fn new(timestamp: DateTime<Utc>, event_type: &str, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            event_type: event_type.to_string(),
            port_id: None,
            message: message.into(),
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_port(mut self, port_id: PortId) -> Self {
        self.port_id = Some(port_id);
        self
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Append-only journal of engine events.
#[derive(Debug, Clone)]
pub struct Journal {
    path: Option<PathBuf>,
}

impl Journal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A journal that records nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append an event.
    pub fn emit(&self, event: &EngineEvent) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        let line = serde_json::to_string(event)?;
        writeln!(file, "{}", line)?;

        Ok(())
    }

    /// Append an event, logging instead of failing.
    pub fn record(&self, event: EngineEvent) {
        if let Err(e) = self.emit(&event) {
            tracing::warn!(error = %e, event_type = %event.event_type, "Failed to write journal");
        }
    }

    /// Read the last `limit` events.
    pub fn read_recent(&self, limit: usize) -> Vec<EngineEvent> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(_) => return Vec::new(),
        };

        let reader = BufReader::new(file);
        let mut events: Vec<EngineEvent> = reader
            .lines()
            .filter_map(|line| line.ok())
            .filter_map(|line| serde_json::from_str(&line).ok())
            .collect();

        if events.len() > limit {
            events.drain(0..events.len() - limit);
        }

        events
    }
}

/// Lifetime counters for the running engine.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    ticks: AtomicU64,
    events_fetched: AtomicU64,
    events_dispatched: AtomicU64,
    events_unrecoverable: AtomicU64,
    event_phases_skipped: AtomicU64,
    buildings_credited: AtomicU64,
    production_failures: AtomicU64,
    constructions_completed: AtomicU64,
    completion_failures: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub ticks: u64,
    pub events_fetched: u64,
    pub events_dispatched: u64,
    pub events_unrecoverable: u64,
    pub event_phases_skipped: u64,
    pub buildings_credited: u64,
    pub production_failures: u64,
    pub constructions_completed: u64,
    pub completion_failures: u64,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(by as u64, Ordering::Relaxed);
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_tick(&self) {
        bump(&self.ticks, 1);
    }

    pub fn record_fetched(&self, count: usize) {
        bump(&self.events_fetched, count);
    }

    pub fn record_dispatched(&self) {
        bump(&self.events_dispatched, 1);
    }

    pub fn record_unrecoverable(&self) {
        bump(&self.events_unrecoverable, 1);
    }

    pub fn record_event_phase_skipped(&self) {
        bump(&self.event_phases_skipped, 1);
    }

    pub fn record_production(&self, credited: usize, failed: usize) {
        bump(&self.buildings_credited, credited);
        bump(&self.production_failures, failed);
    }

    pub fn record_completions(&self, completed: usize, failed: usize) {
        bump(&self.constructions_completed, completed);
        bump(&self.completion_failures, failed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let get = |c: &AtomicU64| c.load(Ordering::Relaxed);
        MetricsSnapshot {
            ticks: get(&self.ticks),
            events_fetched: get(&self.events_fetched),
            events_dispatched: get(&self.events_dispatched),
            events_unrecoverable: get(&self.events_unrecoverable),
            event_phases_skipped: get(&self.event_phases_skipped),
            buildings_credited: get(&self.buildings_credited),
            production_failures: get(&self.production_failures),
            constructions_completed: get(&self.constructions_completed),
            completion_failures: get(&self.completion_failures),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn journal_keeps_most_recent_events() {
        let dir = tempfile::tempdir().unwrap();
        let journal = Journal::new(dir.path().join("nested/events.jsonl"));
        for i in 0..5 {
            let event = EngineEvent::new(Utc::now(), "tick", format!("tick {i}")).with_port(PortId(i));
            journal.emit(&event).unwrap();
        }

        let recent = journal.read_recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "tick 3");
        assert_eq!(recent[1].port_id, Some(PortId(4)));
    }

    #[test]
    fn disabled_journal_is_silent() {
        let journal = Journal::disabled();
        journal.record(EngineEvent::new(Utc::now(), "engine_start", "started"));
        assert!(journal.read_recent(10).is_empty());
        assert!(journal.path().is_none());
    }

    #[test]
    fn metrics_accumulate() {
        let metrics = EngineMetrics::new();
        metrics.record_tick();
        metrics.record_tick();
        metrics.record_production(3, 1);
        metrics.record_unrecoverable();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.buildings_credited, 3);
        assert_eq!(snapshot.production_failures, 1);
        assert_eq!(snapshot.events_unrecoverable, 1);
    }
}
