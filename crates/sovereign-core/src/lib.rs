//! Sovereign Core - island economy simulation engine
//!
//! This crate provides the server-side engine of a multiplayer island game:
//! a fixed-interval tick loop that drains deferred events from a sorted-set
//! store, credits production to every eligible building and completes
//! construction timers, plus the request-path operations that found islands
//! and start construction.

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod kernel;
pub mod observability;
pub mod persistence;
pub mod service;
pub mod state;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{ErrorKind, GameError, StoreError};
pub use events::{GameEvent, GameEventType};
pub use kernel::{SchedulerHandle, SchedulerSummary, TickReport, TickScheduler};
pub use service::IslandService;
