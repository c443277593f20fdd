//! Kernel - the asynchronous simulation engine.

mod construction;
mod dispatcher;
mod production;
mod scheduler;

pub use construction::{CompletionReport, ConstructionService};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use production::{Credit, ProductionEngine, ProductionReport};
pub use scheduler::{SchedulerHandle, SchedulerSummary, TickReport, TickScheduler};
