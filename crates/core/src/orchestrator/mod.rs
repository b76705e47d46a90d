//! Enhancement orchestrator.
//!
//! Drives one [`EnhancementRequest`](crate::enhancement::EnhancementRequest)
//! through the lifecycle state machine against nested time budgets:
//! - **Hard deadline** for the whole attempt, checked between stages
//! - **Per-gatherer budget**, independent for every gatherer
//! - **Synthesis timeout** and **per-call update timeout**, hard cancellation points

mod config;
mod locks;
mod runner;
mod types;

pub use config::OrchestratorConfig;
pub use runner::Orchestrator;
pub use types::{OrchestratorError, DEADLINE_EXCEEDED};
