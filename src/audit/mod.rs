//! Audit execution: the engine contract, single runs, and the per-URL loop.

pub mod engine;
pub mod executor;
pub mod orchestrator;

pub use engine::{AuditEngine, LighthouseEngine};
pub use executor::RunExecutor;
pub use orchestrator::{AuditOrchestrator, UrlSummary};
