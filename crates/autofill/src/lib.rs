//! Fill orchestrator.
//!
//! One pass walks the merge-request form in a fixed field order (assignee,
//! reviewers, labels), skipping every field whose attempt key is already in
//! the completed-set, so a pass re-triggered by the page's own reaction to
//! our edits finds nothing left to do and touches nothing. A pass runs only
//! from `Idle`; requests arriving while one is `Running` are dropped rather
//! than queued. Field-level failures are logged and never abort the
//! remaining fields.

pub mod config;
pub mod controller;
pub mod engine;
pub mod guard;
pub mod readiness;

pub use config::{ConfigError, ConfigStore, JsonFileStore, MemoryStore};
pub use controller::{Command, Controller, ControllerError};
pub use engine::FillEngine;
pub use guard::PassGuard;
pub use readiness::ReadinessPolicy;
