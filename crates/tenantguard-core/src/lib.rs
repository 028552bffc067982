//! TenantGuard core library.
//!
//! Audit pipeline for cloud tenant configuration: connect to the tenant's
//! backend services, evaluate a fixed control catalog, persist the Run,
//! compare Runs over time, and remediate a curated subset of failures.

pub mod checks;
pub mod compare;
pub mod connector;
pub mod domain;
pub mod emitter;
pub mod orchestrator;
pub mod registry;
pub mod remediate;
pub mod telemetry;

pub use checks::{registry as control_registry, DEFAULT_SAMPLE_SIZE, MAX_PRIVILEGED_ADMINS};
pub use compare::{compare_runs, Classification, Diff, RunDiff};
pub use connector::{
    BackendClient, BackendError, BackendResult, ConnectorContext, ConnectorSettings,
    ConnectorStatus, ServiceKind,
};
pub use domain::{
    CheckResult, Control, ControlId, Result, Run, Severity, Status, TenantGuardError,
};
pub use emitter::{load_run, Emitter};
pub use orchestrator::{Orchestrator, RunSettings, DEFAULT_BACKEND_TIMEOUT};
pub use registry::ControlEvaluator;
pub use remediate::{
    action_catalog, remediate, write_log, Mode, Outcome, RemediationRecord, RemediationSummary,
};
pub use telemetry::init_tracing;

/// TenantGuard version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
