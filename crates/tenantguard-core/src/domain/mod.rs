//! TenantGuard domain model: controls, results, runs, and the error
//! taxonomy shared by every pipeline stage.

pub mod control;
pub mod error;
pub mod run;

pub use control::{CheckResult, Control, ControlId, Severity, Status};
pub use error::{Result, TenantGuardError};
pub use run::Run;
