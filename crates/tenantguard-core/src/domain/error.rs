//! Domain-level error taxonomy for TenantGuard.

use std::path::PathBuf;

/// TenantGuard domain errors.
///
/// Per-control and per-action failures never surface through this type —
/// they are folded into `Status::Manual`/`Outcome::Failure` at the
/// evaluator or action boundary. Only systemic failures (cannot write an
/// artifact, cannot parse a required input) propagate.
#[derive(Debug, thiserror::Error)]
pub enum TenantGuardError {
    #[error("cannot parse run artifact {path:?}: {reason}")]
    Configuration { path: PathBuf, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for TenantGuard domain operations.
pub type Result<T> = std::result::Result<T, TenantGuardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_names_file() {
        let err = TenantGuardError::Configuration {
            path: PathBuf::from("runs/audit_old.json"),
            reason: "unexpected end of input".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("audit_old.json"));
        assert!(msg.contains("unexpected end of input"));
    }
}
