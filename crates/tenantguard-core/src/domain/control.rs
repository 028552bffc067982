//! Control catalog types and per-control evaluation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable dotted control identifier (e.g. `"mail.audit.mailbox_auditing"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControlId(String);

impl ControlId {
    pub fn new(id: impl Into<String>) -> Self {
        ControlId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ControlId {
    fn from(s: &str) -> Self {
        ControlId(s.to_string())
    }
}

/// Control severity. Ordering places `Critical` greatest so that
/// severity-descending sorts surface the most impactful controls first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one control evaluation.
///
/// `Manual` is a neutral, non-scored state: the pipeline could not
/// determine Pass/Fail automatically (connector absent, field missing,
/// permission denied). It is a value, never an exception.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pass,
    Fail,
    Manual,
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Pass => "Pass",
            Status::Fail => "Fail",
            Status::Manual => "Manual",
            Status::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// A single compliance control: static, defined at registry build time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Stable dotted identifier.
    pub id: ControlId,

    /// Human-readable title.
    pub title: String,

    /// Severity carried into every result for this control.
    pub severity: Severity,

    /// Reference citation (benchmark section, vendor doc).
    pub reference: String,
}

impl Control {
    pub fn new(
        id: impl Into<ControlId>,
        title: impl Into<String>,
        severity: Severity,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            severity,
            reference: reference.into(),
        }
    }
}

impl From<String> for ControlId {
    fn from(s: String) -> Self {
        ControlId(s)
    }
}

/// Result of evaluating one control. Created once, immutable afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub control_id: ControlId,
    pub title: String,
    pub severity: Severity,

    /// Human-readable target state.
    pub expected: String,

    /// Human-readable observed state (`"Unknown"` when undeterminable).
    pub actual: String,

    pub status: Status,

    /// Raw diagnostic text backing the verdict.
    pub evidence: String,

    pub reference: String,
    pub timestamp: DateTime<Utc>,
}

impl CheckResult {
    /// Build a pass/fail result from a predicate verdict.
    pub fn verdict(
        control: &Control,
        passed: bool,
        expected: impl Into<String>,
        actual: impl Into<String>,
        evidence: impl Into<String>,
    ) -> Self {
        Self {
            control_id: control.id.clone(),
            title: control.title.clone(),
            severity: control.severity,
            expected: expected.into(),
            actual: actual.into(),
            status: if passed { Status::Pass } else { Status::Fail },
            evidence: evidence.into(),
            reference: control.reference.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Build a `Manual` result for a control whose predicate could not be
    /// evaluated. `actual` is always `"Unknown"`; the failure text lands in
    /// the evidence field.
    pub fn manual(control: &Control, expected: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            control_id: control.id.clone(),
            title: control.title.clone(),
            severity: control.severity,
            expected: expected.into(),
            actual: "Unknown".to_string(),
            status: Status::Manual,
            evidence: evidence.into(),
            reference: control.reference.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Build an `Error` result for an evaluator-internal fault.
    pub fn error(control: &Control, expected: impl Into<String>, evidence: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            ..Self::manual(control, expected, evidence)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_control() -> Control {
        Control::new(
            "mail.audit.mailbox_auditing",
            "Mailbox auditing is enabled",
            Severity::High,
            "CIS 365 6.1",
        )
    }

    #[test]
    fn test_severity_ordering_critical_greatest() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
    }

    #[test]
    fn test_verdict_pass_and_fail() {
        let control = sample_control();
        let pass = CheckResult::verdict(&control, true, "enabled", "enabled", "AuditDisabled=false");
        assert_eq!(pass.status, Status::Pass);

        let fail = CheckResult::verdict(&control, false, "enabled", "disabled", "AuditDisabled=true");
        assert_eq!(fail.status, Status::Fail);
        assert_eq!(fail.control_id.as_str(), "mail.audit.mailbox_auditing");
    }

    #[test]
    fn test_manual_result_actual_is_unknown() {
        let control = sample_control();
        let manual = CheckResult::manual(&control, "enabled", "connector for mail unavailable");
        assert_eq!(manual.status, Status::Manual);
        assert_eq!(manual.actual, "Unknown");
        assert!(manual.evidence.contains("unavailable"));
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&Status::Pass).unwrap();
        assert_eq!(json, "\"pass\"");
        let back: Status = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(back, Status::Manual);
    }
}
