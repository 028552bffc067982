//! The Run artifact: one complete ordered evaluation pass.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connector::{ConnectorStatus, ServiceKind};
use crate::domain::control::{CheckResult, ControlId, Status};

/// Ordered collection of results from one evaluation pass.
///
/// Invariants:
/// - control ids are unique and exactly equal the registry's id set at
///   evaluation time;
/// - result order matches registry order;
/// - once persisted, a Run is never mutated (later comparisons treat
///   historical Runs as ground truth).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,

    /// Per-service connection state at evaluation time.
    pub connections: BTreeMap<ServiceKind, ConnectorStatus>,

    /// Results in registry order.
    pub results: Vec<CheckResult>,
}

impl Run {
    /// Control ids in result order.
    pub fn control_ids(&self) -> Vec<&ControlId> {
        self.results.iter().map(|r| &r.control_id).collect()
    }

    /// Status of one control, if present.
    pub fn status_of(&self, id: &ControlId) -> Option<Status> {
        self.results
            .iter()
            .find(|r| &r.control_id == id)
            .map(|r| r.status)
    }

    pub fn pass_count(&self) -> usize {
        self.count(Status::Pass)
    }

    pub fn fail_count(&self) -> usize {
        self.count(Status::Fail)
    }

    pub fn manual_count(&self) -> usize {
        self.count(Status::Manual)
    }

    pub fn error_count(&self) -> usize {
        self.count(Status::Error)
    }

    fn count(&self, status: Status) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    /// True when no control id appears twice.
    pub fn has_unique_ids(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.results.iter().all(|r| seen.insert(&r.control_id))
    }

    /// Services that were connected for this run.
    pub fn connected_services(&self) -> Vec<ServiceKind> {
        self.connections
            .iter()
            .filter(|(_, s)| **s == ConnectorStatus::Connected)
            .map(|(k, _)| *k)
            .collect()
    }

    /// True when at least one service could not be reached (failed, not
    /// merely skipped).
    pub fn degraded(&self) -> bool {
        self.connections
            .values()
            .any(|s| *s == ConnectorStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::control::{Control, Severity};

    fn result_with(id: &str, status: Status) -> CheckResult {
        let control = Control::new(id, id, Severity::Medium, "ref");
        let mut r = CheckResult::verdict(&control, true, "x", "x", "e");
        r.status = status;
        r
    }

    fn run_with(results: Vec<CheckResult>) -> Run {
        Run {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            connections: BTreeMap::new(),
            results,
        }
    }

    #[test]
    fn test_counts() {
        let run = run_with(vec![
            result_with("a", Status::Pass),
            result_with("b", Status::Fail),
            result_with("c", Status::Manual),
            result_with("d", Status::Pass),
        ]);
        assert_eq!(run.pass_count(), 2);
        assert_eq!(run.fail_count(), 1);
        assert_eq!(run.manual_count(), 1);
        assert_eq!(run.error_count(), 0);
    }

    #[test]
    fn test_unique_ids() {
        let unique = run_with(vec![
            result_with("a", Status::Pass),
            result_with("b", Status::Pass),
        ]);
        assert!(unique.has_unique_ids());

        let duplicated = run_with(vec![
            result_with("a", Status::Pass),
            result_with("a", Status::Fail),
        ]);
        assert!(!duplicated.has_unique_ids());
    }

    #[test]
    fn test_degraded() {
        let mut run = run_with(vec![]);
        run.connections
            .insert(ServiceKind::Mail, ConnectorStatus::Connected);
        run.connections
            .insert(ServiceKind::Compliance, ConnectorStatus::Skipped);
        assert!(!run.degraded());

        run.connections
            .insert(ServiceKind::Directory, ConnectorStatus::Failed);
        assert!(run.degraded());
    }
}
