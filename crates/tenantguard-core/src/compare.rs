//! Run-to-run comparison: classifies per-control drift between two
//! persisted Runs and summarizes the posture delta.
//!
//! Classification is keyed on control id, not result position, so the two
//! Runs may come from different catalog versions. `Added` and `Removed`
//! cover controls present in only one Run.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ControlId, Run, Severity, Status};

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// How one control moved between two Runs.
///
/// Only a transition into or out of `Pass` counts as movement: `Fail` to
/// `Manual`, `Manual` to `Error`, and the like are all `Unchanged` in
/// posture terms even when the raw status differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Improved,
    Regressed,
    Unchanged,
    Added,
    Removed,
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Classification::Improved => "Improved",
            Classification::Regressed => "Regressed",
            Classification::Unchanged => "Unchanged",
            Classification::Added => "Added",
            Classification::Removed => "Removed",
        };
        write!(f, "{}", s)
    }
}

fn classify(before: Status, after: Status) -> Classification {
    if after == Status::Pass && before != Status::Pass {
        Classification::Improved
    } else if before == Status::Pass && after != Status::Pass {
        Classification::Regressed
    } else {
        Classification::Unchanged
    }
}

/// One control's movement between the two Runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diff {
    pub control_id: ControlId,
    pub title: String,
    pub severity: Severity,
    pub before: Option<Status>,
    pub after: Option<Status>,
    pub classification: Classification,
}

// ---------------------------------------------------------------------------
// RunDiff
// ---------------------------------------------------------------------------

/// Full comparison of two Runs: per-control diffs plus aggregate counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDiff {
    pub before_run: Uuid,
    pub after_run: Uuid,
    pub pass_before: usize,
    pub fail_before: usize,
    pub pass_after: usize,
    pub fail_after: usize,

    /// Net pass-rate movement in percentage points of the after-Run's
    /// catalog, rounded to one decimal. Zero when the after-Run is empty.
    pub improvement_pct: f64,

    /// Ordered severity-descending; ties keep the after-Run's order, with
    /// removed controls after them.
    pub diffs: Vec<Diff>,
}

impl RunDiff {
    pub fn improved_count(&self) -> usize {
        self.count(Classification::Improved)
    }

    pub fn regressed_count(&self) -> usize {
        self.count(Classification::Regressed)
    }

    fn count(&self, classification: Classification) -> usize {
        self.diffs
            .iter()
            .filter(|d| d.classification == classification)
            .count()
    }

    /// Render a human-readable comparison summary.
    pub fn render_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("# Posture comparison\n\n");
        out.push_str(&format!(
            "- Pass: {} -> {}\n- Fail: {} -> {}\n- Net movement: {:+.1}%\n\n",
            self.pass_before, self.pass_after, self.fail_before, self.fail_after,
            self.improvement_pct
        ));
        out.push_str("| Control | Severity | Before | After | Movement |\n");
        out.push_str("|---------|----------|--------|-------|----------|\n");
        for diff in &self.diffs {
            let fmt_status = |s: &Option<Status>| match s {
                Some(s) => s.to_string(),
                None => "-".to_string(),
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                diff.control_id,
                diff.severity,
                fmt_status(&diff.before),
                fmt_status(&diff.after),
                diff.classification
            ));
        }
        out
    }
}

fn round_one_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Compare two Runs control-by-control.
pub fn compare_runs(before: &Run, after: &Run) -> RunDiff {
    let mut diffs = Vec::with_capacity(after.results.len());

    for result in &after.results {
        let old = before.status_of(&result.control_id);
        let classification = match old {
            Some(old) => classify(old, result.status),
            None => Classification::Added,
        };
        diffs.push(Diff {
            control_id: result.control_id.clone(),
            title: result.title.clone(),
            severity: result.severity,
            before: old,
            after: Some(result.status),
            classification,
        });
    }

    for result in &before.results {
        if after.status_of(&result.control_id).is_none() {
            diffs.push(Diff {
                control_id: result.control_id.clone(),
                title: result.title.clone(),
                severity: result.severity,
                before: Some(result.status),
                after: None,
                classification: Classification::Removed,
            });
        }
    }

    // Highest-severity movement first; the sort is stable so equal
    // severities keep their insertion order.
    diffs.sort_by(|a, b| b.severity.cmp(&a.severity));

    let pass_before = before.pass_count();
    let pass_after = after.pass_count();
    let total_after = after.results.len();
    let improvement_pct = if total_after == 0 {
        0.0
    } else {
        round_one_decimal(
            (pass_after as f64 - pass_before as f64) / total_after as f64 * 100.0,
        )
    };

    RunDiff {
        before_run: before.run_id,
        after_run: after.run_id,
        pass_before,
        fail_before: before.fail_count(),
        pass_after,
        fail_after: after.fail_count(),
        improvement_pct,
        diffs,
    }
}
