//! Report emitter: persists one Run as a structured JSON artifact and a
//! flattened CSV table.
//!
//! Both formats are derived from the same Run instance — the CSV rows are
//! a straight projection of the result fields the JSON carries, so the two
//! can never diverge. Writes go through a temp file plus atomic rename so
//! a failed emission can never corrupt a previously persisted Run, and an
//! optional timestamp suffix keeps successive Runs from overwriting each
//! other (the comparison engine needs the history).

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{CheckResult, Result, Run, TenantGuardError};

/// Column order shared by the CSV table and any tabular consumer.
pub const COLUMNS: [&str; 9] = [
    "control_id",
    "title",
    "severity",
    "expected",
    "actual",
    "status",
    "evidence",
    "reference",
    "timestamp",
];

/// One result projected into the shared column order.
fn row(result: &CheckResult) -> [String; 9] {
    [
        result.control_id.to_string(),
        result.title.clone(),
        result.severity.to_string(),
        result.expected.clone(),
        result.actual.clone(),
        result.status.to_string(),
        result.evidence.clone(),
        result.reference.clone(),
        result.timestamp.to_rfc3339(),
    ]
}

// ---------------------------------------------------------------------------
// CSV encoding/decoding
// ---------------------------------------------------------------------------

/// Quote a field if it embeds a comma, quote, or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Render the flattened tabular form: header plus one row per result.
pub fn to_csv(run: &Run) -> String {
    let mut out = COLUMNS.join(",");
    out.push('\n');
    for result in &run.results {
        let cells: Vec<String> = row(result).iter().map(|f| csv_escape(f)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

/// Parse CSV text (as produced by [`to_csv`]) back into rows of cells,
/// header included. Quote-aware: embedded commas, quotes, and newlines
/// survive the round trip.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    cell.push('"');
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => cells.push(std::mem::take(&mut cell)),
                '\r' => {}
                '\n' => {
                    cells.push(std::mem::take(&mut cell));
                    rows.push(std::mem::take(&mut cells));
                }
                _ => cell.push(c),
            }
        }
    }
    if !cell.is_empty() || !cells.is_empty() {
        cells.push(cell);
        rows.push(cells);
    }
    rows
}

// ---------------------------------------------------------------------------
// Artifact naming and atomic persistence
// ---------------------------------------------------------------------------

/// Build an artifact file name, optionally suffixed with a UTC timestamp
/// (`audit_20260827T101500Z.json`).
pub fn artifact_name(
    prefix: &str,
    ext: &str,
    timestamped: bool,
    now: DateTime<Utc>,
) -> String {
    if timestamped {
        format!("{}_{}.{}", prefix, now.format("%Y%m%dT%H%M%SZ"), ext)
    } else {
        format!("{}.{}", prefix, ext)
    }
}

/// Persists Runs into one output directory.
pub struct Emitter {
    dir: PathBuf,
    timestamped: bool,
}

impl Emitter {
    pub fn new(dir: impl Into<PathBuf>, timestamped: bool) -> Self {
        Self {
            dir: dir.into(),
            timestamped,
        }
    }

    /// Write the structured JSON record array. Returns the artifact path.
    pub fn write_json(&self, run: &Run) -> Result<PathBuf> {
        let content = serde_json::to_string_pretty(run)?;
        let name = artifact_name("audit", "json", self.timestamped, run.started_at);
        self.write_atomic(&name, &content)
    }

    /// Write the flattened CSV table. Returns the artifact path.
    pub fn write_csv(&self, run: &Run) -> Result<PathBuf> {
        let content = to_csv(run);
        let name = artifact_name("audit", "csv", self.timestamped, run.started_at);
        self.write_atomic(&name, &content)
    }

    /// Temp-file-plus-rename so partially written output never replaces a
    /// historical artifact.
    fn write_atomic(&self, name: &str, content: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        std::fs::write(tmp.path(), content)?;
        tmp.persist(&path).map_err(|e| e.error)?;

        info!(path = %path.display(), "wrote run artifact");
        Ok(path)
    }
}

/// Re-parse a persisted JSON Run.
///
/// Parse failure is fatal to the caller (comparison cannot proceed against
/// ambiguous ground truth) and names the file and cause.
pub fn load_run(path: &Path) -> Result<Run> {
    let text = std::fs::read_to_string(path).map_err(|e| TenantGuardError::Configuration {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    serde_json::from_str(&text).map_err(|e| TenantGuardError::Configuration {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Control, Severity};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn sample_run() -> Run {
        let control = Control::new("a.b.c", "Title", Severity::High, "ref 1");
        let tricky = Control::new("d.e.f", "Other", Severity::Low, "ref 2");
        Run {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            connections: BTreeMap::new(),
            results: vec![
                CheckResult::verdict(&control, true, "on", "on", "plain evidence"),
                CheckResult::verdict(
                    &tricky,
                    false,
                    "off",
                    "on",
                    "line one, with comma\nline \"two\"",
                ),
            ],
        }
    }

    #[test]
    fn test_json_roundtrip_preserves_status_mapping() {
        let run = sample_run();
        let dir = tempfile::tempdir().unwrap();
        let path = Emitter::new(dir.path(), false).write_json(&run).unwrap();

        let reloaded = load_run(&path).unwrap();
        assert_eq!(reloaded.results.len(), run.results.len());
        for (a, b) in run.results.iter().zip(reloaded.results.iter()) {
            assert_eq!(a.control_id, b.control_id);
            assert_eq!(a.status, b.status);
        }
    }

    #[test]
    fn test_csv_embedded_comma_and_newline_roundtrip() {
        let run = sample_run();
        let csv = to_csv(&run);
        let rows = parse_csv(&csv);

        // header + 2 rows despite the embedded newline
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], COLUMNS.to_vec());
        assert_eq!(rows[2][6], "line one, with comma\nline \"two\"");
    }

    #[test]
    fn test_csv_columns_match_json_fields() {
        let run = sample_run();
        let csv = to_csv(&run);
        let rows = parse_csv(&csv);
        assert_eq!(rows[1][0], "a.b.c");
        assert_eq!(rows[1][5], "Pass");
        assert_eq!(rows[2][5], "Fail");
    }

    #[test]
    fn test_timestamped_names_never_collide_across_runs() {
        let t1 = DateTime::parse_from_rfc3339("2026-08-27T10:15:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let t2 = DateTime::parse_from_rfc3339("2026-08-27T10:16:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_ne!(
            artifact_name("audit", "json", true, t1),
            artifact_name("audit", "json", true, t2)
        );
        assert_eq!(artifact_name("audit", "json", false, t1), "audit.json");
    }

    #[test]
    fn test_load_run_failure_names_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = load_run(&path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
