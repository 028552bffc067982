//! Remediation engine: fixes a curated subset of failed controls, either
//! as a dry run (`Preview`) or for real (`Apply`).
//!
//! Only controls with a known-safe, reversible configuration patch are
//! remediable. The plan is built from a persisted Run's `Fail` results;
//! `Manual` and `Error` results are never touched. Preview performs zero
//! mutating backend calls.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::connector::{resources, ConnectorContext, ServiceKind};
use crate::domain::{ControlId, Result, Run, Status};
use crate::emitter::artifact_name;

// ---------------------------------------------------------------------------
// Mode and outcome
// ---------------------------------------------------------------------------

/// Execution mode. There is no default: every invocation states whether it
/// mutates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Report what would change. No mutating backend calls.
    Preview,
    /// Apply the configuration patches.
    Apply,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Preview => write!(f, "preview"),
            Mode::Apply => write!(f, "apply"),
        }
    }
}

/// Per-action outcome. `WouldChange` is exclusive to Preview; the other
/// three are exclusive to Apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Skipped,
    WouldChange,
}

// ---------------------------------------------------------------------------
// Action catalog
// ---------------------------------------------------------------------------

/// One remediable control: the service, resource, and patch that fix it.
pub struct RemediationAction {
    pub control_id: ControlId,
    pub service: ServiceKind,
    pub resource: &'static str,
    pub patch: Value,
    pub description: &'static str,
}

/// The curated remediable subset, in catalog order.
pub fn action_catalog() -> Vec<RemediationAction> {
    vec![
        RemediationAction {
            control_id: ControlId::from("mail.audit.mailbox_auditing"),
            service: ServiceKind::Mail,
            resource: resources::MAILBOX_AUDIT,
            patch: json!({ "audit_disabled": false }),
            description: "enable mailbox auditing",
        },
        RemediationAction {
            control_id: ControlId::from("mail.transport.external_forwarding"),
            service: ServiceKind::Mail,
            resource: resources::TRANSPORT_POLICY,
            patch: json!({ "external_forwarding_enabled": false }),
            description: "disable external mail forwarding",
        },
        RemediationAction {
            control_id: ControlId::from("collab.sharing.anonymous_links"),
            service: ServiceKind::Collaboration,
            resource: resources::SHARING_POLICY,
            patch: json!({ "anonymous_links_enabled": false }),
            description: "disable anonymous sharing links",
        },
        RemediationAction {
            control_id: ControlId::from("compliance.audit.unified_log"),
            service: ServiceKind::Compliance,
            resource: resources::AUDIT_LOG,
            patch: json!({ "unified_audit_enabled": true }),
            description: "enable unified audit logging",
        },
    ]
}

// ---------------------------------------------------------------------------
// Records and summary
// ---------------------------------------------------------------------------

/// One action's result, as written to the remediation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationRecord {
    pub control_id: ControlId,
    pub service: ServiceKind,
    pub resource: String,
    pub mode: Mode,
    pub outcome: Outcome,
    pub detail: String,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of one remediation invocation, records in plan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationSummary {
    pub mode: Mode,
    pub source_run: uuid::Uuid,
    pub started_at: DateTime<Utc>,
    pub records: Vec<RemediationRecord>,
}

impl RemediationSummary {
    pub fn succeeded(&self) -> usize {
        self.count(Outcome::Success)
    }

    pub fn failed(&self) -> usize {
        self.count(Outcome::Failure)
    }

    pub fn skipped(&self) -> usize {
        self.count(Outcome::Skipped)
    }

    pub fn would_change(&self) -> usize {
        self.count(Outcome::WouldChange)
    }

    fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Build the plan and execute it against the tenant.
///
/// The plan is every catalog action whose control the Run marked `Fail`,
/// in catalog order. One action's failure never stops the rest of the
/// batch.
pub async fn remediate(ctx: &ConnectorContext, run: &Run, mode: Mode) -> RemediationSummary {
    let started_at = Utc::now();
    let planned: Vec<RemediationAction> = action_catalog()
        .into_iter()
        .filter(|action| run.status_of(&action.control_id) == Some(Status::Fail))
        .collect();

    info!(mode = %mode, planned = planned.len(), "remediation plan built");

    let mut records = Vec::with_capacity(planned.len());
    for action in planned {
        let (outcome, detail) = execute(ctx, &action, mode).await;
        if outcome == Outcome::Failure {
            warn!(control = %action.control_id, detail = %detail, "remediation failed");
        } else {
            info!(control = %action.control_id, outcome = ?outcome, "remediation step done");
        }
        records.push(RemediationRecord {
            control_id: action.control_id,
            service: action.service,
            resource: action.resource.to_string(),
            mode,
            outcome,
            detail,
            timestamp: Utc::now(),
        });
    }

    RemediationSummary {
        mode,
        source_run: run.run_id,
        started_at,
        records,
    }
}

async fn execute(
    ctx: &ConnectorContext,
    action: &RemediationAction,
    mode: Mode,
) -> (Outcome, String) {
    if !ctx.is_connected(action.service) {
        return (
            Outcome::Skipped,
            format!("{} service is not connected", action.service),
        );
    }

    // The only point where the two modes diverge.
    match mode {
        Mode::Preview => match ctx.fetch_raw(action.service, action.resource).await {
            Ok(current) => (
                Outcome::WouldChange,
                format!(
                    "would {}: current {} -> patch {}",
                    action.description, current, action.patch
                ),
            ),
            Err(e) => (
                Outcome::Skipped,
                format!("cannot read {}: {}", action.resource, e),
            ),
        },
        Mode::Apply => {
            match ctx
                .apply_patch(action.service, action.resource, action.patch.clone())
                .await
            {
                Ok(()) => (Outcome::Success, format!("did {}", action.description)),
                Err(e) => (Outcome::Failure, e.to_string()),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Log persistence
// ---------------------------------------------------------------------------

/// Write the summary as a fresh timestamped JSON log file. Invocations
/// never overwrite earlier logs.
pub fn write_log(dir: &Path, summary: &RemediationSummary) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let name = artifact_name("remediation", "json", true, summary.started_at);
    let path = dir.join(name);

    let content = serde_json::to_string_pretty(summary)?;
    let tmp = tempfile::NamedTempFile::new_in(dir)?;
    std::fs::write(tmp.path(), &content)?;
    tmp.persist(&path).map_err(|e| e.error)?;

    info!(path = %path.display(), "wrote remediation log");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::fakes::{drifted_tenant, RejectingBackend, StaticBackend};
    use crate::connector::{BackendClient, ConnectorSettings};
    use crate::orchestrator::{Orchestrator, RunSettings};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    async fn drifted_run() -> (ConnectorContext, Run) {
        let ctx =
            ConnectorContext::connect(&ConnectorSettings::default(), drifted_tenant()).await;
        let run = Orchestrator::new(RunSettings::default()).run(&ctx).await;
        (ctx, run)
    }

    #[tokio::test]
    async fn test_preview_reports_without_mutating() {
        let mail = Arc::new(
            StaticBackend::new()
                .with(resources::MAILBOX_AUDIT, json!({ "audit_disabled": true }))
                .with(
                    resources::TRANSPORT_POLICY,
                    json!({ "external_forwarding_enabled": true, "require_tls": false }),
                ),
        );
        let collaboration = Arc::new(StaticBackend::new().with(
            resources::SHARING_POLICY,
            json!({ "anonymous_links_enabled": true, "external_access": "open" }),
        ));
        let compliance = Arc::new(
            StaticBackend::new()
                .with(resources::AUDIT_LOG, json!({ "unified_audit_enabled": false })),
        );

        let mut clients: BTreeMap<ServiceKind, Arc<dyn BackendClient>> = BTreeMap::new();
        clients.insert(ServiceKind::Mail, mail.clone());
        clients.insert(ServiceKind::Directory, Arc::new(StaticBackend::new()));
        clients.insert(ServiceKind::Collaboration, collaboration.clone());
        clients.insert(ServiceKind::Compliance, compliance.clone());
        let ctx = ConnectorContext::connect(&ConnectorSettings::default(), clients).await;

        let (_, run) = drifted_run().await;
        let summary = remediate(&ctx, &run, Mode::Preview).await;

        assert_eq!(summary.would_change(), 4);
        assert_eq!(summary.succeeded(), 0);
        assert_eq!(summary.failed(), 0);
        assert_eq!(summary.skipped(), 0);
        assert_eq!(
            mail.mutation_count() + collaboration.mutation_count() + compliance.mutation_count(),
            0
        );
    }

    #[tokio::test]
    async fn test_preview_read_failure_is_skipped() {
        let (_, run) = drifted_run().await;

        // Mail is connected but no longer serves the audit-config
        // resource, so the preview cannot compute current-vs-target.
        let mut clients = drifted_tenant();
        clients.insert(
            ServiceKind::Mail,
            Arc::new(StaticBackend::new().with(
                resources::TRANSPORT_POLICY,
                json!({ "external_forwarding_enabled": true, "require_tls": false }),
            )),
        );
        let ctx = ConnectorContext::connect(&ConnectorSettings::default(), clients).await;

        let summary = remediate(&ctx, &run, Mode::Preview).await;
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.would_change(), 3);

        let skipped: Vec<_> = summary
            .records
            .iter()
            .filter(|r| r.outcome == Outcome::Skipped)
            .collect();
        assert_eq!(skipped[0].control_id.as_str(), "mail.audit.mailbox_auditing");
        assert!(skipped[0].detail.contains("cannot read"));
    }

    #[tokio::test]
    async fn test_apply_fixes_the_drifted_tenant() {
        let (ctx, run) = drifted_run().await;
        let summary = remediate(&ctx, &run, Mode::Apply).await;

        assert_eq!(summary.succeeded(), 4);
        assert_eq!(summary.failed(), 0);
        assert_eq!(summary.would_change(), 0);

        // The four curated controls now pass on a re-audit.
        let rerun = Orchestrator::new(RunSettings::default()).run(&ctx).await;
        for action in action_catalog() {
            assert_eq!(rerun.status_of(&action.control_id), Some(Status::Pass));
        }
    }

    #[tokio::test]
    async fn test_rejected_write_is_failure_and_batch_continues() {
        let (_, run) = drifted_run().await;

        // Mail rejects writes; the other services accept them.
        let mut clients = drifted_tenant();
        clients.insert(
            ServiceKind::Mail,
            Arc::new(
                RejectingBackend::new()
                    .with(resources::MAILBOX_AUDIT, json!({ "audit_disabled": true }))
                    .with(
                        resources::TRANSPORT_POLICY,
                        json!({ "external_forwarding_enabled": true, "require_tls": false }),
                    ),
            ),
        );
        let ctx = ConnectorContext::connect(&ConnectorSettings::default(), clients).await;

        let summary = remediate(&ctx, &run, Mode::Apply).await;
        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.records.len(), 4);
    }

    #[tokio::test]
    async fn test_unconnected_service_is_skipped() {
        let (_, run) = drifted_run().await;

        let mut clients = drifted_tenant();
        clients.remove(&ServiceKind::Collaboration);
        let settings = ConnectorSettings {
            skip_collaboration: true,
            ..Default::default()
        };
        let ctx = ConnectorContext::connect(&settings, clients).await;

        let summary = remediate(&ctx, &run, Mode::Apply).await;
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.succeeded(), 3);
    }

    #[tokio::test]
    async fn test_non_fail_statuses_are_never_planned() {
        let ctx = ConnectorContext::connect(
            &ConnectorSettings::default(),
            crate::connector::fakes::compliant_tenant(),
        )
        .await;
        let run = Orchestrator::new(RunSettings::default()).run(&ctx).await;

        let summary = remediate(&ctx, &run, Mode::Apply).await;
        assert!(summary.records.is_empty());
    }

    #[tokio::test]
    async fn test_log_files_never_overwrite() {
        let (ctx, run) = drifted_run().await;
        let summary = remediate(&ctx, &run, Mode::Preview).await;

        let dir = tempfile::tempdir().unwrap();
        let path = write_log(dir.path(), &summary).unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("remediation_"));

        let reloaded: RemediationSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.records.len(), summary.records.len());
    }
}
