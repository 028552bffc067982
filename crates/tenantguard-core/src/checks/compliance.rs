//! Compliance service controls.

use async_trait::async_trait;

use crate::connector::{BackendResult, ConnectorContext};
use crate::domain::{CheckResult, Control, Severity};
use crate::registry::{degrade, ControlEvaluator};

// ---------------------------------------------------------------------------
// compliance.audit.unified_log
// ---------------------------------------------------------------------------

pub struct UnifiedAuditLog {
    control: Control,
}

impl UnifiedAuditLog {
    const EXPECTED: &'static str = "Unified audit log ingestion enabled";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "compliance.audit.unified_log",
                "Unified audit logging is enabled",
                Severity::Critical,
                "CIS Cloud Tenant Benchmark 5.1",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let config = ctx.audit_log_config().await?;
        Ok(CheckResult::verdict(
            &self.control,
            config.unified_audit_enabled,
            Self::EXPECTED,
            if config.unified_audit_enabled { "Ingestion enabled" } else { "Ingestion disabled" },
            format!("unified_audit_enabled={}", config.unified_audit_enabled),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for UnifiedAuditLog {
    fn control(&self) -> &Control {
        &self.control
    }

    async fn evaluate(&self, ctx: &ConnectorContext) -> CheckResult {
        match self.check(ctx).await {
            Ok(result) => result,
            Err(e) => degrade(&self.control, Self::EXPECTED, e),
        }
    }
}

// ---------------------------------------------------------------------------
// compliance.dlp.policy_enabled
// ---------------------------------------------------------------------------

pub struct DlpPolicyEnabled {
    control: Control,
}

impl DlpPolicyEnabled {
    const EXPECTED: &'static str = "At least one enabled DLP policy";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "compliance.dlp.policy_enabled",
                "A data-loss-prevention policy is active",
                Severity::Medium,
                "CIS Cloud Tenant Benchmark 3.2",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let policies = ctx.dlp_policies().await?;
        let enabled: Vec<&str> = policies
            .iter()
            .filter(|p| p.enabled)
            .map(|p| p.name.as_str())
            .collect();

        let passed = !enabled.is_empty();
        Ok(CheckResult::verdict(
            &self.control,
            passed,
            Self::EXPECTED,
            format!("{} enabled DLP policy(ies)", enabled.len()),
            format!("total={} enabled=[{}]", policies.len(), enabled.join(", ")),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for DlpPolicyEnabled {
    fn control(&self) -> &Control {
        &self.control
    }

    async fn evaluate(&self, ctx: &ConnectorContext) -> CheckResult {
        match self.check(ctx).await {
            Ok(result) => result,
            Err(e) => degrade(&self.control, Self::EXPECTED, e),
        }
    }
}

// ---------------------------------------------------------------------------
// compliance.retention.policy_present
// ---------------------------------------------------------------------------

pub struct RetentionPolicyPresent {
    control: Control,
}

impl RetentionPolicyPresent {
    const EXPECTED: &'static str = "At least one retention policy defined";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "compliance.retention.policy_present",
                "A retention policy exists",
                Severity::Low,
                "CIS Cloud Tenant Benchmark 3.4",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let policies = ctx.retention_policies().await?;
        let passed = !policies.is_empty();
        Ok(CheckResult::verdict(
            &self.control,
            passed,
            Self::EXPECTED,
            format!("{} retention policy(ies)", policies.len()),
            policies
                .iter()
                .map(|p| format!("{}={}d", p.name, p.duration_days))
                .collect::<Vec<_>>()
                .join(", "),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for RetentionPolicyPresent {
    fn control(&self) -> &Control {
        &self.control
    }

    async fn evaluate(&self, ctx: &ConnectorContext) -> CheckResult {
        match self.check(ctx).await {
            Ok(result) => result,
            Err(e) => degrade(&self.control, Self::EXPECTED, e),
        }
    }
}
