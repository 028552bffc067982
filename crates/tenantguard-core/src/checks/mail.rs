//! Mail service controls.

use async_trait::async_trait;

use crate::connector::{BackendResult, ConnectorContext};
use crate::domain::{CheckResult, Control, Severity};
use crate::registry::{degrade, ControlEvaluator};

/// Default number of mailboxes inspected by the sample-based delegate
/// control. Recorded in evidence so results are reproducible.
pub const DEFAULT_SAMPLE_SIZE: usize = 10;

// ---------------------------------------------------------------------------
// mail.audit.mailbox_auditing
// ---------------------------------------------------------------------------

pub struct MailboxAuditing {
    control: Control,
}

impl MailboxAuditing {
    const EXPECTED: &'static str = "Mailbox auditing enabled organization-wide";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "mail.audit.mailbox_auditing",
                "Mailbox auditing is enabled for the organization",
                Severity::High,
                "CIS Cloud Tenant Benchmark 6.1",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let config = ctx.mailbox_audit().await?;
        let enabled = !config.audit_disabled;
        Ok(CheckResult::verdict(
            &self.control,
            enabled,
            Self::EXPECTED,
            if enabled { "Auditing enabled" } else { "Auditing disabled" },
            format!(
                "audit_disabled={} retention_days={}",
                config.audit_disabled, config.retention_days
            ),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for MailboxAuditing {
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
// mail.transport.external_forwarding
// ---------------------------------------------------------------------------

pub struct ExternalForwarding {
    control: Control,
}

impl ExternalForwarding {
    const EXPECTED: &'static str = "Automatic forwarding to external domains disabled";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "mail.transport.external_forwarding",
                "External auto-forwarding is disabled",
                Severity::High,
                "CIS Cloud Tenant Benchmark 6.2",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let policy = ctx.transport_policy().await?;
        let disabled = !policy.external_forwarding_enabled;
        Ok(CheckResult::verdict(
            &self.control,
            disabled,
            Self::EXPECTED,
            if disabled { "Forwarding disabled" } else { "Forwarding allowed" },
            format!(
                "external_forwarding_enabled={}",
                policy.external_forwarding_enabled
            ),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for ExternalForwarding {
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
// mail.transport.tls_enforced
// ---------------------------------------------------------------------------

pub struct TlsEnforced {
    control: Control,
}

impl TlsEnforced {
    const EXPECTED: &'static str = "TLS required on outbound connectors";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "mail.transport.tls_enforced",
                "Outbound mail requires TLS",
                Severity::Medium,
                "CIS Cloud Tenant Benchmark 6.5",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let policy = ctx.transport_policy().await?;
        Ok(CheckResult::verdict(
            &self.control,
            policy.require_tls,
            Self::EXPECTED,
            if policy.require_tls { "TLS required" } else { "TLS optional" },
            format!("require_tls={}", policy.require_tls),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for TlsEnforced {
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
// mail.mailbox.delegate_sample
// ---------------------------------------------------------------------------

/// Sample-based control: inspects only the first K mailboxes of the
/// listing. K is recorded in evidence so the result is reproducible given
/// the same K and ordering.
pub struct DelegateSample {
    control: Control,
    sample_size: usize,
}

impl DelegateSample {
    const EXPECTED: &'static str = "No wildcard full-access delegates in sampled mailboxes";

    pub fn new(sample_size: usize) -> Self {
        Self {
            control: Control::new(
                "mail.mailbox.delegate_sample",
                "Sampled mailboxes are free of wildcard delegates",
                Severity::Medium,
                "CIS Cloud Tenant Benchmark 6.7",
            ),
            sample_size,
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        if self.sample_size == 0 {
            // Internal misconfiguration, not a backend problem.
            return Ok(CheckResult::error(
                &self.control,
                Self::EXPECTED,
                "sample size is zero; nothing can be inspected",
            ));
        }

        let mailboxes = ctx.mailboxes().await?;
        let sampled: Vec<_> = mailboxes.iter().take(self.sample_size).collect();
        let offenders: Vec<&str> = sampled
            .iter()
            .filter(|m| m.full_access_delegates.iter().any(|d| d == "*"))
            .map(|m| m.address.as_str())
            .collect();

        let passed = offenders.is_empty();
        Ok(CheckResult::verdict(
            &self.control,
            passed,
            Self::EXPECTED,
            if passed {
                "No wildcard delegates in sample".to_string()
            } else {
                format!("{} mailbox(es) with wildcard delegates", offenders.len())
            },
            format!(
                "sample_size={} inspected={} offenders=[{}]",
                self.sample_size,
                sampled.len(),
                offenders.join(", ")
            ),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for DelegateSample {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::fakes::StaticBackend;
    use crate::connector::{resources, ConnectorContext, ConnectorSettings, ServiceKind};
    use crate::domain::Status;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    async fn mail_ctx(backend: StaticBackend) -> ConnectorContext {
        let mut clients: BTreeMap<ServiceKind, Arc<dyn crate::connector::BackendClient>> =
            BTreeMap::new();
        clients.insert(ServiceKind::Mail, Arc::new(backend));
        ConnectorContext::connect(&ConnectorSettings::default(), clients).await
    }

    #[tokio::test]
    async fn test_mailbox_auditing_pass_and_fail() {
        let ctx = mail_ctx(StaticBackend::new().with(
            resources::MAILBOX_AUDIT,
            json!({ "audit_disabled": false, "retention_days": 365 }),
        ))
        .await;
        assert_eq!(MailboxAuditing::new().evaluate(&ctx).await.status, Status::Pass);

        let ctx = mail_ctx(StaticBackend::new().with(
            resources::MAILBOX_AUDIT,
            json!({ "audit_disabled": true }),
        ))
        .await;
        let result = MailboxAuditing::new().evaluate(&ctx).await;
        assert_eq!(result.status, Status::Fail);
        assert!(result.evidence.contains("audit_disabled=true"));
    }

    #[tokio::test]
    async fn test_missing_field_degrades_to_manual() {
        // Bag without the load-bearing field: decode fails, never raises.
        let ctx = mail_ctx(
            StaticBackend::new().with(resources::MAILBOX_AUDIT, json!({ "retention_days": 30 })),
        )
        .await;
        let result = MailboxAuditing::new().evaluate(&ctx).await;
        assert_eq!(result.status, Status::Manual);
        assert_eq!(result.actual, "Unknown");
        assert!(result.evidence.contains("malformed"));
    }

    #[tokio::test]
    async fn test_delegate_sample_records_sample_size() {
        let ctx = mail_ctx(StaticBackend::new().with(
            resources::MAILBOXES,
            json!([
                { "address": "a@x.example", "full_access_delegates": ["*"] },
                { "address": "b@x.example", "full_access_delegates": [] }
            ]),
        ))
        .await;

        let result = DelegateSample::new(5).evaluate(&ctx).await;
        assert_eq!(result.status, Status::Fail);
        assert!(result.evidence.contains("sample_size=5"));
        assert!(result.evidence.contains("a@x.example"));
    }

    #[tokio::test]
    async fn test_delegate_sample_zero_size_is_error() {
        let ctx = mail_ctx(StaticBackend::new().with(resources::MAILBOXES, json!([]))).await;
        let result = DelegateSample::new(0).evaluate(&ctx).await;
        assert_eq!(result.status, Status::Error);
    }
}
