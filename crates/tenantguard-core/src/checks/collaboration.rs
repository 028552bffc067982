//! Collaboration service controls.

use async_trait::async_trait;

use crate::connector::{BackendResult, ConnectorContext};
use crate::domain::{CheckResult, Control, Severity};
use crate::registry::{degrade, ControlEvaluator};

// ---------------------------------------------------------------------------
// collab.sharing.anonymous_links
// ---------------------------------------------------------------------------

pub struct AnonymousLinks {
    control: Control,
}

impl AnonymousLinks {
    const EXPECTED: &'static str = "Anonymous sharing links disabled";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "collab.sharing.anonymous_links",
                "Anonymous sharing links are disabled",
                Severity::High,
                "CIS Cloud Tenant Benchmark 7.2",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let policy = ctx.sharing_policy().await?;
        let disabled = !policy.anonymous_links_enabled;
        Ok(CheckResult::verdict(
            &self.control,
            disabled,
            Self::EXPECTED,
            if disabled { "Anonymous links disabled" } else { "Anonymous links allowed" },
            format!("anonymous_links_enabled={}", policy.anonymous_links_enabled),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for AnonymousLinks {
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
// collab.external.domain_allowlist
// ---------------------------------------------------------------------------

pub struct ExternalDomainAllowlist {
    control: Control,
}

impl ExternalDomainAllowlist {
    const EXPECTED: &'static str = "External access restricted to an allowlist";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "collab.external.domain_allowlist",
                "External collaboration is allowlist-restricted",
                Severity::Medium,
                "CIS Cloud Tenant Benchmark 7.4",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let policy = ctx.sharing_policy().await?;
        // "blocked" is stricter than an allowlist and also passes.
        let restricted = matches!(policy.external_access.as_str(), "allowlist" | "blocked");
        Ok(CheckResult::verdict(
            &self.control,
            restricted,
            Self::EXPECTED,
            format!("External access is '{}'", policy.external_access),
            format!(
                "external_access={} allowed_domains=[{}]",
                policy.external_access,
                policy.allowed_domains.join(", ")
            ),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for ExternalDomainAllowlist {
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
    use crate::connector::{resources, ConnectorSettings, ServiceKind};
    use crate::domain::Status;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    async fn collab_ctx(policy: serde_json::Value) -> ConnectorContext {
        let backend = StaticBackend::new().with(resources::SHARING_POLICY, policy);
        let mut clients: BTreeMap<ServiceKind, Arc<dyn crate::connector::BackendClient>> =
            BTreeMap::new();
        clients.insert(ServiceKind::Collaboration, Arc::new(backend));
        ConnectorContext::connect(&ConnectorSettings::default(), clients).await
    }

    #[tokio::test]
    async fn test_anonymous_links() {
        let ctx = collab_ctx(json!({
            "anonymous_links_enabled": true,
            "external_access": "open"
        }))
        .await;
        assert_eq!(AnonymousLinks::new().evaluate(&ctx).await.status, Status::Fail);
        assert_eq!(
            ExternalDomainAllowlist::new().evaluate(&ctx).await.status,
            Status::Fail
        );
    }

    #[tokio::test]
    async fn test_blocked_external_access_passes_allowlist_control() {
        let ctx = collab_ctx(json!({
            "anonymous_links_enabled": false,
            "external_access": "blocked"
        }))
        .await;
        assert_eq!(
            ExternalDomainAllowlist::new().evaluate(&ctx).await.status,
            Status::Pass
        );
    }
}
