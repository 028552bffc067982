//! Directory service controls.

use async_trait::async_trait;

use crate::connector::{BackendResult, ConnectorContext};
use crate::domain::{CheckResult, Control, Severity};
use crate::registry::{degrade, ControlEvaluator};

/// Maximum number of privileged admin role assignments before the tenant
/// is considered over-provisioned.
pub const MAX_PRIVILEGED_ADMINS: usize = 4;

// ---------------------------------------------------------------------------
// directory.admin.privileged_count
// ---------------------------------------------------------------------------

pub struct PrivilegedAdminCount {
    control: Control,
}

impl PrivilegedAdminCount {
    const EXPECTED: &'static str = "At most 4 privileged admin role assignments";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "directory.admin.privileged_count",
                "Privileged admin count is within the threshold",
                Severity::Critical,
                "CIS Cloud Tenant Benchmark 1.1",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let assignments = ctx.role_assignments().await?;
        let privileged: Vec<&str> = assignments
            .iter()
            .filter(|a| a.privileged)
            .map(|a| a.principal.as_str())
            .collect();

        let passed = privileged.len() <= MAX_PRIVILEGED_ADMINS;
        Ok(CheckResult::verdict(
            &self.control,
            passed,
            Self::EXPECTED,
            format!("{} privileged assignment(s)", privileged.len()),
            format!(
                "threshold={} privileged=[{}]",
                MAX_PRIVILEGED_ADMINS,
                privileged.join(", ")
            ),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for PrivilegedAdminCount {
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
// directory.auth.legacy_auth_blocked
// ---------------------------------------------------------------------------

pub struct LegacyAuthBlocked {
    control: Control,
}

impl LegacyAuthBlocked {
    const EXPECTED: &'static str = "Legacy authentication protocols disabled";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "directory.auth.legacy_auth_blocked",
                "Legacy authentication is blocked",
                Severity::Critical,
                "CIS Cloud Tenant Benchmark 1.4",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let settings = ctx.directory_settings().await?;
        let blocked = !settings.legacy_auth_enabled;
        Ok(CheckResult::verdict(
            &self.control,
            blocked,
            Self::EXPECTED,
            if blocked { "Legacy auth blocked" } else { "Legacy auth enabled" },
            format!("legacy_auth_enabled={}", settings.legacy_auth_enabled),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for LegacyAuthBlocked {
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
// directory.guest.invite_restricted
// ---------------------------------------------------------------------------

pub struct GuestInviteRestricted {
    control: Control,
}

impl GuestInviteRestricted {
    const EXPECTED: &'static str = "Guest invitations restricted to admins";

    pub fn new() -> Self {
        Self {
            control: Control::new(
                "directory.guest.invite_restricted",
                "Guest invitations are restricted",
                Severity::Medium,
                "CIS Cloud Tenant Benchmark 1.8",
            ),
        }
    }

    async fn check(&self, ctx: &ConnectorContext) -> BackendResult<CheckResult> {
        let settings = ctx.directory_settings().await?;
        let restricted = settings.guest_invite_policy == "admins_only";
        Ok(CheckResult::verdict(
            &self.control,
            restricted,
            Self::EXPECTED,
            format!("Policy is '{}'", settings.guest_invite_policy),
            format!("guest_invite_policy={}", settings.guest_invite_policy),
        ))
    }
}

#[async_trait]
impl ControlEvaluator for GuestInviteRestricted {
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
