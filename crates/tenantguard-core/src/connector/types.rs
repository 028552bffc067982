//! Typed configuration objects decoded at the connector boundary.
//!
//! Backend services answer with arbitrary field bags; each bag is decoded
//! into exactly one of these narrow types before an evaluator sees it.
//! Fields a predicate depends on are required, so a missing field fails
//! the decode (and the evaluator degrades to `Manual`) instead of silently
//! defaulting.

use serde::{Deserialize, Serialize};

/// Org-wide mailbox auditing configuration (mail service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxAuditConfig {
    /// True when auditing is turned off for the organization.
    pub audit_disabled: bool,

    /// Audit log retention in days.
    #[serde(default)]
    pub retention_days: u32,
}

/// Outbound transport policy (mail service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportPolicy {
    /// Whether automatic forwarding to external domains is allowed.
    pub external_forwarding_enabled: bool,

    /// Whether TLS is required on outbound connectors.
    pub require_tls: bool,
}

/// One mailbox, as returned by the mailbox listing (mail service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailboxRecord {
    pub address: String,

    /// Principals holding full-access delegation on this mailbox.
    #[serde(default)]
    pub full_access_delegates: Vec<String>,
}

/// Tenant-wide directory settings (directory service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorySettings {
    /// Whether legacy (basic) authentication protocols are still enabled.
    pub legacy_auth_enabled: bool,

    /// Guest invitation policy: `"admins_only"`, `"members"`, or `"anyone"`.
    pub guest_invite_policy: String,
}

/// One directory role assignment (directory service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub principal: String,
    pub role: String,

    /// Whether the role is a privileged/administrative role.
    pub privileged: bool,
}

/// Collaboration sharing policy (collaboration service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharingPolicy {
    /// Whether anonymous ("anyone with the link") sharing links are allowed.
    pub anonymous_links_enabled: bool,

    /// External access mode: `"allowlist"`, `"open"`, or `"blocked"`.
    pub external_access: String,

    /// Domains permitted when `external_access == "allowlist"`.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

/// Unified audit log configuration (compliance service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogConfig {
    pub unified_audit_enabled: bool,
}

/// One data-loss-prevention policy (compliance service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlpPolicy {
    pub name: String,
    pub enabled: bool,
}

/// One retention policy (compliance service).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub name: String,
    pub duration_days: u32,
}
