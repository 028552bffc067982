//! Connector layer: logical sessions to the tenant's backend services.
//!
//! One [`ConnectorContext`] holds a session per [`ServiceKind`] plus its
//! availability state. Connecting never fails the pipeline: a service that
//! cannot be reached is marked [`ConnectorStatus::Failed`] and logged as a
//! warning; a service the caller opted out of is [`ConnectorStatus::Skipped`].
//! Evaluators consult the status (via the typed fetch helpers) before
//! touching a backend.
//!
//! Backend responses are loosely typed field bags; they are decoded into
//! the explicit typed values of [`types`] at this boundary. Evaluators only
//! ever see the narrow typed value, never the raw JSON.

pub mod fakes;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use types::{
    AuditLogConfig, DirectorySettings, DlpPolicy, MailboxAuditConfig, MailboxRecord,
    RetentionPolicy, RoleAssignment, SharingPolicy, TransportPolicy,
};

// ---------------------------------------------------------------------------
// Service identity and session state
// ---------------------------------------------------------------------------

/// Backend service a connector session targets.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    Mail,
    Directory,
    Collaboration,
    Compliance,
}

impl ServiceKind {
    /// All services, in the order sessions are established.
    pub const ALL: [ServiceKind; 4] = [
        ServiceKind::Mail,
        ServiceKind::Directory,
        ServiceKind::Collaboration,
        ServiceKind::Compliance,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ServiceKind::Mail => "mail",
            ServiceKind::Directory => "directory",
            ServiceKind::Collaboration => "collaboration",
            ServiceKind::Compliance => "compliance",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Connection state of one service after [`ConnectorContext::connect`].
///
/// `Skipped` (explicit opt-out) is distinct from `Failed` (attempted and
/// unreachable/unauthorized).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorStatus {
    Connected,
    Failed,
    Skipped,
}

// ---------------------------------------------------------------------------
// BackendClient — the only capability the pipeline requires of a backend
// ---------------------------------------------------------------------------

/// Errors surfaced by backend calls.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Unreachable(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("malformed response for {resource}: {reason}")]
    Malformed { resource: String, reason: String },

    #[error("mutation rejected: {0}")]
    Rejected(String),
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// A logical session to one backend service.
///
/// Guarantees expected of implementations:
/// - `open` verifies the session once; the pipeline never retries it.
/// - `fetch` returns a configuration object keyed by resource name.
/// - `update` is the only mutating call and is used exclusively by the
///   remediation engine in Apply mode.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Establish or verify the session.
    async fn open(&self) -> BackendResult<()>;

    /// Fetch a configuration object by resource name.
    async fn fetch(&self, resource: &str) -> BackendResult<Value>;

    /// Apply a configuration patch to a resource. Mutating.
    async fn update(&self, resource: &str, patch: Value) -> BackendResult<()>;
}

// ---------------------------------------------------------------------------
// Resource names
// ---------------------------------------------------------------------------

/// Well-known resource names, shared by evaluators and remediation actions.
pub mod resources {
    pub const MAILBOX_AUDIT: &str = "audit-config";
    pub const TRANSPORT_POLICY: &str = "transport-policy";
    pub const MAILBOXES: &str = "mailboxes";
    pub const DIRECTORY_SETTINGS: &str = "settings";
    pub const ROLE_ASSIGNMENTS: &str = "role-assignments";
    pub const SHARING_POLICY: &str = "sharing-policy";
    pub const AUDIT_LOG: &str = "audit-log-config";
    pub const DLP_POLICIES: &str = "dlp-policies";
    pub const RETENTION_POLICIES: &str = "retention-policies";
}

// ---------------------------------------------------------------------------
// ConnectorSettings
// ---------------------------------------------------------------------------

/// Caller-supplied connection options for one run.
#[derive(Debug, Clone, Default)]
pub struct ConnectorSettings {
    /// Skip the mail service entirely (distinct from a failed connection).
    pub skip_mail: bool,
    /// Skip the collaboration service.
    pub skip_collaboration: bool,
    /// Skip the compliance service.
    pub skip_compliance: bool,
    /// Override admin endpoint for the directory service.
    pub admin_endpoint: Option<String>,
}

impl ConnectorSettings {
    fn skips(&self, service: ServiceKind) -> bool {
        match service {
            ServiceKind::Mail => self.skip_mail,
            ServiceKind::Collaboration => self.skip_collaboration,
            ServiceKind::Compliance => self.skip_compliance,
            ServiceKind::Directory => false,
        }
    }
}

// ---------------------------------------------------------------------------
// ConnectorContext
// ---------------------------------------------------------------------------

/// Explicit connector state passed into the orchestrator and every
/// evaluator call. No ambient globals.
pub struct ConnectorContext {
    clients: BTreeMap<ServiceKind, Arc<dyn BackendClient>>,
    status: BTreeMap<ServiceKind, ConnectorStatus>,
    admin_endpoint: Option<String>,
}

impl ConnectorContext {
    /// Establish sessions to every non-skipped service.
    ///
    /// Never returns an error for a per-service failure: the service is
    /// marked `Failed` and a warning is logged, and the pipeline degrades
    /// to `Manual` results for the controls that need it.
    pub async fn connect(
        settings: &ConnectorSettings,
        clients: BTreeMap<ServiceKind, Arc<dyn BackendClient>>,
    ) -> Self {
        let mut status = BTreeMap::new();

        for service in ServiceKind::ALL {
            if settings.skips(service) {
                info!(service = %service, "service skipped by configuration");
                status.insert(service, ConnectorStatus::Skipped);
                continue;
            }

            if service == ServiceKind::Directory {
                if let Some(endpoint) = &settings.admin_endpoint {
                    info!(service = %service, endpoint = %endpoint, "using admin endpoint override");
                }
            }

            match clients.get(&service) {
                None => {
                    warn!(service = %service, "no client configured for service");
                    status.insert(service, ConnectorStatus::Failed);
                }
                Some(client) => match client.open().await {
                    Ok(()) => {
                        info!(service = %service, "connected");
                        status.insert(service, ConnectorStatus::Connected);
                    }
                    Err(e) => {
                        warn!(service = %service, error = %e, "connection failed");
                        status.insert(service, ConnectorStatus::Failed);
                    }
                },
            }
        }

        Self {
            clients,
            status,
            admin_endpoint: settings.admin_endpoint.clone(),
        }
    }

    /// Admin endpoint override the directory session was established
    /// against, when the caller supplied one.
    pub fn admin_endpoint(&self) -> Option<&str> {
        self.admin_endpoint.as_deref()
    }

    /// Connection state of one service.
    pub fn status(&self, service: ServiceKind) -> ConnectorStatus {
        self.status
            .get(&service)
            .copied()
            .unwrap_or(ConnectorStatus::Failed)
    }

    /// Full status map, recorded on the Run artifact.
    pub fn status_map(&self) -> &BTreeMap<ServiceKind, ConnectorStatus> {
        &self.status
    }

    pub fn is_connected(&self, service: ServiceKind) -> bool {
        self.status(service) == ConnectorStatus::Connected
    }

    fn client(&self, service: ServiceKind) -> BackendResult<&Arc<dyn BackendClient>> {
        match self.status(service) {
            ConnectorStatus::Connected => self
                .clients
                .get(&service)
                .ok_or_else(|| BackendError::Unreachable(format!("{} has no client", service))),
            ConnectorStatus::Skipped => Err(BackendError::Unreachable(format!(
                "{} was skipped by configuration",
                service
            ))),
            ConnectorStatus::Failed => Err(BackendError::Unreachable(format!(
                "{} connection failed at session setup",
                service
            ))),
        }
    }

    /// Fetch a resource and decode it into a typed value at the boundary.
    async fn fetch_typed<T: DeserializeOwned>(
        &self,
        service: ServiceKind,
        resource: &str,
    ) -> BackendResult<T> {
        let raw = self.client(service)?.fetch(resource).await?;
        serde_json::from_value(raw).map_err(|e| BackendError::Malformed {
            resource: resource.to_string(),
            reason: e.to_string(),
        })
    }

    // -- typed fetch helpers, one per configuration object ------------------

    pub async fn mailbox_audit(&self) -> BackendResult<MailboxAuditConfig> {
        self.fetch_typed(ServiceKind::Mail, resources::MAILBOX_AUDIT)
            .await
    }

    pub async fn transport_policy(&self) -> BackendResult<TransportPolicy> {
        self.fetch_typed(ServiceKind::Mail, resources::TRANSPORT_POLICY)
            .await
    }

    pub async fn mailboxes(&self) -> BackendResult<Vec<MailboxRecord>> {
        self.fetch_typed(ServiceKind::Mail, resources::MAILBOXES).await
    }

    pub async fn directory_settings(&self) -> BackendResult<DirectorySettings> {
        self.fetch_typed(ServiceKind::Directory, resources::DIRECTORY_SETTINGS)
            .await
    }

    pub async fn role_assignments(&self) -> BackendResult<Vec<RoleAssignment>> {
        self.fetch_typed(ServiceKind::Directory, resources::ROLE_ASSIGNMENTS)
            .await
    }

    pub async fn sharing_policy(&self) -> BackendResult<SharingPolicy> {
        self.fetch_typed(ServiceKind::Collaboration, resources::SHARING_POLICY)
            .await
    }

    pub async fn audit_log_config(&self) -> BackendResult<AuditLogConfig> {
        self.fetch_typed(ServiceKind::Compliance, resources::AUDIT_LOG)
            .await
    }

    pub async fn dlp_policies(&self) -> BackendResult<Vec<DlpPolicy>> {
        self.fetch_typed(ServiceKind::Compliance, resources::DLP_POLICIES)
            .await
    }

    pub async fn retention_policies(&self) -> BackendResult<Vec<RetentionPolicy>> {
        self.fetch_typed(ServiceKind::Compliance, resources::RETENTION_POLICIES)
            .await
    }

    // -- remediation surface -------------------------------------------------

    /// Fetch the raw configuration object for a resource. Used by the
    /// remediation engine to compute current-vs-target diffs.
    pub async fn fetch_raw(&self, service: ServiceKind, resource: &str) -> BackendResult<Value> {
        self.client(service)?.fetch(resource).await
    }

    /// Apply a configuration patch. The only mutating path in the crate;
    /// reached exclusively from remediation Apply mode.
    pub async fn apply_patch(
        &self,
        service: ServiceKind,
        resource: &str,
        patch: Value,
    ) -> BackendResult<()> {
        self.client(service)?.update(resource, patch).await
    }
}
