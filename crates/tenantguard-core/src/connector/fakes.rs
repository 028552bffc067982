//! In-memory fakes for the backend client trait (testing and dry runs).
//!
//! `StaticBackend` serves canned configuration objects and records every
//! mutation, so tests can assert that Preview mode performs zero mutating
//! calls. `UnreachableBackend` and `RejectingBackend` exercise the
//! degradation paths.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{BackendClient, BackendError, BackendResult, ServiceKind};

// ---------------------------------------------------------------------------
// StaticBackend
// ---------------------------------------------------------------------------

/// In-memory backend serving canned JSON objects keyed by resource name.
#[derive(Debug, Default)]
pub struct StaticBackend {
    objects: Mutex<HashMap<String, Value>>,
    mutations: Mutex<Vec<(String, Value)>>,
}

impl StaticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style: seed one resource.
    pub fn with(self, resource: &str, value: Value) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(resource.to_string(), value);
        self
    }

    /// Number of mutating calls received.
    pub fn mutation_count(&self) -> usize {
        self.mutations.lock().unwrap().len()
    }

    /// All mutations received, in call order.
    pub fn mutations(&self) -> Vec<(String, Value)> {
        self.mutations.lock().unwrap().clone()
    }
}

#[async_trait]
impl BackendClient for StaticBackend {
    async fn open(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn fetch(&self, resource: &str) -> BackendResult<Value> {
        self.objects
            .lock()
            .unwrap()
            .get(resource)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(resource.to_string()))
    }

    async fn update(&self, resource: &str, patch: Value) -> BackendResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let entry = objects
            .entry(resource.to_string())
            .or_insert_with(|| json!({}));
        if let (Some(target), Some(fields)) = (entry.as_object_mut(), patch.as_object()) {
            for (k, v) in fields {
                target.insert(k.clone(), v.clone());
            }
        }
        self.mutations
            .lock()
            .unwrap()
            .push((resource.to_string(), patch));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UnreachableBackend
// ---------------------------------------------------------------------------

/// Backend whose session can never be established.
#[derive(Debug, Default)]
pub struct UnreachableBackend;

#[async_trait]
impl BackendClient for UnreachableBackend {
    async fn open(&self) -> BackendResult<()> {
        Err(BackendError::Unreachable(
            "connection refused".to_string(),
        ))
    }

    async fn fetch(&self, resource: &str) -> BackendResult<Value> {
        Err(BackendError::Unreachable(format!(
            "cannot fetch {}: connection refused",
            resource
        )))
    }

    async fn update(&self, resource: &str, _patch: Value) -> BackendResult<()> {
        Err(BackendError::Unreachable(format!(
            "cannot update {}: connection refused",
            resource
        )))
    }
}

// ---------------------------------------------------------------------------
// RejectingBackend
// ---------------------------------------------------------------------------

/// Backend that serves reads but rejects every mutation, for exercising
/// `Outcome::Failure` without tearing down the batch.
#[derive(Debug, Default)]
pub struct RejectingBackend {
    inner: StaticBackend,
}

impl RejectingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, resource: &str, value: Value) -> Self {
        Self {
            inner: self.inner.with(resource, value),
        }
    }
}

#[async_trait]
impl BackendClient for RejectingBackend {
    async fn open(&self) -> BackendResult<()> {
        Ok(())
    }

    async fn fetch(&self, resource: &str) -> BackendResult<Value> {
        self.inner.fetch(resource).await
    }

    async fn update(&self, resource: &str, _patch: Value) -> BackendResult<()> {
        Err(BackendError::Rejected(format!(
            "write to {} denied by policy",
            resource
        )))
    }
}

// ---------------------------------------------------------------------------
// Canned tenants
// ---------------------------------------------------------------------------

/// A tenant whose configuration passes every control.
pub fn compliant_tenant() -> BTreeMap<ServiceKind, Arc<dyn BackendClient>> {
    use super::resources;

    let mail = StaticBackend::new()
        .with(
            resources::MAILBOX_AUDIT,
            json!({ "audit_disabled": false, "retention_days": 365 }),
        )
        .with(
            resources::TRANSPORT_POLICY,
            json!({ "external_forwarding_enabled": false, "require_tls": true }),
        )
        .with(
            resources::MAILBOXES,
            json!([
                { "address": "ceo@contoso.example", "full_access_delegates": [] },
                { "address": "cfo@contoso.example", "full_access_delegates": ["assistant@contoso.example"] }
            ]),
        );

    let directory = StaticBackend::new()
        .with(
            resources::DIRECTORY_SETTINGS,
            json!({ "legacy_auth_enabled": false, "guest_invite_policy": "admins_only" }),
        )
        .with(
            resources::ROLE_ASSIGNMENTS,
            json!([
                { "principal": "alice@contoso.example", "role": "Global Administrator", "privileged": true },
                { "principal": "bob@contoso.example", "role": "Global Administrator", "privileged": true },
                { "principal": "carol@contoso.example", "role": "Helpdesk Administrator", "privileged": false }
            ]),
        );

    let collaboration = StaticBackend::new().with(
        resources::SHARING_POLICY,
        json!({
            "anonymous_links_enabled": false,
            "external_access": "allowlist",
            "allowed_domains": ["partner.example"]
        }),
    );

    let compliance = StaticBackend::new()
        .with(resources::AUDIT_LOG, json!({ "unified_audit_enabled": true }))
        .with(
            resources::DLP_POLICIES,
            json!([{ "name": "Default DLP", "enabled": true }]),
        )
        .with(
            resources::RETENTION_POLICIES,
            json!([{ "name": "Seven year hold", "duration_days": 2555 }]),
        );

    let mut clients: BTreeMap<ServiceKind, Arc<dyn BackendClient>> = BTreeMap::new();
    clients.insert(ServiceKind::Mail, Arc::new(mail));
    clients.insert(ServiceKind::Directory, Arc::new(directory));
    clients.insert(ServiceKind::Collaboration, Arc::new(collaboration));
    clients.insert(ServiceKind::Compliance, Arc::new(compliance));
    clients
}

/// A tenant that fails every control. Includes the drift the remediation
/// engine knows how to fix (auditing off, external forwarding on,
/// anonymous links on, unified audit log off) plus drift it does not.
pub fn drifted_tenant() -> BTreeMap<ServiceKind, Arc<dyn BackendClient>> {
    use super::resources;

    let mail = StaticBackend::new()
        .with(
            resources::MAILBOX_AUDIT,
            json!({ "audit_disabled": true, "retention_days": 90 }),
        )
        .with(
            resources::TRANSPORT_POLICY,
            json!({ "external_forwarding_enabled": true, "require_tls": false }),
        )
        .with(
            resources::MAILBOXES,
            json!([
                { "address": "ceo@contoso.example", "full_access_delegates": ["*"] }
            ]),
        );

    let directory = StaticBackend::new()
        .with(
            resources::DIRECTORY_SETTINGS,
            json!({ "legacy_auth_enabled": true, "guest_invite_policy": "anyone" }),
        )
        .with(
            resources::ROLE_ASSIGNMENTS,
            json!([
                { "principal": "a@contoso.example", "role": "Global Administrator", "privileged": true },
                { "principal": "b@contoso.example", "role": "Global Administrator", "privileged": true },
                { "principal": "c@contoso.example", "role": "Global Administrator", "privileged": true },
                { "principal": "d@contoso.example", "role": "Global Administrator", "privileged": true },
                { "principal": "e@contoso.example", "role": "Global Administrator", "privileged": true }
            ]),
        );

    let collaboration = StaticBackend::new().with(
        resources::SHARING_POLICY,
        json!({
            "anonymous_links_enabled": true,
            "external_access": "open",
            "allowed_domains": []
        }),
    );

    let compliance = StaticBackend::new()
        .with(resources::AUDIT_LOG, json!({ "unified_audit_enabled": false }))
        .with(resources::DLP_POLICIES, json!([]))
        .with(resources::RETENTION_POLICIES, json!([]));

    let mut clients: BTreeMap<ServiceKind, Arc<dyn BackendClient>> = BTreeMap::new();
    clients.insert(ServiceKind::Mail, Arc::new(mail));
    clients.insert(ServiceKind::Directory, Arc::new(directory));
    clients.insert(ServiceKind::Collaboration, Arc::new(collaboration));
    clients.insert(ServiceKind::Compliance, Arc::new(compliance));
    clients
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_backend_records_mutations() {
        let backend = StaticBackend::new().with("audit-config", json!({ "audit_disabled": true }));
        assert_eq!(backend.mutation_count(), 0);

        backend
            .update("audit-config", json!({ "audit_disabled": false }))
            .await
            .unwrap();
        assert_eq!(backend.mutation_count(), 1);

        let after = backend.fetch("audit-config").await.unwrap();
        assert_eq!(after["audit_disabled"], json!(false));
    }

    #[tokio::test]
    async fn test_rejecting_backend_serves_reads_only() {
        let backend = RejectingBackend::new().with("sharing-policy", json!({ "x": 1 }));
        assert!(backend.fetch("sharing-policy").await.is_ok());
        let err = backend.update("sharing-policy", json!({})).await.unwrap_err();
        assert!(matches!(err, BackendError::Rejected(_)));
    }
}
