//! Standard-object snapshot records and per-kind parsing
//!
//! Each listed object is reduced to one `ObjectRecord` carrying the instants
//! the latency reconstruction cares about: creation time and the last status
//! write, recovered from the field-management audit trail.

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

/// Controllers recognized as the managing writer of an object.
/// First managed-fields entry naming one of these wins.
const KNOWN_MANAGERS: [&str; 3] = ["kube-controller-manager", "controller-manager", "kubelet"];

/// Coarse object condition written into the snapshot record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    /// Deployment with all desired replicas ready
    Available,
    /// Deployment with fewer ready replicas than desired
    Unavailable,
    /// Services are always reported active
    Active,
    /// Secrets and ConfigMaps carry no readiness concept
    Exists,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Available => "Available",
            Condition::Unavailable => "Unavailable",
            Condition::Active => "Active",
            Condition::Exists => "Exists",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one standard object in one plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub name: String,
    pub namespace: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Instant of the last status write, if any controller reported one
    pub status_updated_at: Option<DateTime<Utc>>,
    pub condition: Condition,
    /// Recognized controller identity attributed via managed fields
    pub managing_controller: Option<String>,
}

/// The fixed set of standard resource kinds the collector understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardKind {
    Deployments,
    Secrets,
    ConfigMaps,
    Services,
}

impl StandardKind {
    /// Collection order used by the experiment driver
    pub const ALL: [StandardKind; 4] = [
        StandardKind::Deployments,
        StandardKind::Secrets,
        StandardKind::ConfigMaps,
        StandardKind::Services,
    ];

    /// Resolve a kind identifier; unknown identifiers are `None`, which the
    /// collector treats as an empty listing rather than an error.
    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            "deployments" => Some(StandardKind::Deployments),
            "secrets" => Some(StandardKind::Secrets),
            "configmaps" => Some(StandardKind::ConfigMaps),
            "services" => Some(StandardKind::Services),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StandardKind::Deployments => "deployments",
            StandardKind::Secrets => "secrets",
            StandardKind::ConfigMaps => "configmaps",
            StandardKind::Services => "services",
        }
    }
}

/// Instant of the last status write, taken from the field-management trail.
/// Controllers do not expose a uniform status timestamp; an Update operation
/// against the status subresource is the one cross-controller signal.
pub fn status_updated_at(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    meta.managed_fields
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find(|mf| {
            mf.operation.as_deref() == Some("Update") && mf.subresource.as_deref() == Some("status")
        })
        .and_then(|mf| mf.time.as_ref())
        .map(|t| t.0)
}

/// First managed-fields entry whose manager is a recognized controller
pub fn managing_controller(meta: &ObjectMeta) -> Option<String> {
    meta.managed_fields
        .as_deref()
        .unwrap_or_default()
        .iter()
        .find_map(|mf| {
            mf.manager
                .as_deref()
                .filter(|m| KNOWN_MANAGERS.contains(m))
                .map(str::to_owned)
        })
}

fn created_at(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    meta.creation_timestamp.as_ref().map(|t| t.0)
}

fn name_of(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn namespace_of(meta: &ObjectMeta) -> String {
    meta.namespace.clone().unwrap_or_default()
}

/// Available iff every desired replica is ready. A missing desired count
/// falls back to the Kubernetes default of one replica.
pub fn from_deployment(dep: &Deployment) -> ObjectRecord {
    let desired = dep.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let ready = dep
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    let condition = if ready == desired {
        Condition::Available
    } else {
        Condition::Unavailable
    };

    ObjectRecord {
        name: name_of(&dep.metadata),
        namespace: namespace_of(&dep.metadata),
        created_at: created_at(&dep.metadata),
        status_updated_at: status_updated_at(&dep.metadata),
        condition,
        managing_controller: managing_controller(&dep.metadata),
    }
}

pub fn from_service(svc: &Service) -> ObjectRecord {
    ObjectRecord {
        name: name_of(&svc.metadata),
        namespace: namespace_of(&svc.metadata),
        created_at: created_at(&svc.metadata),
        status_updated_at: status_updated_at(&svc.metadata),
        condition: Condition::Active,
        managing_controller: managing_controller(&svc.metadata),
    }
}

pub fn from_secret(secret: &Secret) -> ObjectRecord {
    ObjectRecord {
        name: name_of(&secret.metadata),
        namespace: namespace_of(&secret.metadata),
        created_at: created_at(&secret.metadata),
        // Secrets have no status subresource
        status_updated_at: None,
        condition: Condition::Exists,
        managing_controller: managing_controller(&secret.metadata),
    }
}

pub fn from_config_map(cm: &ConfigMap) -> ObjectRecord {
    ObjectRecord {
        name: name_of(&cm.metadata),
        namespace: namespace_of(&cm.metadata),
        created_at: created_at(&cm.metadata),
        // ConfigMaps have no status subresource
        status_updated_at: None,
        condition: Condition::Exists,
        managing_controller: managing_controller(&cm.metadata),
    }
}
