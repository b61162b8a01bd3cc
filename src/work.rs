//! Custom-resource registry and snapshot parsing
//!
//! The transport planes speak in custom resources: a manifest work packages
//! the workload in the ITS, an applied manifest work is its instance on the
//! WEC, and a work status relays status back toward the origin. Each kind is
//! described by one registry entry so new kinds only add a table row, not
//! new dispatch code.

use chrono::{DateTime, Utc};
use kube::api::{ApiResource, DynamicObject, GroupVersionKind};
use serde::{Deserialize, Serialize};

use crate::snapshot::status_updated_at;

/// Work statuses are named after the object they report on, behind this prefix.
const WORK_STATUS_NAME_PREFIX: &str = "v1-pod-";

/// Snapshot of one custom resource carrying cross-plane provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub name: String,
    pub namespace: String,
    pub created_at: Option<DateTime<Utc>>,
    /// Instant of the last status write, from the field-management trail
    pub updated_at: Option<DateTime<Utc>>,
    /// Free-form phase reported under `.status.phase`, empty if unset
    pub status_phase: String,
    /// Name of the workload object this resource packages or reports on
    pub target_object: String,
}

/// One row of the custom-resource registry
pub struct WorkResource {
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    target_object: fn(&DynamicObject) -> Option<String>,
}

impl WorkResource {
    pub fn api_resource(&self) -> ApiResource {
        let gvk = GroupVersionKind::gvk(self.group, self.version, self.kind);
        ApiResource::from_gvk_with_plural(&gvk, self.plural)
    }
}

/// Packaged manifests in transit through the ITS
pub static MANIFEST_WORKS: WorkResource = WorkResource {
    group: "work.open-cluster-management.io",
    version: "v1",
    kind: "ManifestWork",
    plural: "manifestworks",
    target_object: manifest_target,
};

/// Status reports relayed back toward the origin plane
pub static WORK_STATUSES: WorkResource = WorkResource {
    group: "control.kubestellar.io",
    version: "v1alpha1",
    kind: "WorkStatus",
    plural: "workstatuses",
    target_object: name_suffix_target,
};

/// Applied manifest instances on the execution cluster
pub static APPLIED_MANIFEST_WORKS: WorkResource = WorkResource {
    group: "work.open-cluster-management.io",
    version: "v1",
    kind: "AppliedManifestWork",
    plural: "appliedmanifestworks",
    target_object: no_target,
};

/// Control object binding a workload to its execution destinations.
/// Cluster-scoped; only its creation instant is consumed, as the timeline t0.
pub static BINDING_POLICIES: WorkResource = WorkResource {
    group: "control.kubestellar.io",
    version: "v1alpha1",
    kind: "BindingPolicy",
    plural: "bindingpolicies",
    target_object: no_target,
};

/// First embedded manifest exposing a metadata name
fn manifest_target(obj: &DynamicObject) -> Option<String> {
    let manifests = obj
        .data
        .pointer("/spec/workload/manifests")?
        .as_array()?;
    manifests.iter().find_map(|manifest| {
        manifest
            .pointer("/metadata/name")
            .and_then(|name| name.as_str())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
    })
}

/// Own name with the well-known prefix stripped; names without the prefix
/// pass through unchanged.
fn name_suffix_target(obj: &DynamicObject) -> Option<String> {
    let name = obj.metadata.name.as_deref()?;
    Some(
        name.strip_prefix(WORK_STATUS_NAME_PREFIX)
            .unwrap_or(name)
            .to_owned(),
    )
}

fn no_target(_obj: &DynamicObject) -> Option<String> {
    None
}

/// Reduce one listed custom resource to its snapshot record
pub fn parse_work(obj: &DynamicObject, resource: &WorkResource) -> WorkRecord {
    let status_phase = obj
        .data
        .pointer("/status/phase")
        .and_then(|phase| phase.as_str())
        .unwrap_or_default()
        .to_owned();

    WorkRecord {
        name: obj.metadata.name.clone().unwrap_or_default(),
        namespace: obj.metadata.namespace.clone().unwrap_or_default(),
        created_at: obj.metadata.creation_timestamp.as_ref().map(|t| t.0),
        updated_at: status_updated_at(&obj.metadata),
        status_phase,
        target_object: (resource.target_object)(obj).unwrap_or_default(),
    }
}
