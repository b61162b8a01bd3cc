//! Per-plane Kubernetes snapshot reader
//!
//! Each plane (WDS, ITS, WEC) gets its own `Collector`, built from an
//! explicit kubeconfig path and context name. Standard kinds go through the
//! typed listing path; custom kinds go through the dynamic path driven by
//! the `work` registry. Any failed list aborts the run: partial data would
//! corrupt the fixed-shape expectations of the reconstruction.

use std::path::Path;

use chrono::{DateTime, Utc};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, DynamicObject, ListParams};
use kube::config::{KubeConfigOptions, Kubeconfig, KubeconfigError};
use kube::{Client, Config};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::snapshot::{self, ObjectRecord, StandardKind};
use crate::work::{self, WorkRecord, WorkResource, BINDING_POLICIES};

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("failed to load kubeconfig for context {context:?}: {source}")]
    Kubeconfig {
        context: String,
        #[source]
        source: KubeconfigError,
    },

    #[error("failed to create client for context {context:?}: {source}")]
    Client {
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error("failed to list {resource} in context {context:?}: {source}")]
    List {
        resource: String,
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error(
        "failed to get binding policy {name:?} in context {context:?}: {source}\n\
         Did you create the binding policy after the deployment?"
    )]
    BindingPolicy {
        name: String,
        context: String,
        #[source]
        source: kube::Error,
    },

    #[error("binding policy {name:?} has no creation timestamp")]
    MissingCreationTimestamp { name: String },
}

/// Snapshot reader bound to one cluster context
pub struct Collector {
    client: Client,
    context: String,
}

impl Collector {
    /// Resolve the given context from an explicit kubeconfig path and build
    /// a client for it. Fails fast; nothing is collected on a bad context.
    pub async fn connect(kubeconfig: &Path, context: &str) -> Result<Self, CollectError> {
        let config = Kubeconfig::read_from(kubeconfig).map_err(|source| {
            CollectError::Kubeconfig {
                context: context.to_owned(),
                source,
            }
        })?;
        let options = KubeConfigOptions {
            context: Some(context.to_owned()),
            ..Default::default()
        };
        let config = Config::from_custom_kubeconfig(config, &options)
            .await
            .map_err(|source| CollectError::Kubeconfig {
                context: context.to_owned(),
                source,
            })?;
        let client = Client::try_from(config).map_err(|source| CollectError::Client {
            context: context.to_owned(),
            source,
        })?;

        Ok(Self {
            client,
            context: context.to_owned(),
        })
    }

    /// Context name this collector is bound to
    pub fn context(&self) -> &str {
        &self.context
    }

    async fn list_namespaced<K>(&self, kind: &str, namespace: &str) -> Result<Vec<K>, CollectError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope>
            + Clone
            + DeserializeOwned
            + std::fmt::Debug,
        K::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|source| CollectError::List {
                resource: kind.to_owned(),
                context: self.context.clone(),
                source,
            })?;
        Ok(list.items)
    }

    /// Snapshot one standard kind in one namespace. Unrecognized kind
    /// identifiers yield an empty listing so the driver stays resilient to
    /// partial kind lists.
    pub async fn list_standard(
        &self,
        kind: &str,
        namespace: &str,
    ) -> Result<Vec<ObjectRecord>, CollectError> {
        let records = match StandardKind::parse(kind) {
            None => {
                debug!(kind, "skipping unrecognized resource kind");
                Vec::new()
            }
            Some(StandardKind::Deployments) => self
                .list_namespaced::<Deployment>(kind, namespace)
                .await?
                .iter()
                .map(snapshot::from_deployment)
                .collect(),
            Some(StandardKind::Services) => self
                .list_namespaced::<Service>(kind, namespace)
                .await?
                .iter()
                .map(snapshot::from_service)
                .collect(),
            Some(StandardKind::Secrets) => self
                .list_namespaced::<Secret>(kind, namespace)
                .await?
                .iter()
                .map(snapshot::from_secret)
                .collect(),
            Some(StandardKind::ConfigMaps) => self
                .list_namespaced::<ConfigMap>(kind, namespace)
                .await?
                .iter()
                .map(snapshot::from_config_map)
                .collect(),
        };
        Ok(records)
    }

    /// Snapshot one custom kind through the dynamic client. `None` namespace
    /// lists across the whole cluster.
    pub async fn list_custom(
        &self,
        resource: &WorkResource,
        namespace: Option<&str>,
        label_selector: Option<&str>,
    ) -> Result<Vec<WorkRecord>, CollectError> {
        let ar = resource.api_resource();
        let api: Api<DynamicObject> = match namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        };

        let mut params = ListParams::default();
        if let Some(selector) = label_selector {
            params = params.labels(selector);
        }

        let list = api.list(&params).await.map_err(|source| CollectError::List {
            resource: resource.plural.to_owned(),
            context: self.context.clone(),
            source,
        })?;

        Ok(list
            .items
            .iter()
            .map(|obj| work::parse_work(obj, resource))
            .collect())
    }

    /// Creation instant of the singleton binding policy, read live rather
    /// than from a snapshot file: the policy is a control object, not a
    /// collected metric.
    pub async fn binding_policy_created_at(
        &self,
        name: &str,
    ) -> Result<DateTime<Utc>, CollectError> {
        let ar = BINDING_POLICIES.api_resource();
        let api: Api<DynamicObject> = Api::all_with(self.client.clone(), &ar);
        let policy = api
            .get(name)
            .await
            .map_err(|source| CollectError::BindingPolicy {
                name: name.to_owned(),
                context: self.context.clone(),
                source,
            })?;

        policy
            .metadata
            .creation_timestamp
            .map(|t| t.0)
            .ok_or_else(|| CollectError::MissingCreationTimestamp {
                name: name.to_owned(),
            })
    }
}
