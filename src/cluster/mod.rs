// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Uniform access to clusters behind a management plane proxy or a direct
//! credential bundle.
//!
//! Both backends end up talking the Kubernetes REST API, so the workload and
//! ConfigMap/Secret operations are provided once on the trait on top of
//! [`ClusterAdapter::client`]. Backends only differ in how a client for a
//! cluster id is obtained, how connectivity is checked and how namespaces are
//! enumerated. Updates are read-modify-write with last-writer-wins semantics;
//! no resourceVersion conflict detection is attempted.

pub mod direct;
pub mod proxied;

pub use direct::DirectClusterAdapter;
pub use proxied::ProxiedClusterAdapter;

use crate::error::Result;
use crate::kubernetes::{config_data, workloads};
use crate::types::{
    BackendKind, ConfigMapSnapshot, NamespaceInfo, SecretSnapshot, Workload, WorkloadKind,
};
use async_trait::async_trait;
use kube::Client;
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of a connectivity check. Failures are reported, never raised.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectionStatus {
    pub fn ok(message: impl Into<String>, details: Option<serde_json::Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }
}

#[async_trait]
pub trait ClusterAdapter: Send + Sync {
    fn backend(&self) -> BackendKind;

    /// Check the site is reachable and the credentials are accepted
    async fn test_connection(&self) -> ConnectionStatus;

    /// Namespaces of one cluster. Backends with a single cluster ignore the scope.
    async fn list_namespaces(&self, cluster: Option<&str>) -> Result<Vec<NamespaceInfo>>;

    /// Kubernetes client for a cluster of this site
    async fn client(&self, cluster: &str) -> Result<Client>;

    async fn list_workloads(&self, cluster: &str, namespace: &str) -> Result<Vec<Workload>> {
        let client = self.client(cluster).await?;
        workloads::list_workloads(&client, namespace).await
    }

    /// Replace the first container image of a workload. `kind` accepts any
    /// spelling of deployment, daemonset or statefulset.
    async fn update_workload_image(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
        kind: &str,
        image: &str,
    ) -> Result<()> {
        let kind = WorkloadKind::parse(kind)?;
        let client = self.client(cluster).await?;
        workloads::update_workload_image(&client, namespace, name, kind, image).await?;
        Ok(())
    }

    async fn list_config_maps(
        &self,
        cluster: &str,
        namespace: &str,
    ) -> Result<Vec<ConfigMapSnapshot>> {
        let client = self.client(cluster).await?;
        config_data::list_config_maps(&client, namespace).await
    }

    async fn get_config_map_keys(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>> {
        let client = self.client(cluster).await?;
        config_data::get_config_map_data(&client, namespace, name).await
    }

    async fn update_config_map_key(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let keys = BTreeMap::from([(key.to_string(), value.to_string())]);
        self.sync_config_map_keys(cluster, namespace, name, &keys).await
    }

    async fn sync_config_map_keys(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<()> {
        let client = self.client(cluster).await?;
        config_data::merge_config_map_data(&client, namespace, name, keys).await?;
        Ok(())
    }

    /// User Secrets; service account tokens, image pull secrets and default
    /// tokens are never returned
    async fn list_secrets(&self, cluster: &str, namespace: &str) -> Result<Vec<SecretSnapshot>> {
        let client = self.client(cluster).await?;
        config_data::list_secrets(&client, namespace).await
    }

    /// Key names of a Secret; values are not exposed
    async fn get_secret_keys(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
    ) -> Result<Vec<String>> {
        let client = self.client(cluster).await?;
        config_data::get_secret_keys(&client, namespace, name).await
    }

    async fn update_secret_key(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
        key: &str,
        value: &str,
    ) -> Result<()> {
        let keys = BTreeMap::from([(key.to_string(), value.to_string())]);
        self.sync_secret_keys(cluster, namespace, name, &keys).await
    }

    async fn sync_secret_keys(
        &self,
        cluster: &str,
        namespace: &str,
        name: &str,
        keys: &BTreeMap<String, String>,
    ) -> Result<()> {
        let client = self.client(cluster).await?;
        config_data::merge_secret_data(&client, namespace, name, keys).await?;
        Ok(())
    }
}
