// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster adapter for sites carrying their own kubeconfig

use super::{ClusterAdapter, ConnectionStatus};
use crate::error::{CourierError, Result};
use crate::kubernetes::{create_client, kubeconfig_cluster_id, list_namespaces, parse_kubeconfig};
use crate::types::{BackendKind, DirectSite, NamespaceInfo};
use async_trait::async_trait;
use kube::config::Kubeconfig;
use kube::Client;
use tracing::{debug, instrument, warn};

pub struct DirectClusterAdapter {
    site: DirectSite,
    kubeconfig: Kubeconfig,
    cluster_id: String,
}

impl DirectClusterAdapter {
    pub fn new(site: DirectSite) -> Result<Self> {
        let kubeconfig = parse_kubeconfig(&site.kubeconfig)?;
        let cluster_id = kubeconfig_cluster_id(&kubeconfig)?;
        Ok(Self {
            site,
            kubeconfig,
            cluster_id,
        })
    }

    /// The only cluster this site can address
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }
}

#[async_trait]
impl ClusterAdapter for DirectClusterAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Direct
    }

    #[instrument(skip(self), fields(site = %self.site.name))]
    async fn test_connection(&self) -> ConnectionStatus {
        let client = match self.client(&self.cluster_id).await {
            Ok(client) => client,
            Err(e) => return ConnectionStatus::failed(e.to_string()),
        };

        match client.apiserver_version().await {
            Ok(info) => ConnectionStatus::ok(
                format!(
                    "Connected to cluster {} (Kubernetes {})",
                    self.cluster_id, info.git_version
                ),
                Some(serde_json::json!({
                    "clusterId": self.cluster_id,
                    "version": info.git_version,
                    "platform": info.platform,
                })),
            ),
            Err(e) => {
                let context = format!("Failed to reach cluster {}", self.cluster_id);
                let err = CourierError::from_kube(e, context);
                warn!("Connection test failed: {}", err);
                ConnectionStatus::failed(err.to_string())
            }
        }
    }

    async fn list_namespaces(&self, _cluster: Option<&str>) -> Result<Vec<NamespaceInfo>> {
        let client = self.client(&self.cluster_id).await?;
        list_namespaces(&client, Some(&self.cluster_id)).await
    }

    async fn client(&self, cluster: &str) -> Result<Client> {
        if cluster != self.cluster_id {
            debug!(
                "Site {} has a single cluster {}, ignoring requested cluster {}",
                self.site.name, self.cluster_id, cluster
            );
        }
        create_client(self.kubeconfig.clone()).await
    }
}
