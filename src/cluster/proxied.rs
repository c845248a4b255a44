// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Cluster adapter for clusters reached through a Rancher management plane

use super::{ClusterAdapter, ConnectionStatus};
use crate::constants::proxied::CLUSTERS_PATH;
use crate::error::{CourierError, Result};
use crate::kubernetes::{create_client, list_namespaces, proxied_kubeconfig};
use crate::types::{BackendKind, NamespaceInfo, ProxiedSite};
use async_trait::async_trait;
use kube::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// A downstream cluster known to the management plane
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ManagedCluster {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Deserialize)]
struct Collection<T> {
    data: Vec<T>,
}

pub struct ProxiedClusterAdapter {
    site: ProxiedSite,
    http: reqwest::Client,
}

impl ProxiedClusterAdapter {
    pub fn new(site: ProxiedSite, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(site.insecure_skip_tls_verify)
            .build()
            .map_err(|e| CourierError::Adapter(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { site, http })
    }

    /// List the downstream clusters of this management plane
    #[instrument(skip(self), fields(site = %self.site.name))]
    pub async fn list_clusters(&self) -> Result<Vec<ManagedCluster>> {
        let url = format!("{}{}", self.site.url.trim_end_matches('/'), CLUSTERS_PATH);
        let context = format!("Failed to list clusters of {}", self.site.name);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.site.token)
            .send()
            .await
            .map_err(|e| CourierError::from_http(e, &context))?;

        if !response.status().is_success() {
            return Err(CourierError::from_status(response.status(), &context));
        }

        let clusters: Collection<ManagedCluster> = response
            .json()
            .await
            .map_err(|e| CourierError::Adapter(format!("{}: invalid response: {}", context, e)))?;

        debug!("Found {} clusters", clusters.data.len());
        Ok(clusters.data)
    }
}

#[async_trait]
impl ClusterAdapter for ProxiedClusterAdapter {
    fn backend(&self) -> BackendKind {
        BackendKind::Proxied
    }

    #[instrument(skip(self), fields(site = %self.site.name))]
    async fn test_connection(&self) -> ConnectionStatus {
        match self.list_clusters().await {
            Ok(clusters) => ConnectionStatus::ok(
                format!("Connected to {} ({} clusters)", self.site.name, clusters.len()),
                Some(serde_json::json!({ "clusters": clusters })),
            ),
            Err(e) => {
                warn!("Connection test failed: {}", e);
                ConnectionStatus::failed(e.to_string())
            }
        }
    }

    /// Namespaces of one cluster, or of every downstream cluster when no scope is given
    async fn list_namespaces(&self, cluster: Option<&str>) -> Result<Vec<NamespaceInfo>> {
        if let Some(cluster) = cluster {
            let client = self.client(cluster).await?;
            return list_namespaces(&client, Some(cluster)).await;
        }

        let mut namespaces = Vec::new();
        for cluster in self.list_clusters().await? {
            let client = self.client(&cluster.id).await?;
            namespaces.extend(list_namespaces(&client, Some(&cluster.id)).await?);
        }
        Ok(namespaces)
    }

    async fn client(&self, cluster: &str) -> Result<Client> {
        let kubeconfig = proxied_kubeconfig(
            &self.site.url,
            cluster,
            &self.site.token,
            self.site.insecure_skip_tls_verify,
        )?;
        create_client(kubeconfig).await
    }
}
