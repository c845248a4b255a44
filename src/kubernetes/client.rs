// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes client creation for direct and proxied cluster sites

use crate::constants::proxied::CLUSTER_PROXY_PREFIX;
use crate::error::{CourierError, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::{debug, instrument};

/// Parse a kubeconfig credential bundle
pub fn parse_kubeconfig(kubeconfig: &str) -> Result<Kubeconfig> {
    serde_yaml::from_str(kubeconfig)
        .map_err(|e| CourierError::Kubeconfig(format!("Failed to parse kubeconfig: {}", e)))
}

/// The single addressable cluster of a bundle: the current context's cluster,
/// or the first cluster entry when no context is selected.
pub fn kubeconfig_cluster_id(kubeconfig: &Kubeconfig) -> Result<String> {
    let from_context = kubeconfig.current_context.as_ref().and_then(|current| {
        kubeconfig
            .contexts
            .iter()
            .find(|c| &c.name == current)
            .and_then(|c| c.context.as_ref())
            .map(|c| c.cluster.clone())
    });

    from_context
        .or_else(|| kubeconfig.clusters.first().map(|c| c.name.clone()))
        .ok_or_else(|| CourierError::Kubeconfig("Kubeconfig does not define a cluster".to_string()))
}

/// Build a kubeconfig that reaches one cluster through the management plane proxy
pub fn proxied_kubeconfig(
    site_url: &str,
    cluster_id: &str,
    token: &str,
    insecure_skip_tls_verify: bool,
) -> Result<Kubeconfig> {
    let server = format!(
        "{}{}/{}",
        site_url.trim_end_matches('/'),
        CLUSTER_PROXY_PREFIX,
        cluster_id
    );
    let document = serde_json::json!({
        "apiVersion": "v1",
        "kind": "Config",
        "clusters": [{
            "name": cluster_id,
            "cluster": {
                "server": server,
                "insecure-skip-tls-verify": insecure_skip_tls_verify,
            }
        }],
        "users": [{
            "name": "courier",
            "user": { "token": token }
        }],
        "contexts": [{
            "name": cluster_id,
            "context": { "cluster": cluster_id, "user": "courier" }
        }],
        "current-context": cluster_id,
    });

    serde_json::from_value(document)
        .map_err(|e| CourierError::Kubeconfig(format!("Failed to build proxy kubeconfig: {}", e)))
}

/// Create a Kubernetes client from a parsed kubeconfig
#[instrument(skip(kubeconfig))]
pub async fn create_client(kubeconfig: Kubeconfig) -> Result<Client> {
    let options = KubeConfigOptions::default();
    let client_config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
        .await
        .map_err(|e| CourierError::Kubeconfig(format!("Failed to create config: {}", e)))?;

    debug!("Creating client for {}", client_config.cluster_url);

    Client::try_from(client_config)
        .map_err(|e| CourierError::Kubeconfig(format!("Failed to create client: {}", e)))
}
