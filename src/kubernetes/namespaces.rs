// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace listing

use crate::error::{CourierError, Result};
use crate::types::NamespaceInfo;
use k8s_openapi::api::core::v1::Namespace;
use kube::{api::ListParams, Api, Client, ResourceExt};
use tracing::{debug, instrument};

/// List all namespaces, tagging each with the cluster it was read from
#[instrument(skip(client))]
pub async fn list_namespaces(
    client: &Client,
    cluster_id: Option<&str>,
) -> Result<Vec<NamespaceInfo>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let list = namespaces
        .list(&ListParams::default())
        .await
        .map_err(|e| CourierError::from_kube(e, "Failed to list namespaces"))?;

    debug!("Found {} namespaces", list.items.len());

    Ok(list
        .items
        .into_iter()
        .map(|ns| NamespaceInfo {
            name: ns.name_any(),
            cluster_id: cluster_id.map(str::to_string),
            phase: ns.status.and_then(|s| s.phase),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{list_json, namespace_json, MockService};

    #[tokio::test]
    async fn test_list_namespaces() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces",
                200,
                &list_json(
                    "NamespaceList",
                    vec![namespace_json("default"), namespace_json("prod")],
                ),
            )
            .into_client();

        let namespaces = list_namespaces(&client, Some("c-1")).await.unwrap();

        assert_eq!(namespaces.len(), 2);
        assert_eq!(namespaces[0].name, "default");
        assert_eq!(namespaces[1].cluster_id.as_deref(), Some("c-1"));
        assert_eq!(namespaces[1].phase.as_deref(), Some("Active"));
    }

    #[tokio::test]
    async fn test_list_namespaces_forbidden() {
        let client = MockService::new()
            .on_get(
                "/api/v1/namespaces",
                403,
                &crate::test_utils::status_json(403, "Forbidden", "namespaces is forbidden"),
            )
            .into_client();

        let err = list_namespaces(&client, None).await.unwrap_err();
        assert!(matches!(err, CourierError::AuthFailed(_)));
    }
}
