// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Deployment, DaemonSet and StatefulSet reads and image updates

use crate::error::{CourierError, Result};
use crate::types::{HealthSignals, Workload, WorkloadKind};
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{PodSpec, PodTemplateSpec};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{ListParams, PostParams},
    Api, Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// List every Deployment, DaemonSet and StatefulSet in a namespace
#[instrument(skip(client))]
pub async fn list_workloads(client: &Client, namespace: &str) -> Result<Vec<Workload>> {
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let daemon_sets: Api<DaemonSet> = Api::namespaced(client.clone(), namespace);
    let stateful_sets: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
    let lp = ListParams::default();
    let context = |kind: &str| format!("Failed to list {} in {}", kind, namespace);

    let (deployments, daemon_sets, stateful_sets) = tokio::try_join!(
        async {
            deployments
                .list(&lp)
                .await
                .map_err(|e| CourierError::from_kube(e, context("deployments")))
        },
        async {
            daemon_sets
                .list(&lp)
                .await
                .map_err(|e| CourierError::from_kube(e, context("daemonsets")))
        },
        async {
            stateful_sets
                .list(&lp)
                .await
                .map_err(|e| CourierError::from_kube(e, context("statefulsets")))
        },
    )?;

    let workloads: Vec<Workload> = deployments
        .items
        .iter()
        .map(deployment_workload)
        .chain(daemon_sets.items.iter().map(daemon_set_workload))
        .chain(stateful_sets.items.iter().map(stateful_set_workload))
        .collect();

    debug!("Found {} workloads in {}", workloads.len(), namespace);
    Ok(workloads)
}

/// Replace the image of the first container of a workload. Returns the previous image.
#[instrument(skip(client))]
pub async fn update_workload_image(
    client: &Client,
    namespace: &str,
    name: &str,
    kind: WorkloadKind,
    image: &str,
) -> Result<String> {
    let previous = match kind {
        WorkloadKind::Deployment => {
            let api: Api<Deployment> = Api::namespaced(client.clone(), namespace);
            replace_first_image(api, name, image, deployment_pod_spec).await?
        }
        WorkloadKind::DaemonSet => {
            let api: Api<DaemonSet> = Api::namespaced(client.clone(), namespace);
            replace_first_image(api, name, image, daemon_set_pod_spec).await?
        }
        WorkloadKind::StatefulSet => {
            let api: Api<StatefulSet> = Api::namespaced(client.clone(), namespace);
            replace_first_image(api, name, image, stateful_set_pod_spec).await?
        }
    };

    info!(
        "Updated {} {}/{} image from {} to {}",
        kind, namespace, name, previous, image
    );
    Ok(previous)
}

async fn replace_first_image<K>(
    api: Api<K>,
    name: &str,
    image: &str,
    pod_spec: fn(&mut K) -> Option<&mut PodSpec>,
) -> Result<String>
where
    K: Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Serialize + Debug,
    K::DynamicType: Default,
{
    let kind = K::kind(&K::DynamicType::default()).to_string();
    let mut workload = api
        .get(name)
        .await
        .map_err(|e| CourierError::from_kube(e, format!("Failed to read {} {}", kind, name)))?;

    let container = pod_spec(&mut workload)
        .and_then(|spec| spec.containers.first_mut())
        .ok_or_else(|| CourierError::Adapter(format!("{} {} has no containers", kind, name)))?;
    let previous = container.image.replace(image.to_string()).unwrap_or_default();

    api.replace(name, &PostParams::default(), &workload)
        .await
        .map_err(|e| CourierError::from_kube(e, format!("Failed to update {} {}", kind, name)))?;

    Ok(previous)
}

fn deployment_pod_spec(d: &mut Deployment) -> Option<&mut PodSpec> {
    d.spec.as_mut().and_then(|s| s.template.spec.as_mut())
}

fn daemon_set_pod_spec(d: &mut DaemonSet) -> Option<&mut PodSpec> {
    d.spec.as_mut().and_then(|s| s.template.spec.as_mut())
}

fn stateful_set_pod_spec(s: &mut StatefulSet) -> Option<&mut PodSpec> {
    s.spec.as_mut().and_then(|s| s.template.spec.as_mut())
}

fn first_image(template: Option<&PodTemplateSpec>) -> String {
    template
        .and_then(|t| t.spec.as_ref())
        .and_then(|s| s.containers.first())
        .and_then(|c| c.image.clone())
        .unwrap_or_default()
}

fn is_ready_condition(type_: &str, status: &str) -> bool {
    (type_ == "Available" || type_ == "Ready") && status == "True"
}

fn deployment_workload(d: &Deployment) -> Workload {
    let desired = d.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let status = d.status.as_ref();
    let available = status.and_then(|s| s.available_replicas).unwrap_or(0);
    let condition_ready = status
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|cs| cs.iter().any(|c| is_ready_condition(&c.type_, &c.status)));

    Workload {
        name: d.name_any(),
        kind: WorkloadKind::Deployment,
        state: HealthSignals::Rollout {
            condition_ready,
            available_replicas: available,
            desired_replicas: desired,
        }
        .state(),
        image: first_image(d.spec.as_ref().map(|s| &s.template)),
        scale: desired,
        available_replicas: available,
    }
}

fn stateful_set_workload(s: &StatefulSet) -> Workload {
    let desired = s.spec.as_ref().and_then(|s| s.replicas).unwrap_or(1);
    let status = s.status.as_ref();
    let available = status
        .and_then(|s| s.available_replicas.or(s.ready_replicas))
        .unwrap_or(0);
    let condition_ready = status
        .and_then(|s| s.conditions.as_ref())
        .is_some_and(|cs| cs.iter().any(|c| is_ready_condition(&c.type_, &c.status)));

    Workload {
        name: s.name_any(),
        kind: WorkloadKind::StatefulSet,
        state: HealthSignals::Rollout {
            condition_ready,
            available_replicas: available,
            desired_replicas: desired,
        }
        .state(),
        image: first_image(s.spec.as_ref().map(|s| &s.template)),
        scale: desired,
        available_replicas: available,
    }
}

fn daemon_set_workload(d: &DaemonSet) -> Workload {
    let status = d.status.as_ref();
    let desired = status.map(|s| s.desired_number_scheduled).unwrap_or(0);
    let ready = status.map(|s| s.number_ready).unwrap_or(0);
    let available = status
        .and_then(|s| s.number_available)
        .unwrap_or(ready);

    Workload {
        name: d.name_any(),
        kind: WorkloadKind::DaemonSet,
        state: HealthSignals::DaemonSet {
            number_ready: ready,
            desired_number_scheduled: desired,
        }
        .state(),
        image: first_image(d.spec.as_ref().map(|s| &s.template)),
        scale: desired,
        available_replicas: available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{deployment_json, list_json, status_json, MockService};
    use crate::types::WorkloadState;

    fn daemon_set_json(name: &str, ready: i32, desired: i32) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "DaemonSet",
            "metadata": { "name": name },
            "spec": {
                "selector": { "matchLabels": { "app": name } },
                "template": {
                    "spec": { "containers": [{ "name": name, "image": "fluent/fluent-bit:3.0" }] }
                }
            },
            "status": {
                "currentNumberScheduled": desired,
                "desiredNumberScheduled": desired,
                "numberMisscheduled": 0,
                "numberReady": ready
            }
        })
    }

    fn stateful_set_json(name: &str) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "apps/v1",
            "kind": "StatefulSet",
            "metadata": { "name": name },
            "spec": {
                "replicas": 3,
                "serviceName": name,
                "selector": { "matchLabels": { "app": name } },
                "template": { "spec": { "containers": [{ "name": name, "image": "postgres:16" }] } }
            },
            "status": {
                "replicas": 3,
                "availableReplicas": 1,
                "conditions": [{ "type": "Ready", "status": "True" }]
            }
        })
    }

    fn mock_with_workloads() -> MockService {
        MockService::new()
            .on_get(
                "/apis/apps/v1/namespaces/prod/deployments",
                200,
                &list_json(
                    "DeploymentList",
                    vec![
                        deployment_json("api", "registry.example.com/proj/api:v1", 2, 2),
                        deployment_json("worker", "registry.example.com/proj/worker:v3", 3, 1),
                    ],
                ),
            )
            .on_get(
                "/apis/apps/v1/namespaces/prod/daemonsets",
                200,
                &list_json("DaemonSetList", vec![daemon_set_json("logs", 2, 3)]),
            )
            .on_get(
                "/apis/apps/v1/namespaces/prod/statefulsets",
                200,
                &list_json("StatefulSetList", vec![stateful_set_json("db")]),
            )
    }

    #[tokio::test]
    async fn test_list_workloads_aggregates_all_kinds() {
        let client = mock_with_workloads().into_client();

        let mut workloads = list_workloads(&client, "prod").await.unwrap();
        workloads.sort_by(|a, b| a.name.cmp(&b.name));

        let names: Vec<&str> = workloads.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(names, vec!["api", "db", "logs", "worker"]);

        let api = &workloads[0];
        assert_eq!(api.kind, WorkloadKind::Deployment);
        assert_eq!(api.image, "registry.example.com/proj/api:v1");
        assert_eq!(api.state, WorkloadState::Active);
        assert_eq!(api.scale, 2);

        let db = &workloads[1];
        assert_eq!(db.kind, WorkloadKind::StatefulSet);
        assert_eq!(db.state, WorkloadState::Active, "Ready condition wins over replica count");
        assert_eq!(db.available_replicas, 1);

        let logs = &workloads[2];
        assert_eq!(logs.kind, WorkloadKind::DaemonSet);
        assert_eq!(logs.state, WorkloadState::Inactive);
        assert_eq!(logs.scale, 3);

        assert_eq!(workloads[3].state, WorkloadState::Inactive);
    }

    #[tokio::test]
    async fn test_list_workloads_propagates_errors() {
        let client = mock_with_workloads()
            .on_get(
                "/apis/apps/v1/namespaces/prod/daemonsets",
                401,
                &status_json(401, "Unauthorized", "Unauthorized"),
            )
            .into_client();

        let err = list_workloads(&client, "prod").await.unwrap_err();
        assert!(matches!(err, CourierError::AuthFailed(_)));
    }

    #[tokio::test]
    async fn test_update_workload_image_replaces_first_container_only() {
        let current = deployment_json("api", "registry.example.com/proj/api:v1", 2, 2);
        let updated = deployment_json("api", "registry.example.com/proj/api:v2", 2, 2);
        let mock = MockService::new()
            .on_get("/apis/apps/v1/namespaces/prod/deployments/api", 200, &current.to_string())
            .on_put("/apis/apps/v1/namespaces/prod/deployments/api", 200, &updated.to_string());

        let previous = update_workload_image(
            &mock.client(),
            "prod",
            "api",
            WorkloadKind::Deployment,
            "registry.example.com/proj/api:v2",
        )
        .await
        .unwrap();

        assert_eq!(previous, "registry.example.com/proj/api:v1");

        let puts = mock.requests_with_method("PUT");
        assert_eq!(puts.len(), 1);
        let containers = puts[0].json()["spec"]["template"]["spec"]["containers"].clone();
        assert_eq!(containers[0]["image"], "registry.example.com/proj/api:v2");
        assert_eq!(containers[1]["image"], "envoyproxy/envoy:v1.30");
    }

    #[tokio::test]
    async fn test_update_workload_image_missing_workload() {
        let client = MockService::new().into_client();

        let err = update_workload_image(&client, "prod", "ghost", WorkloadKind::StatefulSet, "x:1")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
