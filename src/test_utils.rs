// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities: a mock Kubernetes API service and an in-memory cluster adapter.

use crate::cluster::{ClusterAdapter, ConnectionStatus};
use crate::error::CourierError;
use crate::factory::AdapterResolver;
use crate::types::{AppInstance, BackendKind, NamespaceInfo, Workload, WorkloadKind, WorkloadState};
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request seen by the mock, with its body decoded as UTF-8
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// A mock HTTP service that returns predefined responses based on request paths.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the path
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.on("GET", path, status, body)
    }

    /// Add a response for PUT requests matching the path
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.on("PUT", path, status, body)
    }

    fn on(self, method: &str, path: &str, status: u16, body: &str) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert((method.to_string(), path.to_string()), (status, body.to_string()));
        self
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests received with the given method
    pub fn requests_with_method(&self, method: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Build a kube Client from this mock service. The mock stays usable for
    /// inspecting recorded requests.
    pub fn client(&self) -> Client {
        Client::new(self.clone(), "default")
    }

    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(resp) = responses.get(&(method.to_string(), path.to_string())) {
            return Some(resp.clone());
        }

        // Then the longest registered prefix
        responses
            .iter()
            .filter(|((m, p), _)| m == method && path.starts_with(p.as_str()))
            .max_by_key(|((_, p), _)| p.len())
            .map(|(_, resp)| resp.clone())
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let method = req.method().to_string();
        let path = req.uri().path().to_string();

        let response = self.find_response(&method, &path);
        let requests = self.requests.clone();

        Box::pin(async move {
            let body: Bytes = req.into_body().collect().await?.to_bytes();
            requests.lock().unwrap().push(RecordedRequest {
                method,
                path,
                body: String::from_utf8_lossy(&body).into_owned(),
            });

            match response {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = status_json(404, "NotFound", "not found");
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.into_bytes()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace object
pub fn namespace_json(name: &str) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        },
        "status": { "phase": "Active" }
    })
}

/// Wrap objects into a list response body
pub fn list_json(kind: &str, items: Vec<serde_json::Value>) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": kind,
        "metadata": { "resourceVersion": "1" },
        "items": items
    })
    .to_string()
}

/// Create a Kubernetes Status failure body
pub fn status_json(code: u16, reason: &str, message: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code
    })
    .to_string()
}

/// A Deployment with one container
pub fn deployment_json(
    name: &str,
    image: &str,
    replicas: i32,
    available: i32,
) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "apps/v1",
        "kind": "Deployment",
        "metadata": { "name": name, "namespace": "prod" },
        "spec": {
            "replicas": replicas,
            "selector": { "matchLabels": { "app": name } },
            "template": {
                "metadata": { "labels": { "app": name } },
                "spec": { "containers": [
                    { "name": name, "image": image },
                    { "name": "sidecar", "image": "envoyproxy/envoy:v1.30" }
                ] }
            }
        },
        "status": { "availableReplicas": available, "replicas": replicas }
    })
}

/// A ConfigMap with string data
pub fn config_map_json(name: &str, data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": { "name": name, "namespace": "prod", "labels": { "app": "api" } },
        "data": data
    })
}

/// A Secret; `data` values must already be base64 encoded
pub fn secret_json(name: &str, type_: &str, data: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Secret",
        "metadata": { "name": name, "namespace": "prod" },
        "type": type_,
        "data": data
    })
}

type ObjectKey = (String, String);

/// In-memory cluster adapter holding workload images, ConfigMaps and Secrets
/// keyed by (namespace, name)
#[derive(Default)]
pub struct FakeCluster {
    images: Mutex<HashMap<ObjectKey, String>>,
    config_maps: Mutex<HashMap<ObjectKey, BTreeMap<String, String>>>,
    secrets: Mutex<HashMap<ObjectKey, BTreeMap<String, String>>>,
}

fn object_key(namespace: &str, name: &str) -> ObjectKey {
    (namespace.to_string(), name.to_string())
}

fn to_map(data: &[(&str, &str)]) -> BTreeMap<String, String> {
    data.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

impl FakeCluster {
    pub fn with_workload(self, namespace: &str, name: &str, image: &str) -> Self {
        self.images
            .lock()
            .unwrap()
            .insert(object_key(namespace, name), image.to_string());
        self
    }

    pub fn with_config_map(self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        self.config_maps
            .lock()
            .unwrap()
            .insert(object_key(namespace, name), to_map(data));
        self
    }

    pub fn with_secret(self, namespace: &str, name: &str, data: &[(&str, &str)]) -> Self {
        self.secrets
            .lock()
            .unwrap()
            .insert(object_key(namespace, name), to_map(data));
        self
    }

    pub fn image(&self, namespace: &str, name: &str) -> Option<String> {
        self.images.lock().unwrap().get(&object_key(namespace, name)).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.config_maps.lock().unwrap().get(&object_key(namespace, name)).cloned()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<BTreeMap<String, String>> {
        self.secrets.lock().unwrap().get(&object_key(namespace, name)).cloned()
    }

    fn merge(
        objects: &Mutex<HashMap<ObjectKey, BTreeMap<String, String>>>,
        namespace: &str,
        name: &str,
        keys: &BTreeMap<String, String>,
    ) -> crate::error::Result<()> {
        let mut objects = objects.lock().unwrap();
        let data = objects
            .get_mut(&object_key(namespace, name))
            .ok_or_else(|| CourierError::NotFound(format!("{}/{}", namespace, name)))?;
        data.extend(keys.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

#[async_trait]
impl ClusterAdapter for FakeCluster {
    fn backend(&self) -> BackendKind {
        BackendKind::Direct
    }

    async fn test_connection(&self) -> ConnectionStatus {
        ConnectionStatus::ok("Connected to fake cluster", None)
    }

    async fn list_namespaces(
        &self,
        _cluster: Option<&str>,
    ) -> crate::error::Result<Vec<NamespaceInfo>> {
        Ok(Vec::new())
    }

    async fn client(&self, _cluster: &str) -> crate::error::Result<Client> {
        Err(CourierError::OperationNotSupported("fake cluster has no API server".to_string()))
    }

    async fn list_workloads(
        &self,
        _cluster: &str,
        namespace: &str,
    ) -> crate::error::Result<Vec<Workload>> {
        Ok(self
            .images
            .lock()
            .unwrap()
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .map(|((_, name), image)| Workload {
                name: name.clone(),
                kind: WorkloadKind::Deployment,
                state: WorkloadState::Active,
                image: image.clone(),
                scale: 1,
                available_replicas: 1,
            })
            .collect())
    }

    async fn update_workload_image(
        &self,
        _cluster: &str,
        namespace: &str,
        name: &str,
        kind: &str,
        image: &str,
    ) -> crate::error::Result<()> {
        WorkloadKind::parse(kind)?;
        let mut images = self.images.lock().unwrap();
        let current = images
            .get_mut(&object_key(namespace, name))
            .ok_or_else(|| CourierError::NotFound(format!("{} {}/{}", kind, namespace, name)))?;
        *current = image.to_string();
        Ok(())
    }

    async fn get_config_map_keys(
        &self,
        _cluster: &str,
        namespace: &str,
        name: &str,
    ) -> crate::error::Result<BTreeMap<String, String>> {
        self.config_map(namespace, name)
            .ok_or_else(|| CourierError::NotFound(format!("ConfigMap {}/{}", namespace, name)))
    }

    async fn sync_config_map_keys(
        &self,
        _cluster: &str,
        namespace: &str,
        name: &str,
        keys: &BTreeMap<String, String>,
    ) -> crate::error::Result<()> {
        Self::merge(&self.config_maps, namespace, name, keys)
    }

    async fn get_secret_keys(
        &self,
        _cluster: &str,
        namespace: &str,
        name: &str,
    ) -> crate::error::Result<Vec<String>> {
        self.secret(namespace, name)
            .map(|data| data.into_keys().collect())
            .ok_or_else(|| CourierError::NotFound(format!("Secret {}/{}", namespace, name)))
    }

    async fn sync_secret_keys(
        &self,
        _cluster: &str,
        namespace: &str,
        name: &str,
        keys: &BTreeMap<String, String>,
    ) -> crate::error::Result<()> {
        Self::merge(&self.secrets, namespace, name, keys)
    }
}

/// Resolves every app instance to the same fake cluster
pub struct FakeResolver(pub Arc<FakeCluster>);

#[async_trait]
impl AdapterResolver for FakeResolver {
    async fn resolve_cluster_adapter(
        &self,
        _instance: &AppInstance,
    ) -> crate::error::Result<Arc<dyn ClusterAdapter>> {
        Ok(self.0.clone())
    }
}
