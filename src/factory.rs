// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Resolution of cluster and registry adapters from stored records and image references

use crate::cluster::{ClusterAdapter, ConnectionStatus, DirectClusterAdapter, ProxiedClusterAdapter};
use crate::config::Config;
use crate::error::{CourierError, Result};
use crate::image::normalize_host;
use crate::registry::{BaseUrlCache, FlatRegistryAdapter, ProjectRegistryAdapter, RegistryAdapter};
use crate::store::Store;
use crate::types::{AppInstance, BackendKind, ClusterSite};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// Registry host segment of an image reference, if it has one
pub fn image_host(image: &str) -> Option<&str> {
    image
        .trim()
        .split_once('/')
        .map(|(host, _)| host)
        .filter(|host| !host.is_empty())
}

/// Resolves the cluster adapter serving an app instance
#[async_trait]
pub trait AdapterResolver: Send + Sync {
    async fn resolve_cluster_adapter(
        &self,
        instance: &AppInstance,
    ) -> Result<Arc<dyn ClusterAdapter>>;
}

pub struct AdapterFactory {
    store: Arc<dyn Store>,
    http_timeout: Duration,
    flat_registry_url: String,
    base_urls: BaseUrlCache,
}

impl AdapterFactory {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        Self::with_settings(store, config.http_timeout, &config.flat_registry_url)
    }

    pub fn with_settings(
        store: Arc<dyn Store>,
        http_timeout: Duration,
        flat_registry_url: &str,
    ) -> Self {
        Self {
            store,
            http_timeout,
            flat_registry_url: flat_registry_url.to_string(),
            base_urls: BaseUrlCache::default(),
        }
    }

    fn build_cluster_adapter(&self, site: ClusterSite) -> Result<Arc<dyn ClusterAdapter>> {
        Ok(match site {
            ClusterSite::Proxied(site) => {
                Arc::new(ProxiedClusterAdapter::new(site, self.http_timeout)?)
            }
            ClusterSite::Direct(site) => Arc::new(DirectClusterAdapter::new(site)?),
        })
    }

    /// Adapter for a site, independent of any app instance
    #[instrument(skip(self))]
    pub async fn resolve_site_adapter(
        &self,
        kind: BackendKind,
        site_id: i64,
    ) -> Result<Arc<dyn ClusterAdapter>> {
        let site = self
            .store
            .find_cluster_site(kind, site_id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("{} site {}", kind, site_id)))?;
        self.build_cluster_adapter(site)
    }

    /// Connectivity check for a site; failures, including a missing site, are reported
    pub async fn test_site_connection(&self, kind: BackendKind, site_id: i64) -> ConnectionStatus {
        match self.resolve_site_adapter(kind, site_id).await {
            Ok(adapter) => adapter.test_connection().await,
            Err(e) => ConnectionStatus::failed(e.to_string()),
        }
    }

    /// Adapter for the registry serving an image. Images whose host matches no
    /// configured project registry, or that carry no host at all, go to the
    /// flat registry.
    #[instrument(skip(self))]
    pub async fn resolve_registry_adapter(&self, image: &str) -> Result<Arc<dyn RegistryAdapter>> {
        self.resolve_registry_for_host(image_host(image)).await
    }

    /// Adapter for a registry host, the flat registry when none matches
    pub async fn resolve_registry_for_host(
        &self,
        host: Option<&str>,
    ) -> Result<Arc<dyn RegistryAdapter>> {
        if let Some(host) = host.and_then(normalize_host) {
            let site = self
                .store
                .list_registry_sites()
                .await?
                .into_iter()
                .find(|site| normalize_host(&site.url).as_deref() == Some(host.as_str()));

            if let Some(site) = site {
                debug!("Host {} served by registry {}", host, site.name);
                return Ok(Arc::new(ProjectRegistryAdapter::new(
                    site,
                    self.base_urls.clone(),
                    self.http_timeout,
                )?));
            }
        }

        debug!("No project registry for {:?}, using flat registry", host);
        Ok(Arc::new(FlatRegistryAdapter::new(&self.flat_registry_url, self.http_timeout)?))
    }
}

#[async_trait]
impl AdapterResolver for AdapterFactory {
    /// Uses the preloaded site when it matches the instance backend, otherwise fetches it
    async fn resolve_cluster_adapter(
        &self,
        instance: &AppInstance,
    ) -> Result<Arc<dyn ClusterAdapter>> {
        match instance.preloaded_site() {
            Some(site) => self.build_cluster_adapter(site.clone()),
            None => {
                self.resolve_site_adapter(instance.backend_kind(), instance.backend.site_id())
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Inventory, MemoryStore};
    use crate::types::{InstanceBackend, ProxiedSite};

    const INVENTORY: &str = r#"
proxiedSites:
  - id: 1
    name: rancher
    url: https://rancher.example.com
    token: token-abc
registries:
  - id: 1
    name: harbor
    url: https://Harbor.Example.com/
  - id: 2
    name: harbor-lab
    url: http://registry.lab:8443/harbor
"#;

    fn factory() -> AdapterFactory {
        let store = MemoryStore::from_inventory(Inventory::from_yaml(INVENTORY).unwrap());
        AdapterFactory::with_settings(
            Arc::new(store),
            Duration::from_secs(5),
            "https://hub.docker.com",
        )
    }

    fn instance(backend: InstanceBackend) -> AppInstance {
        AppInstance {
            id: 1,
            name: "api-prod".to_string(),
            cluster_id: "c-1".to_string(),
            namespace: "prod".to_string(),
            backend,
            environment_id: 1,
            site: None,
        }
    }

    #[test]
    fn test_image_host() {
        assert_eq!(image_host("harbor.example.com/proj/api:v1"), Some("harbor.example.com"));
        assert_eq!(image_host("bitnami/redis"), Some("bitnami"));
        assert_eq!(image_host("nginx:1.27"), None);
    }

    #[tokio::test]
    async fn test_registry_routing_by_host() {
        let factory = factory();

        let adapter = factory
            .resolve_registry_adapter("harbor.example.com/proj/api:v1")
            .await
            .unwrap();
        assert_eq!(adapter.registry_type(), "harbor");
        assert_eq!(adapter.parse_image("harbor.example.com/proj/api:v1").project, "proj");

        let adapter = factory
            .resolve_registry_adapter("registry.lab:8443/team/app")
            .await
            .unwrap();
        assert_eq!(adapter.known_host(), Some("registry.lab:8443"));

        let adapter = factory
            .resolve_registry_for_host(Some("https://harbor.example.com"))
            .await
            .unwrap();
        assert!(adapter.capabilities().supports_projects);
    }

    #[tokio::test]
    async fn test_routed_image_parses_against_the_same_host() {
        let factory = factory();
        for image in ["harbor.example.com:443/proj/api:v1", "Harbor.Example.com/proj/api:v1"] {
            let adapter = factory.resolve_registry_adapter(image).await.unwrap();
            assert_eq!(adapter.registry_type(), "harbor", "{}", image);

            let reference = adapter.parse_image(image);
            assert_eq!(reference.project, "proj", "{}", image);
            assert_eq!(reference.repository, "api", "{}", image);
        }
    }

    #[tokio::test]
    async fn test_registry_falls_back_to_flat() {
        let factory = factory();
        for image in ["nginx", "bitnami/redis:7.2", "ghcr.io/org/app:v1"] {
            let adapter = factory.resolve_registry_adapter(image).await.unwrap();
            assert_eq!(adapter.registry_type(), "dockerhub", "{}", image);
            assert!(!adapter.capabilities().supports_projects);
        }
    }

    #[tokio::test]
    async fn test_resolve_cluster_adapter_fetches_site() {
        let adapter = factory()
            .resolve_cluster_adapter(&instance(InstanceBackend::Proxied { site_id: 1 }))
            .await
            .unwrap();
        assert_eq!(adapter.backend(), BackendKind::Proxied);
    }

    #[tokio::test]
    async fn test_resolve_cluster_adapter_missing_site() {
        let err = factory()
            .resolve_cluster_adapter(&instance(InstanceBackend::Direct { site_id: 5 }))
            .await
            .err()
            .unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_resolve_cluster_adapter_uses_preloaded_site() {
        let mut app = instance(InstanceBackend::Proxied { site_id: 7 });
        app.site = Some(ClusterSite::Proxied(ProxiedSite {
            id: 7,
            name: "preloaded".to_string(),
            url: "https://rancher-2.example.com".to_string(),
            token: "t".to_string(),
            insecure_skip_tls_verify: false,
            active: false,
        }));

        let adapter = factory().resolve_cluster_adapter(&app).await.unwrap();
        assert_eq!(adapter.backend(), BackendKind::Proxied);
    }

    #[tokio::test]
    async fn test_site_connection_missing_site_is_reported() {
        let status = factory().test_site_connection(BackendKind::Direct, 3).await;
        assert!(!status.success);
        assert!(status.message.contains("Not found"));
    }
}
