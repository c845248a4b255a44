// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the clusters of an app instance are reached
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Through a management plane that proxies many clusters behind one token
    Proxied,
    /// Through the cluster's own credential bundle
    Direct,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Proxied => f.write_str("proxied"),
            BackendKind::Direct => f.write_str("direct"),
        }
    }
}

/// Management plane site, clusters addressed by id through its proxy
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxiedSite {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing)]
    pub token: String,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
    #[serde(default)]
    pub active: bool,
}

/// Site backed by a kubeconfig bundle for exactly one cluster
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DirectSite {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(skip_serializing)]
    pub kubeconfig: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ClusterSite {
    Proxied(ProxiedSite),
    Direct(DirectSite),
}

impl ClusterSite {
    pub fn kind(&self) -> BackendKind {
        match self {
            ClusterSite::Proxied(_) => BackendKind::Proxied,
            ClusterSite::Direct(_) => BackendKind::Direct,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            ClusterSite::Proxied(s) => s.id,
            ClusterSite::Direct(s) => s.id,
        }
    }

    pub fn is_active(&self) -> bool {
        match self {
            ClusterSite::Proxied(s) => s.active,
            ClusterSite::Direct(s) => s.active,
        }
    }
}

/// Project-scoped registry (Harbor style)
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRegistrySite {
    pub id: i64,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default)]
    pub insecure_skip_tls_verify: bool,
}

/// The single site an app instance is bound to
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum InstanceBackend {
    Proxied {
        #[serde(rename = "siteId")]
        site_id: i64,
    },
    Direct {
        #[serde(rename = "siteId")]
        site_id: i64,
    },
}

impl InstanceBackend {
    pub fn new(kind: BackendKind, site_id: i64) -> Self {
        match kind {
            BackendKind::Proxied => InstanceBackend::Proxied { site_id },
            BackendKind::Direct => InstanceBackend::Direct { site_id },
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            InstanceBackend::Proxied { .. } => BackendKind::Proxied,
            InstanceBackend::Direct { .. } => BackendKind::Direct,
        }
    }

    pub fn site_id(&self) -> i64 {
        match self {
            InstanceBackend::Proxied { site_id } | InstanceBackend::Direct { site_id } => *site_id,
        }
    }
}

/// A (cluster, namespace) deployment target
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppInstance {
    pub id: i64,
    pub name: String,
    pub cluster_id: String,
    pub namespace: String,
    #[serde(flatten)]
    pub backend: InstanceBackend,
    pub environment_id: i64,
    /// Preloaded site record, fetched from the store when absent
    #[serde(skip)]
    pub site: Option<ClusterSite>,
}

impl AppInstance {
    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Rebind the instance to another site; the previous reference and any
    /// preloaded site are dropped together.
    pub fn switch_backend(&mut self, kind: BackendKind, site_id: i64) {
        self.backend = InstanceBackend::new(kind, site_id);
        self.site = None;
    }

    /// Preloaded site, only when it matches the current backend reference
    pub fn preloaded_site(&self) -> Option<&ClusterSite> {
        self.site
            .as_ref()
            .filter(|s| s.kind() == self.backend.kind() && s.id() == self.backend.site_id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_instance() -> AppInstance {
        AppInstance {
            id: 1,
            name: "api-prod".to_string(),
            cluster_id: "c-abc12".to_string(),
            namespace: "prod".to_string(),
            backend: InstanceBackend::Proxied { site_id: 7 },
            environment_id: 3,
            site: Some(ClusterSite::Proxied(ProxiedSite {
                id: 7,
                name: "rancher".to_string(),
                url: "https://rancher.example.com".to_string(),
                token: "token-xyz".to_string(),
                insecure_skip_tls_verify: false,
                active: true,
            })),
        }
    }

    #[test]
    fn test_switch_backend_drops_previous_reference() {
        let mut instance = make_instance();
        instance.switch_backend(BackendKind::Direct, 12);

        assert_eq!(instance.backend_kind(), BackendKind::Direct);
        assert_eq!(instance.backend, InstanceBackend::Direct { site_id: 12 });
        assert!(instance.site.is_none());
    }

    #[test]
    fn test_preloaded_site_matches_backend() {
        let instance = make_instance();
        assert_eq!(instance.preloaded_site().map(|s| s.id()), Some(7));
    }

    #[test]
    fn test_preloaded_site_ignored_when_mismatched() {
        let mut instance = make_instance();
        instance.backend = InstanceBackend::Proxied { site_id: 8 };
        assert!(instance.preloaded_site().is_none());
    }

    #[test]
    fn test_instance_backend_deserializes_from_yaml() {
        let yaml = r#"
id: 4
name: web-stage
clusterId: local
namespace: stage
backend: direct
siteId: 2
environmentId: 1
"#;
        let instance: AppInstance = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(instance.backend, InstanceBackend::Direct { site_id: 2 });
        assert!(instance.site.is_none());
    }

    #[test]
    fn test_site_token_not_serialized() {
        let site = ProxiedSite {
            id: 1,
            name: "rancher".to_string(),
            url: "https://rancher.example.com".to_string(),
            token: "token-secret".to_string(),
            insecure_skip_tls_verify: false,
            active: false,
        };
        let json = serde_json::to_string(&site).unwrap();
        assert!(!json.contains("token-secret"));
    }
}
