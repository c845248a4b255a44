// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Secrets that are managed by Kubernetes or operators and never listed
pub mod secrets {
    /// Secret types excluded from listings
    pub const EXCLUDED_TYPES: &[&str] = &[
        "kubernetes.io/service-account-token",
        "kubernetes.io/dockerconfigjson",
        "kubernetes.io/dockercfg",
    ];
    /// Name prefix of legacy service account token secrets
    pub const DEFAULT_TOKEN_PREFIX: &str = "default-token-";
}

/// Management plane (Rancher) API paths
pub mod proxied {
    /// Path of the cluster listing endpoint
    pub const CLUSTERS_PATH: &str = "/v3/clusters";
    /// Prefix of the per-cluster Kubernetes API proxy, followed by the cluster id
    pub const CLUSTER_PROXY_PREFIX: &str = "/k8s/clusters";
}

/// Container registry constants
pub mod registry {
    /// Namespace or project assumed for single-segment image references
    pub const DEFAULT_NAMESPACE: &str = "library";
    /// Tag assumed when an image reference carries none
    pub const DEFAULT_TAG: &str = "latest";
    /// Page size used for all paginated registry listings
    pub const PAGE_SIZE: usize = 100;
    /// Maximum artifact pages searched when looking up a single tag
    pub const TAG_DETAIL_MAX_PAGES: usize = 5;
    /// Maximum pages followed for project, repository and tag listings
    pub const LIST_MAX_PAGES: usize = 50;
    /// API base path candidates for project-scoped registries, most recent first
    pub const PROJECT_API_PATHS: &[&str] = &["/api/v2.0", "/api"];
}

/// Status stored on a service record after it was synced
pub const SYNCED_STATUS: &str = "synced";
