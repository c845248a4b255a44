// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Plain data shared between adapters, the store and the sync engine.

pub mod config_data;
pub mod registry;
pub mod site;
pub mod sync;
pub mod workload;

pub use config_data::{ConfigMapSnapshot, SecretSnapshot};
pub use registry::{
    Platform, Project, RegistryCapabilities, Repository, RepositoryRef, Tag, TagDetail,
};
pub use site::{
    AppInstance, BackendKind, ClusterSite, DirectSite, InstanceBackend, ProjectRegistrySite,
    ProxiedSite,
};
pub use sync::{
    HistoryStatus, Location, OperationStatus, ResourceType, ServiceRecord, SyncHistory,
    SyncOperation,
};
pub use workload::{
    normalize_kind, HealthSignals, NamespaceInfo, Workload, WorkloadKind, WorkloadState,
};
