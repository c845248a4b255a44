// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Persistence of sites, app instances, service records and sync audit rows.
//!
//! Every method is atomic at the single-record level; nothing here spans
//! records in one transaction.

use crate::error::{CourierError, Result};
use crate::types::{
    AppInstance, BackendKind, ClusterSite, DirectSite, ProjectRegistrySite, ProxiedSite,
    ServiceRecord, SyncHistory, SyncOperation,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[async_trait]
pub trait Store: Send + Sync {
    async fn find_cluster_site(&self, kind: BackendKind, id: i64) -> Result<Option<ClusterSite>>;

    async fn list_cluster_sites(&self, kind: BackendKind) -> Result<Vec<ClusterSite>>;

    /// Mark one site active and deactivate its siblings of the same kind
    async fn set_active_cluster_site(&self, kind: BackendKind, id: i64) -> Result<()>;

    async fn list_registry_sites(&self) -> Result<Vec<ProjectRegistrySite>>;

    async fn find_app_instance(&self, id: i64) -> Result<Option<AppInstance>>;

    async fn find_service(&self, id: i64) -> Result<Option<ServiceRecord>>;

    async fn find_service_by_name(
        &self,
        instance_id: i64,
        name: &str,
    ) -> Result<Option<ServiceRecord>>;

    async fn list_services(&self, instance_id: i64) -> Result<Vec<ServiceRecord>>;

    /// Insert or update by id, or by (instance, name) when the id is unset.
    /// Returns the stored record.
    async fn upsert_service(&self, record: ServiceRecord) -> Result<ServiceRecord>;

    /// Remove a service record. Returns false if it did not exist.
    async fn delete_service(&self, id: i64) -> Result<bool>;

    async fn append_sync_history(&self, row: SyncHistory) -> Result<SyncHistory>;

    async fn list_sync_history(&self, operation_id: i64) -> Result<Vec<SyncHistory>>;

    async fn find_sync_operation(&self, id: i64) -> Result<Option<SyncOperation>>;

    async fn create_sync_operation(&self, operation: SyncOperation) -> Result<SyncOperation>;

    async fn update_sync_operation(&self, operation: SyncOperation) -> Result<SyncOperation>;
}

/// Seed document for [`MemoryStore`]
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Inventory {
    pub proxied_sites: Vec<ProxiedSite>,
    pub direct_sites: Vec<DirectSite>,
    pub registries: Vec<ProjectRegistrySite>,
    pub instances: Vec<AppInstance>,
    pub services: Vec<ServiceRecord>,
}

impl Inventory {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| CourierError::Store(format!("Invalid inventory: {}", e)))
    }
}

#[derive(Default)]
struct State {
    proxied_sites: BTreeMap<i64, ProxiedSite>,
    direct_sites: BTreeMap<i64, DirectSite>,
    registries: Vec<ProjectRegistrySite>,
    instances: BTreeMap<i64, AppInstance>,
    services: BTreeMap<i64, ServiceRecord>,
    operations: BTreeMap<i64, SyncOperation>,
    history: Vec<SyncHistory>,
    last_service_id: i64,
    last_operation_id: i64,
    last_history_id: i64,
}

impl State {
    fn next_service_id(&mut self) -> i64 {
        self.last_service_id += 1;
        self.last_service_id
    }
}

/// In-process store backed by ordered maps
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_inventory(inventory: Inventory) -> Self {
        let mut state = State {
            proxied_sites: inventory.proxied_sites.into_iter().map(|s| (s.id, s)).collect(),
            direct_sites: inventory.direct_sites.into_iter().map(|s| (s.id, s)).collect(),
            registries: inventory.registries,
            instances: inventory.instances.into_iter().map(|i| (i.id, i)).collect(),
            ..State::default()
        };
        for mut service in inventory.services {
            if service.id == 0 {
                service.id = state.next_service_id();
            }
            state.last_service_id = state.last_service_id.max(service.id);
            state.services.insert(service.id, service);
        }

        info!(
            "Loaded {} proxied sites, {} direct sites, {} registries, {} instances, {} services",
            state.proxied_sites.len(),
            state.direct_sites.len(),
            state.registries.len(),
            state.instances.len(),
            state.services.len()
        );
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_cluster_site(&self, kind: BackendKind, id: i64) -> Result<Option<ClusterSite>> {
        let state = self.state.read().await;
        Ok(match kind {
            BackendKind::Proxied => state.proxied_sites.get(&id).cloned().map(ClusterSite::Proxied),
            BackendKind::Direct => state.direct_sites.get(&id).cloned().map(ClusterSite::Direct),
        })
    }

    async fn list_cluster_sites(&self, kind: BackendKind) -> Result<Vec<ClusterSite>> {
        let state = self.state.read().await;
        Ok(match kind {
            BackendKind::Proxied => {
                state.proxied_sites.values().cloned().map(ClusterSite::Proxied).collect()
            }
            BackendKind::Direct => {
                state.direct_sites.values().cloned().map(ClusterSite::Direct).collect()
            }
        })
    }

    async fn set_active_cluster_site(&self, kind: BackendKind, id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        let not_found = || CourierError::NotFound(format!("{} site {}", kind, id));
        match kind {
            BackendKind::Proxied => {
                if !state.proxied_sites.contains_key(&id) {
                    return Err(not_found());
                }
                for site in state.proxied_sites.values_mut() {
                    site.active = site.id == id;
                }
            }
            BackendKind::Direct => {
                if !state.direct_sites.contains_key(&id) {
                    return Err(not_found());
                }
                for site in state.direct_sites.values_mut() {
                    site.active = site.id == id;
                }
            }
        }
        info!("Activated {} site {}", kind, id);
        Ok(())
    }

    async fn list_registry_sites(&self) -> Result<Vec<ProjectRegistrySite>> {
        Ok(self.state.read().await.registries.clone())
    }

    async fn find_app_instance(&self, id: i64) -> Result<Option<AppInstance>> {
        Ok(self.state.read().await.instances.get(&id).cloned())
    }

    async fn find_service(&self, id: i64) -> Result<Option<ServiceRecord>> {
        Ok(self.state.read().await.services.get(&id).cloned())
    }

    async fn find_service_by_name(
        &self,
        instance_id: i64,
        name: &str,
    ) -> Result<Option<ServiceRecord>> {
        Ok(self
            .state
            .read()
            .await
            .services
            .values()
            .find(|s| s.app_instance_id == instance_id && s.name == name)
            .cloned())
    }

    async fn list_services(&self, instance_id: i64) -> Result<Vec<ServiceRecord>> {
        Ok(self
            .state
            .read()
            .await
            .services
            .values()
            .filter(|s| s.app_instance_id == instance_id)
            .cloned()
            .collect())
    }

    async fn upsert_service(&self, mut record: ServiceRecord) -> Result<ServiceRecord> {
        let mut state = self.state.write().await;
        if record.id == 0 {
            let existing = state
                .services
                .values()
                .find(|s| s.app_instance_id == record.app_instance_id && s.name == record.name)
                .map(|s| s.id);
            record.id = match existing {
                Some(id) => id,
                None => state.next_service_id(),
            };
        }
        if record.updated_at.is_none() {
            record.updated_at = Some(Utc::now());
        }
        debug!(
            "Upserting service {} ({}) of instance {}",
            record.name, record.id, record.app_instance_id
        );
        state.services.insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_service(&self, id: i64) -> Result<bool> {
        let removed = self.state.write().await.services.remove(&id);
        if let Some(record) = &removed {
            debug!(
                "Deleted service {} ({}) of instance {}",
                record.name, id, record.app_instance_id
            );
        }
        Ok(removed.is_some())
    }

    async fn append_sync_history(&self, mut row: SyncHistory) -> Result<SyncHistory> {
        let mut state = self.state.write().await;
        state.last_history_id += 1;
        row.id = state.last_history_id;
        state.history.push(row.clone());
        Ok(row)
    }

    async fn list_sync_history(&self, operation_id: i64) -> Result<Vec<SyncHistory>> {
        Ok(self
            .state
            .read()
            .await
            .history
            .iter()
            .filter(|h| h.operation_id == operation_id)
            .cloned()
            .collect())
    }

    async fn find_sync_operation(&self, id: i64) -> Result<Option<SyncOperation>> {
        Ok(self.state.read().await.operations.get(&id).cloned())
    }

    async fn create_sync_operation(&self, mut operation: SyncOperation) -> Result<SyncOperation> {
        let mut state = self.state.write().await;
        state.last_operation_id += 1;
        operation.id = state.last_operation_id;
        state.operations.insert(operation.id, operation.clone());
        Ok(operation)
    }

    async fn update_sync_operation(&self, operation: SyncOperation) -> Result<SyncOperation> {
        let mut state = self.state.write().await;
        match state.operations.get_mut(&operation.id) {
            Some(existing) => {
                *existing = operation.clone();
                Ok(operation)
            }
            None => Err(CourierError::NotFound(format!("Sync operation {}", operation.id))),
        }
    }
}
