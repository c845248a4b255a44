// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ConfigMap and Secret key propagation

use super::{history_row, BatchItem, SyncOrchestrator};
use crate::error::{CourierError, Result};
use crate::types::{Location, ResourceType, SyncHistory, SyncOperation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, instrument};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    ConfigMap,
    Secret,
}

impl ConfigKind {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            ConfigKind::ConfigMap => ResourceType::ConfigMap,
            ConfigKind::Secret => ResourceType::Secret,
        }
    }
}

/// Keys to merge into one ConfigMap or Secret of a target instance
#[derive(Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSyncItem {
    pub target_instance_id: i64,
    pub name: String,
    pub keys: BTreeMap<String, String>,
}

impl std::fmt::Debug for ConfigSyncItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSyncItem")
            .field("target_instance_id", &self.target_instance_id)
            .field("name", &self.name)
            .field("keys", &self.keys.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl BatchItem for ConfigSyncItem {
    fn target_instance_id(&self) -> i64 {
        self.target_instance_id
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSyncRequest {
    pub source_instance_id: i64,
    pub kind: ConfigKind,
    pub items: Vec<ConfigSyncItem>,
    pub initiator: String,
}

impl SyncOrchestrator {
    /// Merge caller-supplied keys into ConfigMaps or Secrets as one operation
    #[instrument(skip(self, request), fields(kind = ?request.kind, items = request.items.len()))]
    pub async fn sync_config_keys(&self, request: ConfigSyncRequest) -> Result<SyncOperation> {
        let mut target_ids: Vec<i64> = Vec::new();
        for item in &request.items {
            if !target_ids.contains(&item.target_instance_id) {
                target_ids.push(item.target_instance_id);
            }
        }

        let source = self
            .store
            .find_app_instance(request.source_instance_id)
            .await?
            .map(|instance| Location::from(&instance))
            .unwrap_or_default();

        let operation = self
            .begin(SyncOperation::start(
                request.kind.resource_type(),
                request.source_instance_id,
                target_ids,
                request.items.iter().map(|i| i.name.clone()).collect(),
                request.initiator,
            ))
            .await?;

        let kind = request.kind;
        let source = &source;
        self.run_batch(operation, request.items, |operation_id, item| async move {
            let started = Instant::now();
            let mut row = history_row(operation_id, kind.resource_type(), item.name.clone());
            row.source = source.clone();
            let outcome = self.apply_keys(kind, &item, &mut row).await;
            self.record(row, started, outcome).await
        })
        .await
    }

    /// Read-modify-write of one item. Secret history carries key names only.
    async fn apply_keys(
        &self,
        kind: ConfigKind,
        item: &ConfigSyncItem,
        row: &mut SyncHistory,
    ) -> Result<()> {
        let target = self.load_instance(item.target_instance_id).await?;
        row.target = Location::from(&target);
        let adapter = self.resolver.resolve_cluster_adapter(&target).await?;
        let (cluster, namespace) = (target.cluster_id.as_str(), target.namespace.as_str());

        let wrap = |e: CourierError| {
            CourierError::Adapter(format!(
                "Failed to update {} in {}/{}: {}",
                item.name, cluster, namespace, e
            ))
        };

        match kind {
            ConfigKind::ConfigMap => {
                let current = adapter.get_config_map_keys(cluster, namespace, &item.name).await?;
                let previous: BTreeMap<&String, &String> = item
                    .keys
                    .keys()
                    .filter_map(|k| current.get_key_value(k))
                    .collect();
                row.previous_value = serde_json::to_string(&previous)?;
                row.new_value = serde_json::to_string(&item.keys)?;

                adapter
                    .sync_config_map_keys(cluster, namespace, &item.name, &item.keys)
                    .await
                    .map_err(wrap)?;
            }
            ConfigKind::Secret => {
                let current = adapter.get_secret_keys(cluster, namespace, &item.name).await?;
                let previous: Vec<&String> =
                    item.keys.keys().filter(|k| current.contains(*k)).collect();
                row.previous_value = serde_json::to_string(&previous)?;
                row.new_value = serde_json::to_string(&item.keys.keys().collect::<Vec<_>>())?;

                adapter
                    .sync_secret_keys(cluster, namespace, &item.name, &item.keys)
                    .await
                    .map_err(wrap)?;
            }
        }

        debug!("Merged {} keys into {}", item.keys.len(), item.name);
        Ok(())
    }
}
