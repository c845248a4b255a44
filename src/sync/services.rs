// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Service image propagation and service catalog refresh

use super::{history_row, BatchItem, SyncOrchestrator};
use crate::constants::SYNCED_STATUS;
use crate::error::{CourierError, Result};
use crate::types::{
    normalize_kind, HistoryStatus, Location, ResourceType, ServiceRecord, SyncHistory,
    SyncOperation,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, instrument};

/// Copy the image of one source service to one target instance
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSyncItem {
    pub service_id: i64,
    pub target_instance_id: i64,
}

impl BatchItem for ServiceSyncItem {
    fn target_instance_id(&self) -> i64 {
        self.target_instance_id
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSyncRequest {
    pub source_instance_id: i64,
    pub items: Vec<ServiceSyncItem>,
    pub initiator: String,
}

impl ServiceSyncRequest {
    /// Every service of the source to every target, service-major order
    pub fn fan_out(
        source_instance_id: i64,
        service_ids: &[i64],
        target_instance_ids: &[i64],
        initiator: impl Into<String>,
    ) -> Self {
        let items = service_ids
            .iter()
            .flat_map(|&service_id| {
                target_instance_ids.iter().map(move |&target_instance_id| ServiceSyncItem {
                    service_id,
                    target_instance_id,
                })
            })
            .collect();
        Self {
            source_instance_id,
            items,
            initiator: initiator.into(),
        }
    }

    fn target_instance_ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        for item in &self.items {
            if !ids.contains(&item.target_instance_id) {
                ids.push(item.target_instance_id);
            }
        }
        ids
    }
}

impl SyncOrchestrator {
    /// Propagate service images as one operation
    #[instrument(
        skip(self, request),
        fields(source = request.source_instance_id, items = request.items.len())
    )]
    pub async fn sync_services(&self, request: ServiceSyncRequest) -> Result<SyncOperation> {
        let source_instance_id = request.source_instance_id;
        let operation = self
            .begin(SyncOperation::start(
                ResourceType::Service,
                request.source_instance_id,
                request.target_instance_ids(),
                request.items.iter().map(|i| i.service_id.to_string()).collect(),
                request.initiator,
            ))
            .await?;

        self.run_batch(operation, request.items, |operation_id, item| {
            self.sync_service_item(operation_id, source_instance_id, item)
        })
        .await
    }

    async fn sync_service_item(
        &self,
        operation_id: i64,
        source_instance_id: i64,
        item: ServiceSyncItem,
    ) -> Result<HistoryStatus> {
        let started = Instant::now();
        let resource_name = format!("service {}", item.service_id);
        let mut row = history_row(operation_id, ResourceType::Service, resource_name);
        let outcome = self.sync_single_service(source_instance_id, &item, &mut row).await;
        self.record(row, started, outcome).await
    }

    /// Copy one service image to a target instance, filling in the history
    /// row along the way. Adapter failures are returned, not swallowed.
    async fn sync_single_service(
        &self,
        source_instance_id: i64,
        item: &ServiceSyncItem,
        row: &mut SyncHistory,
    ) -> Result<()> {
        let service = self
            .store
            .find_service(item.service_id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("Service {}", item.service_id)))?;
        row.resource_name = service.name.clone();
        row.new_value = service.image_tag.clone();

        // The service must belong to the instance the batch syncs from
        if service.app_instance_id != source_instance_id {
            return Err(CourierError::NotFound(format!(
                "Service {} in app instance {}",
                item.service_id, source_instance_id
            )));
        }

        let source = self.load_instance(source_instance_id).await?;
        row.source = Location::from(&source);

        let target = self.load_instance(item.target_instance_id).await?;
        row.target = Location::from(&target);

        let existing = self.store.find_service_by_name(target.id, &service.name).await?;
        row.previous_value = existing.as_ref().map(|s| s.image_tag.clone()).unwrap_or_default();
        let mut record = existing.unwrap_or_else(|| ServiceRecord {
            id: 0,
            app_instance_id: target.id,
            name: service.name.clone(),
            kind: String::new(),
            image_tag: String::new(),
            status: String::new(),
            replicas: service.replicas,
            updated_at: None,
        });

        let kind = normalize_kind(&service.kind);
        debug!(
            "Updating {} {} in {}/{} from {} to {}",
            kind,
            service.name,
            target.cluster_id,
            target.namespace,
            row.previous_value,
            service.image_tag
        );

        let adapter = self.resolver.resolve_cluster_adapter(&target).await?;
        adapter
            .update_workload_image(
                &target.cluster_id,
                &target.namespace,
                &service.name,
                &kind,
                &service.image_tag,
            )
            .await
            .map_err(|e| {
                CourierError::Adapter(format!(
                    "Failed to update {} in {}/{}: {}",
                    service.name, target.cluster_id, target.namespace, e
                ))
            })?;

        record.image_tag = service.image_tag.clone();
        record.kind = kind;
        record.status = SYNCED_STATUS.to_string();
        record.updated_at = Some(Utc::now());
        self.store.upsert_service(record).await?;
        Ok(())
    }

    /// Rebuild the service catalog of an instance from its live workloads.
    /// Records of workloads that no longer exist are removed.
    #[instrument(skip(self))]
    pub async fn refresh_services(&self, instance_id: i64) -> Result<Vec<ServiceRecord>> {
        let instance = self.load_instance(instance_id).await?;
        let adapter = self.resolver.resolve_cluster_adapter(&instance).await?;
        let workloads = adapter
            .list_workloads(&instance.cluster_id, &instance.namespace)
            .await?;

        let mut records = Vec::with_capacity(workloads.len());
        for workload in workloads {
            let record = ServiceRecord {
                id: 0,
                app_instance_id: instance.id,
                name: workload.name,
                kind: workload.kind.as_str().to_string(),
                image_tag: workload.image,
                status: workload.state.as_str().to_string(),
                replicas: workload.scale,
                updated_at: Some(Utc::now()),
            };
            records.push(self.store.upsert_service(record).await?);
        }

        let mut pruned = 0;
        for stale in self.store.list_services(instance.id).await? {
            if !records.iter().any(|r| r.id == stale.id) {
                debug!("Removing stale service {} of instance {}", stale.name, instance.name);
                if self.store.delete_service(stale.id).await? {
                    pruned += 1;
                }
            }
        }

        info!(
            "Refreshed {} services of instance {}, removed {}",
            records.len(),
            instance.name,
            pruned
        );
        Ok(records)
    }
}
