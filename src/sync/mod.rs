// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Batch synchronization of services, ConfigMap keys and Secret keys between
//! app instances.
//!
//! A batch becomes one [`SyncOperation`]. Items are grouped by target
//! instance: groups run with bounded concurrency, items within a group run one
//! after another. Each item appends exactly one history row, success or
//! failure, and an item failure never stops its siblings. Only a failure to
//! persist the audit trail aborts the batch, which then ends `failed`.

pub mod config_data;
pub mod services;

pub use config_data::{ConfigKind, ConfigSyncItem, ConfigSyncRequest};
pub use services::{ServiceSyncItem, ServiceSyncRequest};

use crate::error::{CourierError, Result};
use crate::factory::AdapterResolver;
use crate::store::Store;
use crate::types::{
    AppInstance, HistoryStatus, Location, OperationStatus, ResourceType, SyncHistory, SyncOperation,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// An item of a batch, addressed to one target instance
pub trait BatchItem {
    fn target_instance_id(&self) -> i64;
}

impl From<&AppInstance> for Location {
    fn from(instance: &AppInstance) -> Self {
        Location {
            cluster: instance.cluster_id.clone(),
            namespace: instance.namespace.clone(),
        }
    }
}

/// History row for an item, filled in as the item progresses so a failure
/// still records what was known at that point
fn history_row(
    operation_id: i64,
    resource_type: ResourceType,
    resource_name: String,
) -> SyncHistory {
    SyncHistory {
        id: 0,
        operation_id,
        resource_name,
        resource_type,
        source: Location::default(),
        target: Location::default(),
        previous_value: String::new(),
        new_value: String::new(),
        status: HistoryStatus::Failed,
        error_message: None,
        duration_ms: 0,
        created_at: Utc::now(),
    }
}

pub struct SyncOrchestrator {
    store: Arc<dyn Store>,
    resolver: Arc<dyn AdapterResolver>,
    concurrency: usize,
}

impl SyncOrchestrator {
    pub fn new(
        store: Arc<dyn Store>,
        resolver: Arc<dyn AdapterResolver>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            resolver,
            concurrency: concurrency.max(1),
        }
    }

    async fn load_instance(&self, id: i64) -> Result<AppInstance> {
        self.store
            .find_app_instance(id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("App instance {}", id)))
    }

    /// Persist a new operation; environment ids are filled in for the
    /// instances that exist
    async fn begin(&self, mut operation: SyncOperation) -> Result<SyncOperation> {
        if let Some(source) = self.store.find_app_instance(operation.source_instance_id).await? {
            operation.source_environment_id = Some(source.environment_id);
        }
        for target_id in operation.target_instance_ids.clone() {
            if let Some(target) = self.store.find_app_instance(target_id).await? {
                if !operation.target_environment_ids.contains(&target.environment_id) {
                    operation.target_environment_ids.push(target.environment_id);
                }
            }
        }

        let operation = self.store.create_sync_operation(operation).await?;
        info!(
            "Started sync operation {} for {} resources to {} instances",
            operation.id,
            operation.resources.len(),
            operation.target_instance_ids.len()
        );
        Ok(operation)
    }

    /// Finalize an item's history row and append it
    async fn record(
        &self,
        mut row: SyncHistory,
        started: Instant,
        outcome: Result<()>,
    ) -> Result<HistoryStatus> {
        row.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        row.created_at = Utc::now();
        match outcome {
            Ok(()) => {
                info!(
                    "Synced {} to {}/{}",
                    row.resource_name, row.target.cluster, row.target.namespace
                );
                row.status = HistoryStatus::Success;
            }
            Err(e) => {
                error!("Failed to sync {}: {}", row.resource_name, e);
                row.status = HistoryStatus::Failed;
                row.error_message = Some(e.to_string());
            }
        }

        let status = row.status;
        self.store.append_sync_history(row).await?;
        Ok(status)
    }

    /// Run every item and move the operation into its terminal status
    async fn run_batch<I, F, Fut>(
        &self,
        mut operation: SyncOperation,
        items: Vec<I>,
        sync_item: F,
    ) -> Result<SyncOperation>
    where
        I: BatchItem,
        F: Fn(i64, I) -> Fut,
        Fut: Future<Output = Result<HistoryStatus>>,
    {
        match self.process_items(operation.id, items, &sync_item).await {
            Ok((succeeded, failed)) => {
                operation.finish(OperationStatus::from_outcomes(succeeded, failed));
                info!(
                    "Sync operation {} finished {:?}: {} succeeded, {} failed",
                    operation.id, operation.status, succeeded, failed
                );
                match self.store.update_sync_operation(operation.clone()).await {
                    Ok(operation) => Ok(operation),
                    Err(e) => {
                        error!("Failed to store outcome of sync operation {}: {}", operation.id, e);
                        self.mark_failed(operation).await;
                        Err(e)
                    }
                }
            }
            Err(e) => {
                error!("Sync operation {} aborted: {}", operation.id, e);
                self.mark_failed(operation).await;
                Err(e)
            }
        }
    }

    /// One attempt to leave the operation `failed` instead of `pending`
    async fn mark_failed(&self, mut operation: SyncOperation) {
        let id = operation.id;
        operation.status = OperationStatus::Failed;
        operation.finished_at.get_or_insert_with(Utc::now);
        if let Err(e) = self.store.update_sync_operation(operation).await {
            warn!("Failed to mark sync operation {} as failed: {}", id, e);
        }
    }

    async fn process_items<I, F, Fut>(
        &self,
        operation_id: i64,
        items: Vec<I>,
        sync_item: &F,
    ) -> Result<(usize, usize)>
    where
        I: BatchItem,
        F: Fn(i64, I) -> Fut,
        Fut: Future<Output = Result<HistoryStatus>>,
    {
        let mut groups: BTreeMap<i64, Vec<I>> = BTreeMap::new();
        for item in items {
            groups.entry(item.target_instance_id()).or_default().push(item);
        }

        let outcomes: Vec<Result<(usize, usize)>> = stream::iter(groups.into_values())
            .map(|group| async move {
                let (mut succeeded, mut failed) = (0usize, 0usize);
                for item in group {
                    match sync_item(operation_id, item).await? {
                        HistoryStatus::Success => succeeded += 1,
                        HistoryStatus::Failed => failed += 1,
                    }
                }
                Ok::<_, CourierError>((succeeded, failed))
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        outcomes.into_iter().try_fold((0, 0), |(succeeded, failed), outcome| {
            let (s, f) = outcome?;
            Ok((succeeded + s, failed + f))
        })
    }
}
