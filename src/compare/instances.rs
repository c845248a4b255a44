// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Comparison of live resources between two app instances

use super::{compare_collections, keyed, Comparable, ComparisonOf};
use crate::cluster::ClusterAdapter;
use crate::error::{CourierError, Result};
use crate::factory::AdapterResolver;
use crate::store::Store;
use crate::types::{AppInstance, ConfigMapSnapshot, SecretSnapshot, ServiceRecord, Workload};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, instrument};

pub struct InstanceComparer {
    store: Arc<dyn Store>,
    resolver: Arc<dyn AdapterResolver>,
}

impl InstanceComparer {
    pub fn new(store: Arc<dyn Store>, resolver: Arc<dyn AdapterResolver>) -> Self {
        Self { store, resolver }
    }

    async fn load_instance(&self, id: i64) -> Result<AppInstance> {
        self.store
            .find_app_instance(id)
            .await?
            .ok_or_else(|| CourierError::NotFound(format!("App instance {}", id)))
    }

    /// Fetch both sides concurrently through their own adapters and diff them
    async fn compare_live<T, F, Fut>(
        &self,
        source_id: i64,
        target_id: i64,
        fetch: F,
    ) -> Result<ComparisonOf<T>>
    where
        T: Comparable,
        F: Fn(Arc<dyn ClusterAdapter>, AppInstance) -> Fut,
        Fut: Future<Output = Result<Vec<T>>>,
    {
        let (source, target) =
            tokio::try_join!(self.load_instance(source_id), self.load_instance(target_id))?;
        let (source_adapter, target_adapter) = tokio::try_join!(
            self.resolver.resolve_cluster_adapter(&source),
            self.resolver.resolve_cluster_adapter(&target)
        )?;

        let (source_items, target_items) =
            tokio::try_join!(fetch(source_adapter, source), fetch(target_adapter, target))?;
        debug!(
            "Comparing {} source against {} target resources",
            source_items.len(),
            target_items.len()
        );

        Ok(compare_collections(keyed(source_items), keyed(target_items)))
    }

    #[instrument(skip(self))]
    pub async fn compare_services(
        &self,
        source_id: i64,
        target_id: i64,
    ) -> Result<ComparisonOf<Workload>> {
        self.compare_live(source_id, target_id, |adapter, instance| async move {
            adapter.list_workloads(&instance.cluster_id, &instance.namespace).await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn compare_config_maps(
        &self,
        source_id: i64,
        target_id: i64,
    ) -> Result<ComparisonOf<ConfigMapSnapshot>> {
        self.compare_live(source_id, target_id, |adapter, instance| async move {
            adapter.list_config_maps(&instance.cluster_id, &instance.namespace).await
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn compare_secrets(
        &self,
        source_id: i64,
        target_id: i64,
    ) -> Result<ComparisonOf<SecretSnapshot>> {
        self.compare_live(source_id, target_id, |adapter, instance| async move {
            adapter.list_secrets(&instance.cluster_id, &instance.namespace).await
        })
        .await
    }

    /// Compare the cached service catalogs without touching the clusters
    #[instrument(skip(self))]
    pub async fn compare_service_catalog(
        &self,
        source_id: i64,
        target_id: i64,
    ) -> Result<ComparisonOf<ServiceRecord>> {
        let (source, target) = tokio::try_join!(
            self.store.list_services(source_id),
            self.store.list_services(target_id)
        )?;
        Ok(compare_collections(keyed(source), keyed(target)))
    }
}
