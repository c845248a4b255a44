// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cached view of a workload in an app instance
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    /// Zero until the store assigns an id
    #[serde(default)]
    pub id: i64,
    pub app_instance_id: i64,
    pub name: String,
    pub kind: String,
    pub image_tag: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Completed,
    Partial,
    Failed,
}

impl OperationStatus {
    /// Terminal status of a batch from its item outcomes
    pub fn from_outcomes(succeeded: usize, failed: usize) -> Self {
        if failed == 0 {
            OperationStatus::Completed
        } else if succeeded > 0 {
            OperationStatus::Partial
        } else {
            OperationStatus::Failed
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OperationStatus::Pending)
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Service,
    ConfigMap,
    Secret,
}

/// One batch sync request
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncOperation {
    #[serde(default)]
    pub id: i64,
    pub resource_type: ResourceType,
    pub source_environment_id: Option<i64>,
    pub source_instance_id: i64,
    pub target_environment_ids: Vec<i64>,
    pub target_instance_ids: Vec<i64>,
    /// Resource identifiers in request order
    pub resources: Vec<String>,
    pub status: OperationStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub initiator: String,
}

impl SyncOperation {
    pub fn start(
        resource_type: ResourceType,
        source_instance_id: i64,
        target_instance_ids: Vec<i64>,
        resources: Vec<String>,
        initiator: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            resource_type,
            source_environment_id: None,
            source_instance_id,
            target_environment_ids: Vec::new(),
            target_instance_ids,
            resources,
            status: OperationStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
            initiator: initiator.into(),
        }
    }

    /// Move into a terminal status. Returns false if the operation already finished.
    pub fn finish(&mut self, status: OperationStatus) -> bool {
        if self.status.is_terminal() || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.finished_at = Some(Utc::now());
        true
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryStatus {
    Success,
    Failed,
}

/// Where a synced resource lives
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub cluster: String,
    pub namespace: String,
}

/// One resource sync attempt, append-only
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncHistory {
    #[serde(default)]
    pub id: i64,
    pub operation_id: i64,
    pub resource_name: String,
    pub resource_type: ResourceType,
    pub source: Location,
    pub target: Location,
    pub previous_value: String,
    pub new_value: String,
    pub status: HistoryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}
