// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CourierError, Result};

/// Case-fold a workload kind and strip the trailing plural.
pub fn normalize_kind(kind: &str) -> String {
    kind.trim().to_lowercase().trim_end_matches('s').to_string()
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WorkloadKind {
    Deployment,
    DaemonSet,
    StatefulSet,
}

impl WorkloadKind {
    /// Parse any spelling of a supported kind ("Deployments", "daemonset", ...)
    pub fn parse(kind: &str) -> Result<Self> {
        match normalize_kind(kind).as_str() {
            "deployment" => Ok(WorkloadKind::Deployment),
            "daemonset" => Ok(WorkloadKind::DaemonSet),
            "statefulset" => Ok(WorkloadKind::StatefulSet),
            _ => Err(CourierError::UnsupportedWorkloadKind(kind.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Deployment => "deployment",
            WorkloadKind::DaemonSet => "daemonset",
            WorkloadKind::StatefulSet => "statefulset",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadState {
    Active,
    Inactive,
}

impl WorkloadState {
    fn from_bool(active: bool) -> Self {
        if active {
            WorkloadState::Active
        } else {
            WorkloadState::Inactive
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadState::Active => "active",
            WorkloadState::Inactive => "inactive",
        }
    }
}

/// Status readings a health state is derived from
#[derive(Debug, Clone, PartialEq)]
pub enum HealthSignals {
    /// Deployments and StatefulSets
    Rollout {
        condition_ready: bool,
        available_replicas: i32,
        desired_replicas: i32,
    },
    DaemonSet {
        number_ready: i32,
        desired_number_scheduled: i32,
    },
    /// Kinds without a dedicated rule
    Other { reported_active: bool, replicas: i32 },
}

impl HealthSignals {
    pub fn state(&self) -> WorkloadState {
        let active = match *self {
            HealthSignals::Rollout {
                condition_ready,
                available_replicas,
                desired_replicas,
            } => condition_ready || available_replicas >= desired_replicas,
            HealthSignals::DaemonSet {
                number_ready,
                desired_number_scheduled,
            } => number_ready == desired_number_scheduled,
            HealthSignals::Other {
                reported_active,
                replicas,
            } => reported_active && replicas > 0,
        };
        WorkloadState::from_bool(active)
    }
}

/// A Deployment, DaemonSet or StatefulSet reduced to what sync and compare need
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workload {
    pub name: String,
    pub kind: WorkloadKind,
    pub state: WorkloadState,
    /// Image of the first container
    pub image: String,
    pub scale: i32,
    pub available_replicas: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}
