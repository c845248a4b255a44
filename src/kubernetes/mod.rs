// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes primitives shared by all cluster adapters: client creation,
//! namespace listing, workload and ConfigMap/Secret access.

pub mod client;
pub mod config_data;
pub mod namespaces;
pub mod workloads;

pub use client::{create_client, kubeconfig_cluster_id, parse_kubeconfig, proxied_kubeconfig};
pub use config_data::is_managed_secret;
pub use namespaces::list_namespaces;
pub use workloads::{list_workloads, update_workload_image};
