// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! ConfigMap and Secret reads and key-level read-modify-write updates

use crate::constants::secrets::{DEFAULT_TOKEN_PREFIX, EXCLUDED_TYPES};
use crate::error::{CourierError, Result};
use crate::types::{ConfigMapSnapshot, SecretSnapshot};
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use k8s_openapi::ByteString;
use kube::{
    api::{ListParams, PostParams},
    Api, Client, ResourceExt,
};
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

/// List ConfigMaps in a namespace
#[instrument(skip(client))]
pub async fn list_config_maps(client: &Client, namespace: &str) -> Result<Vec<ConfigMapSnapshot>> {
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let list = config_maps
        .list(&ListParams::default())
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to list configmaps in {}", namespace))
        })?;

    Ok(list.items.into_iter().map(config_map_snapshot).collect())
}

/// Read the data of one ConfigMap
#[instrument(skip(client))]
pub async fn get_config_map_data(
    client: &Client,
    namespace: &str,
    name: &str,
) -> Result<BTreeMap<String, String>> {
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let config_map = config_maps
        .get(name)
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to read configmap {}/{}", namespace, name))
        })?;

    Ok(config_map.data.unwrap_or_default())
}

/// Merge keys into a ConfigMap, leaving other keys untouched. Returns the data as it was before.
#[instrument(skip(client, keys), fields(key_names = ?keys.keys().collect::<Vec<_>>()))]
pub async fn merge_config_map_data(
    client: &Client,
    namespace: &str,
    name: &str,
    keys: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, String>> {
    let config_maps: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    let mut config_map = config_maps
        .get(name)
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to read configmap {}/{}", namespace, name))
        })?;

    let previous = config_map.data.clone().unwrap_or_default();
    config_map
        .data
        .get_or_insert_with(BTreeMap::new)
        .extend(keys.iter().map(|(k, v)| (k.clone(), v.clone())));

    config_maps
        .replace(name, &PostParams::default(), &config_map)
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to update configmap {}/{}", namespace, name))
        })?;

    info!("Updated {} keys in configmap {}/{}", keys.len(), namespace, name);
    Ok(previous)
}

/// List Secrets in a namespace, excluding Kubernetes- and operator-managed ones
#[instrument(skip(client))]
pub async fn list_secrets(client: &Client, namespace: &str) -> Result<Vec<SecretSnapshot>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let list = secrets
        .list(&ListParams::default())
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to list secrets in {}", namespace))
        })?;

    let total = list.items.len();
    let snapshots: Vec<SecretSnapshot> = list
        .items
        .into_iter()
        .filter(|s| !is_managed_secret(s))
        .map(secret_snapshot)
        .collect();

    debug!(
        "Listed {} secrets in {} ({} managed secrets excluded)",
        snapshots.len(),
        namespace,
        total - snapshots.len()
    );
    Ok(snapshots)
}

/// Read the key names of one Secret
#[instrument(skip(client))]
pub async fn get_secret_keys(client: &Client, namespace: &str, name: &str) -> Result<Vec<String>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let secret = secrets
        .get(name)
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to read secret {}/{}", namespace, name))
        })?;

    Ok(secret_key_names(&secret))
}

/// Merge keys into a Secret; values are base64 encoded on the wire. Returns the
/// key names present before the update.
#[instrument(skip(client, keys), fields(key_names = ?keys.keys().collect::<Vec<_>>()))]
pub async fn merge_secret_data(
    client: &Client,
    namespace: &str,
    name: &str,
    keys: &BTreeMap<String, String>,
) -> Result<Vec<String>> {
    let secrets: Api<Secret> = Api::namespaced(client.clone(), namespace);
    let mut secret = secrets
        .get(name)
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to read secret {}/{}", namespace, name))
        })?;

    let previous = secret_key_names(&secret);
    secret.data.get_or_insert_with(BTreeMap::new).extend(
        keys.iter()
            .map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec()))),
    );

    secrets
        .replace(name, &PostParams::default(), &secret)
        .await
        .map_err(|e| {
            CourierError::from_kube(e, format!("Failed to update secret {}/{}", namespace, name))
        })?;

    info!("Updated {} keys in secret {}/{}", keys.len(), namespace, name);
    Ok(previous)
}

/// Check if a secret is managed by Kubernetes or an operator rather than by users
pub fn is_managed_secret(secret: &Secret) -> bool {
    let excluded_type = secret
        .type_
        .as_deref()
        .is_some_and(|t| EXCLUDED_TYPES.contains(&t));

    excluded_type || secret.name_any().starts_with(DEFAULT_TOKEN_PREFIX)
}

fn secret_key_names(secret: &Secret) -> Vec<String> {
    let mut keys: Vec<String> = secret
        .data
        .iter()
        .flat_map(|d| d.keys().cloned())
        .chain(secret.string_data.iter().flat_map(|d| d.keys().cloned()))
        .collect();
    keys.sort();
    keys.dedup();
    keys
}

fn config_map_snapshot(config_map: ConfigMap) -> ConfigMapSnapshot {
    ConfigMapSnapshot {
        name: config_map.name_any(),
        labels: config_map.labels().clone(),
        annotations: config_map.annotations().clone(),
        data: config_map.data.unwrap_or_default(),
    }
}

fn secret_snapshot(secret: Secret) -> SecretSnapshot {
    let values = secret
        .data
        .clone()
        .unwrap_or_default()
        .into_iter()
        .map(|(k, v)| (k, v.0))
        .collect();

    SecretSnapshot::new(
        secret.name_any(),
        secret.type_.clone().unwrap_or_else(|| "Opaque".to_string()),
        values,
    )
    .with_metadata(secret.labels().clone(), secret.annotations().clone())
}
