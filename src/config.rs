// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// YAML inventory of sites, app instances and services
    pub inventory_path: PathBuf,
    /// Number of target instances synced concurrently within one batch
    pub sync_concurrency: usize,
    /// Timeout applied to management plane and registry requests
    pub http_timeout: Duration,
    /// Base URL of the flat registry used when no project registry matches
    pub flat_registry_url: String,
    pub initiator: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let inventory_path = env::var("COURIER_INVENTORY")
            .context("COURIER_INVENTORY environment variable not set")?
            .into();
        let sync_concurrency = parse_var("COURIER_SYNC_CONCURRENCY", 4usize)?.max(1);
        let http_timeout = Duration::from_secs(parse_var("COURIER_HTTP_TIMEOUT_SECS", 30u64)?);
        let flat_registry_url = env::var("COURIER_FLAT_REGISTRY_URL")
            .unwrap_or_else(|_| "https://hub.docker.com".to_string());
        let initiator = env::var("COURIER_INITIATOR").unwrap_or_else(|_| "courier".to_string());

        Ok(Config {
            inventory_path,
            sync_concurrency,
            http_timeout,
            flat_registry_url,
            initiator,
        })
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(default),
    }
}
