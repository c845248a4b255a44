// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use courier::compare::InstanceComparer;
use courier::config::Config;
use courier::factory::{AdapterFactory, AdapterResolver};
use courier::store::{Inventory, MemoryStore, Store};
use courier::sync::{
    ConfigKind, ConfigSyncItem, ConfigSyncRequest, ServiceSyncRequest, SyncOrchestrator,
};
use courier::types::BackendKind;

#[derive(Parser, Debug)]
#[command(
    name = "courier",
    about = "Compare and promote workloads between Kubernetes app instances"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SiteKind {
    Proxied,
    Direct,
}

impl From<SiteKind> for BackendKind {
    fn from(kind: SiteKind) -> Self {
        match kind {
            SiteKind::Proxied => BackendKind::Proxied,
            SiteKind::Direct => BackendKind::Direct,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Resource {
    Services,
    Catalog,
    Configmaps,
    Secrets,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum KeyKind {
    Configmap,
    Secret,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check a cluster site is reachable
    TestConnection {
        #[arg(value_enum)]
        kind: SiteKind,
        site_id: i64,
    },
    /// List namespaces of a cluster site
    Namespaces {
        #[arg(value_enum)]
        kind: SiteKind,
        site_id: i64,
        #[arg(long)]
        cluster: Option<String>,
    },
    /// List workloads of an app instance
    Workloads { instance_id: i64 },
    /// Compare two app instances
    Compare {
        #[arg(value_enum)]
        resource: Resource,
        source: i64,
        target: i64,
    },
    /// Promote service images from a source instance to target instances
    SyncServices {
        source: i64,
        #[arg(long = "service", required = true)]
        services: Vec<i64>,
        #[arg(long = "target", required = true)]
        targets: Vec<i64>,
    },
    /// Merge keys into a ConfigMap or Secret of target instances
    SyncKeys {
        #[arg(value_enum)]
        kind: KeyKind,
        source: i64,
        name: String,
        #[arg(long = "target", required = true)]
        targets: Vec<i64>,
        /// KEY=VALUE pairs
        #[arg(long = "set", required = true, value_parser = parse_key_value)]
        keys: Vec<(String, String)>,
    },
    /// Refresh the recorded services of an instance from its cluster
    RefreshServices { instance_id: i64 },
    /// List projects of a registry host
    Projects { host: String },
    /// List repositories of a registry project, or of all projects
    Repositories {
        host: String,
        #[arg(long)]
        project: Option<String>,
    },
    /// List tags of the repository an image lives in
    Tags { image: String },
    /// Show the tag an image reference points to
    TagDetail { image: String },
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {}", s))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let inventory = tokio::fs::read_to_string(&config.inventory_path)
        .await
        .with_context(|| format!("Failed to read inventory {}", config.inventory_path.display()))?;
    let inventory = Inventory::from_yaml(&inventory)?;
    let store: Arc<dyn Store> = Arc::new(MemoryStore::from_inventory(inventory));
    info!("Inventory loaded from {}", config.inventory_path.display());

    let factory = Arc::new(AdapterFactory::new(store.clone(), &config));
    let comparer = InstanceComparer::new(store.clone(), factory.clone());
    let orchestrator =
        SyncOrchestrator::new(store.clone(), factory.clone(), config.sync_concurrency);

    match cli.command {
        Command::TestConnection { kind, site_id } => {
            print_json(&factory.test_site_connection(kind.into(), site_id).await)?;
        }
        Command::Namespaces { kind, site_id, cluster } => {
            let adapter = factory.resolve_site_adapter(kind.into(), site_id).await?;
            print_json(&adapter.list_namespaces(cluster.as_deref()).await?)?;
        }
        Command::Workloads { instance_id } => {
            let instance = store
                .find_app_instance(instance_id)
                .await?
                .with_context(|| format!("App instance {} not found", instance_id))?;
            let adapter = factory.resolve_cluster_adapter(&instance).await?;
            print_json(&adapter.list_workloads(&instance.cluster_id, &instance.namespace).await?)?;
        }
        Command::Compare { resource, source, target } => match resource {
            Resource::Services => print_json(&comparer.compare_services(source, target).await?)?,
            Resource::Catalog => {
                print_json(&comparer.compare_service_catalog(source, target).await?)?
            }
            Resource::Configmaps => {
                print_json(&comparer.compare_config_maps(source, target).await?)?
            }
            Resource::Secrets => print_json(&comparer.compare_secrets(source, target).await?)?,
        },
        Command::SyncServices { source, services, targets } => {
            let initiator = config.initiator.as_str();
            let request = ServiceSyncRequest::fan_out(source, &services, &targets, initiator);
            print_json(&orchestrator.sync_services(request).await?)?;
        }
        Command::SyncKeys {
            kind,
            source,
            name,
            targets,
            keys,
        } => {
            let keys: BTreeMap<String, String> = keys.into_iter().collect();
            let request = ConfigSyncRequest {
                source_instance_id: source,
                kind: match kind {
                    KeyKind::Configmap => ConfigKind::ConfigMap,
                    KeyKind::Secret => ConfigKind::Secret,
                },
                items: targets
                    .into_iter()
                    .map(|target_instance_id| ConfigSyncItem {
                        target_instance_id,
                        name: name.clone(),
                        keys: keys.clone(),
                    })
                    .collect(),
                initiator: config.initiator.clone(),
            };
            print_json(&orchestrator.sync_config_keys(request).await?)?;
        }
        Command::RefreshServices { instance_id } => {
            print_json(&orchestrator.refresh_services(instance_id).await?)?;
        }
        Command::Projects { host } => {
            let registry = factory.resolve_registry_for_host(Some(&host)).await?;
            print_json(&registry.list_projects().await?)?;
        }
        Command::Repositories { host, project } => {
            let registry = factory.resolve_registry_for_host(Some(&host)).await?;
            let repositories = match project {
                Some(project) => registry.list_repositories(&project).await?,
                None => registry.list_all_repositories().await?,
            };
            print_json(&repositories)?;
        }
        Command::Tags { image } => {
            let registry = factory.resolve_registry_adapter(&image).await?;
            let reference = registry.parse_image(&image);
            print_json(&registry.list_tags(&reference.repository_ref()).await?)?;
        }
        Command::TagDetail { image } => {
            let registry = factory.resolve_registry_adapter(&image).await?;
            let reference = registry.parse_image(&image);
            let detail = registry
                .get_tag_detail(&reference.repository_ref(), &reference.tag)
                .await?;
            print_json(&detail)?;
        }
    }

    Ok(())
}
