// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Flat registry adapter (Docker Hub style namespace/repository layout)

use super::{build_http_client, decode_response, dedupe_tags, sort_tags, RegistryAdapter};
use crate::constants::registry::{LIST_MAX_PAGES, PAGE_SIZE};
use crate::error::{CourierError, Result};
use crate::types::{
    Platform, Project, RegistryCapabilities, Repository, RepositoryRef, Tag, TagDetail,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize)]
struct HubRepository {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    pull_count: Option<i64>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct HubImage {
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    os: Option<String>,
}

#[derive(Deserialize)]
struct HubTag {
    name: String,
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    full_size: Option<i64>,
    #[serde(default)]
    tag_last_pushed: Option<DateTime<Utc>>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    images: Vec<HubImage>,
}

impl HubTag {
    fn to_tag(&self) -> Tag {
        Tag {
            name: self.name.clone(),
            digest: self.digest.clone(),
            size: self.full_size,
            push_time: self.tag_last_pushed.or(self.last_updated),
        }
    }
}

pub struct FlatRegistryAdapter {
    base_url: String,
    http: reqwest::Client,
}

impl FlatRegistryAdapter {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: build_http_client(timeout, false)?,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let context = format!("Request to {} failed", url);
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| CourierError::from_http(e, &context))?;
        decode_response(response, &context).await
    }

    /// Follow `next` links from the first page, bounded by the listing page limit
    async fn get_all<T: DeserializeOwned>(&self, first: String) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0;

        while let Some(url) = next {
            if pages == LIST_MAX_PAGES {
                debug!("Stopping after {} pages", pages);
                break;
            }
            let page: Page<T> = self.get_json(&url).await?;
            items.extend(page.results);
            next = page.next.filter(|n| !n.is_empty());
            pages += 1;
        }
        Ok(items)
    }

    fn repository_url(&self, repository: &RepositoryRef) -> String {
        format!(
            "{}/v2/repositories/{}/{}",
            self.base_url, repository.project, repository.repository
        )
    }
}

#[async_trait]
impl RegistryAdapter for FlatRegistryAdapter {
    fn registry_type(&self) -> &'static str {
        "dockerhub"
    }

    fn capabilities(&self) -> RegistryCapabilities {
        RegistryCapabilities {
            supports_projects: false,
            supports_list_all_repositories: false,
            supports_tag_detail: true,
        }
    }

    fn known_host(&self) -> Option<&str> {
        None
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        Err(CourierError::OperationNotSupported(
            "flat registries have no projects".to_string(),
        ))
    }

    /// Repositories of a namespace
    #[instrument(skip(self))]
    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>> {
        let first = format!(
            "{}/v2/repositories/{}/?page_size={}",
            self.base_url, project, PAGE_SIZE
        );
        let repositories: Vec<HubRepository> = self.get_all(first).await?;

        Ok(repositories
            .into_iter()
            .map(|r| {
                let namespace = r.namespace.unwrap_or_else(|| project.to_string());
                Repository {
                    full_name: format!("{}/{}", namespace, r.name),
                    name: r.name,
                    project: namespace,
                    artifact_count: 0,
                    pull_count: r.pull_count.unwrap_or(0),
                    description: r.description.filter(|d| !d.is_empty()),
                    updated_at: r.last_updated,
                }
            })
            .collect())
    }

    async fn list_all_repositories(&self) -> Result<Vec<Repository>> {
        Err(CourierError::OperationNotSupported(
            "flat registries cannot list every repository".to_string(),
        ))
    }

    #[instrument(skip(self), fields(repository = %repository))]
    async fn list_tags(&self, repository: &RepositoryRef) -> Result<Vec<Tag>> {
        let first = format!("{}/tags?page_size={}", self.repository_url(repository), PAGE_SIZE);
        let raw: Vec<HubTag> = self.get_all(first).await?;

        let mut tags = dedupe_tags(raw.iter().map(HubTag::to_tag).collect());
        sort_tags(&mut tags);
        Ok(tags)
    }

    #[instrument(skip(self), fields(repository = %repository))]
    async fn get_tag_detail(&self, repository: &RepositoryRef, tag: &str) -> Result<TagDetail> {
        let url = format!("{}/tags/{}", self.repository_url(repository), tag);
        let raw: HubTag = self.get_json(&url).await?;
        let found = raw.to_tag();

        Ok(TagDetail {
            name: found.name,
            repository: repository.to_string(),
            digest: found.digest,
            size: found.size,
            push_time: found.push_time,
            platforms: raw
                .images
                .iter()
                .filter_map(|i| {
                    Some(Platform {
                        os: i.os.clone()?,
                        architecture: i.architecture.clone()?,
                    })
                })
                .collect(),
        })
    }
}
