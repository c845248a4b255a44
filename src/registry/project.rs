// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Project-scoped registry adapter (Harbor REST API)

use super::{
    build_http_client, decode_response, dedupe_tags, sort_tags, supersedes, BaseUrlCache,
    RegistryAdapter,
};
use crate::constants::registry::{
    LIST_MAX_PAGES, PAGE_SIZE, PROJECT_API_PATHS, TAG_DETAIL_MAX_PAGES,
};
use crate::error::{CourierError, Result};
use crate::image::normalize_host;
use crate::types::{
    Platform, Project, ProjectRegistrySite, RegistryCapabilities, Repository, RepositoryRef, Tag,
    TagDetail,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

#[derive(Deserialize)]
struct HarborProject {
    project_id: Option<i64>,
    name: String,
    #[serde(default)]
    repo_count: Option<i64>,
    #[serde(default)]
    metadata: Option<HashMap<String, String>>,
}

#[derive(Deserialize)]
struct HarborRepository {
    name: String,
    #[serde(default)]
    artifact_count: Option<i64>,
    #[serde(default)]
    pull_count: Option<i64>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    update_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct HarborTag {
    name: String,
    #[serde(default)]
    push_time: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
struct HarborPlatform {
    #[serde(default)]
    architecture: Option<String>,
    #[serde(default)]
    os: Option<String>,
}

#[derive(Deserialize)]
struct HarborReference {
    #[serde(default)]
    platform: Option<HarborPlatform>,
}

#[derive(Deserialize)]
struct HarborArtifact {
    #[serde(default)]
    digest: Option<String>,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    push_time: Option<DateTime<Utc>>,
    #[serde(default)]
    tags: Option<Vec<HarborTag>>,
    #[serde(default)]
    extra_attrs: Option<HarborPlatform>,
    #[serde(default)]
    references: Option<Vec<HarborReference>>,
}

impl HarborArtifact {
    fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tags.iter().flatten().map(move |t| Tag {
            name: t.name.clone(),
            digest: self.digest.clone(),
            size: self.size,
            push_time: t.push_time.or(self.push_time),
        })
    }

    fn platforms(&self) -> Vec<Platform> {
        let from_index: Vec<Platform> = self
            .references
            .iter()
            .flatten()
            .filter_map(|r| r.platform.as_ref())
            .filter_map(to_platform)
            .collect();
        if !from_index.is_empty() {
            return from_index;
        }
        self.extra_attrs.as_ref().and_then(to_platform).into_iter().collect()
    }
}

fn to_platform(p: &HarborPlatform) -> Option<Platform> {
    Some(Platform {
        os: p.os.clone()?,
        architecture: p.architecture.clone()?,
    })
}

/// Repository names may contain slashes, which the API expects double encoded
fn encode_repository(name: &str) -> String {
    name.replace('/', "%252F")
}

pub struct ProjectRegistryAdapter {
    site: ProjectRegistrySite,
    host: Option<String>,
    http: reqwest::Client,
    base_urls: BaseUrlCache,
}

impl ProjectRegistryAdapter {
    pub fn new(
        site: ProjectRegistrySite,
        base_urls: BaseUrlCache,
        timeout: Duration,
    ) -> Result<Self> {
        let http = build_http_client(timeout, site.insecure_skip_tls_verify)?;
        let host = normalize_host(&site.url);
        Ok(Self {
            site,
            host,
            http,
            base_urls,
        })
    }

    /// API base URLs to try, the cached one first. Each is tried at most once.
    fn base_url_candidates(&self) -> Vec<String> {
        let root = self.site.url.trim_end_matches('/');
        let mut candidates: Vec<String> = PROJECT_API_PATHS
            .iter()
            .map(|p| format!("{}{}", root, p))
            .collect();
        if let Some(cached) = self.base_urls.get(self.site.id) {
            candidates.retain(|c| c != &cached);
            candidates.insert(0, cached);
        }
        candidates
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let context = format!("Request to {} {} failed", self.site.name, path);
        let mut last_error = None;

        for base in self.base_url_candidates() {
            let mut request = self.http.get(format!("{}{}", base, path));
            if let Some(username) = &self.site.username {
                request = request.basic_auth(username, self.site.password.as_ref());
            }
            let response = request
                .send()
                .await
                .map_err(|e| CourierError::from_http(e, &context))?;

            let status = response.status();
            if matches!(status.as_u16(), 400 | 404 | 405) {
                debug!("API base {} answered {} for {}, trying next candidate", base, status, path);
                last_error = Some(CourierError::from_status(status, &context));
                continue;
            }

            let body = decode_response(response, &context).await?;
            self.base_urls.remember(self.site.id, &base);
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| CourierError::Adapter(context)))
    }

    async fn get_pages<T: DeserializeOwned>(&self, path: &str, max_pages: usize) -> Result<Vec<T>> {
        let separator = if path.contains('?') { '&' } else { '?' };
        let mut items = Vec::new();

        for page in 1..=max_pages {
            let batch: Vec<T> = self
                .get_json(&format!("{}{}page={}&page_size={}", path, separator, page, PAGE_SIZE))
                .await?;
            let done = batch.len() < PAGE_SIZE;
            items.extend(batch);
            if done {
                break;
            }
        }
        Ok(items)
    }

    fn artifacts_path(repository: &RepositoryRef) -> String {
        format!(
            "/projects/{}/repositories/{}/artifacts?with_tag=true",
            repository.project,
            encode_repository(&repository.repository)
        )
    }

    fn to_repository(project: &str, repo: HarborRepository) -> Repository {
        let prefix = format!("{}/", project);
        let name = repo
            .name
            .strip_prefix(&prefix)
            .map(str::to_string)
            .unwrap_or(repo.name);
        Repository {
            full_name: format!("{}/{}", project, name),
            name,
            project: project.to_string(),
            artifact_count: repo.artifact_count.unwrap_or(0),
            pull_count: repo.pull_count.unwrap_or(0),
            description: repo.description.filter(|d| !d.is_empty()),
            updated_at: repo.update_time,
        }
    }
}

#[async_trait]
impl RegistryAdapter for ProjectRegistryAdapter {
    fn registry_type(&self) -> &'static str {
        "harbor"
    }

    fn capabilities(&self) -> RegistryCapabilities {
        RegistryCapabilities {
            supports_projects: true,
            supports_list_all_repositories: true,
            supports_tag_detail: true,
        }
    }

    fn known_host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    #[instrument(skip(self), fields(registry = %self.site.name))]
    async fn list_projects(&self) -> Result<Vec<Project>> {
        let projects: Vec<HarborProject> = self.get_pages("/projects", LIST_MAX_PAGES).await?;
        debug!("Found {} projects", projects.len());

        Ok(projects
            .into_iter()
            .map(|p| Project {
                public: p
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("public"))
                    .is_some_and(|v| v == "true"),
                id: p.project_id,
                repo_count: p.repo_count.unwrap_or(0),
                name: p.name,
            })
            .collect())
    }

    #[instrument(skip(self), fields(registry = %self.site.name))]
    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>> {
        let repositories: Vec<HarborRepository> = self
            .get_pages(&format!("/projects/{}/repositories", project), LIST_MAX_PAGES)
            .await?;

        Ok(repositories
            .into_iter()
            .map(|r| Self::to_repository(project, r))
            .collect())
    }

    /// Repositories of every project; a project that fails to list is logged and skipped
    #[instrument(skip(self), fields(registry = %self.site.name))]
    async fn list_all_repositories(&self) -> Result<Vec<Repository>> {
        let mut repositories = Vec::new();
        for project in self.list_projects().await? {
            match self.list_repositories(&project.name).await {
                Ok(repos) => repositories.extend(repos),
                Err(e) => warn!("Failed to list repositories of project {}: {}", project.name, e),
            }
        }
        Ok(repositories)
    }

    #[instrument(skip(self), fields(registry = %self.site.name, repository = %repository))]
    async fn list_tags(&self, repository: &RepositoryRef) -> Result<Vec<Tag>> {
        let artifacts: Vec<HarborArtifact> = self
            .get_pages(&Self::artifacts_path(repository), LIST_MAX_PAGES)
            .await?;

        let mut tags = dedupe_tags(artifacts.iter().flat_map(|a| a.tags()).collect());
        sort_tags(&mut tags);
        Ok(tags)
    }

    #[instrument(skip(self), fields(registry = %self.site.name, repository = %repository))]
    async fn get_tag_detail(&self, repository: &RepositoryRef, tag: &str) -> Result<TagDetail> {
        let path = Self::artifacts_path(repository);

        for page in 1..=TAG_DETAIL_MAX_PAGES {
            let artifacts: Vec<HarborArtifact> = self
                .get_json(&format!("{}&page={}&page_size={}", path, page, PAGE_SIZE))
                .await?;
            let last_page = artifacts.len() < PAGE_SIZE;

            let mut best: Option<(Tag, &HarborArtifact)> = None;
            for artifact in &artifacts {
                for candidate in artifact.tags().filter(|t| t.name == tag) {
                    if best.as_ref().map_or(true, |(current, _)| supersedes(&candidate, current)) {
                        best = Some((candidate, artifact));
                    }
                }
            }

            if let Some((found, artifact)) = best {
                return Ok(TagDetail {
                    name: found.name,
                    repository: repository.to_string(),
                    digest: found.digest,
                    size: found.size,
                    push_time: found.push_time,
                    platforms: artifact.platforms(),
                });
            }
            if last_page {
                break;
            }
        }

        Err(CourierError::NotFound(format!(
            "Tag {} not found in {}",
            tag, repository
        )))
    }
}
