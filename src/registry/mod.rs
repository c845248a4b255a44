// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Uniform access to container registries with and without a project hierarchy.

pub mod flat;
pub mod project;

pub use flat::FlatRegistryAdapter;
pub use project::ProjectRegistryAdapter;

use crate::error::{CourierError, Result};
use crate::image::ImageReference;
use crate::types::{Project, RegistryCapabilities, Repository, RepositoryRef, Tag, TagDetail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Human-readable registry type name
    fn registry_type(&self) -> &'static str;

    /// Static per adapter type
    fn capabilities(&self) -> RegistryCapabilities;

    /// Host stripped from image references served by this registry
    fn known_host(&self) -> Option<&str>;

    async fn list_projects(&self) -> Result<Vec<Project>>;

    async fn list_repositories(&self, project: &str) -> Result<Vec<Repository>>;

    async fn list_all_repositories(&self) -> Result<Vec<Repository>>;

    /// Tags sorted by push time, newest first
    async fn list_tags(&self, repository: &RepositoryRef) -> Result<Vec<Tag>>;

    async fn get_tag_detail(&self, repository: &RepositoryRef, tag: &str) -> Result<TagDetail>;

    fn parse_image(&self, image: &str) -> ImageReference {
        ImageReference::parse(image, self.known_host())
    }
}

/// Best-known-good API base URL per registry site. A miss only costs a re-probe.
#[derive(Clone, Default)]
pub struct BaseUrlCache {
    entries: Arc<RwLock<HashMap<i64, String>>>,
}

impl BaseUrlCache {
    pub fn get(&self, site_id: i64) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&site_id)
            .cloned()
    }

    pub fn remember(&self, site_id: i64, base_url: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(site_id, base_url.to_string());
    }
}

fn push_time_key(push_time: Option<DateTime<Utc>>) -> DateTime<Utc> {
    push_time.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Sort tags newest first; tags without a push time sort last
pub fn sort_tags(tags: &mut [Tag]) {
    tags.sort_by_key(|t| Reverse(push_time_key(t.push_time)));
}

/// Whether a later-seen entry of the same tag replaces the current one:
/// a newer push wins, and so does an equal one
pub(crate) fn supersedes(candidate: &Tag, current: &Tag) -> bool {
    push_time_key(candidate.push_time) >= push_time_key(current.push_time)
}

/// Keep one entry per tag name: the newest push, the later-seen one on ties.
/// First-seen order of names is preserved.
pub fn dedupe_tags(tags: Vec<Tag>) -> Vec<Tag> {
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut unique: Vec<Tag> = Vec::with_capacity(tags.len());

    for tag in tags {
        match positions.get(&tag.name) {
            Some(&idx) => {
                if supersedes(&tag, &unique[idx]) {
                    unique[idx] = tag;
                }
            }
            None => {
                positions.insert(tag.name.clone(), unique.len());
                unique.push(tag);
            }
        }
    }
    unique
}

/// Decode a successful response or classify the failure
pub(crate) async fn decode_response<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &str,
) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(CourierError::from_status(status, context));
    }
    response
        .json()
        .await
        .map_err(|e| CourierError::Adapter(format!("{}: invalid response: {}", context, e)))
}

pub(crate) fn build_http_client(
    timeout: std::time::Duration,
    insecure_skip_tls_verify: bool,
) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(insecure_skip_tls_verify)
        .build()
        .map_err(|e| CourierError::Adapter(format!("Failed to build HTTP client: {}", e)))
}
