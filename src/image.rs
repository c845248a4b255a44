// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Container image reference parsing

use crate::constants::registry::{DEFAULT_NAMESPACE, DEFAULT_TAG};
use crate::types::RepositoryRef;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::debug;
use url::Url;

static HOST_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z][A-Za-z0-9+.-]*://)?([^/?#]+)").ok());

/// Strip scheme and path from a host or URL, keeping `host[:port]`.
/// Hosts are lowercased and default ports dropped.
pub fn normalize_host(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let candidate = if input.contains("://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    match Url::parse(&candidate) {
        Ok(url) => {
            let host = url.host_str()?;
            Some(match url.port() {
                Some(port) => format!("{}:{}", host, port),
                None => host.to_string(),
            })
        }
        Err(e) => {
            debug!("Falling back to pattern match for host {}: {}", input, e);
            HOST_PATTERN
                .as_ref()?
                .captures(input)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_lowercase())
        }
    }
}

/// An image reference split into its registry, project (or namespace), repository and tag
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, set when the known host was stripped from the reference
    pub registry: Option<String>,
    pub project: String,
    pub repository: String,
    pub tag: String,
}

impl ImageReference {
    /// Parse `[host/][project/]repository[:tag]`.
    ///
    /// The tag is split at the last colon only when no `/` follows it, so
    /// `host:5000/repo` keeps its port. A leading host segment is stripped when
    /// it normalizes to `known_host`, so case and default ports do not matter.
    /// References with a single path segment live in the default project;
    /// otherwise the first segment is the project and the rest, slashes
    /// included, the repository.
    pub fn parse(reference: &str, known_host: Option<&str>) -> Self {
        let reference = reference.trim();
        let (path, tag) = match reference.rfind(':') {
            Some(idx) if !reference[idx + 1..].contains('/') => {
                (&reference[..idx], &reference[idx + 1..])
            }
            _ => (reference, ""),
        };
        let tag = if tag.is_empty() { DEFAULT_TAG } else { tag };

        let known = known_host.and_then(normalize_host);
        let (registry, path) = match (known, path.split_once('/')) {
            (Some(known), Some((host, rest)))
                if normalize_host(host).as_deref() == Some(known.as_str()) =>
            {
                (Some(known), rest)
            }
            _ => (None, path),
        };

        let (project, repository) = match path.split_once('/') {
            Some((project, repository)) => (project, repository),
            None => (DEFAULT_NAMESPACE, path),
        };

        Self {
            registry,
            project: project.to_string(),
            repository: repository.to_string(),
            tag: tag.to_string(),
        }
    }

    pub fn repository_ref(&self) -> RepositoryRef {
        RepositoryRef::new(&self.project, &self.repository)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_reference_with_known_host() {
        let image =
            ImageReference::parse("registry.example.com/proj/api:v2", Some("registry.example.com"));
        assert_eq!(image.registry.as_deref(), Some("registry.example.com"));
        assert_eq!(image.project, "proj");
        assert_eq!(image.repository, "api");
        assert_eq!(image.tag, "v2");
    }

    #[test]
    fn test_parse_bare_repository() {
        let image = ImageReference::parse("nginx", None);
        assert_eq!(image.registry, None);
        assert_eq!(image.project, "library");
        assert_eq!(image.repository, "nginx");
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_parse_namespace_and_tag() {
        let image = ImageReference::parse("bitnami/redis:7.2", None);
        assert_eq!(image.project, "bitnami");
        assert_eq!(image.repository, "redis");
        assert_eq!(image.tag, "7.2");
    }

    #[test]
    fn test_port_is_not_a_tag() {
        let image =
            ImageReference::parse("registry.local:5000/team/app", Some("registry.local:5000"));
        assert_eq!(image.registry.as_deref(), Some("registry.local:5000"));
        assert_eq!(image.project, "team");
        assert_eq!(image.repository, "app");
        assert_eq!(image.tag, "latest");
    }

    #[test]
    fn test_port_and_tag() {
        let image = ImageReference::parse(
            "registry.local:5000/team/app:1.4.0",
            Some("registry.local:5000"),
        );
        assert_eq!(image.project, "team");
        assert_eq!(image.repository, "app");
        assert_eq!(image.tag, "1.4.0");
    }

    #[test]
    fn test_nested_repository_keeps_slashes() {
        let image = ImageReference::parse(
            "harbor.example.com/platform/tools/cli:3",
            Some("harbor.example.com"),
        );
        assert_eq!(image.project, "platform");
        assert_eq!(image.repository, "tools/cli");
        assert_eq!(image.tag, "3");
        assert_eq!(image.repository_ref().to_string(), "platform/tools/cli");
    }

    #[test]
    fn test_unknown_host_is_kept_as_project() {
        let image = ImageReference::parse("ghcr.io/org/app:v1", Some("harbor.example.com"));
        assert_eq!(image.registry, None);
        assert_eq!(image.project, "ghcr.io");
        assert_eq!(image.repository, "org/app");
    }

    #[test]
    fn test_known_host_matches_regardless_of_case_and_default_port() {
        for reference in ["harbor.example.com:443/proj/api:v1", "Harbor.Example.com/proj/api:v1"] {
            let image = ImageReference::parse(reference, Some("harbor.example.com"));
            assert_eq!(image.registry.as_deref(), Some("harbor.example.com"), "{}", reference);
            assert_eq!(image.project, "proj", "{}", reference);
            assert_eq!(image.repository, "api", "{}", reference);
            assert_eq!(image.tag, "v1", "{}", reference);
        }
    }

    #[test]
    fn test_non_default_port_must_match() {
        let image =
            ImageReference::parse("harbor.example.com:8443/proj/api", Some("harbor.example.com"));
        assert_eq!(image.registry, None);
        assert_eq!(image.project, "harbor.example.com:8443");
    }

    #[test]
    fn test_normalize_host() {
        let cases = [
            ("https://harbor.example.com/", Some("harbor.example.com")),
            ("harbor.example.com", Some("harbor.example.com")),
            ("HARBOR.example.com:443", Some("harbor.example.com")),
            ("http://registry.lab:8443/api/v2.0", Some("registry.lab:8443")),
            ("registry.lab:8443", Some("registry.lab:8443")),
            ("  ", None),
        ];
        for (input, expected) in cases {
            assert_eq!(normalize_host(input).as_deref(), expected, "{}", input);
        }
    }

    #[test]
    fn test_normalize_host_falls_back_when_unparseable() {
        // Port out of range is rejected by the URL parser
        assert_eq!(
            normalize_host("Registry.lab:99999/proj"),
            Some("registry.lab:99999".to_string())
        );
    }

    #[test]
    fn test_host_prefix_must_end_at_slash() {
        let image =
            ImageReference::parse("harbor.example.com.evil/proj/app", Some("harbor.example.com"));
        assert_eq!(image.registry, None);
        assert_eq!(image.project, "harbor.example.com.evil");
    }
}
