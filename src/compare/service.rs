// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{Comparable, Difference};
use crate::types::{ServiceRecord, Workload};
use serde::Serialize;

/// Display version of an image: everything after the last colon
pub fn image_version(image: &str) -> &str {
    image.rsplit_once(':').map_or(image, |(_, version)| version)
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDiff {
    pub image_tag: bool,
    pub status: bool,
    pub replicas: bool,
    pub source_version: String,
    pub target_version: String,
}

impl ServiceDiff {
    fn new(
        (source_image, source_status, source_replicas): (&str, &str, i32),
        (target_image, target_status, target_replicas): (&str, &str, i32),
    ) -> Self {
        Self {
            image_tag: source_image != target_image,
            status: source_status != target_status,
            replicas: source_replicas != target_replicas,
            source_version: image_version(source_image).to_string(),
            target_version: image_version(target_image).to_string(),
        }
    }
}

impl Difference for ServiceDiff {
    /// Versions are informational only
    fn is_different(&self) -> bool {
        self.image_tag || self.status || self.replicas
    }
}

impl Comparable for Workload {
    type Diff = ServiceDiff;

    fn key(&self) -> &str {
        &self.name
    }

    fn diff(&self, target: &Self) -> ServiceDiff {
        ServiceDiff::new(
            (self.image.as_str(), self.state.as_str(), self.scale),
            (target.image.as_str(), target.state.as_str(), target.scale),
        )
    }
}

/// Cached catalog entries compare the same way as live workloads
impl Comparable for ServiceRecord {
    type Diff = ServiceDiff;

    fn key(&self) -> &str {
        &self.name
    }

    fn diff(&self, target: &Self) -> ServiceDiff {
        ServiceDiff::new(
            (self.image_tag.as_str(), self.status.as_str(), self.replicas),
            (target.image_tag.as_str(), target.status.as_str(), target.replicas),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{compare_collections, keyed, DifferenceType};
    use crate::types::{WorkloadKind, WorkloadState};

    fn workload(name: &str, image: &str, state: WorkloadState, scale: i32) -> Workload {
        Workload {
            name: name.to_string(),
            kind: WorkloadKind::Deployment,
            state,
            image: image.to_string(),
            scale,
            available_replicas: scale,
        }
    }

    #[test]
    fn test_image_version() {
        assert_eq!(image_version("registry.example.com/proj/api:v2"), "v2");
        assert_eq!(image_version("nginx"), "nginx");
        assert_eq!(image_version("a:b:c"), "c");
    }

    #[test]
    fn test_image_change_is_different() {
        let source = workload("api", "registry.example.com/proj/api:v2", WorkloadState::Active, 2);
        let target = workload("api", "registry.example.com/proj/api:v1", WorkloadState::Active, 2);

        let diff = source.diff(&target);
        assert!(diff.is_different());
        assert!(diff.image_tag);
        assert!(!diff.replicas);
        assert_eq!(diff.source_version, "v2");
        assert_eq!(diff.target_version, "v1");
    }

    #[test]
    fn test_status_and_replicas_are_compared() {
        let source = workload("api", "api:v1", WorkloadState::Active, 2);

        assert!(source.diff(&workload("api", "api:v1", WorkloadState::Inactive, 2)).status);
        assert!(source.diff(&workload("api", "api:v1", WorkloadState::Active, 3)).replicas);
        assert!(!source.diff(&source.clone()).is_different());
    }

    #[test]
    fn test_service_records_compare_by_name() {
        let record = |instance: i64, image: &str| ServiceRecord {
            id: instance,
            app_instance_id: instance,
            name: "api".to_string(),
            kind: "deployment".to_string(),
            image_tag: image.to_string(),
            status: "active".to_string(),
            replicas: 1,
            updated_at: None,
        };

        let comparison = compare_collections(
            keyed(vec![record(1, "api:v2")]),
            keyed(vec![record(2, "api:v2")]),
        );
        assert_eq!(comparison.results[0].difference_type, DifferenceType::Identical);
        assert_eq!(comparison.summary.identical, 1);
    }
}
