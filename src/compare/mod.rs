// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Keyed diff of two resource collections.
//!
//! Results are ordered missing-in-source, missing-in-target, different,
//! identical, then by name. The summary counts always add up to the size of
//! the union of names.

pub mod config_data;
pub mod instances;
pub mod service;

pub use config_data::KeyDiff;
pub use instances::InstanceComparer;
pub use service::{image_version, ServiceDiff};

use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DifferenceType {
    MissingInSource,
    MissingInTarget,
    Different,
    Identical,
}

/// Outcome of a kind-specific comparison of two snapshots
pub trait Difference {
    fn is_different(&self) -> bool;
}

/// A resource snapshot that can be keyed by name and diffed against another one
pub trait Comparable {
    type Diff: Difference;

    fn key(&self) -> &str;

    fn diff(&self, target: &Self) -> Self::Diff;
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult<T, D> {
    pub name: String,
    pub source: Option<T>,
    pub target: Option<T>,
    pub difference_type: DifferenceType,
    /// Only set when the resource exists on both sides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub differences: Option<D>,
}

#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSummary {
    pub total: usize,
    pub identical: usize,
    pub different: usize,
    pub missing_in_source: usize,
    pub missing_in_target: usize,
}

impl ComparisonSummary {
    fn record(&mut self, difference_type: DifferenceType) {
        self.total += 1;
        match difference_type {
            DifferenceType::Identical => self.identical += 1,
            DifferenceType::Different => self.different += 1,
            DifferenceType::MissingInSource => self.missing_in_source += 1,
            DifferenceType::MissingInTarget => self.missing_in_target += 1,
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Comparison<T, D> {
    pub results: Vec<ComparisonResult<T, D>>,
    pub summary: ComparisonSummary,
}

/// Comparison of `T` snapshots with their kind-specific differences
pub type ComparisonOf<T> = Comparison<T, <T as Comparable>::Diff>;

/// Key a collection by resource name. Names are unique within a collection;
/// on a duplicate the later entry wins.
pub fn keyed<T: Comparable>(items: Vec<T>) -> BTreeMap<String, T> {
    items
        .into_iter()
        .map(|item| (item.key().to_string(), item))
        .collect()
}

pub fn compare_collections<T: Comparable>(
    source: BTreeMap<String, T>,
    mut target: BTreeMap<String, T>,
) -> ComparisonOf<T> {
    let mut results = Vec::with_capacity(source.len() + target.len());

    for (name, source_item) in source {
        let result = match target.remove(&name) {
            Some(target_item) => {
                let diff = source_item.diff(&target_item);
                let difference_type = if diff.is_different() {
                    DifferenceType::Different
                } else {
                    DifferenceType::Identical
                };
                ComparisonResult {
                    name,
                    source: Some(source_item),
                    target: Some(target_item),
                    difference_type,
                    differences: Some(diff),
                }
            }
            None => ComparisonResult {
                name,
                source: Some(source_item),
                target: None,
                difference_type: DifferenceType::MissingInTarget,
                differences: None,
            },
        };
        results.push(result);
    }

    results.extend(target.into_iter().map(|(name, target_item)| ComparisonResult {
        name,
        source: None,
        target: Some(target_item),
        difference_type: DifferenceType::MissingInSource,
        differences: None,
    }));

    results.sort_by(|a, b| {
        a.difference_type
            .cmp(&b.difference_type)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut summary = ComparisonSummary::default();
    for result in &results {
        summary.record(result.difference_type);
    }

    Comparison { results, summary }
}
