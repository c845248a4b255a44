// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use super::{Comparable, Difference};
use crate::types::{ConfigMapSnapshot, SecretSnapshot};
use serde::Serialize;
use std::collections::BTreeMap;

/// Key-level differences of a ConfigMap or Secret. Only key names are carried.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyDiff {
    pub only_in_source: Vec<String>,
    pub only_in_target: Vec<String>,
    pub value_changed: Vec<String>,
    pub labels_differ: bool,
    pub annotations_differ: bool,
}

impl KeyDiff {
    fn between<V: PartialEq>(source: &BTreeMap<String, V>, target: &BTreeMap<String, V>) -> Self {
        let mut diff = KeyDiff::default();
        for (key, value) in source {
            match target.get(key) {
                Some(other) if other != value => diff.value_changed.push(key.clone()),
                Some(_) => {}
                None => diff.only_in_source.push(key.clone()),
            }
        }
        diff.only_in_target = target
            .keys()
            .filter(|k| !source.contains_key(*k))
            .cloned()
            .collect();
        diff
    }

    fn with_metadata(
        mut self,
        (source_labels, source_annotations): (&BTreeMap<String, String>, &BTreeMap<String, String>),
        (target_labels, target_annotations): (&BTreeMap<String, String>, &BTreeMap<String, String>),
    ) -> Self {
        self.labels_differ = source_labels != target_labels;
        self.annotations_differ = source_annotations != target_annotations;
        self
    }
}

impl Difference for KeyDiff {
    /// Data keys decide; label and annotation changes are reported alongside
    fn is_different(&self) -> bool {
        !self.only_in_source.is_empty()
            || !self.only_in_target.is_empty()
            || !self.value_changed.is_empty()
    }
}

impl Comparable for ConfigMapSnapshot {
    type Diff = KeyDiff;

    fn key(&self) -> &str {
        &self.name
    }

    fn diff(&self, target: &Self) -> KeyDiff {
        KeyDiff::between(&self.data, &target.data).with_metadata(
            (&self.labels, &self.annotations),
            (&target.labels, &target.annotations),
        )
    }
}

impl Comparable for SecretSnapshot {
    type Diff = KeyDiff;

    fn key(&self) -> &str {
        &self.name
    }

    fn diff(&self, target: &Self) -> KeyDiff {
        KeyDiff::between(self.values(), target.values()).with_metadata(
            (&self.labels, &self.annotations),
            (&target.labels, &target.annotations),
        )
    }
}
