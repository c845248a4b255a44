// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMapSnapshot {
    pub name: String,
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

/// Secret contents for comparison. Values are kept only for equality checks
/// and are never serialized or printed.
#[derive(Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecretSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub keys: Vec<String>,
    #[serde(skip)]
    values: BTreeMap<String, Vec<u8>>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

impl SecretSnapshot {
    pub fn new(
        name: impl Into<String>,
        type_: impl Into<String>,
        values: BTreeMap<String, Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            type_: type_.into(),
            keys: values.keys().cloned().collect(),
            values,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
        }
    }

    pub fn with_metadata(
        mut self,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
    ) -> Self {
        self.labels = labels;
        self.annotations = annotations;
        self
    }

    pub(crate) fn values(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.values
    }
}

impl fmt::Debug for SecretSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretSnapshot")
            .field("name", &self.name)
            .field("type", &self.type_)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SecretSnapshot {
        SecretSnapshot::new(
            "db-credentials",
            "Opaque",
            BTreeMap::from([("password".to_string(), b"hunter2".to_vec())]),
        )
    }

    #[test]
    fn test_secret_values_not_serialized() {
        let json = serde_json::to_string(&snapshot()).unwrap();
        assert!(json.contains("password"));
        assert!(!json.contains("hunter2"));
    }

    #[test]
    fn test_secret_values_not_in_debug() {
        let debug = format!("{:?}", snapshot());
        assert!(debug.contains("db-credentials"));
        assert!(!debug.contains("hunter2"));
    }
}
