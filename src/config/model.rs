use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use crate::types::{RetentionSlice, Secret};

/// Parsed configuration file. Target bodies stay as raw YAML until a single
/// target is validated, so a malformed sibling never blocks the selected one.
#[derive(Debug, Clone)]
pub struct Config {
    pub targets: Mapping,
}

impl Config {
    /// Target names in file order.
    pub fn target_names(&self) -> Vec<String> {
        self.targets
            .keys()
            .map(|key| match key {
                Value::String(name) => name.clone(),
                other => serde_yaml::to_string(other)
                    .map(|s| s.trim_end().to_string())
                    .unwrap_or_default(),
            })
            .collect()
    }

    pub fn target(&self, name: &str) -> Option<&Value> {
        self.targets.get(name)
    }
}

/// Retention counts per slice; slices with no count are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Retention(pub BTreeMap<RetentionSlice, u64>);

impl Retention {
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|count| *count == 0)
    }

    /// `(slice, count)` pairs with a non-zero count, hourly first.
    pub fn flags(&self) -> impl Iterator<Item = (RetentionSlice, u64)> + '_ {
        self.0
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(slice, count)| (*slice, *count))
    }
}

/// A validated target. Fields not given in the file are `None` and fall back
/// to [`TargetDefaults`] when the execution context is built.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    pub name: String,
    pub src_paths: Vec<String>,
    pub dst_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dst_srv: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cert_path: Option<String>,
    #[serde(skip)]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep: Option<Retention>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_run: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_run: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetDefaults {
    pub cert_path: String,
    pub password: Secret,
    pub user: String,
    pub rate_limit: u64,
    pub pre_run: String,
    pub post_run: String,
}
