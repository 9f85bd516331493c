// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Credentials injected into one stage's handler.
///
/// The pipeline only passes these through; `Debug` never prints values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StageSecrets {
    values: BTreeMap<String, String>,
}

impl StageSecrets {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for StageSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|k| (k, "<redacted>")))
            .finish()
    }
}

/// Resolves the secrets a stage asked for by name.
///
/// Names that cannot be resolved are left out; the handler decides whether
/// that is fatal.
pub trait SecretsProvider: Send + Sync {
    fn secrets_for(&self, stage: &str, names: &[String]) -> StageSecrets;
}

/// Reads each secret from the environment variable of the same name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSecretsProvider;

impl SecretsProvider for EnvSecretsProvider {
    fn secrets_for(&self, _stage: &str, names: &[String]) -> StageSecrets {
        StageSecrets::new(
            names
                .iter()
                .filter_map(|name| std::env::var(name).ok().map(|value| (name.clone(), value))),
        )
    }
}

/// Fixed name/value table, shared by every stage.
#[derive(Debug, Default, Clone)]
pub struct StaticSecretsProvider {
    values: HashMap<String, String>,
}

impl StaticSecretsProvider {
    pub fn new<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretsProvider for StaticSecretsProvider {
    fn secrets_for(&self, _stage: &str, names: &[String]) -> StageSecrets {
        StageSecrets::new(names.iter().filter_map(|name| {
            self.values
                .get(name)
                .map(|value| (name.clone(), value.clone()))
        }))
    }
}
