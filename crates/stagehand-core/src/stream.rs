use std::collections::BTreeMap;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentStream {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedManifest {
    #[serde(default)]
    pub streams: BTreeMap<String, String>,
}

impl ResolvedManifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_streams(streams: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            streams: streams.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, version: impl Into<String>) {
        self.streams.insert(name.into(), version.into());
    }

    pub fn find(&self, name: &str) -> Option<&str> {
        self.streams.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn component_streams(&self) -> Vec<ComponentStream> {
        self.streams
            .iter()
            .map(|(name, version)| ComponentStream {
                name: name.clone(),
                version: version.clone(),
            })
            .collect()
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let manifest: Self =
            toml::from_str(input).context("failed to parse resolved manifest")?;
        for (name, version) in &manifest.streams {
            if name.trim().is_empty() {
                return Err(anyhow!("resolved manifest contains an empty stream name"));
            }
            if version.trim().is_empty() {
                return Err(anyhow!(
                    "resolved manifest stream '{name}' has an empty version"
                ));
            }
        }
        Ok(manifest)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize resolved manifest")
    }
}
