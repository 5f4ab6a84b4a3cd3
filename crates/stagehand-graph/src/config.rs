use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::location::FeaturePackLocation;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConfigId {
    pub model: String,
    pub name: String,
}

impl ConfigId {
    pub fn new(model: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigCustomization {
    pub id: ConfigId,
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default)]
    pub excluded_layers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturePackConfig {
    pub location: FeaturePackLocation,
    #[serde(default)]
    pub inherit_packages: Option<bool>,
    #[serde(default)]
    pub inherit_configs: Option<bool>,
    #[serde(default)]
    pub inherit_model_only_configs: Option<bool>,
    #[serde(default)]
    pub excluded_packages: BTreeSet<String>,
    #[serde(default)]
    pub included_packages: BTreeSet<String>,
    #[serde(default)]
    pub excluded_config_models: BTreeSet<String>,
    #[serde(default)]
    pub included_config_models: BTreeSet<String>,
    #[serde(default)]
    pub excluded_default_configs: BTreeSet<ConfigId>,
    #[serde(default)]
    pub included_default_configs: BTreeSet<ConfigId>,
    #[serde(default)]
    pub patches: Vec<FeaturePackLocation>,
    #[serde(default)]
    pub configs: Vec<ConfigCustomization>,
    #[serde(default)]
    pub transitive: bool,
}

impl FeaturePackConfig {
    pub fn builder(location: FeaturePackLocation) -> FeaturePackConfigBuilder {
        FeaturePackConfigBuilder::new(location, false)
    }

    pub fn transitive_builder(location: FeaturePackLocation) -> FeaturePackConfigBuilder {
        FeaturePackConfigBuilder::new(location, true)
    }

    pub fn of(location: FeaturePackLocation) -> Self {
        Self::builder(location).build()
    }

    pub fn inherits_packages(&self) -> bool {
        self.inherit_packages.unwrap_or(true)
    }

    pub fn inherits_configs(&self) -> bool {
        self.inherit_configs.unwrap_or(true)
    }
}

#[derive(Debug, Clone)]
pub struct FeaturePackConfigBuilder {
    config: FeaturePackConfig,
}

impl FeaturePackConfigBuilder {
    fn new(location: FeaturePackLocation, transitive: bool) -> Self {
        Self {
            config: FeaturePackConfig {
                location,
                inherit_packages: None,
                inherit_configs: None,
                inherit_model_only_configs: None,
                excluded_packages: BTreeSet::new(),
                included_packages: BTreeSet::new(),
                excluded_config_models: BTreeSet::new(),
                included_config_models: BTreeSet::new(),
                excluded_default_configs: BTreeSet::new(),
                included_default_configs: BTreeSet::new(),
                patches: Vec::new(),
                configs: Vec::new(),
                transitive,
            },
        }
    }

    pub fn location(&self) -> &FeaturePackLocation {
        &self.config.location
    }

    pub fn inherit_packages(mut self, value: bool) -> Self {
        self.config.inherit_packages = Some(value);
        self
    }

    pub fn inherit_configs(mut self, value: bool) -> Self {
        self.config.inherit_configs = Some(value);
        self
    }

    pub fn inherit_model_only_configs(mut self, value: bool) -> Self {
        self.config.inherit_model_only_configs = Some(value);
        self
    }

    pub fn exclude_package(mut self, name: impl Into<String>) -> Self {
        self.config.excluded_packages.insert(name.into());
        self
    }

    pub fn include_package(mut self, name: impl Into<String>) -> Self {
        self.config.included_packages.insert(name.into());
        self
    }

    pub fn exclude_config_model(mut self, model: impl Into<String>) -> Self {
        self.config.excluded_config_models.insert(model.into());
        self
    }

    pub fn include_config_model(mut self, model: impl Into<String>) -> Self {
        self.config.included_config_models.insert(model.into());
        self
    }

    pub fn exclude_default_config(
        mut self,
        model: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.config
            .excluded_default_configs
            .insert(ConfigId::new(model, name));
        self
    }

    pub fn include_default_config(
        mut self,
        model: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        self.config
            .included_default_configs
            .insert(ConfigId::new(model, name));
        self
    }

    pub fn add_patch(mut self, patch: FeaturePackLocation) -> Self {
        if !self.config.patches.contains(&patch) {
            self.config.patches.push(patch);
        }
        self
    }

    pub fn add_config(mut self, config: ConfigCustomization) -> Self {
        if !self.config.configs.contains(&config) {
            self.config.configs.push(config);
        }
        self
    }

    pub fn build(self) -> FeaturePackConfig {
        self.config
    }
}
