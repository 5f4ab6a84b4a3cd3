use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::FeaturePackConfig;
use crate::error::GraphError;
use crate::location::FeaturePackLocation;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisioningConfig {
    #[serde(default)]
    pub feature_packs: Vec<FeaturePackConfig>,
    #[serde(default)]
    pub transitive: Vec<FeaturePackConfig>,
}

impl ProvisioningConfig {
    pub fn builder() -> ProvisioningConfigBuilder {
        ProvisioningConfigBuilder::default()
    }

    pub fn to_builder(&self) -> ProvisioningConfigBuilder {
        ProvisioningConfigBuilder {
            feature_packs: self.feature_packs.clone(),
            transitive: self.transitive.clone(),
        }
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let parsed: Self =
            toml::from_str(input).context("failed to parse provisioning configuration")?;

        let mut builder = ProvisioningConfigBuilder::default();
        for feature_pack in parsed
            .feature_packs
            .iter()
            .chain(parsed.transitive.iter())
        {
            builder.add_feature_pack(feature_pack.clone())?;
        }
        Ok(parsed)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize provisioning configuration")
    }
}

#[derive(Debug, Clone, Default)]
pub struct ProvisioningConfigBuilder {
    pub(crate) feature_packs: Vec<FeaturePackConfig>,
    pub(crate) transitive: Vec<FeaturePackConfig>,
}

impl ProvisioningConfigBuilder {
    pub fn add_feature_pack_dep(
        &mut self,
        location: FeaturePackLocation,
    ) -> Result<&mut Self, GraphError> {
        self.add_feature_pack(FeaturePackConfig::of(location))
    }

    pub fn add_feature_pack(
        &mut self,
        feature_pack: FeaturePackConfig,
    ) -> Result<&mut Self, GraphError> {
        let producer = &feature_pack.location.producer;
        if self.contains_producer(producer) {
            return Err(GraphError::DuplicateProducer(producer.clone()));
        }

        if feature_pack.transitive {
            self.transitive.push(feature_pack);
        } else {
            self.feature_packs.push(feature_pack);
        }
        Ok(self)
    }

    pub fn feature_packs(&self) -> &[FeaturePackConfig] {
        &self.feature_packs
    }

    pub fn transitive_deps(&self) -> &[FeaturePackConfig] {
        &self.transitive
    }

    pub fn build(&self) -> ProvisioningConfig {
        ProvisioningConfig {
            feature_packs: self.feature_packs.clone(),
            transitive: self.transitive.clone(),
        }
    }

    fn contains_producer(&self, producer: &str) -> bool {
        self.feature_packs
            .iter()
            .chain(self.transitive.iter())
            .any(|existing| existing.location.producer == producer)
    }
}
