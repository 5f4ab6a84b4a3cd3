use crate::config::{FeaturePackConfig, FeaturePackConfigBuilder};
use crate::error::GraphError;
use crate::location::FeaturePackLocation;
use crate::provisioning::ProvisioningConfigBuilder;

pub struct ProvisioningConfigManipulator<'a> {
    builder: &'a mut ProvisioningConfigBuilder,
}

impl<'a> ProvisioningConfigManipulator<'a> {
    pub fn new(builder: &'a mut ProvisioningConfigBuilder) -> Self {
        Self { builder }
    }

    pub fn remove_feature_pack_definition(
        &mut self,
        location: &FeaturePackLocation,
    ) -> Result<usize, GraphError> {
        let index = self
            .builder
            .feature_packs
            .iter()
            .position(|feature_pack| &feature_pack.location == location)
            .ok_or_else(|| GraphError::FeaturePackNotFound(location.clone()))?;

        self.builder.feature_packs.remove(index);
        Ok(index)
    }

    pub fn convert_to_transitive_dep(
        &mut self,
        location: &FeaturePackLocation,
    ) -> Result<usize, GraphError> {
        let index = self
            .builder
            .feature_packs
            .iter()
            .position(|feature_pack| &feature_pack.location == location)
            .ok_or_else(|| GraphError::FeaturePackNotFound(location.clone()))?;

        let removed = self.builder.feature_packs.remove(index);
        let transitive = copy_feature_pack_config(
            &removed,
            FeaturePackConfig::transitive_builder(removed.location.clone()),
        )
        .build();
        self.builder.transitive.push(transitive);
        Ok(index)
    }
}

pub fn copy_feature_pack_config(
    origin: &FeaturePackConfig,
    mut destination: FeaturePackConfigBuilder,
) -> FeaturePackConfigBuilder {
    if let Some(value) = origin.inherit_packages {
        destination = destination.inherit_packages(value);
    }
    if let Some(value) = origin.inherit_configs {
        destination = destination.inherit_configs(value);
    }
    if let Some(value) = origin.inherit_model_only_configs {
        destination = destination.inherit_model_only_configs(value);
    }

    for package in &origin.excluded_packages {
        destination = destination.exclude_package(package.as_str());
    }
    for package in &origin.included_packages {
        destination = destination.include_package(package.as_str());
    }
    for model in &origin.excluded_config_models {
        destination = destination.exclude_config_model(model.as_str());
    }
    for model in &origin.included_config_models {
        destination = destination.include_config_model(model.as_str());
    }
    for config_id in &origin.excluded_default_configs {
        destination =
            destination.exclude_default_config(config_id.model.as_str(), config_id.name.as_str());
    }
    for config_id in &origin.included_default_configs {
        destination =
            destination.include_default_config(config_id.model.as_str(), config_id.name.as_str());
    }
    for patch in &origin.patches {
        destination = destination.add_patch(patch.clone());
    }
    for config in &origin.configs {
        destination = destination.add_config(config.clone());
    }

    destination
}
