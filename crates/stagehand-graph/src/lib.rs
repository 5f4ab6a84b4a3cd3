mod config;
mod error;
mod location;
mod manipulator;
mod provisioning;

pub use config::{ConfigCustomization, ConfigId, FeaturePackConfig, FeaturePackConfigBuilder};
pub use error::GraphError;
pub use location::FeaturePackLocation;
pub use manipulator::{copy_feature_pack_config, ProvisioningConfigManipulator};
pub use provisioning::{ProvisioningConfig, ProvisioningConfigBuilder};
