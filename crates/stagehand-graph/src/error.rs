use thiserror::Error;

use crate::location::FeaturePackLocation;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("invalid feature pack location: '{0}'")]
    InvalidLocation(String),

    #[error("feature pack '{0}' is not a direct dependency of this configuration")]
    FeaturePackNotFound(FeaturePackLocation),

    #[error("feature pack producer '{0}' is already present in this configuration")]
    DuplicateProducer(String),
}
