use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GraphError;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeaturePackLocation {
    pub producer: String,
    pub channel: Option<String>,
    pub version: Option<String>,
}

impl FeaturePackLocation {
    pub fn new(producer: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            channel: None,
            version: None,
        }
    }

    pub fn with_version(producer: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            producer: producer.into(),
            channel: None,
            version: Some(version.into()),
        }
    }

    pub fn parse(input: &str) -> Result<Self, GraphError> {
        let trimmed = input.trim();
        let (rest, version) = match trimmed.split_once('#') {
            Some((rest, version)) => (rest, Some(version)),
            None => (trimmed, None),
        };
        let (producer, channel) = match rest.split_once('@') {
            Some((producer, channel)) => (producer, Some(channel)),
            None => (rest, None),
        };

        if producer.is_empty()
            || version.is_some_and(str::is_empty)
            || channel.is_some_and(str::is_empty)
        {
            return Err(GraphError::InvalidLocation(input.to_string()));
        }

        Ok(Self {
            producer: producer.to_string(),
            channel: channel.map(ToOwned::to_owned),
            version: version.map(ToOwned::to_owned),
        })
    }
}

impl fmt::Display for FeaturePackLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.producer)?;
        if let Some(channel) = &self.channel {
            write!(f, "@{channel}")?;
        }
        if let Some(version) = &self.version {
            write!(f, "#{version}")?;
        }
        Ok(())
    }
}

impl TryFrom<String> for FeaturePackLocation {
    type Error = GraphError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FeaturePackLocation> for String {
    fn from(value: FeaturePackLocation) -> Self {
        value.to_string()
    }
}
