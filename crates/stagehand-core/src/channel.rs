use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::error::OperationError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: String,
    pub url: String,
}

impl Repository {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoStreamStrategy {
    Latest,
    MavenLatest,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    #[serde(default)]
    pub name: Option<String>,
    pub manifest_coordinate: String,
    #[serde(default)]
    pub blocklist_coordinate: Option<String>,
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub no_stream_strategy: NoStreamStrategy,
}

impl Channel {
    pub fn new(manifest_coordinate: impl Into<String>, repositories: Vec<Repository>) -> Self {
        Self {
            name: None,
            manifest_coordinate: manifest_coordinate.into(),
            blocklist_coordinate: None,
            repositories,
            no_stream_strategy: NoStreamStrategy::default(),
        }
    }
}

pub fn enforce_channel_names(channels: Vec<Channel>) -> Vec<Channel> {
    channels
        .into_iter()
        .enumerate()
        .map(|(index, channel)| {
            let missing = channel
                .name
                .as_deref()
                .map(str::trim)
                .unwrap_or("")
                .is_empty();
            if missing {
                Channel {
                    name: Some(format!("channel-{index}")),
                    ..channel
                }
            } else {
                channel
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelection {
    Current,
    Channels(Vec<Channel>),
    RepositoryOverride(Vec<Repository>),
}

impl ChannelSelection {
    pub fn apply_to(&self, current: &[Channel]) -> Result<Vec<Channel>> {
        let selected = match self {
            Self::Current => {
                if current.is_empty() {
                    return Err(OperationError::Configuration(
                        "the installation does not define any channels".to_string(),
                    )
                    .into());
                }
                current.to_vec()
            }
            Self::Channels(channels) => {
                if channels.is_empty() {
                    return Err(OperationError::Configuration(
                        "at least one channel is required".to_string(),
                    )
                    .into());
                }
                channels.clone()
            }
            Self::RepositoryOverride(repositories) => {
                if repositories.is_empty() {
                    return Err(OperationError::Configuration(
                        "at least one override repository is required".to_string(),
                    )
                    .into());
                }
                if current.is_empty() {
                    return Err(OperationError::Configuration(
                        "the installation does not define any channels to override".to_string(),
                    )
                    .into());
                }
                current
                    .iter()
                    .map(|channel| Channel {
                        repositories: repositories.clone(),
                        ..channel.clone()
                    })
                    .collect()
            }
        };
        Ok(enforce_channel_names(selected))
    }
}
