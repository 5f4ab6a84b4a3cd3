use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::stream::ResolvedManifest;
use crate::version::compare_versions;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactChange {
    pub name: String,
    #[serde(default)]
    pub old_version: Option<String>,
    #[serde(default)]
    pub new_version: Option<String>,
}

impl ArtifactChange {
    pub fn added(name: impl Into<String>, new_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_version: None,
            new_version: Some(new_version.into()),
        }
    }

    pub fn removed(name: impl Into<String>, old_version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            old_version: Some(old_version.into()),
            new_version: None,
        }
    }

    pub fn updated(
        name: impl Into<String>,
        old_version: impl Into<String>,
        new_version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            old_version: Some(old_version.into()),
            new_version: Some(new_version.into()),
        }
    }

    pub fn is_downgrade(&self) -> bool {
        match (&self.old_version, &self.new_version) {
            (Some(old), Some(new)) => compare_versions(new, old) == Ordering::Less,
            _ => false,
        }
    }
}

pub fn artifact_diff(
    current: &ResolvedManifest,
    candidate: &ResolvedManifest,
) -> Vec<ArtifactChange> {
    let mut changes = Vec::new();

    for (name, old_version) in &current.streams {
        match candidate.streams.get(name) {
            None => changes.push(ArtifactChange::removed(name, old_version)),
            Some(new_version) if new_version != old_version => {
                changes.push(ArtifactChange::updated(name, old_version, new_version));
            }
            Some(_) => {}
        }
    }

    for (name, new_version) in &candidate.streams {
        if !current.streams.contains_key(name) {
            changes.push(ArtifactChange::added(name, new_version));
        }
    }

    changes.sort_by(|a, b| a.name.cmp(&b.name));
    changes
}
