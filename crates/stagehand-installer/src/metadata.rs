use std::fs;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use stagehand_core::{enforce_channel_names, Channel, OperationError, ResolvedManifest};

use crate::fs_utils::{collect_tree_files, file_sha256, join_unix_path};
use crate::layout::{InstallationLayout, METADATA_DIR_NAME};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallationMetadata {
    pub manifest: ResolvedManifest,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub inventory: Vec<InventoryEntry>,
}

impl InstallationMetadata {
    pub fn new(
        manifest: ResolvedManifest,
        channels: Vec<Channel>,
        inventory: Vec<InventoryEntry>,
    ) -> Self {
        Self {
            manifest,
            channels: enforce_channel_names(channels),
            inventory,
        }
    }

    pub fn read(layout: &InstallationLayout) -> Result<Self> {
        let path = layout.metadata_path();
        let raw = fs::read_to_string(&path).map_err(|err| OperationError::Metadata {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        let metadata: Self = toml::from_str(&raw).map_err(|err| OperationError::Metadata {
            path: path.clone(),
            reason: err.to_string(),
        })?;
        Ok(metadata)
    }

    pub fn write(&self, layout: &InstallationLayout) -> Result<()> {
        layout.ensure_metadata_dir()?;

        let raw = toml::to_string_pretty(self).map_err(|err| OperationError::Metadata {
            path: layout.metadata_path(),
            reason: err.to_string(),
        })?;

        let tmp = layout.metadata_tmp_path();
        fs::write(&tmp, raw).map_err(|err| OperationError::Metadata {
            path: tmp.clone(),
            reason: err.to_string(),
        })?;
        fs::rename(&tmp, layout.metadata_path()).map_err(|err| OperationError::Metadata {
            path: layout.metadata_path(),
            reason: err.to_string(),
        })?;
        Ok(())
    }
}

pub fn collect_inventory(layout: &InstallationLayout) -> Result<Vec<InventoryEntry>> {
    let files = collect_tree_files(layout.root(), &[METADATA_DIR_NAME])?;
    let mut inventory = Vec::with_capacity(files.len());
    for path in files {
        let sha256 = file_sha256(&join_unix_path(layout.root(), &path))?;
        inventory.push(InventoryEntry { path, sha256 });
    }
    Ok(inventory)
}
