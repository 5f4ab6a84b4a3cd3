use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use stagehand_core::{
    artifact_diff, enforce_channel_names, ArtifactChange, Channel, ChannelSelection, Console,
    OperationError, ResolvedManifest,
};
use stagehand_graph::ProvisioningConfig;

use crate::layout::InstallationLayout;
use crate::metadata::{collect_inventory, InstallationMetadata};
use crate::provision::Provisioner;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateCandidateOutcome {
    NoChanges,
    Cancelled,
    Built { changes: Vec<ArtifactChange> },
}

pub struct UpdateCandidateBuilder<'a> {
    layout: &'a InstallationLayout,
    provisioner: &'a dyn Provisioner,
}

impl<'a> UpdateCandidateBuilder<'a> {
    pub fn new(layout: &'a InstallationLayout, provisioner: &'a dyn Provisioner) -> Self {
        Self {
            layout,
            provisioner,
        }
    }

    pub fn build(
        &self,
        selection: &ChannelSelection,
        staging: &Path,
        console: &dyn Console,
    ) -> Result<UpdateCandidateOutcome> {
        if !self.layout.is_installation() {
            return Err(OperationError::InvalidInstallation {
                path: self.layout.root().to_path_buf(),
            }
            .into());
        }
        let config = read_provisioning_config(self.layout)?;
        self.build_with_config(&config, selection, staging, console)
    }

    pub fn build_with_config(
        &self,
        config: &ProvisioningConfig,
        selection: &ChannelSelection,
        staging: &Path,
        console: &dyn Console,
    ) -> Result<UpdateCandidateOutcome> {
        if !self.layout.is_installation() {
            return Err(OperationError::InvalidInstallation {
                path: self.layout.root().to_path_buf(),
            }
            .into());
        }
        let live = InstallationMetadata::read(self.layout)?;
        let channels = selection.apply_to(&live.channels)?;

        validate_staging_dir(staging)?;

        let result = self
            .provisioner
            .materialize(config, &channels, staging, console);
        let candidate_manifest = match result {
            Ok(manifest) => manifest,
            Err(err) => {
                clean_staging_best_effort(staging);
                return Err(err);
            }
        };

        let changes = artifact_diff(&live.manifest, &candidate_manifest);
        if changes.is_empty() {
            clean_staging_best_effort(staging);
            return Ok(UpdateCandidateOutcome::NoChanges);
        }

        console.changes_found(&changes);
        if !console.confirm("Continue with building the update candidate?") {
            clean_staging_best_effort(staging);
            return Ok(UpdateCandidateOutcome::Cancelled);
        }

        let staging_layout = InstallationLayout::new(staging);
        let inventory = collect_inventory(&staging_layout)?;
        InstallationMetadata::new(candidate_manifest, channels, inventory)
            .write(&staging_layout)?;
        write_provisioning_config(&staging_layout, config)?;
        write_candidate_changes(&staging_layout, &changes)?;

        Ok(UpdateCandidateOutcome::Built { changes })
    }
}

pub fn provision_installation(
    layout: &InstallationLayout,
    config: &ProvisioningConfig,
    channels: Vec<Channel>,
    provisioner: &dyn Provisioner,
    console: &dyn Console,
) -> Result<ResolvedManifest> {
    let root = layout.root();
    if root.is_file() {
        return Err(OperationError::Configuration(format!(
            "installation target must be a directory: {}",
            root.display()
        ))
        .into());
    }
    if root.exists() && !crate::fs_utils::is_empty_dir(root)? {
        return Err(OperationError::Configuration(format!(
            "cannot provision into a non-empty directory: {}",
            root.display()
        ))
        .into());
    }

    let channels = enforce_channel_names(channels);
    let manifest = provisioner.materialize(config, &channels, root, console)?;

    let inventory = collect_inventory(layout)?;
    InstallationMetadata::new(manifest.clone(), channels, inventory).write(layout)?;
    write_provisioning_config(layout, config)?;

    Ok(manifest)
}

pub fn preview_update(
    layout: &InstallationLayout,
    selection: &ChannelSelection,
    provisioner: &dyn Provisioner,
    console: &dyn Console,
) -> Result<Vec<ArtifactChange>> {
    if !layout.is_installation() {
        return Err(OperationError::InvalidInstallation {
            path: layout.root().to_path_buf(),
        }
        .into());
    }
    let live = InstallationMetadata::read(layout)?;
    let config = read_provisioning_config(layout)?;
    let channels = selection.apply_to(&live.channels)?;

    let scratch = scratch_dir("preview")?;
    let result = provisioner.materialize(&config, &channels, &scratch, console);
    let changes = result.map(|manifest| artifact_diff(&live.manifest, &manifest));
    clean_staging_best_effort(&scratch);
    changes
}

pub fn read_provisioning_config(layout: &InstallationLayout) -> Result<ProvisioningConfig> {
    let path = layout.provisioning_config_path();
    let raw = fs::read_to_string(&path).map_err(|err| OperationError::Metadata {
        path: path.clone(),
        reason: err.to_string(),
    })?;
    ProvisioningConfig::from_toml_str(&raw).map_err(|err| {
        OperationError::Metadata {
            path,
            reason: format!("{err:#}"),
        }
        .into()
    })
}

pub fn read_candidate_changes(layout: &InstallationLayout) -> Result<Vec<ArtifactChange>> {
    let path = layout.candidate_changes_path();
    let raw = fs::read_to_string(&path).map_err(|_| OperationError::InvalidCandidateTarget {
        path: layout.root().to_path_buf(),
        reason: "the directory is not a prepared update candidate".to_string(),
    })?;
    let changes = serde_json::from_str(&raw).map_err(|err| {
        OperationError::InvalidCandidateTarget {
            path: layout.root().to_path_buf(),
            reason: format!("unreadable change record: {err}"),
        }
    })?;
    Ok(changes)
}

fn write_provisioning_config(
    layout: &InstallationLayout,
    config: &ProvisioningConfig,
) -> Result<()> {
    let path = layout.provisioning_config_path();
    fs::write(&path, config.to_toml_string()?)
        .with_context(|| format!("failed to write provisioning config: {}", path.display()))
}

fn write_candidate_changes(
    layout: &InstallationLayout,
    changes: &[ArtifactChange],
) -> Result<()> {
    let path = layout.candidate_changes_path();
    let raw = serde_json::to_string_pretty(changes).context("failed to serialize change record")?;
    fs::write(&path, raw)
        .with_context(|| format!("failed to write change record: {}", path.display()))
}

fn validate_staging_dir(staging: &Path) -> Result<()> {
    match fs::metadata(staging) {
        Ok(metadata) => {
            if !metadata.is_dir() {
                return Err(OperationError::InvalidCandidateTarget {
                    path: staging.to_path_buf(),
                    reason: "the target is not a directory".to_string(),
                }
                .into());
            }
            if !crate::fs_utils::is_empty_dir(staging)? {
                return Err(OperationError::InvalidCandidateTarget {
                    path: staging.to_path_buf(),
                    reason: "the target directory is not empty".to_string(),
                }
                .into());
            }
            Ok(())
        }
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            fs::create_dir_all(staging)
                .with_context(|| format!("failed to create {}", staging.display()))?;
            Ok(())
        }
        Err(err) => Err(err)
            .with_context(|| format!("failed to inspect staging dir: {}", staging.display())),
    }
}

fn clean_staging_best_effort(staging: &Path) {
    let _ = fs::remove_dir_all(staging);
}

fn scratch_dir(label: &str) -> Result<std::path::PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "stagehand-{label}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}
