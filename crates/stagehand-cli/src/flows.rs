use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use stagehand_core::{Channel, ChannelSelection, Console, OperationError, Repository};
use stagehand_graph::{
    FeaturePackConfig, FeaturePackLocation, ProvisioningConfig, ProvisioningConfigManipulator,
};
use stagehand_installer::{
    expand_repository_bundle, is_archive_path, preview_update, provision_installation,
    read_candidate_changes, read_provisioning_config, ApplyOutcome, CandidateApplier,
    FileRepositoryProvisioner, InstallationLayout, UpdateCandidateBuilder, UpdateCandidateOutcome,
};

pub(crate) fn run_install_command(
    dir: &Path,
    channel_manifest: &str,
    repositories: &[String],
    feature_pack: Option<&str>,
    config_path: Option<&Path>,
    console: &dyn Console,
) -> Result<()> {
    let repositories = parse_repository_specs(repositories, &bundle_scratch_root()?)?;
    let channel = Channel::new(channel_manifest, repositories);
    let config = resolve_install_config(feature_pack, config_path)?;

    let layout = InstallationLayout::new(dir);
    let manifest = provision_installation(
        &layout,
        &config,
        vec![channel],
        &FileRepositoryProvisioner,
        console,
    )?;

    console.println(&format!(
        "Installed {} component stream(s) into {}",
        manifest.component_streams().len(),
        layout.root().display()
    ));
    Ok(())
}

pub(crate) fn run_update_prepare_command(
    dir: &Path,
    candidate_dir: &Path,
    repositories: &[String],
    console: &dyn Console,
) -> Result<()> {
    let repositories = parse_repository_specs(repositories, &bundle_scratch_root()?)?;
    let layout = InstallationLayout::new(dir);
    let builder = UpdateCandidateBuilder::new(&layout, &FileRepositoryProvisioner);

    let outcome = builder.build(
        &ChannelSelection::RepositoryOverride(repositories),
        candidate_dir,
        console,
    )?;

    match outcome {
        UpdateCandidateOutcome::NoChanges => {
            console.println("No updates found");
        }
        UpdateCandidateOutcome::Cancelled => {
            console.println("Update candidate generation cancelled");
        }
        UpdateCandidateOutcome::Built { changes } => {
            console.println(&format!(
                "Update candidate generated in {} ({} artifact change(s))",
                candidate_dir.display(),
                changes.len()
            ));
        }
    }
    Ok(())
}

pub(crate) fn run_update_apply_command(
    dir: &Path,
    candidate_dir: &Path,
    console: &dyn Console,
) -> Result<()> {
    let layout = InstallationLayout::new(dir);
    let candidate_layout = InstallationLayout::new(candidate_dir);

    let changes = read_candidate_changes(&candidate_layout)?;
    console.changes_found(&changes);
    if !console.confirm("Continue with applying the update?") {
        console.println("Update cancelled");
        return Ok(());
    }

    let outcome = CandidateApplier::new(&layout, &candidate_layout).apply()?;
    match outcome {
        ApplyOutcome::NoChanges => {
            console.println("The installation is already up to date");
        }
        ApplyOutcome::Applied { changes } => {
            console.println(&format!(
                "Update applied to {} ({} artifact change(s))",
                layout.root().display(),
                changes.len()
            ));
        }
    }
    Ok(())
}

pub(crate) fn run_update_list_command(
    dir: &Path,
    repositories: &[String],
    console: &dyn Console,
) -> Result<()> {
    let layout = InstallationLayout::new(dir);
    let selection = if repositories.is_empty() {
        ChannelSelection::Current
    } else {
        ChannelSelection::RepositoryOverride(parse_repository_specs(
            repositories,
            &bundle_scratch_root()?,
        )?)
    };

    let changes = preview_update(&layout, &selection, &FileRepositoryProvisioner, console)?;
    console.changes_found(&changes);
    Ok(())
}

pub(crate) fn run_feature_pack_remove_command(
    dir: &Path,
    location: &str,
    console: &dyn Console,
) -> Result<()> {
    let location = FeaturePackLocation::parse(location)?;
    let layout = InstallationLayout::new(dir);

    let config = read_provisioning_config(&layout)?;
    let mut builder = config.to_builder();
    ProvisioningConfigManipulator::new(&mut builder).remove_feature_pack_definition(&location)?;
    let modified = builder.build();

    let staging = bundle_scratch_root()?.join("feature-pack-remove");
    let candidate_builder = UpdateCandidateBuilder::new(&layout, &FileRepositoryProvisioner);
    let outcome = candidate_builder.build_with_config(
        &modified,
        &ChannelSelection::Current,
        &staging,
        console,
    )?;

    match outcome {
        UpdateCandidateOutcome::NoChanges => {
            console.println(&format!("Removing {location} does not change the installation"));
        }
        UpdateCandidateOutcome::Cancelled => {
            console.println("Feature pack removal cancelled");
        }
        UpdateCandidateOutcome::Built { changes } => {
            let candidate_layout = InstallationLayout::new(&staging);
            CandidateApplier::new(&layout, &candidate_layout).apply()?;
            let _ = fs::remove_dir_all(&staging);
            console.println(&format!(
                "Removed {location} from {} ({} artifact change(s))",
                layout.root().display(),
                changes.len()
            ));
        }
    }
    Ok(())
}

pub(crate) fn parse_repository_specs(
    values: &[String],
    scratch_root: &Path,
) -> Result<Vec<Repository>> {
    if values.is_empty() {
        return Err(OperationError::Configuration(
            "at least one --repository is required".to_string(),
        )
        .into());
    }

    let mut repositories = Vec::with_capacity(values.len());
    for (index, value) in values.iter().enumerate() {
        let (id, location) = match value.split_once("::") {
            Some((id, location)) if !id.is_empty() && !location.is_empty() => {
                (id.to_string(), location)
            }
            Some(_) => {
                return Err(OperationError::Configuration(format!(
                    "invalid repository spec '{value}', expected <id>::<location>"
                ))
                .into());
            }
            None => (format!("repo-{index}"), value.as_str()),
        };

        let location = if is_archive_path(location) {
            let scratch = scratch_root.join(format!("bundle-{index}"));
            expand_repository_bundle(Path::new(location), &scratch)?
                .display()
                .to_string()
        } else {
            location.to_string()
        };

        repositories.push(Repository::new(id, location));
    }
    Ok(repositories)
}

fn resolve_install_config(
    feature_pack: Option<&str>,
    config_path: Option<&Path>,
) -> Result<ProvisioningConfig> {
    match (feature_pack, config_path) {
        (Some(location), None) => {
            let location = FeaturePackLocation::parse(location)?;
            let mut builder = ProvisioningConfig::builder();
            builder.add_feature_pack(FeaturePackConfig::of(location))?;
            Ok(builder.build())
        }
        (None, Some(path)) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            ProvisioningConfig::from_toml_str(&raw)
        }
        _ => Err(OperationError::Configuration(
            "exactly one of --feature-pack and --config is required".to_string(),
        )
        .into()),
    }
}

fn bundle_scratch_root() -> Result<PathBuf> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_nanos();
    Ok(std::env::temp_dir().join(format!(
        "stagehand-bundles-{}-{nanos}",
        std::process::id()
    )))
}
