use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use stagehand_core::{
    Channel, Console, NoStreamStrategy, OperationError, ProgressEvent, ProgressStage,
    ResolvedManifest,
};
use stagehand_graph::{FeaturePackConfig, ProvisioningConfig};

use crate::fs_utils::copy_tree;

pub trait Provisioner {
    fn materialize(
        &self,
        config: &ProvisioningConfig,
        channels: &[Channel],
        target: &Path,
        console: &dyn Console,
    ) -> Result<ResolvedManifest>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileRepositoryProvisioner;

struct ResolvedFeaturePack<'a> {
    config: &'a FeaturePackConfig,
    version: String,
    payload: PathBuf,
}

impl Provisioner for FileRepositoryProvisioner {
    fn materialize(
        &self,
        config: &ProvisioningConfig,
        channels: &[Channel],
        target: &Path,
        console: &dyn Console,
    ) -> Result<ResolvedManifest> {
        fs::create_dir_all(target)
            .with_context(|| format!("failed to create target: {}", target.display()))?;

        let feature_packs: Vec<&FeaturePackConfig> = config
            .feature_packs
            .iter()
            .chain(config.transitive.iter())
            .collect();

        let resolved = run_stage(
            console,
            ProgressStage::LayoutResolution,
            &feature_packs,
            |feature_pack| resolve_feature_pack(feature_pack, channels),
        )?;

        run_stage(
            console,
            ProgressStage::PackageInstallation,
            &resolved,
            |pack| install_packages(pack, target),
        )?;

        run_stage(console, ProgressStage::ConfigGeneration, &resolved, |pack| {
            install_configs(pack, target)
        })?;

        run_stage(
            console,
            ProgressStage::ModuleInstallation,
            &resolved,
            |pack| install_modules(pack, target),
        )?;

        let mut manifest = ResolvedManifest::new();
        for pack in &resolved {
            manifest.insert(pack.config.location.producer.clone(), pack.version.clone());
        }
        Ok(manifest)
    }
}

fn run_stage<'a, T, U>(
    console: &dyn Console,
    stage: ProgressStage,
    items: &'a [T],
    mut step: impl FnMut(&'a T) -> Result<U>,
) -> Result<Vec<U>> {
    console.progress_update(ProgressEvent::Starting(stage));
    let mut results = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        results.push(step(item)?);
        let percent = ((index + 1) as f64 / items.len().max(1) as f64) * 100.0;
        console.progress_update(ProgressEvent::Pulse(stage, percent));
    }
    console.progress_update(ProgressEvent::Completed(stage));
    Ok(results)
}

fn repository_root(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

fn resolve_feature_pack<'a>(
    feature_pack: &'a FeaturePackConfig,
    channels: &[Channel],
) -> Result<ResolvedFeaturePack<'a>> {
    let producer = &feature_pack.location.producer;
    let mut searched = Vec::new();

    let version = match &feature_pack.location.version {
        Some(version) => version.clone(),
        None => resolve_stream_version(producer, channels, &mut searched)?,
    };

    for channel in channels {
        for repository in &channel.repositories {
            let payload = repository_root(&repository.url)
                .join("packs")
                .join(producer)
                .join(&version);
            if payload.is_dir() {
                return Ok(ResolvedFeaturePack {
                    config: feature_pack,
                    version,
                    payload,
                });
            }
            let label = format!("{} ({})", repository.id, repository.url);
            if !searched.contains(&label) {
                searched.push(label);
            }
        }
    }

    Err(OperationError::Resolution {
        stream: format!("{producer}#{version}"),
        repositories: searched,
        offline: false,
    }
    .into())
}

fn resolve_stream_version(
    producer: &str,
    channels: &[Channel],
    searched: &mut Vec<String>,
) -> Result<String> {
    for channel in channels {
        for repository in &channel.repositories {
            searched.push(format!("{} ({})", repository.id, repository.url));

            let manifest_path = repository_root(&repository.url)
                .join("manifests")
                .join(format!("{}.toml", channel.manifest_coordinate));
            let raw = match fs::read_to_string(&manifest_path) {
                Ok(raw) => raw,
                Err(_) => continue,
            };
            let manifest = ResolvedManifest::from_toml_str(&raw).with_context(|| {
                format!("failed to parse channel manifest: {}", manifest_path.display())
            })?;
            if let Some(version) = manifest.find(producer) {
                return Ok(version.to_string());
            }
        }
    }

    let allow_latest = channels
        .iter()
        .any(|channel| channel.no_stream_strategy != NoStreamStrategy::None);
    if allow_latest {
        if let Some(version) = find_latest_version(producer, channels)? {
            return Ok(version);
        }
    }

    Err(OperationError::Resolution {
        stream: producer.to_string(),
        repositories: searched.clone(),
        offline: false,
    }
    .into())
}

fn find_latest_version(producer: &str, channels: &[Channel]) -> Result<Option<String>> {
    let mut latest: Option<String> = None;
    for channel in channels {
        for repository in &channel.repositories {
            let pack_root = repository_root(&repository.url).join("packs").join(producer);
            let entries = match fs::read_dir(&pack_root) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries {
                let entry = entry.with_context(|| {
                    format!("failed to iterate directory: {}", pack_root.display())
                })?;
                let Some(version) = entry.file_name().to_str().map(ToOwned::to_owned) else {
                    continue;
                };
                let newer = latest
                    .as_deref()
                    .map(|current| {
                        stagehand_core::compare_versions(&version, current)
                            == std::cmp::Ordering::Greater
                    })
                    .unwrap_or(true);
                if newer {
                    latest = Some(version);
                }
            }
        }
    }
    Ok(latest)
}

fn install_packages(pack: &ResolvedFeaturePack<'_>, target: &Path) -> Result<()> {
    let packages_root = pack.payload.join("packages");
    if !packages_root.is_dir() {
        return Ok(());
    }

    for package in sorted_dir_names(&packages_root)? {
        if !package_selected(pack.config, &package) {
            continue;
        }
        copy_tree(&packages_root.join(&package), target)?;
    }
    Ok(())
}

fn package_selected(config: &FeaturePackConfig, package: &str) -> bool {
    if config.excluded_packages.contains(package) {
        return false;
    }
    if config.inherits_packages() {
        return true;
    }
    config.included_packages.contains(package)
}

fn install_configs(pack: &ResolvedFeaturePack<'_>, target: &Path) -> Result<()> {
    let configs_root = pack.payload.join("configs");
    if !configs_root.is_dir() {
        return Ok(());
    }

    for model in sorted_dir_names(&configs_root)? {
        if !config_model_selected(pack.config, &model) {
            continue;
        }
        copy_tree(&configs_root.join(&model), target)?;
    }
    Ok(())
}

fn config_model_selected(config: &FeaturePackConfig, model: &str) -> bool {
    if config.excluded_config_models.contains(model) {
        return false;
    }
    if config.inherits_configs() {
        return true;
    }
    config.included_config_models.contains(model)
}

fn install_modules(pack: &ResolvedFeaturePack<'_>, target: &Path) -> Result<()> {
    let modules_root = pack.payload.join("modules");
    if !modules_root.is_dir() {
        return Ok(());
    }
    copy_tree(&modules_root, &target.join("modules"))
}

fn sorted_dir_names(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry =
            entry.with_context(|| format!("failed to iterate directory: {}", dir.display()))?;
        if entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", entry.path().display()))?
            .is_dir()
        {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
