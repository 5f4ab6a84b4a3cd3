use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use stagehand_core::{artifact_diff, ArtifactChange, OperationError};

use crate::fs_utils::{collect_tree_files, file_sha256, join_unix_path, remove_file_if_exists};
use crate::layout::{InstallationLayout, METADATA_DIR_NAME};
use crate::metadata::InstallationMetadata;
use crate::prepare::read_candidate_changes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyStage {
    Validating,
    BackingUp,
    Merging,
    Committing,
    RollingBack,
}

impl ApplyStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::BackingUp => "backing-up",
            Self::Merging => "merging",
            Self::Committing => "committing",
            Self::RollingBack => "rolling-back",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    NoChanges,
    Applied { changes: Vec<ArtifactChange> },
}

pub struct CandidateApplier<'a> {
    live: &'a InstallationLayout,
    candidate: &'a InstallationLayout,
}

impl<'a> CandidateApplier<'a> {
    pub fn new(live: &'a InstallationLayout, candidate: &'a InstallationLayout) -> Self {
        Self { live, candidate }
    }

    pub fn apply(&self) -> Result<ApplyOutcome> {
        let live = self.live.resolved().map_err(|_| {
            OperationError::InvalidInstallation {
                path: self.live.root().to_path_buf(),
            }
        })?;
        let candidate = self.candidate.resolved().map_err(|_| {
            OperationError::InvalidCandidateTarget {
                path: self.candidate.root().to_path_buf(),
                reason: "the directory does not exist".to_string(),
            }
        })?;

        if !live.is_installation() {
            return Err(OperationError::InvalidInstallation {
                path: live.root().to_path_buf(),
            }
            .into());
        }
        if !candidate.is_installation() {
            return Err(OperationError::InvalidCandidateTarget {
                path: candidate.root().to_path_buf(),
                reason: "the directory holds no installation metadata".to_string(),
            }
            .into());
        }

        let candidate_metadata =
            InstallationMetadata::read(&candidate).map_err(|err| {
                OperationError::InvalidCandidateTarget {
                    path: candidate.root().to_path_buf(),
                    reason: format!("{err:#}"),
                }
            })?;
        let recorded_changes = read_candidate_changes(&candidate)?;
        let live_metadata = InstallationMetadata::read(&live)?;

        let changes = artifact_diff(&live_metadata.manifest, &candidate_metadata.manifest);
        if changes.is_empty() {
            return Ok(ApplyOutcome::NoChanges);
        }
        if changes != recorded_changes {
            return Err(OperationError::InvalidCandidateTarget {
                path: candidate.root().to_path_buf(),
                reason: "the candidate was prepared against a different installation state"
                    .to_string(),
            }
            .into());
        }

        let mut lock = ApplyLock::claim(&live)
            .map_err(|err| apply_failure(ApplyStage::Validating, err))?;

        let plan = build_merge_plan(&live, &candidate, &live_metadata)
            .map_err(|err| apply_failure(ApplyStage::BackingUp, err))?;

        let txid = new_txid()?;
        let recovery = match capture_recovery_point(&live, &txid, &plan) {
            Ok(recovery) => recovery,
            Err(err) => {
                let _ = fs::remove_dir_all(live.recovery_pending_dir(&txid));
                let _ = fs::remove_dir(live.recovery_root());
                return Err(apply_failure(ApplyStage::BackingUp, err));
            }
        };

        if let Err(err) = merge_candidate(&live, &candidate, &plan) {
            return Err(roll_back(&live, &recovery, ApplyStage::Merging, err));
        }

        if let Err(err) = commit(&live, &recovery, &plan) {
            return Err(roll_back(&live, &recovery, ApplyStage::Committing, err));
        }

        lock.release();
        Ok(ApplyOutcome::Applied { changes })
    }
}

struct ApplyLock {
    path: PathBuf,
    released: bool,
}

impl ApplyLock {
    fn claim(layout: &InstallationLayout) -> Result<Self> {
        let path = layout.apply_lock_path();
        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
        {
            Ok(_) => Ok(Self {
                path,
                released: false,
            }),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Err(anyhow!(
                "another update is already in progress for this installation (lock: {})",
                path.display()
            )),
            Err(err) => Err(err)
                .with_context(|| format!("failed to claim update lock: {}", path.display())),
        }
    }

    fn release(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
            self.released = true;
        }
    }
}

impl Drop for ApplyLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MergePlan {
    writes: Vec<String>,
    deletes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecoveryEntry {
    path: String,
    existed: bool,
    backup: Option<String>,
    sha256: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RecoveryManifest {
    entries: Vec<RecoveryEntry>,
    created_dirs: Vec<String>,
}

struct RecoveryPoint {
    dir: PathBuf,
    manifest: RecoveryManifest,
}

fn metadata_write_paths() -> [String; 2] {
    [
        format!("{METADATA_DIR_NAME}/installation.toml"),
        format!("{METADATA_DIR_NAME}/provisioning.toml"),
    ]
}

fn build_merge_plan(
    live: &InstallationLayout,
    candidate: &InstallationLayout,
    live_metadata: &InstallationMetadata,
) -> Result<MergePlan> {
    let candidate_files = collect_tree_files(candidate.root(), &[METADATA_DIR_NAME])?;
    let candidate_set: BTreeSet<&str> = candidate_files.iter().map(String::as_str).collect();

    let mut writes = Vec::new();
    for relative in &candidate_files {
        let live_path = join_unix_path(live.root(), relative);
        let candidate_path = join_unix_path(candidate.root(), relative);
        let changed = match fs::metadata(&live_path) {
            Ok(meta) if meta.is_file() => {
                file_sha256(&live_path)? != file_sha256(&candidate_path)?
            }
            _ => true,
        };
        if changed {
            writes.push(relative.clone());
        }
    }
    writes.extend(metadata_write_paths());

    let mut deletes = Vec::new();
    for entry in &live_metadata.inventory {
        if !candidate_set.contains(entry.path.as_str()) {
            deletes.push(entry.path.clone());
        }
    }
    deletes.sort();

    Ok(MergePlan { writes, deletes })
}

fn capture_recovery_point(
    live: &InstallationLayout,
    txid: &str,
    plan: &MergePlan,
) -> Result<RecoveryPoint> {
    let pending = live.recovery_pending_dir(txid);
    let files_dir = pending.join("files");
    fs::create_dir_all(&files_dir)
        .with_context(|| format!("failed to create {}", files_dir.display()))?;

    let mut manifest = RecoveryManifest::default();
    let mut created_dirs = BTreeSet::new();
    let mut backup_index = 0_usize;

    for relative in plan.writes.iter().chain(plan.deletes.iter()) {
        record_missing_ancestors(live, relative, &mut created_dirs);

        let live_path = join_unix_path(live.root(), relative);
        match fs::metadata(&live_path) {
            Ok(meta) if meta.is_file() => {
                let backup_name = format!("files/{backup_index}");
                backup_index += 1;
                let backup_path = pending.join(&backup_name);
                fs::copy(&live_path, &backup_path).with_context(|| {
                    format!(
                        "failed to back up {} to {}",
                        live_path.display(),
                        backup_path.display()
                    )
                })?;
                manifest.entries.push(RecoveryEntry {
                    path: relative.clone(),
                    existed: true,
                    backup: Some(backup_name),
                    sha256: Some(file_sha256(&live_path)?),
                });
            }
            Ok(_) => {
                return Err(anyhow!(
                    "cannot back up non-file path: {}",
                    live_path.display()
                ));
            }
            Err(_) if !live_path.exists() => {
                manifest.entries.push(RecoveryEntry {
                    path: relative.clone(),
                    existed: false,
                    backup: None,
                    sha256: None,
                });
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to inspect {}", live_path.display())
                });
            }
        }
    }

    manifest.created_dirs = created_dirs.into_iter().collect();

    let manifest_raw = serde_json::to_string_pretty(&manifest)
        .context("failed to serialize recovery manifest")?;
    let manifest_path = pending.join("manifest.json");
    fs::write(&manifest_path, manifest_raw)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    let dir = live.recovery_dir(txid);
    fs::rename(&pending, &dir).with_context(|| {
        format!(
            "failed to seal recovery point {} as {}",
            pending.display(),
            dir.display()
        )
    })?;

    Ok(RecoveryPoint { dir, manifest })
}

fn record_missing_ancestors(
    live: &InstallationLayout,
    relative: &str,
    created_dirs: &mut BTreeSet<String>,
) {
    let segments: Vec<&str> = relative.split('/').collect();
    let mut prefix = String::new();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        if prefix.is_empty() {
            prefix.push_str(segment);
        } else {
            prefix.push('/');
            prefix.push_str(segment);
        }
        if !join_unix_path(live.root(), &prefix).exists() {
            created_dirs.insert(prefix.clone());
        }
    }
}

fn merge_candidate(
    live: &InstallationLayout,
    candidate: &InstallationLayout,
    plan: &MergePlan,
) -> Result<()> {
    for relative in &plan.writes {
        let source = join_unix_path(candidate.root(), relative);
        let target = join_unix_path(live.root(), relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        if relative.starts_with(METADATA_DIR_NAME) {
            copy_file_atomic(&source, &target)?;
        } else {
            fs::copy(&source, &target).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    source.display(),
                    target.display()
                )
            })?;
        }
    }

    for relative in &plan.deletes {
        let target = join_unix_path(live.root(), relative);
        remove_file_if_exists(&target)
            .with_context(|| format!("failed to delete {}", target.display()))?;
    }

    Ok(())
}

fn copy_file_atomic(source: &std::path::Path, target: &std::path::Path) -> Result<()> {
    let tmp = tmp_sibling(target);
    fs::copy(source, &tmp).with_context(|| {
        format!("failed to copy {} to {}", source.display(), tmp.display())
    })?;
    fs::rename(&tmp, target).with_context(|| {
        format!(
            "failed to move {} into place as {}",
            tmp.display(),
            target.display()
        )
    })?;
    Ok(())
}

fn tmp_sibling(target: &std::path::Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    target.with_file_name(name)
}

fn commit(
    live: &InstallationLayout,
    recovery: &RecoveryPoint,
    plan: &MergePlan,
) -> Result<()> {
    prune_emptied_dirs(live, &plan.deletes);

    fs::remove_dir_all(&recovery.dir).with_context(|| {
        format!(
            "failed to discard recovery point: {}",
            recovery.dir.display()
        )
    })?;
    let _ = fs::remove_dir(live.recovery_root());
    Ok(())
}

fn prune_emptied_dirs(live: &InstallationLayout, deletes: &[String]) {
    let mut parents = BTreeSet::new();
    for relative in deletes {
        let segments: Vec<&str> = relative.split('/').collect();
        let mut prefix = String::new();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if prefix.is_empty() {
                prefix.push_str(segment);
            } else {
                prefix.push('/');
                prefix.push_str(segment);
            }
            parents.insert(prefix.clone());
        }
    }

    let mut ordered: Vec<String> = parents.into_iter().collect();
    ordered.sort_by_key(|path| std::cmp::Reverse(path.split('/').count()));
    for relative in ordered {
        let _ = fs::remove_dir(join_unix_path(live.root(), &relative));
    }
}

fn roll_back(
    live: &InstallationLayout,
    recovery: &RecoveryPoint,
    stage: ApplyStage,
    original: anyhow::Error,
) -> anyhow::Error {
    match restore_recovery_point(live, recovery) {
        Ok(()) => apply_failure(stage, original),
        Err(rollback_err) => OperationError::CorruptInstallation {
            path: live.root().to_path_buf(),
            apply_error: format!("{original:#}"),
            rollback_error: format!("{rollback_err:#}"),
        }
        .into(),
    }
}

fn restore_recovery_point(live: &InstallationLayout, recovery: &RecoveryPoint) -> Result<()> {
    for entry in &recovery.manifest.entries {
        let target = join_unix_path(live.root(), &entry.path);
        if entry.existed {
            let expected = entry.sha256.as_deref().ok_or_else(|| {
                anyhow!("recovery entry for {} is missing its digest", entry.path)
            })?;
            let intact = match fs::metadata(&target) {
                Ok(meta) if meta.is_file() => file_sha256(&target)? == expected,
                _ => false,
            };
            if intact {
                continue;
            }

            let backup_name = entry.backup.as_deref().ok_or_else(|| {
                anyhow!("recovery entry for {} is missing its backup", entry.path)
            })?;
            let backup_path = recovery.dir.join(backup_name);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            if entry.path.starts_with(METADATA_DIR_NAME) {
                copy_file_atomic(&backup_path, &target)?;
            } else {
                fs::copy(&backup_path, &target).with_context(|| {
                    format!(
                        "failed to restore {} from {}",
                        target.display(),
                        backup_path.display()
                    )
                })?;
            }
            if file_sha256(&target)? != expected {
                return Err(anyhow!(
                    "restored file does not match its recorded digest: {}",
                    target.display()
                ));
            }
        } else {
            remove_file_if_exists(&target)
                .with_context(|| format!("failed to remove {}", target.display()))?;
        }
    }

    let mut created: Vec<&String> = recovery.manifest.created_dirs.iter().collect();
    created.sort_by_key(|path| std::cmp::Reverse(path.split('/').count()));
    for relative in created {
        let dir = join_unix_path(live.root(), relative);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .with_context(|| format!("failed to remove {}", dir.display()))?;
        }
    }

    for stray in [
        tmp_sibling(&live.metadata_path()),
        tmp_sibling(&live.provisioning_config_path()),
    ] {
        remove_file_if_exists(&stray)
            .with_context(|| format!("failed to remove {}", stray.display()))?;
    }
    fs::remove_dir_all(&recovery.dir).with_context(|| {
        format!(
            "failed to discard recovery point: {}",
            recovery.dir.display()
        )
    })?;
    let _ = fs::remove_dir(live.recovery_root());
    Ok(())
}

fn apply_failure(stage: ApplyStage, err: anyhow::Error) -> anyhow::Error {
    OperationError::Apply {
        stage: stage.as_str(),
        reason: format!("{err:#}"),
    }
    .into()
}

fn new_txid() -> Result<String> {
    let started_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs();
    Ok(format!("apply-{started_at}-{}", std::process::id()))
}
