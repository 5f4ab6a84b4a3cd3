use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{anyhow, Context, Result};
use stagehand_core::OperationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleType {
    Zip,
    TarGz,
}

impl BundleType {
    pub fn infer_from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            return Some(Self::Zip);
        }
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            return Some(Self::TarGz);
        }
        None
    }
}

pub fn is_archive_path(value: &str) -> bool {
    BundleType::infer_from_path(value).is_some()
}

pub fn expand_repository_bundle(archive: &Path, scratch: &Path) -> Result<PathBuf> {
    let bundle_type = archive
        .to_str()
        .and_then(BundleType::infer_from_path)
        .ok_or_else(|| {
            OperationError::Configuration(format!(
                "unsupported repository bundle: {}",
                archive.display()
            ))
        })?;

    fs::create_dir_all(scratch)
        .with_context(|| format!("failed to create {}", scratch.display()))?;

    match bundle_type {
        BundleType::Zip => extract_zip(archive, scratch)?,
        BundleType::TarGz => extract_tar(archive, scratch)?,
    }

    find_repository_root(scratch, 3)?.ok_or_else(|| {
        OperationError::Configuration(format!(
            "the bundle {} does not contain a repository (no manifests directory found)",
            archive.display()
        ))
        .into()
    })
}

fn find_repository_root(dir: &Path, depth: usize) -> Result<Option<PathBuf>> {
    if dir.join("manifests").is_dir() {
        return Ok(Some(dir.to_path_buf()));
    }
    if depth == 0 {
        return Ok(None);
    }

    let mut subdirs = Vec::new();
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
            subdirs.push(entry.path());
        }
    }
    subdirs.sort();

    for subdir in subdirs {
        if let Some(found) = find_repository_root(&subdir, depth - 1)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn extract_tar(archive_path: &Path, dst: &Path) -> Result<()> {
    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract tar archive",
    )
}

fn extract_zip(archive_path: &Path, dst: &Path) -> Result<()> {
    if cfg!(windows) {
        let mut command = Command::new("powershell");
        command.arg("-NoProfile").arg("-Command").arg(format!(
            "Expand-Archive -LiteralPath '{}' -DestinationPath '{}' -Force",
            escape_ps_single_quote(archive_path),
            escape_ps_single_quote(dst)
        ));
        if run_command(
            &mut command,
            "failed to extract zip archive with powershell",
        )
        .is_ok()
        {
            return Ok(());
        }
    }

    let mut unzip_command = Command::new("unzip");
    unzip_command.arg("-q").arg(archive_path).arg("-d").arg(dst);
    if run_command(
        &mut unzip_command,
        "failed to extract zip archive with unzip",
    )
    .is_ok()
    {
        return Ok(());
    }

    run_command(
        Command::new("tar")
            .arg("-xf")
            .arg(archive_path)
            .arg("-C")
            .arg(dst),
        "failed to extract zip archive with tar fallback",
    )
}

fn run_command(command: &mut Command, context_message: &str) -> Result<()> {
    let output = command
        .output()
        .with_context(|| format!("{context_message}: command failed to start"))?;
    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    Err(anyhow!(
        "{context_message}: status={} stdout='{}' stderr='{}'",
        output.status,
        stdout.trim(),
        stderr.trim()
    ))
}

fn escape_ps_single_quote(path: &Path) -> String {
    path.display().to_string().replace('\'', "''")
}
