use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};

pub fn remove_file_if_exists(path: &Path) -> io::Result<()> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(())
}

pub fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path)
        .with_context(|| format!("failed to read directory: {}", path.display()))?;
    Ok(entries.next().is_none())
}

pub fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create {}", dst.display()))?;

    for entry in
        fs::read_dir(src).with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry
            .with_context(|| format!("failed to iterate directory: {}", src.display()))?;
        let source = entry.path();
        let target = dst.join(entry.file_name());
        if entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", source.display()))?
            .is_dir()
        {
            copy_tree(&source, &target)?;
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
    Ok(())
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read file: {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

pub fn relative_unix_path(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).with_context(|| {
        format!(
            "path {} is not under root {}",
            path.display(),
            root.display()
        )
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            std::path::Component::Normal(segment) => {
                let segment = segment
                    .to_str()
                    .ok_or_else(|| anyhow!("non-utf8 path segment in {}", path.display()))?;
                segments.push(segment.to_string());
            }
            other => {
                return Err(anyhow!(
                    "unexpected path component {:?} in {}",
                    other,
                    path.display()
                ));
            }
        }
    }
    Ok(segments.join("/"))
}

pub fn collect_tree_files(root: &Path, skip_root_dirs: &[&str]) -> Result<Vec<String>> {
    let mut files = Vec::new();
    collect_into(root, root, skip_root_dirs, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_into(
    root: &Path,
    dir: &Path,
    skip_root_dirs: &[&str],
    files: &mut Vec<String>,
) -> Result<()> {
    for entry in
        fs::read_dir(dir).with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry
            .with_context(|| format!("failed to iterate directory: {}", dir.display()))?;
        let path = entry.path();

        if dir == root {
            let name = entry.file_name();
            if let Some(name) = name.to_str() {
                if skip_root_dirs.contains(&name) {
                    continue;
                }
            }
        }

        if entry
            .file_type()
            .with_context(|| format!("failed to inspect {}", path.display()))?
            .is_dir()
        {
            collect_into(root, &path, skip_root_dirs, files)?;
        } else {
            files.push(relative_unix_path(root, &path)?);
        }
    }
    Ok(())
}

pub fn join_unix_path(root: &Path, relative: &str) -> PathBuf {
    let mut path = root.to_path_buf();
    for segment in relative.split('/') {
        path.push(segment);
    }
    path
}
