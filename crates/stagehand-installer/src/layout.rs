use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub const METADATA_DIR_NAME: &str = ".installation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallationLayout {
    root: PathBuf,
}

impl InstallationLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolved(&self) -> Result<Self> {
        let resolved = fs::canonicalize(&self.root).with_context(|| {
            format!("failed to resolve installation path: {}", self.root.display())
        })?;
        Ok(Self::new(resolved))
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR_NAME)
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.metadata_dir().join("installation.toml")
    }

    pub fn metadata_tmp_path(&self) -> PathBuf {
        self.metadata_dir().join("installation.toml.tmp")
    }

    pub fn provisioning_config_path(&self) -> PathBuf {
        self.metadata_dir().join("provisioning.toml")
    }

    pub fn candidate_changes_path(&self) -> PathBuf {
        self.metadata_dir().join("candidate-changes.json")
    }

    pub fn apply_lock_path(&self) -> PathBuf {
        self.metadata_dir().join(".apply-lock")
    }

    pub fn recovery_root(&self) -> PathBuf {
        self.metadata_dir().join("recovery")
    }

    pub fn recovery_dir(&self, txid: &str) -> PathBuf {
        self.recovery_root().join(txid)
    }

    pub fn recovery_pending_dir(&self, txid: &str) -> PathBuf {
        self.recovery_root().join(format!("{txid}.partial"))
    }

    pub fn is_installation(&self) -> bool {
        self.metadata_path().is_file()
    }

    pub fn ensure_metadata_dir(&self) -> Result<()> {
        let dir = self.metadata_dir();
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))
    }
}
