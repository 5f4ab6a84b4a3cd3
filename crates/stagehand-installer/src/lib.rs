mod apply;
mod archive;
mod fs_utils;
mod layout;
mod metadata;
mod prepare;
mod provision;

pub use apply::{ApplyOutcome, ApplyStage, CandidateApplier};
pub use archive::{expand_repository_bundle, is_archive_path, BundleType};
pub use layout::{InstallationLayout, METADATA_DIR_NAME};
pub use metadata::{InstallationMetadata, InventoryEntry};
pub use prepare::{
    preview_update, provision_installation, read_candidate_changes, read_provisioning_config,
    UpdateCandidateBuilder, UpdateCandidateOutcome,
};
pub use provision::{FileRepositoryProvisioner, Provisioner};
