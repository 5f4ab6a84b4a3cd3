use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use clap::Parser;
use stagehand_core::{ArtifactChange, NullConsole, OperationError, ResolvedManifest};
use stagehand_installer::{InstallationLayout, InstallationMetadata};

use crate::flows::{
    parse_repository_specs, run_feature_pack_remove_command, run_install_command,
    run_update_apply_command, run_update_list_command, run_update_prepare_command,
};
use crate::render::format_changes_lines;
use crate::{return_code_for, Cli, INVALID_ARGUMENTS, PROCESSING_ERROR};

static TEST_DIR_COUNTER: AtomicU64 = AtomicU64::new(0);

fn test_dir() -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("system time")
        .as_nanos();
    let sequence = TEST_DIR_COUNTER.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "stagehand-cli-tests-{}-{}-{}",
        std::process::id(),
        nanos,
        sequence
    ));
    fs::create_dir_all(&path).expect("must create test dir");
    path
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("must create parent dirs");
    }
    fs::write(path, content).expect("must write file");
}

fn build_repository(root: &Path, pins: &[(&str, &str)]) {
    let mut manifest = ResolvedManifest::new();
    for (name, version) in pins {
        manifest.insert(*name, *version);
    }
    write_file(
        &root.join("manifests").join("org.test:manifest.toml"),
        &manifest.to_toml_string().expect("must serialize manifest"),
    );
}

fn add_pack_file(root: &Path, producer: &str, version: &str, relative: &str, content: &str) {
    let mut path = root.join("packs").join(producer).join(version);
    for segment in relative.split('/') {
        path.push(segment);
    }
    write_file(&path, content);
}

#[test]
fn cli_parses_update_prepare_arguments() {
    let cli = Cli::try_parse_from([
        "stagehand",
        "update",
        "prepare",
        "--dir",
        "/srv/server",
        "--candidate-dir",
        "/srv/candidate",
        "--repository",
        "update::/repos/update",
        "-y",
    ])
    .expect("must parse");

    match cli.command {
        crate::Commands::Update(crate::UpdateCommands::Prepare {
            dir,
            candidate_dir,
            repositories,
            yes,
        }) => {
            assert_eq!(dir, PathBuf::from("/srv/server"));
            assert_eq!(candidate_dir, PathBuf::from("/srv/candidate"));
            assert_eq!(repositories, vec!["update::/repos/update".to_string()]);
            assert!(yes);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_rejects_unknown_subcommands() {
    assert!(Cli::try_parse_from(["stagehand", "upgrade"]).is_err());
}

#[test]
fn repository_specs_accept_ids_and_assign_positional_fallbacks() {
    let scratch = test_dir();
    let specs = vec![
        "update::/repos/update".to_string(),
        "/repos/anonymous".to_string(),
    ];

    let repositories = parse_repository_specs(&specs, &scratch).expect("must parse");

    assert_eq!(repositories[0].id, "update");
    assert_eq!(repositories[0].url, "/repos/update");
    assert_eq!(repositories[1].id, "repo-1");
    assert_eq!(repositories[1].url, "/repos/anonymous");

    let _ = fs::remove_dir_all(&scratch);
}

#[test]
fn empty_repository_list_is_a_configuration_error() {
    let scratch = test_dir();
    let err = parse_repository_specs(&[], &scratch).expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<OperationError>(),
        Some(OperationError::Configuration(_))
    ));

    let _ = fs::remove_dir_all(&scratch);
}

#[test]
fn malformed_repository_spec_is_rejected() {
    let scratch = test_dir();
    let err = parse_repository_specs(&["::missing-id".to_string()], &scratch)
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<OperationError>(),
        Some(OperationError::Configuration(_))
    ));

    let _ = fs::remove_dir_all(&scratch);
}

#[test]
fn changes_render_with_versions_and_placeholders() {
    let lines = format_changes_lines(&[
        ArtifactChange::updated("org.test:core", "1.0.0", "1.1.0"),
        ArtifactChange::added("org.test:extras", "3.0.0"),
        ArtifactChange::removed("org.test:legacy", "0.9.0"),
    ]);

    assert_eq!(lines[0], "Updates found:");
    assert!(lines[1].contains("org.test:core"));
    assert!(lines[1].contains("1.0.0"));
    assert!(lines[1].contains("==>"));
    assert!(lines[2].contains("[]"));
    assert!(lines[3].contains("org.test:legacy"));
    assert_eq!(lines.len(), 4);
}

#[test]
fn downgrades_are_marked_and_produce_a_warning() {
    let lines = format_changes_lines(&[ArtifactChange::updated(
        "org.test:core",
        "2.0.0",
        "1.0.0",
    )]);

    assert!(lines[1].contains("[*]"));
    assert!(lines
        .last()
        .expect("must have a warning line")
        .contains("downgrades"));
}

#[test]
fn empty_change_list_renders_no_updates() {
    assert_eq!(
        format_changes_lines(&[]),
        vec!["No updates found".to_string()]
    );
}

#[test]
fn processing_errors_map_to_the_processing_exit_code() {
    let apply = anyhow::Error::from(OperationError::Apply {
        stage: "merging",
        reason: "disk full".to_string(),
    });
    let resolution = anyhow::Error::from(OperationError::Resolution {
        stream: "base-pack".to_string(),
        repositories: vec!["test (/repos/test)".to_string()],
        offline: false,
    });
    let corrupt = anyhow::Error::from(OperationError::CorruptInstallation {
        path: PathBuf::from("/srv/server"),
        apply_error: "disk full".to_string(),
        rollback_error: "still locked".to_string(),
    });

    assert_eq!(return_code_for(&apply), PROCESSING_ERROR);
    assert_eq!(return_code_for(&resolution), PROCESSING_ERROR);
    assert_eq!(return_code_for(&corrupt), PROCESSING_ERROR);
}

#[test]
fn validation_errors_map_to_the_invalid_arguments_exit_code() {
    let configuration =
        anyhow::Error::from(OperationError::Configuration("bad input".to_string()));
    let invalid_target = anyhow::Error::from(OperationError::InvalidCandidateTarget {
        path: PathBuf::from("/srv/candidate"),
        reason: "not empty".to_string(),
    });
    let metadata = anyhow::Error::from(OperationError::Metadata {
        path: PathBuf::from("/srv/server/.installation/installation.toml"),
        reason: "missing".to_string(),
    });

    assert_eq!(return_code_for(&configuration), INVALID_ARGUMENTS);
    assert_eq!(return_code_for(&invalid_target), INVALID_ARGUMENTS);
    assert_eq!(return_code_for(&metadata), INVALID_ARGUMENTS);
}

#[test]
fn install_prepare_and_apply_flow_updates_the_server() {
    let root = test_dir();
    let repo_v1 = root.join("repo-v1");
    build_repository(&repo_v1, &[("base-pack", "1.0.0")]);
    add_pack_file(
        &repo_v1,
        "base-pack",
        "1.0.0",
        "packages/main/bin/standalone.sh",
        "echo v1\n",
    );

    let server = root.join("server");
    run_install_command(
        &server,
        "org.test:manifest",
        &[repo_v1.display().to_string()],
        Some("base-pack"),
        None,
        &NullConsole,
    )
    .expect("install must succeed");

    let layout = InstallationLayout::new(&server);
    let metadata = InstallationMetadata::read(&layout).expect("must read metadata");
    assert_eq!(metadata.manifest.find("base-pack"), Some("1.0.0"));

    let repo_v2 = root.join("repo-v2");
    build_repository(&repo_v2, &[("base-pack", "1.1.0")]);
    add_pack_file(
        &repo_v2,
        "base-pack",
        "1.1.0",
        "packages/main/bin/standalone.sh",
        "echo v2\n",
    );

    let candidate = root.join("candidate");
    run_update_prepare_command(
        &server,
        &candidate,
        &[repo_v2.display().to_string()],
        &NullConsole,
    )
    .expect("prepare must succeed");

    let metadata = InstallationMetadata::read(&layout).expect("must read metadata");
    assert_eq!(metadata.manifest.find("base-pack"), Some("1.0.0"));

    run_update_apply_command(&server, &candidate, &NullConsole).expect("apply must succeed");

    let metadata = InstallationMetadata::read(&layout).expect("must read metadata");
    assert_eq!(metadata.manifest.find("base-pack"), Some("1.1.0"));
    assert_eq!(
        fs::read_to_string(server.join("bin/standalone.sh")).expect("must read file"),
        "echo v2\n"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn update_list_reports_pending_changes_without_modifying_the_server() {
    let root = test_dir();
    let repo_v1 = root.join("repo-v1");
    build_repository(&repo_v1, &[("base-pack", "1.0.0")]);
    add_pack_file(&repo_v1, "base-pack", "1.0.0", "packages/main/a.txt", "a\n");

    let server = root.join("server");
    run_install_command(
        &server,
        "org.test:manifest",
        &[repo_v1.display().to_string()],
        Some("base-pack"),
        None,
        &NullConsole,
    )
    .expect("install must succeed");

    let repo_v2 = root.join("repo-v2");
    build_repository(&repo_v2, &[("base-pack", "2.0.0")]);
    add_pack_file(&repo_v2, "base-pack", "2.0.0", "packages/main/a.txt", "b\n");

    run_update_list_command(&server, &[repo_v2.display().to_string()], &NullConsole)
        .expect("list must succeed");

    let layout = InstallationLayout::new(&server);
    let metadata = InstallationMetadata::read(&layout).expect("must read metadata");
    assert_eq!(metadata.manifest.find("base-pack"), Some("1.0.0"));
    assert_eq!(
        fs::read_to_string(server.join("a.txt")).expect("must read file"),
        "a\n"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn apply_failure_surfaces_a_processing_error() {
    let root = test_dir();
    let repo_v1 = root.join("repo-v1");
    build_repository(&repo_v1, &[("base-pack", "1.0.0")]);
    add_pack_file(&repo_v1, "base-pack", "1.0.0", "packages/main/mods", "flat file\n");

    let server = root.join("server");
    run_install_command(
        &server,
        "org.test:manifest",
        &[repo_v1.display().to_string()],
        Some("base-pack"),
        None,
        &NullConsole,
    )
    .expect("install must succeed");

    let repo_v2 = root.join("repo-v2");
    build_repository(&repo_v2, &[("base-pack", "1.1.0")]);
    add_pack_file(
        &repo_v2,
        "base-pack",
        "1.1.0",
        "packages/main/mods/nested.txt",
        "nested\n",
    );

    let candidate = root.join("candidate");
    run_update_prepare_command(
        &server,
        &candidate,
        &[repo_v2.display().to_string()],
        &NullConsole,
    )
    .expect("prepare must succeed");

    let err = run_update_apply_command(&server, &candidate, &NullConsole)
        .expect_err("apply must fail on the file/directory conflict");

    assert_eq!(return_code_for(&err), PROCESSING_ERROR);

    let layout = InstallationLayout::new(&server);
    let metadata = InstallationMetadata::read(&layout).expect("must read metadata");
    assert_eq!(metadata.manifest.find("base-pack"), Some("1.0.0"));
    assert_eq!(
        fs::read_to_string(server.join("mods")).expect("must read file"),
        "flat file\n"
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn feature_pack_remove_converges_the_installation() {
    let root = test_dir();
    let repo = root.join("repo");
    build_repository(&repo, &[("base-pack", "1.0.0"), ("extras-pack", "2.0.0")]);
    add_pack_file(&repo, "base-pack", "1.0.0", "packages/main/base.txt", "base\n");
    add_pack_file(
        &repo,
        "extras-pack",
        "2.0.0",
        "packages/main/extras.txt",
        "extras\n",
    );

    let config_path = root.join("provisioning.toml");
    write_file(
        &config_path,
        "[[feature_packs]]\nlocation = \"base-pack\"\n\n[[feature_packs]]\nlocation = \"extras-pack\"\n",
    );

    let server = root.join("server");
    run_install_command(
        &server,
        "org.test:manifest",
        &[repo.display().to_string()],
        None,
        Some(&config_path),
        &NullConsole,
    )
    .expect("install must succeed");

    let layout = InstallationLayout::new(&server);
    assert!(server.join("extras.txt").is_file());

    run_feature_pack_remove_command(&server, "extras-pack", &NullConsole)
        .expect("feature pack removal must succeed");

    let metadata = InstallationMetadata::read(&layout).expect("must read metadata");
    assert_eq!(metadata.manifest.find("base-pack"), Some("1.0.0"));
    assert_eq!(metadata.manifest.find("extras-pack"), None);
    assert!(server.join("base.txt").is_file());
    assert!(!server.join("extras.txt").exists());

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn removing_an_unknown_feature_pack_is_an_invalid_argument() {
    let root = test_dir();
    let repo = root.join("repo");
    build_repository(&repo, &[("base-pack", "1.0.0")]);
    add_pack_file(&repo, "base-pack", "1.0.0", "packages/main/base.txt", "base\n");

    let server = root.join("server");
    run_install_command(
        &server,
        "org.test:manifest",
        &[repo.display().to_string()],
        Some("base-pack"),
        None,
        &NullConsole,
    )
    .expect("install must succeed");

    let err = run_feature_pack_remove_command(&server, "missing-pack", &NullConsole)
        .expect_err("must fail for an unknown feature pack");

    assert_eq!(return_code_for(&err), INVALID_ARGUMENTS);

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn missing_stream_resolution_error_is_a_processing_error() {
    let root = test_dir();
    let repo = root.join("repo");
    build_repository(&repo, &[("other-pack", "1.0.0")]);

    let server = root.join("server");
    let err = run_install_command(
        &server,
        "org.test:manifest",
        &[repo.display().to_string()],
        Some("base-pack"),
        None,
        &NullConsole,
    )
    .expect_err("install must fail to resolve");

    assert_eq!(return_code_for(&err), PROCESSING_ERROR);

    let _ = fs::remove_dir_all(&root);
}
