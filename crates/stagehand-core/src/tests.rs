use std::cmp::Ordering;

use crate::{
    artifact_diff, compare_versions, enforce_channel_names, ArtifactChange, Channel,
    ChannelSelection, NoStreamStrategy, OperationError, Repository, ResolvedManifest,
};

fn manifest(pins: &[(&str, &str)]) -> ResolvedManifest {
    ResolvedManifest::from_streams(
        pins.iter()
            .map(|(name, version)| (name.to_string(), version.to_string())),
    )
}

#[test]
fn diff_of_identical_manifests_is_empty() {
    let current = manifest(&[("org.test:core", "1.0.0"), ("org.test:cli", "2.1.0")]);
    let candidate = current.clone();

    assert!(artifact_diff(&current, &candidate).is_empty());
}

#[test]
fn diff_reports_added_removed_and_updated_sorted_by_name() {
    let current = manifest(&[("org.test:core", "1.0.0"), ("org.test:legacy", "0.9.0")]);
    let candidate = manifest(&[("org.test:core", "1.1.0"), ("org.test:extras", "3.0.0")]);

    let changes = artifact_diff(&current, &candidate);

    assert_eq!(
        changes,
        vec![
            ArtifactChange::updated("org.test:core", "1.0.0", "1.1.0"),
            ArtifactChange::added("org.test:extras", "3.0.0"),
            ArtifactChange::removed("org.test:legacy", "0.9.0"),
        ]
    );
}

#[test]
fn diff_omits_streams_with_identical_versions() {
    let current = manifest(&[("org.test:core", "1.0.0"), ("org.test:cli", "2.0.0")]);
    let candidate = manifest(&[("org.test:core", "1.0.0"), ("org.test:cli", "2.2.0")]);

    let changes = artifact_diff(&current, &candidate);

    assert_eq!(
        changes,
        vec![ArtifactChange::updated("org.test:cli", "2.0.0", "2.2.0")]
    );
}

#[test]
fn downgrade_requires_both_versions() {
    assert!(!ArtifactChange::added("org.test:core", "1.0.0").is_downgrade());
    assert!(!ArtifactChange::removed("org.test:core", "1.0.0").is_downgrade());
    assert!(!ArtifactChange::updated("org.test:core", "1.0.0", "1.1.0").is_downgrade());
    assert!(ArtifactChange::updated("org.test:core", "1.1.0", "1.0.0").is_downgrade());
}

#[test]
fn semver_ordering_is_used_when_both_versions_parse() {
    assert_eq!(compare_versions("1.9.0", "1.10.0"), Ordering::Less);
    assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
    assert_eq!(
        compare_versions("1.0.0-alpha", "1.0.0"),
        Ordering::Less
    );
}

#[test]
fn qualifier_versions_fall_back_to_segment_ordering() {
    assert_eq!(
        compare_versions("1.0.0.Final", "1.0.0.Beta1"),
        Ordering::Greater
    );
    assert_eq!(compare_versions("1.0.0", "1.0.0.Final"), Ordering::Less);
    assert_eq!(
        compare_versions("1.2.10.Final", "1.2.9.Final"),
        Ordering::Greater
    );
}

#[test]
fn resolved_manifest_round_trips_through_toml() {
    let original = manifest(&[("org.test:core", "1.0.0"), ("org.test:cli", "2.1.0")]);

    let raw = original.to_toml_string().expect("must serialize");
    let parsed = ResolvedManifest::from_toml_str(&raw).expect("must parse");

    assert_eq!(parsed, original);
}

#[test]
fn resolved_manifest_rejects_empty_versions() {
    let raw = "[streams]\n\"org.test:core\" = \"\"\n";
    assert!(ResolvedManifest::from_toml_str(raw).is_err());
}

#[test]
fn component_streams_are_sorted_by_name() {
    let manifest = manifest(&[("z-pack", "1.0.0"), ("a-pack", "2.0.0")]);
    let streams = manifest.component_streams();

    assert_eq!(streams.len(), 2);
    assert_eq!(streams[0].name, "a-pack");
    assert_eq!(streams[1].name, "z-pack");
}

fn unnamed_channel(coordinate: &str) -> Channel {
    Channel::new(coordinate, vec![Repository::new("central", "/repos/central")])
}

#[test]
fn unnamed_channels_get_positional_names() {
    let mut named = unnamed_channel("org.test:manifest");
    named.name = Some("stable".to_string());

    let channels = enforce_channel_names(vec![
        unnamed_channel("org.test:manifest"),
        named,
        unnamed_channel("org.test:other"),
    ]);

    assert_eq!(channels[0].name.as_deref(), Some("channel-0"));
    assert_eq!(channels[1].name.as_deref(), Some("stable"));
    assert_eq!(channels[2].name.as_deref(), Some("channel-2"));
}

#[test]
fn blank_channel_names_are_replaced() {
    let mut blank = unnamed_channel("org.test:manifest");
    blank.name = Some("   ".to_string());

    let channels = enforce_channel_names(vec![blank]);

    assert_eq!(channels[0].name.as_deref(), Some("channel-0"));
}

#[test]
fn repository_override_replaces_repositories_on_every_channel() {
    let current = enforce_channel_names(vec![
        unnamed_channel("org.test:manifest"),
        unnamed_channel("org.test:other"),
    ]);
    let override_repos = vec![Repository::new("update-repo", "/repos/update")];

    let selected = ChannelSelection::RepositoryOverride(override_repos.clone())
        .apply_to(&current)
        .expect("must apply override");

    assert_eq!(selected.len(), 2);
    for (index, channel) in selected.iter().enumerate() {
        assert_eq!(channel.repositories, override_repos);
        assert_eq!(
            channel.manifest_coordinate,
            current[index].manifest_coordinate
        );
    }
}

#[test]
fn repository_override_without_channels_is_a_configuration_error() {
    let err = ChannelSelection::RepositoryOverride(vec![Repository::new("r", "/r")])
        .apply_to(&[])
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<OperationError>(),
        Some(OperationError::Configuration(_))
    ));
}

#[test]
fn empty_channel_selection_is_a_configuration_error() {
    let err = ChannelSelection::Channels(Vec::new())
        .apply_to(&[])
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<OperationError>(),
        Some(OperationError::Configuration(_))
    ));
}

#[test]
fn current_selection_keeps_the_installation_channels() {
    let current = enforce_channel_names(vec![
        unnamed_channel("org.test:manifest"),
        unnamed_channel("org.test:other"),
    ]);

    let selected = ChannelSelection::Current
        .apply_to(&current)
        .expect("must keep current channels");

    assert_eq!(selected, current);
}

#[test]
fn current_selection_without_channels_is_a_configuration_error() {
    let err = ChannelSelection::Current
        .apply_to(&[])
        .expect_err("must fail");

    assert!(matches!(
        err.downcast_ref::<OperationError>(),
        Some(OperationError::Configuration(_))
    ));
}

#[test]
fn channel_selection_enforces_names_on_replacement() {
    let selected = ChannelSelection::Channels(vec![unnamed_channel("org.test:manifest")])
        .apply_to(&[])
        .expect("must apply");

    assert_eq!(selected[0].name.as_deref(), Some("channel-0"));
    assert_eq!(selected[0].no_stream_strategy, NoStreamStrategy::None);
}
