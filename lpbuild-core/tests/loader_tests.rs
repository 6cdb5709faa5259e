//! Config-directory loading, error-message, and merge integration tests.

use assert_fs::prelude::*;
use lpbuild_core::{
    loader,
    types::{BranchEntry, BranchRef, ProjectEntry},
    ConfigError, ProjectRegistry,
};
use predicates::prelude::predicate;

const OPENSTACK: &str = r#"
defaults:
  team: openstack-charmers
  branches:
    master:
      channels:
        - yoga/edge
        - latest/edge
projects:
  - name: OpenStack Keystone
    charmhub: keystone
    launchpad: charm-keystone
    repository: https://opendev.org/openstack/charm-keystone.git
  - name: OpenStack Nova Compute
    charmhub: nova-compute
    launchpad: charm-nova-compute
    repository: https://opendev.org/openstack/charm-nova-compute.git
    branches:
      stable/xena:
        channels: [xena/edge]
"#;

const CEPH: &str = r#"
defaults:
  team: ceph-charmers
projects:
  - name: Ceph Monitor
    charmhub: ceph-mon
    launchpad: charm-ceph-mon
    repository: https://opendev.org/openstack/charm-ceph-mon.git
"#;

fn config_dir() -> assert_fs::TempDir {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("openstack.yaml").write_str(OPENSTACK).expect("write");
    dir.child("ceph.yaml").write_str(CEPH).expect("write");
    dir.child("README.md").write_str("not a group").expect("write");
    dir
}

// ---------------------------------------------------------------------------
// 1. Locating files
// ---------------------------------------------------------------------------

#[test]
fn missing_config_dir_is_reported_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let missing = dir.child("nope");
    let err = loader::config_dir_at(missing.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ConfigDirNotFound { .. }));
    assert!(err.to_string().contains("nope"));
}

#[test]
fn all_yaml_files_are_found_sorted() {
    let dir = config_dir();
    let files = loader::group_files_at(dir.path(), &[]).expect("files");
    let names: Vec<String> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["ceph.yaml", "openstack.yaml"]);
}

#[test]
fn named_group_must_exist() {
    let dir = config_dir();
    let err = loader::group_files_at(dir.path(), &["ovn".to_owned()]).unwrap_err();
    assert!(matches!(err, ConfigError::GroupNotFound { .. }));
    assert!(err.to_string().contains("ovn.yaml"));
}

// ---------------------------------------------------------------------------
// 2. Loading
// ---------------------------------------------------------------------------

#[test]
fn loads_every_group_with_their_own_defaults() {
    let dir = config_dir();
    let registry = loader::load_group_dir_at(dir.path(), &[]).expect("load");
    assert_eq!(registry.len(), 3);

    let mon = registry.get("Ceph Monitor").expect("ceph-mon");
    assert_eq!(mon.team, "ceph-charmers");
    assert!(mon.branches.is_empty());

    let nova = registry.get("OpenStack Nova Compute").expect("nova");
    assert_eq!(nova.team, "openstack-charmers");
    assert!(nova.branches.contains_key(&BranchRef::from_name("master")));
    assert!(nova.branches.contains_key(&BranchRef::from_name("stable/xena")));
}

#[test]
fn selecting_a_group_limits_the_registry() {
    let dir = config_dir();
    let registry = loader::load_group_dir_at(dir.path(), &["ceph".to_owned()]).expect("load");
    assert_eq!(registry.len(), 1);
    assert!(registry.get("Ceph Monitor").is_some());
}

#[test]
fn same_project_in_two_groups_is_a_duplicate() {
    let dir = config_dir();
    dir.child("zz-extra.yaml").write_str(CEPH).expect("write");
    let err = loader::load_group_dir_at(dir.path(), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateProject { ref name } if name == "Ceph Monitor"));
}

#[test]
fn corrupt_group_file_names_the_file() {
    let dir = config_dir();
    let broken = dir.child("broken.yaml");
    broken
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");
    broken.assert(predicate::path::exists());

    let err = loader::load_group_dir_at(dir.path(), &[]).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("broken.yaml"));
}

#[test]
fn group_with_only_defaults_is_skipped() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    dir.child("shared.yaml")
        .write_str("defaults:\n  team: openstack-charmers\n")
        .expect("write");
    let registry = loader::load_group_dir_at(dir.path(), &[]).expect("load");
    assert!(registry.is_empty());
}

// ---------------------------------------------------------------------------
// 3. Explicit merge
// ---------------------------------------------------------------------------

#[test]
fn merge_adds_branch_and_keeps_other_fields() {
    let dir = config_dir();
    let mut registry: ProjectRegistry =
        loader::load_group_dir_at(dir.path(), &["ceph".to_owned()]).expect("load");

    let second = ProjectEntry {
        name: "Ceph Monitor".to_owned(),
        branches: vec![("stable/quincy".to_owned(), BranchEntry::default())],
        ..ProjectEntry::default()
    };
    registry.add(second, true).expect("merge");

    let mon = registry.get("Ceph Monitor").expect("ceph-mon");
    assert_eq!(mon.branches.len(), 1);
    assert!(mon.branches.contains_key(&BranchRef::from_name("stable/quincy")));
    assert_eq!(mon.charmhub.as_deref(), Some("ceph-mon"));
    assert_eq!(mon.remote_project, "charm-ceph-mon");
}
