//! Reconciliation of one declared project against the remote build system.
//!
//! ## `reconcile`: snapshot, then diff
//!
//! 1. Resolve team and project; the project must be owned by the team.
//! 2. Resolve (or, under [`RepositoryPolicy::ImportMissing`], import) the
//!    default repository.
//! 3. List recipes once: the single remote snapshot for this project.
//! 4. List branches once and compute one [`RecipePlan`] per declared
//!    branch/track against the snapshot.
//! 5. Orphans are snapshot names minus planned names.
//! 6. Declared branches never seen remotely are reported as missing.
//!
//! Nothing in this module writes recipes; see [`crate::executor`].

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use lpbuild_core::{BranchRef, BranchSpec, ProjectName, ProjectSpec};
use lpbuild_core::template::format_recipe_name;

use crate::error::SyncError;
use crate::gateway::{
    NewRecipe, RecipeAttrs, RecipeChanges, RecipeField, RemoteGateway, RemoteProject,
    RemoteRecipe, Repository, Team, GIT_VCS,
};

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Whether reconciliation may write repository-level state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryPolicy {
    /// Never write; a missing repository is an error.
    ReadOnly,
    /// Import a missing repository from the configured URL and make the
    /// repository the project default.
    ImportMissing,
}

/// The resolved remote objects a project reconciles against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub team: Team,
    pub project: RemoteProject,
    pub repository: Repository,
}

/// Desired vs. current state of one recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipePlan {
    pub name: String,
    pub source_branch: BranchRef,
    pub track: String,
    pub source_channels: Vec<String>,
    pub exists: bool,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteRecipe>,
    pub desired: RecipeAttrs,
    pub changed_fields: BTreeSet<RecipeField>,
}

impl RecipePlan {
    /// The update to send for an existing, changed recipe.
    pub fn changes(&self) -> Option<RecipeChanges> {
        (self.exists && self.changed).then(|| RecipeChanges {
            fields: self.changed_fields.clone(),
            values: self.desired.clone(),
        })
    }
}

/// Everything `diff`, `show` and `sync` need to know about one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconciliationResult {
    pub project: ProjectName,
    pub team: String,
    pub remote_project: String,
    pub repository: String,
    pub store_name: Option<String>,
    /// Keyed by recipe name.
    pub recipes: BTreeMap<String, RecipePlan>,
    /// Declared branches absent from the remote repository.
    pub missing_branches_in_repo: Vec<BranchRef>,
    /// Remote recipes that no declared branch/track produces.
    pub non_config_recipes: Vec<String>,
    /// Remote branches with no declaration.
    pub no_recipe_branches: Vec<BranchRef>,
}

impl ReconciliationResult {
    pub fn creates(&self) -> impl Iterator<Item = &RecipePlan> {
        self.recipes.values().filter(|p| !p.exists)
    }

    pub fn updates(&self) -> impl Iterator<Item = &RecipePlan> {
        self.recipes.values().filter(|p| p.exists && p.changed)
    }

    pub fn unchanged(&self) -> impl Iterator<Item = &RecipePlan> {
        self.recipes.values().filter(|p| p.exists && !p.changed)
    }

    /// True if any recipe must be created or updated, or a declared branch is
    /// missing upstream.
    pub fn needs_changes(&self) -> bool {
        self.creates().next().is_some()
            || self.updates().next().is_some()
            || !self.missing_branches_in_repo.is_empty()
    }

    /// The creation payload for `plan`.
    pub fn new_recipe(&self, plan: &RecipePlan) -> NewRecipe {
        NewRecipe {
            name: plan.name.clone(),
            owner: self.team.clone(),
            project: self.remote_project.clone(),
            git_ref: plan.source_branch.clone(),
            store_name: self.store_name.clone(),
            attrs: plan.desired.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// reconcile
// ---------------------------------------------------------------------------

/// Reconcile `spec` against the live state behind `gateway`.
pub fn reconcile<G: RemoteGateway + ?Sized>(
    spec: &ProjectSpec,
    gateway: &mut G,
    policy: RepositoryPolicy,
) -> Result<ReconciliationResult, SyncError> {
    tracing::info!("reconciling project {}", spec.name);
    let target = resolve_target(spec, gateway, policy)?;

    let snapshot = gateway.list_recipes(&target.team, &target.project)?;
    let branches = gateway.list_branches(&target.repository)?;
    tracing::debug!(
        "{}: {} remote recipe(s), {} remote branch(es)",
        spec.name,
        snapshot.len(),
        branches.len()
    );

    Ok(diff_snapshot(spec, &target, &branches, snapshot))
}

/// Steps 1 and 2: resolve team, project and repository.
pub fn resolve_target<G: RemoteGateway + ?Sized>(
    spec: &ProjectSpec,
    gateway: &mut G,
    policy: RepositoryPolicy,
) -> Result<RemoteTarget, SyncError> {
    let team = gateway.resolve_team(&spec.team)?;
    let project = gateway.resolve_project(&spec.remote_project)?;
    if project.owner != team.name {
        tracing::error!(
            "project {} is owned by {}, expected {}",
            project.name,
            project.owner,
            team.name
        );
        return Err(SyncError::OwnershipMismatch {
            project: project.name,
            owner: project.owner,
            team: team.name,
        });
    }
    let repository = ensure_repository(spec, &team, &project, gateway, policy)?;
    Ok(RemoteTarget {
        team,
        project,
        repository,
    })
}

/// Find the project's repository, importing it when `policy` allows.
pub fn ensure_repository<G: RemoteGateway + ?Sized>(
    spec: &ProjectSpec,
    team: &Team,
    project: &RemoteProject,
    gateway: &mut G,
    policy: RepositoryPolicy,
) -> Result<Repository, SyncError> {
    let unavailable = |reason: String| SyncError::RepositoryUnavailable {
        project: project.name.clone(),
        reason,
    };

    let existing = gateway.default_repository(team, project)?;
    let mut repository = match (existing, policy) {
        (Some(repository), _) => repository,
        (None, RepositoryPolicy::ReadOnly) => {
            return Err(unavailable(format!("no repository owned by {}", team.name)))
        }
        (None, RepositoryPolicy::ImportMissing) => {
            let Some(url) = spec.repository.as_deref() else {
                return Err(unavailable("no repository URL configured".to_owned()));
            };
            tracing::info!(
                "repository for {} does not exist, importing from {url}",
                project.name
            );
            gateway
                .import_repository(team, project, url)
                .map_err(|e| unavailable(e.to_string()))?
        }
    };

    if policy == RepositoryPolicy::ImportMissing && !repository.is_default {
        tracing::info!(
            "setting default repository for {} to {}",
            project.name,
            repository.path
        );
        match gateway.set_default_repository(project, &repository) {
            Ok(()) => repository.is_default = true,
            Err(e) => tracing::error!(
                "failed to set default repository for {} to {}: {e}",
                project.name,
                repository.path
            ),
        }
    }

    if policy == RepositoryPolicy::ImportMissing && project.vcs.is_none() {
        tracing::info!("setting project {} vcs to {GIT_VCS}", project.name);
        gateway.set_project_vcs(project, GIT_VCS)?;
    }
    Ok(repository)
}

/// Steps 4 to 6: a pure function of the declared spec and one snapshot.
pub fn diff_snapshot(
    spec: &ProjectSpec,
    target: &RemoteTarget,
    branches: &[BranchRef],
    snapshot: Vec<RemoteRecipe>,
) -> ReconciliationResult {
    let mut index: BTreeMap<String, RemoteRecipe> =
        snapshot.into_iter().map(|r| (r.name.clone(), r)).collect();

    let mut recipes = BTreeMap::new();
    let mut no_recipe_branches = Vec::new();
    let seen: BTreeSet<&BranchRef> = branches.iter().collect();

    for branch in branches {
        let Some(branch_spec) = spec.branches.get(branch) else {
            tracing::info!("no recipes configured for branch {branch}, continuing");
            no_recipe_branches.push(branch.clone());
            continue;
        };
        for plan in plan_branch(&target.project.name, branch, branch_spec, &index) {
            recipes.insert(plan.name.clone(), plan);
        }
    }

    // Second pass: whatever the plans did not claim is an orphan.
    index.retain(|name, _| !recipes.contains_key(name));
    let non_config_recipes: Vec<String> = index.into_keys().collect();

    let missing_branches_in_repo: Vec<BranchRef> = spec
        .branches
        .keys()
        .filter(|b| !seen.contains(b))
        .cloned()
        .collect();

    ReconciliationResult {
        project: spec.name.clone(),
        team: target.team.name.clone(),
        remote_project: target.project.name.clone(),
        repository: target.repository.path.clone(),
        store_name: spec.charmhub.clone(),
        recipes,
        missing_branches_in_repo,
        non_config_recipes,
        no_recipe_branches,
    }
}

fn plan_branch(
    project: &str,
    branch: &BranchRef,
    spec: &BranchSpec,
    index: &BTreeMap<String, RemoteRecipe>,
) -> Vec<RecipePlan> {
    let component = branch.recipe_component();
    spec.track_groups()
        .into_iter()
        .map(|group| {
            let name = format_recipe_name(&spec.recipe_name, project, &component, &group.track);
            let desired = RecipeAttrs {
                auto_build: spec.auto_build,
                auto_build_channels: spec.build_channels.clone(),
                build_path: spec.build_path.clone(),
                store_channels: group.channels.clone(),
                store_upload: spec.upload,
            };
            let remote = index.get(&name).cloned();
            let changed_fields = remote
                .as_ref()
                .map(|r| r.attrs.diff(&desired))
                .unwrap_or_default();
            RecipePlan {
                exists: remote.is_some(),
                changed: !changed_fields.is_empty(),
                name,
                source_branch: branch.clone(),
                track: group.track,
                source_channels: group.channels,
                remote,
                desired,
                changed_fields,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use lpbuild_core::types::{BranchEntry, ChannelList, ProjectEntry};

    fn spec(branches: Vec<(&str, BranchEntry)>) -> ProjectSpec {
        ProjectSpec::from_entry(&ProjectEntry {
            name: "keystone".to_owned(),
            team: Some("openstack-charmers".to_owned()),
            charmhub: Some("keystone".to_owned()),
            launchpad: Some("charm-keystone".to_owned()),
            repository: Some("https://opendev.org/openstack/charm-keystone".to_owned()),
            branches: branches
                .into_iter()
                .map(|(name, entry)| (name.to_owned(), entry))
                .collect(),
        })
        .expect("spec")
    }

    fn branch(channels: &[&str]) -> BranchEntry {
        BranchEntry {
            channels: Some(ChannelList::Many(channels.iter().map(|c| c.to_string()).collect())),
            ..BranchEntry::default()
        }
    }

    fn target() -> RemoteTarget {
        RemoteTarget {
            team: Team {
                name: "openstack-charmers".to_owned(),
            },
            project: RemoteProject {
                name: "charm-keystone".to_owned(),
                owner: "openstack-charmers".to_owned(),
                vcs: Some(GIT_VCS.to_owned()),
            },
            repository: Repository {
                path: "~openstack-charmers/charm-keystone/+git/charm-keystone".to_owned(),
                owner: "openstack-charmers".to_owned(),
                project: "charm-keystone".to_owned(),
                url: "https://opendev.org/openstack/charm-keystone".to_owned(),
                is_default: true,
            },
        }
    }

    fn remote(name: &str, git_ref: &str, channels: &[&str]) -> RemoteRecipe {
        RemoteRecipe {
            name: name.to_owned(),
            owner: "openstack-charmers".to_owned(),
            project: "charm-keystone".to_owned(),
            git_ref: BranchRef::from_name(git_ref),
            store_name: Some("keystone".to_owned()),
            attrs: RecipeAttrs {
                auto_build: true,
                auto_build_channels: BTreeMap::new(),
                build_path: None,
                store_channels: channels.iter().map(|c| c.to_string()).collect(),
                store_upload: true,
            },
        }
    }

    fn refs(names: &[&str]) -> Vec<BranchRef> {
        names.iter().map(|n| BranchRef::from_name(n)).collect()
    }

    #[test]
    fn one_recipe_per_track_in_declared_order() {
        let spec = spec(vec![("master", branch(&["yoga/edge", "latest/edge", "yoga/stable"]))]);
        let result = diff_snapshot(&spec, &target(), &refs(&["master"]), vec![]);

        let yoga = &result.recipes["charm-keystone.master.yoga"];
        assert_eq!(yoga.source_channels, vec!["yoga/edge", "yoga/stable"]);
        assert!(!yoga.exists);
        assert!(!yoga.changed);
        assert!(result.recipes.contains_key("charm-keystone.master.latest"));
        assert_eq!(result.creates().count(), 2);
        assert!(result.needs_changes());
    }

    #[test]
    fn matching_remote_is_unchanged() {
        let spec = spec(vec![("master", branch(&["latest/edge"]))]);
        let snapshot = vec![remote("charm-keystone.master.latest", "master", &["latest/edge"])];
        let result = diff_snapshot(&spec, &target(), &refs(&["master"]), snapshot);

        assert_eq!(result.unchanged().count(), 1);
        assert!(!result.needs_changes());
    }

    #[test]
    fn differing_remote_lists_changed_fields() {
        let spec = spec(vec![("master", branch(&["latest/edge", "latest/stable"]))]);
        let snapshot = vec![remote("charm-keystone.master.latest", "master", &["latest/edge"])];
        let result = diff_snapshot(&spec, &target(), &refs(&["master"]), snapshot);

        let plan = &result.recipes["charm-keystone.master.latest"];
        assert!(plan.exists && plan.changed);
        assert_eq!(
            plan.changed_fields.iter().copied().collect::<Vec<_>>(),
            vec![RecipeField::StoreChannels]
        );
        let changes = plan.changes().expect("update");
        assert_eq!(changes.values.store_channels, vec!["latest/edge", "latest/stable"]);
    }

    #[test]
    fn declared_branch_missing_upstream_has_no_recipe() {
        let spec = spec(vec![
            ("master", branch(&["latest/edge"])),
            ("stable/xena", branch(&["xena/stable"])),
        ]);
        let result = diff_snapshot(&spec, &target(), &refs(&["master"]), vec![]);

        assert_eq!(result.missing_branches_in_repo, refs(&["stable/xena"]));
        assert!(result.recipes.values().all(|p| p.source_branch.short_name() == "master"));
        assert!(result.needs_changes());
    }

    #[test]
    fn unclaimed_remote_recipe_is_an_orphan() {
        let spec = spec(vec![("master", branch(&["latest/edge"]))]);
        let snapshot = vec![
            remote("charm-keystone.master.latest", "master", &["latest/edge"]),
            remote("foo.legacy.latest", "legacy", &[]),
        ];
        let result = diff_snapshot(&spec, &target(), &refs(&["master", "legacy"]), snapshot);

        assert_eq!(result.non_config_recipes, vec!["foo.legacy.latest".to_owned()]);
        assert_eq!(result.no_recipe_branches, refs(&["legacy"]));
        assert!(!result.recipes.contains_key("foo.legacy.latest"));
    }

    #[test]
    fn upload_false_builds_latest_without_store_channels() {
        let spec = spec(vec![(
            "master",
            BranchEntry {
                upload: Some(false),
                ..branch(&["xena/edge", "yoga/edge"])
            },
        )]);
        let result = diff_snapshot(&spec, &target(), &refs(&["master"]), vec![]);

        assert_eq!(result.recipes.len(), 1);
        let plan = &result.recipes["charm-keystone.master.latest"];
        assert!(plan.desired.store_channels.is_empty());
        assert!(!plan.desired.store_upload);
    }

    #[test]
    fn slashes_in_branch_become_dashes() {
        let spec = spec(vec![("stable/xena", branch(&["xena/stable"]))]);
        let result = diff_snapshot(&spec, &target(), &refs(&["stable/xena"]), vec![]);
        assert!(result.recipes.contains_key("charm-keystone.stable-xena.xena"));
    }

    #[test]
    fn creation_payload_carries_store_name_and_ref() {
        let spec = spec(vec![("master", branch(&["latest/edge"]))]);
        let result = diff_snapshot(&spec, &target(), &refs(&["master"]), vec![]);
        let plan = &result.recipes["charm-keystone.master.latest"];
        let new = result.new_recipe(plan);
        assert_eq!(new.store_name.as_deref(), Some("keystone"));
        assert_eq!(new.git_ref, BranchRef::from_name("master"));
        assert_eq!(new.owner, "openstack-charmers");
    }
}
