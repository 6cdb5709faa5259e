//! A [`RemoteGateway`] backed by a plain [`RemoteState`] value.
//!
//! The state is what [`crate::state_store`] persists between runs, so the CLI
//! can be driven end to end without network access. Tests use it directly.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lpbuild_core::BranchRef;

use crate::error::GatewayError;
use crate::gateway::{
    NewRecipe, RecipeChanges, RemoteGateway, RemoteProject, RemoteRecipe, Repository, Team,
};

/// A repository plus the branches it currently has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    #[serde(flatten)]
    pub repository: Repository,
    #[serde(default)]
    pub branches: Vec<BranchRef>,
}

/// Everything the remote build system knows, as one serializable document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub projects: Vec<RemoteProject>,
    #[serde(default)]
    pub repositories: Vec<RepositoryRecord>,
    #[serde(default)]
    pub recipes: Vec<RemoteRecipe>,
    /// Branches visible at each upstream URL; an imported repository starts
    /// with the branches of its URL.
    #[serde(default)]
    pub upstreams: BTreeMap<String, Vec<BranchRef>>,
}

/// Path of a repository imported by `owner` into `project`.
pub fn repository_path(owner: &str, project: &str) -> String {
    format!("~{owner}/{project}/+git/{project}")
}

impl RemoteState {
    pub fn with_team(mut self, name: &str) -> Self {
        self.teams.push(Team {
            name: name.to_owned(),
        });
        self
    }

    pub fn with_project(mut self, name: &str, owner: &str) -> Self {
        self.projects.push(RemoteProject {
            name: name.to_owned(),
            owner: owner.to_owned(),
            vcs: None,
        });
        self
    }

    /// Add a default repository for (`owner`, `project`) with `branches`.
    pub fn with_repository(mut self, owner: &str, project: &str, url: &str, branches: &[&str]) -> Self {
        self.repositories.push(RepositoryRecord {
            repository: Repository {
                path: repository_path(owner, project),
                owner: owner.to_owned(),
                project: project.to_owned(),
                url: url.to_owned(),
                is_default: true,
            },
            branches: branches.iter().map(|b| BranchRef::from_name(b)).collect(),
        });
        self
    }

    pub fn with_upstream(mut self, url: &str, branches: &[&str]) -> Self {
        self.upstreams.insert(
            url.to_owned(),
            branches.iter().map(|b| BranchRef::from_name(b)).collect(),
        );
        self
    }

    pub fn with_recipe(mut self, recipe: RemoteRecipe) -> Self {
        self.recipes.push(recipe);
        self
    }

    pub fn recipe(&self, name: &str) -> Option<&RemoteRecipe> {
        self.recipes.iter().find(|r| r.name == name)
    }
}

/// Number of write calls made through an [`InMemoryGateway`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteCounts {
    pub imports: usize,
    pub set_defaults: usize,
    pub vcs_updates: usize,
    pub creates: usize,
    pub updates: usize,
}

impl WriteCounts {
    pub fn total(&self) -> usize {
        self.imports + self.set_defaults + self.vcs_updates + self.creates + self.updates
    }
}

/// In-memory [`RemoteGateway`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: RemoteState,
    failing: BTreeSet<String>,
    writes: WriteCounts,
}

impl InMemoryGateway {
    pub fn new(state: RemoteState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    /// Make every create or update of recipe `name` fail.
    pub fn fail_recipe(&mut self, name: &str) {
        self.failing.insert(name.to_owned());
    }

    pub fn state(&self) -> &RemoteState {
        &self.state
    }

    pub fn into_state(self) -> RemoteState {
        self.state
    }

    pub fn writes(&self) -> WriteCounts {
        self.writes
    }

    fn check_failing(&self, name: &str) -> Result<(), GatewayError> {
        if self.failing.contains(name) {
            return Err(GatewayError::Rejected {
                message: format!("recipe '{name}' could not be saved"),
            });
        }
        Ok(())
    }
}

impl RemoteGateway for InMemoryGateway {
    fn resolve_team(&self, name: &str) -> Result<Team, GatewayError> {
        self.state
            .teams
            .iter()
            .find(|t| t.name == name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                kind: "team",
                name: name.to_owned(),
            })
    }

    fn resolve_project(&self, name: &str) -> Result<RemoteProject, GatewayError> {
        self.state
            .projects
            .iter()
            .find(|p| p.name == name)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound {
                kind: "project",
                name: name.to_owned(),
            })
    }

    fn default_repository(
        &self,
        team: &Team,
        project: &RemoteProject,
    ) -> Result<Option<Repository>, GatewayError> {
        Ok(self
            .state
            .repositories
            .iter()
            .find(|r| r.repository.owner == team.name && r.repository.project == project.name)
            .map(|r| r.repository.clone()))
    }

    fn import_repository(
        &mut self,
        team: &Team,
        project: &RemoteProject,
        url: &str,
    ) -> Result<Repository, GatewayError> {
        self.writes.imports += 1;
        let repository = Repository {
            path: repository_path(&team.name, &project.name),
            owner: team.name.clone(),
            project: project.name.clone(),
            url: url.to_owned(),
            is_default: false,
        };
        let branches = self.state.upstreams.get(url).cloned().unwrap_or_default();
        self.state.repositories.push(RepositoryRecord {
            repository: repository.clone(),
            branches,
        });
        Ok(repository)
    }

    fn set_default_repository(
        &mut self,
        project: &RemoteProject,
        repository: &Repository,
    ) -> Result<(), GatewayError> {
        self.writes.set_defaults += 1;
        if !self.state.repositories.iter().any(|r| r.repository.path == repository.path) {
            return Err(GatewayError::NotFound {
                kind: "repository",
                name: repository.path.clone(),
            });
        }
        for record in &mut self.state.repositories {
            if record.repository.project == project.name {
                record.repository.is_default = record.repository.path == repository.path;
            }
        }
        Ok(())
    }

    fn set_project_vcs(&mut self, project: &RemoteProject, vcs: &str) -> Result<(), GatewayError> {
        self.writes.vcs_updates += 1;
        let stored = self
            .state
            .projects
            .iter_mut()
            .find(|p| p.name == project.name)
            .ok_or_else(|| GatewayError::NotFound {
                kind: "project",
                name: project.name.clone(),
            })?;
        stored.vcs = Some(vcs.to_owned());
        Ok(())
    }

    fn list_branches(&self, repository: &Repository) -> Result<Vec<BranchRef>, GatewayError> {
        self.state
            .repositories
            .iter()
            .find(|r| r.repository.path == repository.path)
            .map(|r| r.branches.clone())
            .ok_or_else(|| GatewayError::NotFound {
                kind: "repository",
                name: repository.path.clone(),
            })
    }

    fn list_recipes(
        &self,
        team: &Team,
        project: &RemoteProject,
    ) -> Result<Vec<RemoteRecipe>, GatewayError> {
        Ok(self
            .state
            .recipes
            .iter()
            .filter(|r| r.owner == team.name && r.project == project.name)
            .cloned()
            .collect())
    }

    fn create_recipe(&mut self, recipe: &NewRecipe) -> Result<RemoteRecipe, GatewayError> {
        self.writes.creates += 1;
        self.check_failing(&recipe.name)?;
        if self
            .state
            .recipes
            .iter()
            .any(|r| r.owner == recipe.owner && r.name == recipe.name)
        {
            return Err(GatewayError::Rejected {
                message: format!("recipe '{}' already exists", recipe.name),
            });
        }
        let created = RemoteRecipe {
            name: recipe.name.clone(),
            owner: recipe.owner.clone(),
            project: recipe.project.clone(),
            git_ref: recipe.git_ref.clone(),
            store_name: recipe.store_name.clone(),
            attrs: recipe.attrs.clone(),
        };
        self.state.recipes.push(created.clone());
        Ok(created)
    }

    fn update_recipe(
        &mut self,
        existing: &RemoteRecipe,
        changes: &RecipeChanges,
    ) -> Result<(), GatewayError> {
        self.writes.updates += 1;
        self.check_failing(&existing.name)?;
        let recipe = self
            .state
            .recipes
            .iter_mut()
            .find(|r| r.owner == existing.owner && r.name == existing.name)
            .ok_or_else(|| GatewayError::NotFound {
                kind: "recipe",
                name: existing.name.clone(),
            })?;
        changes.apply_to(&mut recipe.attrs);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{RecipeAttrs, RecipeField};

    fn state() -> RemoteState {
        RemoteState::default()
            .with_team("openstack-charmers")
            .with_project("charm-keystone", "openstack-charmers")
            .with_upstream("https://opendev.org/openstack/charm-keystone", &["master", "stable/xena"])
    }

    fn team() -> Team {
        Team {
            name: "openstack-charmers".to_owned(),
        }
    }

    #[test]
    fn unknown_project_is_not_found() {
        let gw = InMemoryGateway::new(state());
        let err = gw.resolve_project("charm-nope").unwrap_err();
        assert_eq!(
            err,
            GatewayError::NotFound {
                kind: "project",
                name: "charm-nope".to_owned()
            }
        );
    }

    #[test]
    fn import_copies_upstream_branches_and_set_default_flags_it() {
        let mut gw = InMemoryGateway::new(state());
        let project = gw.resolve_project("charm-keystone").unwrap();
        assert!(gw.default_repository(&team(), &project).unwrap().is_none());

        let repo = gw
            .import_repository(&team(), &project, "https://opendev.org/openstack/charm-keystone")
            .unwrap();
        assert_eq!(repo.path, "~openstack-charmers/charm-keystone/+git/charm-keystone");
        assert_eq!(gw.list_branches(&repo).unwrap().len(), 2);

        gw.set_default_repository(&project, &repo).unwrap();
        let repo = gw.default_repository(&team(), &project).unwrap().unwrap();
        assert!(repo.is_default);
        assert_eq!(gw.writes().total(), 2);
    }

    #[test]
    fn update_touches_only_changed_fields_and_failures_are_injected() {
        let recipe = RemoteRecipe {
            name: "charm-keystone.master.latest".to_owned(),
            owner: "openstack-charmers".to_owned(),
            project: "charm-keystone".to_owned(),
            git_ref: BranchRef::from_name("master"),
            store_name: None,
            attrs: RecipeAttrs {
                auto_build: true,
                store_upload: true,
                ..RecipeAttrs::default()
            },
        };
        let mut gw = InMemoryGateway::new(state().with_recipe(recipe.clone()));

        let changes = RecipeChanges {
            fields: [RecipeField::AutoBuild].into_iter().collect(),
            values: RecipeAttrs::default(),
        };
        gw.update_recipe(&recipe, &changes).unwrap();
        let stored = gw.state().recipe("charm-keystone.master.latest").unwrap();
        assert!(!stored.attrs.auto_build);
        assert!(stored.attrs.store_upload);

        gw.fail_recipe("charm-keystone.master.latest");
        assert!(matches!(
            gw.update_recipe(&recipe, &changes),
            Err(GatewayError::Rejected { .. })
        ));
        assert_eq!(gw.writes().updates, 2);
    }
}
