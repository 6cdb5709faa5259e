//! The remote build system, as seen by the reconciliation engine.
//!
//! [`RemoteGateway`] is the only network-facing boundary. It exposes named
//! types for the four kinds of remote object the engine touches (team,
//! project, repository, recipe), each carrying only the fields the engine
//! reads or writes. Identity is always compared by name or path string.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use lpbuild_core::BranchRef;

use crate::error::GatewayError;

// ---------------------------------------------------------------------------
// Remote objects
// ---------------------------------------------------------------------------

/// A team (or person) that can own projects, repositories and recipes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
}

/// A remote project and the name of its owning team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteProject {
    pub name: String,
    pub owner: String,
    /// Version control system the project uses; `None` until one is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,
}

/// The only VCS the engine configures projects for.
pub const GIT_VCS: &str = "Git";

/// A git repository hosted by the remote system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Unique path, e.g. `~openstack-charmers/charm-keystone/+git/charm-keystone`.
    pub path: String,
    pub owner: String,
    pub project: String,
    /// Upstream URL the repository is imported from.
    pub url: String,
    /// Whether this is the default repository of its project.
    #[serde(default)]
    pub is_default: bool,
}

/// The recipe attributes the engine manages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeAttrs {
    pub auto_build: bool,
    #[serde(default)]
    pub auto_build_channels: BTreeMap<String, String>,
    #[serde(default)]
    pub build_path: Option<String>,
    #[serde(default)]
    pub store_channels: Vec<String>,
    pub store_upload: bool,
}

/// One diffable recipe attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeField {
    AutoBuild,
    AutoBuildChannels,
    BuildPath,
    StoreChannels,
    StoreUpload,
}

impl RecipeField {
    pub fn all() -> &'static [RecipeField] {
        &[
            RecipeField::AutoBuild,
            RecipeField::AutoBuildChannels,
            RecipeField::BuildPath,
            RecipeField::StoreChannels,
            RecipeField::StoreUpload,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeField::AutoBuild => "auto_build",
            RecipeField::AutoBuildChannels => "auto_build_channels",
            RecipeField::BuildPath => "build_path",
            RecipeField::StoreChannels => "store_channels",
            RecipeField::StoreUpload => "store_upload",
        }
    }
}

impl fmt::Display for RecipeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RecipeAttrs {
    /// Fields whose value in `desired` differs from `self`.
    pub fn diff(&self, desired: &RecipeAttrs) -> BTreeSet<RecipeField> {
        RecipeField::all()
            .iter()
            .copied()
            .filter(|field| !self.same_field(desired, *field))
            .collect()
    }

    fn same_field(&self, other: &RecipeAttrs, field: RecipeField) -> bool {
        match field {
            RecipeField::AutoBuild => self.auto_build == other.auto_build,
            RecipeField::AutoBuildChannels => self.auto_build_channels == other.auto_build_channels,
            RecipeField::BuildPath => self.build_path == other.build_path,
            RecipeField::StoreChannels => self.store_channels == other.store_channels,
            RecipeField::StoreUpload => self.store_upload == other.store_upload,
        }
    }

    /// Human-readable value of one field.
    pub fn describe(&self, field: RecipeField) -> String {
        match field {
            RecipeField::AutoBuild => self.auto_build.to_string(),
            RecipeField::AutoBuildChannels => {
                let pins: Vec<String> = self
                    .auto_build_channels
                    .iter()
                    .map(|(k, v)| format!("{k}={v}"))
                    .collect();
                format!("{{{}}}", pins.join(", "))
            }
            RecipeField::BuildPath => self.build_path.clone().unwrap_or_else(|| "None".to_owned()),
            RecipeField::StoreChannels => format!("[{}]", self.store_channels.join(", ")),
            RecipeField::StoreUpload => self.store_upload.to_string(),
        }
    }

    fn copy_field(&mut self, from: &RecipeAttrs, field: RecipeField) {
        match field {
            RecipeField::AutoBuild => self.auto_build = from.auto_build,
            RecipeField::AutoBuildChannels => {
                self.auto_build_channels = from.auto_build_channels.clone()
            }
            RecipeField::BuildPath => self.build_path = from.build_path.clone(),
            RecipeField::StoreChannels => self.store_channels = from.store_channels.clone(),
            RecipeField::StoreUpload => self.store_upload = from.store_upload,
        }
    }
}

/// A recipe as it currently exists remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRecipe {
    pub name: String,
    pub owner: String,
    pub project: String,
    pub git_ref: BranchRef,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(flatten)]
    pub attrs: RecipeAttrs,
}

/// Creation payload for a recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecipe {
    pub name: String,
    pub owner: String,
    pub project: String,
    pub git_ref: BranchRef,
    pub store_name: Option<String>,
    pub attrs: RecipeAttrs,
}

/// An update limited to the fields that changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeChanges {
    pub fields: BTreeSet<RecipeField>,
    pub values: RecipeAttrs,
}

impl RecipeChanges {
    /// Copy only the changed fields onto `attrs`.
    pub fn apply_to(&self, attrs: &mut RecipeAttrs) {
        for field in &self.fields {
            attrs.copy_field(&self.values, *field);
        }
    }
}

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Capabilities the engine needs from the remote build system.
///
/// Every call blocks until it returns. Reads take `&self`; writes take
/// `&mut self`.
pub trait RemoteGateway {
    fn resolve_team(&self, name: &str) -> Result<Team, GatewayError>;

    /// Fails with [`GatewayError::NotFound`] if the project does not exist.
    fn resolve_project(&self, name: &str) -> Result<RemoteProject, GatewayError>;

    /// The repository owned by `team` for `project`, if any.
    fn default_repository(
        &self,
        team: &Team,
        project: &RemoteProject,
    ) -> Result<Option<Repository>, GatewayError>;

    fn import_repository(
        &mut self,
        team: &Team,
        project: &RemoteProject,
        url: &str,
    ) -> Result<Repository, GatewayError>;

    fn set_default_repository(
        &mut self,
        project: &RemoteProject,
        repository: &Repository,
    ) -> Result<(), GatewayError>;

    fn set_project_vcs(&mut self, project: &RemoteProject, vcs: &str) -> Result<(), GatewayError>;

    fn list_branches(&self, repository: &Repository) -> Result<Vec<BranchRef>, GatewayError>;

    /// Recipes owned by `team` for `project`.
    fn list_recipes(
        &self,
        team: &Team,
        project: &RemoteProject,
    ) -> Result<Vec<RemoteRecipe>, GatewayError>;

    fn create_recipe(&mut self, recipe: &NewRecipe) -> Result<RemoteRecipe, GatewayError>;

    fn update_recipe(
        &mut self,
        existing: &RemoteRecipe,
        changes: &RecipeChanges,
    ) -> Result<(), GatewayError>;
}
