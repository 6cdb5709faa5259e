//! Domain types for declared build targets.
//!
//! Two layers live here:
//! - *entries* ([`ProjectEntry`], [`BranchEntry`]) mirror what a YAML document
//!   said, with every optional key kept as `Option`;
//! - *specs* ([`ProjectSpec`], [`BranchSpec`]) are fully populated, with
//!   defaults applied once at construction.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channels::{group_channels, ChannelGroup};
use crate::error::ConfigError;
use crate::template::{format_recipe_name, validate_template};

/// Prefix of every normalized branch reference.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Recipe name template used when a branch does not set `recipe-name`.
pub const DEFAULT_RECIPE_NAME: &str = "{project}.{branch}.{track}";

/// Track used for the implicit recipe of a branch that publishes nowhere.
pub const IMPLICIT_TRACK: &str = "latest";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A strongly-typed display name for a declared project; the registry key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectName(pub String);

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for ProjectName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProjectName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A normalized git branch reference, e.g. `refs/heads/stable/xena`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchRef(pub String);

impl BranchRef {
    /// Normalize a branch name from config (`main`, `stable/xena`) or an
    /// already-qualified ref.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with(BRANCH_REF_PREFIX) {
            Self(name.to_owned())
        } else {
            Self(format!("{BRANCH_REF_PREFIX}{name}"))
        }
    }

    /// The branch name without the `refs/heads/` prefix.
    pub fn short_name(&self) -> &str {
        self.0.strip_prefix(BRANCH_REF_PREFIX).unwrap_or(&self.0)
    }

    /// The short name with `/` replaced by `-`, safe to embed in a recipe name.
    pub fn recipe_component(&self) -> String {
        self.short_name().replace('/', "-")
    }
}

impl fmt::Display for BranchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for BranchRef {
    fn from(s: &str) -> Self {
        Self::from_name(s)
    }
}

// ---------------------------------------------------------------------------
// Entries (as declared)
// ---------------------------------------------------------------------------

/// `channels:` accepts either a single channel or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ChannelList {
    One(String),
    Many(Vec<String>),
}

impl ChannelList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            ChannelList::One(channel) => vec![channel.clone()],
            ChannelList::Many(channels) => channels.clone(),
        }
    }
}

/// One branch as written in a YAML document; absent keys stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BranchEntry {
    #[serde(default)]
    pub channels: Option<ChannelList>,
    #[serde(default)]
    pub auto_build: Option<bool>,
    #[serde(default)]
    pub upload: Option<bool>,
    #[serde(default)]
    pub recipe_name: Option<String>,
    #[serde(default)]
    pub build_path: Option<String>,
    #[serde(default)]
    pub build_channels: Option<BTreeMap<String, String>>,
}

/// One project as written in a YAML document, after group defaults were
/// copied in. Branches keep document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectEntry {
    pub name: String,
    pub team: Option<String>,
    pub charmhub: Option<String>,
    pub launchpad: Option<String>,
    pub repository: Option<String>,
    pub branches: Vec<(String, BranchEntry)>,
}

// ---------------------------------------------------------------------------
// Specs (normalized)
// ---------------------------------------------------------------------------

/// Per-branch build directive with every default applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BranchSpec {
    pub auto_build: bool,
    pub upload: bool,
    pub recipe_name: String,
    pub channels: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_path: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub build_channels: BTreeMap<String, String>,
}

impl Default for BranchSpec {
    fn default() -> Self {
        Self {
            auto_build: true,
            upload: true,
            recipe_name: DEFAULT_RECIPE_NAME.to_owned(),
            channels: Vec::new(),
            build_path: None,
            build_channels: BTreeMap::new(),
        }
    }
}

impl BranchSpec {
    /// Build a spec from defaults plus the keys present in `entry`.
    pub fn from_entry(entry: &BranchEntry) -> Self {
        let mut spec = Self::default();
        spec.apply(entry);
        spec
    }

    /// Overwrite every field that `entry` sets; leave the rest untouched.
    pub fn apply(&mut self, entry: &BranchEntry) {
        if let Some(channels) = &entry.channels {
            self.channels = channels.to_vec();
        }
        if let Some(auto_build) = entry.auto_build {
            self.auto_build = auto_build;
        }
        if let Some(upload) = entry.upload {
            self.upload = upload;
        }
        if let Some(recipe_name) = &entry.recipe_name {
            self.recipe_name = recipe_name.clone();
        }
        if let Some(build_path) = &entry.build_path {
            self.build_path = Some(build_path.clone());
        }
        if let Some(build_channels) = &entry.build_channels {
            self.build_channels = build_channels.clone();
        }
    }

    /// The track groups this branch produces one recipe each for.
    ///
    /// `upload` gates grouping: a branch that does not upload, or declares no
    /// channels, yields the single implicit group `("latest", [])`.
    pub fn track_groups(&self) -> Vec<ChannelGroup> {
        if self.upload && !self.channels.is_empty() {
            group_channels(&self.channels)
        } else {
            vec![ChannelGroup {
                track: IMPLICIT_TRACK.to_owned(),
                channels: Vec::new(),
            }]
        }
    }
}

/// One declared build target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectSpec {
    pub name: ProjectName,
    pub team: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charmhub: Option<String>,
    #[serde(rename = "launchpad")]
    pub remote_project: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,
    pub branches: BTreeMap<BranchRef, BranchSpec>,
}

impl ProjectSpec {
    /// Build a spec from a first declaration. `team` and `launchpad` are required.
    pub fn from_entry(entry: &ProjectEntry) -> Result<Self, ConfigError> {
        let missing = |key| ConfigError::MissingKey {
            project: entry.name.clone(),
            key,
        };
        let mut spec = Self {
            name: ProjectName::from(entry.name.clone()),
            team: entry.team.clone().ok_or_else(|| missing("team"))?,
            charmhub: entry.charmhub.clone(),
            remote_project: entry.launchpad.clone().ok_or_else(|| missing("launchpad"))?,
            repository: entry.repository.clone(),
            branches: BTreeMap::new(),
        };
        spec.add_branches(&entry.branches);
        spec.validate()?;
        Ok(spec)
    }

    /// Additive merge of a later declaration of the same project.
    ///
    /// Scalars present in `entry` overwrite; branches are unioned, and a
    /// branch declared in both is updated field by field. Nothing is removed.
    pub fn merge(&mut self, entry: &ProjectEntry) -> Result<(), ConfigError> {
        let mut merged = self.clone();
        if let Some(team) = &entry.team {
            merged.team = team.clone();
        }
        if let Some(charmhub) = &entry.charmhub {
            merged.charmhub = Some(charmhub.clone());
        }
        if let Some(launchpad) = &entry.launchpad {
            merged.remote_project = launchpad.clone();
        }
        if let Some(repository) = &entry.repository {
            merged.repository = Some(repository.clone());
        }
        merged.add_branches(&entry.branches);
        merged.validate()?;
        *self = merged;
        Ok(())
    }

    fn add_branches(&mut self, branches: &[(String, BranchEntry)]) {
        for (name, entry) in branches {
            self.branches
                .entry(BranchRef::from_name(name))
                .or_default()
                .apply(entry);
        }
    }

    /// Every recipe name this project declares, with its source branch and
    /// track, in branch order.
    pub fn recipe_names(&self) -> Vec<(String, &BranchRef, String)> {
        let mut names = Vec::new();
        for (branch, spec) in &self.branches {
            for group in spec.track_groups() {
                let name = format_recipe_name(
                    &spec.recipe_name,
                    &self.remote_project,
                    &branch.recipe_component(),
                    &group.track,
                );
                names.push((name, branch, group.track));
            }
        }
        names
    }

    /// Reject unusable templates and recipe names claimed twice.
    fn validate(&self) -> Result<(), ConfigError> {
        for (branch, spec) in &self.branches {
            validate_template(&spec.recipe_name).map_err(|reason| ConfigError::InvalidTemplate {
                project: self.name.0.clone(),
                branch: branch.short_name().to_owned(),
                template: spec.recipe_name.clone(),
                reason,
            })?;
        }

        let mut seen: HashMap<String, String> = HashMap::new();
        for (recipe, branch, track) in self.recipe_names() {
            let source = format!("{} ({track})", branch.short_name());
            if let Some(first) = seen.get(&recipe) {
                return Err(ConfigError::RecipeNameCollision {
                    project: self.name.0.clone(),
                    recipe,
                    first: first.clone(),
                    second: source,
                });
            }
            seen.insert(recipe, source);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
