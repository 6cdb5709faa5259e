//! Project-group YAML loading.
//!
//! # Layout
//!
//! ```text
//! <config-dir>/
//!   openstack.yaml     (one document per project group)
//!   ceph.yaml
//! ```
//!
//! Each document has an optional `defaults` mapping and a `projects` list.
//! Keys missing from a project entry are copied from `defaults`; `branches`
//! is merged one level deeper so that a project can add to, or override
//! fields of, the default branches.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};

use crate::error::{io_err, ConfigError};
use crate::registry::ProjectRegistry;
use crate::types::{BranchEntry, ProjectEntry};

// ---------------------------------------------------------------------------
// 1. Locating group files
// ---------------------------------------------------------------------------

/// Validate that the config directory exists and return it.
pub fn config_dir_at(path: &Path) -> Result<PathBuf, ConfigError> {
    if !path.is_dir() {
        return Err(ConfigError::ConfigDirNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}

/// The group files to load from `dir`.
///
/// With no `groups`, every `*.yaml` file in `dir`, sorted by file name.
/// Otherwise `<dir>/<group>.yaml` for each group, each of which must exist.
pub fn group_files_at(dir: &Path, groups: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    if !groups.is_empty() {
        let files: Vec<PathBuf> = groups.iter().map(|g| dir.join(format!("{g}.yaml"))).collect();
        if let Some(missing) = files.iter().find(|f| !f.is_file()) {
            return Err(ConfigError::GroupNotFound {
                path: missing.clone(),
            });
        }
        return Ok(files);
    }

    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "yaml"))
        .collect();
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// 2. Loading
// ---------------------------------------------------------------------------

/// Resolve the group files under `config_dir` and load them.
pub fn load_group_dir_at(config_dir: &Path, groups: &[String]) -> Result<ProjectRegistry, ConfigError> {
    let dir = config_dir_at(config_dir)?;
    let files = group_files_at(&dir, groups)?;
    tracing::info!("loading {} group file(s) from {}", files.len(), dir.display());
    load_files(&files)
}

/// Load every file, in order, into a fresh registry.
pub fn load_files(files: &[PathBuf]) -> Result<ProjectRegistry, ConfigError> {
    let mut registry = ProjectRegistry::new();
    for file in files {
        let contents = std::fs::read_to_string(file).map_err(|e| io_err(file, e))?;
        load_str_into(&mut registry, &contents, file)?;
    }
    Ok(registry)
}

#[derive(Debug, Deserialize)]
struct GroupDocument {
    #[serde(default)]
    defaults: Mapping,
    #[serde(default)]
    projects: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectScalars {
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    charmhub: Option<String>,
    #[serde(default)]
    launchpad: Option<String>,
    #[serde(default)]
    repository: Option<String>,
}

/// Parse one group document and register its projects.
///
/// `origin` names the document in errors and logs.
pub fn load_str_into(
    registry: &mut ProjectRegistry,
    contents: &str,
    origin: &Path,
) -> Result<(), ConfigError> {
    let parse_err = |source: serde_yaml::Error| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    };

    let value: Value = serde_yaml::from_str(contents).map_err(parse_err)?;
    if value.is_null() {
        tracing::warn!("{} is empty, skipping", origin.display());
        return Ok(());
    }
    let document: GroupDocument = serde_yaml::from_value(value).map_err(parse_err)?;
    let Some(projects) = document.projects else {
        tracing::warn!("{} has no 'projects' key, skipping", origin.display());
        return Ok(());
    };

    for (index, project) in projects.into_iter().enumerate() {
        let Value::Mapping(mut mapping) = project else {
            return Err(parse_err(custom(format!("project entry #{index} is not a mapping"))));
        };
        apply_defaults(&mut mapping, &document.defaults).map_err(parse_err)?;
        let entry = project_entry(mapping, origin, index)?;
        tracing::debug!("loaded project {} from {}", entry.name, origin.display());
        registry.add(entry, false)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 3. Defaults and conversion
// ---------------------------------------------------------------------------

/// Copy keys from `defaults` that `project` lacks; deep-merge `branches`.
fn apply_defaults(project: &mut Mapping, defaults: &Mapping) -> Result<(), serde_yaml::Error> {
    for (key, default) in defaults {
        if key.as_str() == Some("branches") {
            merge_default_branches(project, default)?;
        } else if !project.contains_key(key) {
            project.insert(key.clone(), default.clone());
        }
    }
    Ok(())
}

fn merge_default_branches(project: &mut Mapping, defaults: &Value) -> Result<(), serde_yaml::Error> {
    let Value::Mapping(default_branches) = defaults else {
        return Err(custom("defaults.branches must be a mapping"));
    };
    let branches = project
        .entry(Value::from("branches"))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if branches.is_null() {
        *branches = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(branches) = branches else {
        return Err(custom("branches must be a mapping"));
    };

    for (name, default_branch) in default_branches {
        match branches.get_mut(name) {
            None => {
                branches.insert(name.clone(), default_branch.clone());
            }
            Some(Value::Mapping(branch)) => {
                if let Value::Mapping(default_fields) = default_branch {
                    for (field, value) in default_fields {
                        if !branch.contains_key(field) {
                            branch.insert(field.clone(), value.clone());
                        }
                    }
                }
            }
            // Not a mapping: left for `project_entry` to reject by name.
            Some(_) => {}
        }
    }
    Ok(())
}

fn project_entry(mapping: Mapping, origin: &Path, index: usize) -> Result<ProjectEntry, ConfigError> {
    let parse_err = |source: serde_yaml::Error| ConfigError::Parse {
        path: origin.to_path_buf(),
        source,
    };

    let Some(name) = mapping.get("name").and_then(Value::as_str).map(str::to_owned) else {
        return Err(ConfigError::MissingName {
            origin: origin.display().to_string(),
            index,
        });
    };

    let branches = match mapping.get("branches") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Mapping(branches)) => {
            let mut out = Vec::with_capacity(branches.len());
            for (key, value) in branches {
                let branch = match key {
                    Value::String(s) => s.clone(),
                    other => serde_yaml::to_string(other).map_err(parse_err)?.trim().to_owned(),
                };
                if !value.is_mapping() {
                    return Err(ConfigError::BranchNotMapping {
                        project: name,
                        branch,
                    });
                }
                let entry: BranchEntry = serde_yaml::from_value(value.clone()).map_err(parse_err)?;
                out.push((branch, entry));
            }
            out
        }
        Some(_) => {
            return Err(parse_err(custom(format!(
                "project '{name}': branches must be a mapping"
            ))))
        }
    };

    let scalars: ProjectScalars = serde_yaml::from_value(Value::Mapping(mapping)).map_err(parse_err)?;
    Ok(ProjectEntry {
        name,
        team: scalars.team,
        charmhub: scalars.charmhub,
        launchpad: scalars.launchpad,
        repository: scalars.repository,
        branches,
    })
}

fn custom(msg: impl std::fmt::Display) -> serde_yaml::Error {
    <serde_yaml::Error as serde::de::Error>::custom(msg)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
