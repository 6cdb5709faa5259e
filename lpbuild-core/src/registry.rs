//! In-memory project registry.
//!
//! One `ProjectRegistry` is built per run by the loader and then borrowed by
//! every component that needs declared config. It keeps registration order.

use crate::error::ConfigError;
use crate::types::{ProjectEntry, ProjectSpec};

/// The set of declared projects, keyed by display name.
#[derive(Debug, Clone, Default)]
pub struct ProjectRegistry {
    projects: Vec<ProjectSpec>,
}

impl ProjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a project declaration.
    ///
    /// A name seen for the first time becomes a new [`ProjectSpec`]. A name
    /// already present fails with [`ConfigError::DuplicateProject`] unless
    /// `merge` is set, in which case the declaration is merged additively.
    pub fn add(&mut self, entry: ProjectEntry, merge: bool) -> Result<(), ConfigError> {
        match self.projects.iter_mut().find(|p| p.name.0 == entry.name) {
            Some(existing) if merge => {
                tracing::debug!("merging declaration into project {}", entry.name);
                existing.merge(&entry)
            }
            Some(_) => Err(ConfigError::DuplicateProject { name: entry.name }),
            None => {
                let spec = ProjectSpec::from_entry(&entry)?;
                tracing::debug!("registered project {}", spec.name);
                self.projects.push(spec);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&ProjectSpec> {
        self.projects.iter().find(|p| p.name.0 == name)
    }

    /// Projects in registration order, restricted to `select` when it is
    /// non-empty.
    pub fn projects(&self, select: &[String]) -> Vec<&ProjectSpec> {
        self.projects
            .iter()
            .filter(|p| select.is_empty() || select.iter().any(|s| *s == p.name.0))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}
