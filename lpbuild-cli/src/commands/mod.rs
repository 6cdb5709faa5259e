//! Subcommand implementations.
//!
//! Each command loads the declared config itself through [`GlobalArgs`];
//! the remote ones also load the remote state snapshot.

pub mod config;
pub mod diff;
pub mod list;
pub mod show;
pub mod sync;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};

use lpbuild_core::{loader, ProjectRegistry, ProjectSpec};
use lpbuild_sync::{
    reconcile, state_store, InMemoryGateway, ReconciliationResult, RepositoryPolicy,
};

use crate::report;

/// Exit code for a failed reconciliation or a partially applied sync.
pub const EXIT_RECONCILE_FAILED: u8 = 2;

/// Options shared by every subcommand.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub config_dir: PathBuf,
    pub groups: Vec<String>,
    pub charms: Vec<String>,
    pub remote_state: PathBuf,
}

impl GlobalArgs {
    pub fn load_registry(&self) -> Result<ProjectRegistry> {
        loader::load_group_dir_at(&self.config_dir, &self.groups)
            .with_context(|| format!("failed to load config from {}", self.config_dir.display()))
    }

    /// The selected projects; an unknown `--charm` name is an error.
    pub fn select<'a>(&self, registry: &'a ProjectRegistry) -> Result<Vec<&'a ProjectSpec>> {
        if let Some(unknown) = self.charms.iter().find(|c| registry.get(c).is_none()) {
            anyhow::bail!("no project named '{unknown}' in {}", self.config_dir.display());
        }
        Ok(registry.projects(&self.charms))
    }

    pub fn load_gateway(&self) -> Result<InMemoryGateway> {
        let state = state_store::load_at(&self.remote_state).with_context(|| {
            format!("failed to load remote state from {}", self.remote_state.display())
        })?;
        Ok(InMemoryGateway::new(state))
    }
}

/// Reconcile each project read-only, rendering results with `render`.
///
/// A project that fails is reported with an error line and the run carries
/// on; with a single selected project the failure sets exit code 2.
pub(crate) fn for_each_read_only(
    globals: &GlobalArgs,
    mut render: impl FnMut(&ReconciliationResult),
    mut on_error: impl FnMut(&ProjectSpec, &anyhow::Error),
) -> Result<ExitCode> {
    let registry = globals.load_registry()?;
    let projects = globals.select(&registry)?;
    let mut gateway = globals.load_gateway()?;

    let mut failed = false;
    for spec in projects.iter().copied() {
        match reconcile(spec, &mut gateway, RepositoryPolicy::ReadOnly) {
            Ok(result) => render(&result),
            Err(e) => {
                let e = anyhow::Error::new(e);
                log::warn!("{}: {e}", spec.name);
                on_error(spec, &e);
                failed = true;
            }
        }
    }

    if failed && projects.len() == 1 {
        return Ok(ExitCode::from(EXIT_RECONCILE_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

pub(crate) fn print_error_line(spec: &ProjectSpec, error: &anyhow::Error) {
    println!("{}", report::error_line(&spec.name.0, error));
}
