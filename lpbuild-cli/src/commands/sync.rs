//! `lpbuild sync`: create and update recipes to match the declared config.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use lpbuild_sync::{apply, reconcile, state_store, RepositoryPolicy, SyncError};

use super::{GlobalArgs, EXIT_RECONCILE_FAILED};
use crate::report;

/// Arguments for `lpbuild sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Required: actually make the changes.
    #[arg(long = "i-really-mean-it")]
    pub confirmed: bool,
}

impl SyncArgs {
    pub fn run(self, globals: &GlobalArgs) -> Result<ExitCode> {
        if !self.confirmed {
            return Err(SyncError::NotConfirmed.into());
        }

        let registry = globals.load_registry()?;
        let projects = globals.select(&registry)?;
        let mut gateway = globals.load_gateway()?;

        let mut failed = false;
        for spec in projects.iter().copied() {
            let result = match reconcile(spec, &mut gateway, RepositoryPolicy::ImportMissing) {
                Ok(result) => result,
                Err(e) => {
                    log::error!("{}: {e}", spec.name);
                    println!("{}", report::error_line(&spec.name.0, &e));
                    failed = true;
                    continue;
                }
            };
            for branch in &result.missing_branches_in_repo {
                log::info!(
                    "{}: branch {} is configured but missing from the repository",
                    spec.name,
                    branch.short_name()
                );
            }
            let outcome = apply(&result, &mut gateway, self.confirmed)
                .with_context(|| format!("sync failed for '{}'", spec.name))?;
            println!("{}", report::render_apply(&result, &outcome));
            failed |= !outcome.is_success();
        }

        let mut state = gateway.into_state();
        state_store::save_at(&globals.remote_state, &mut state).with_context(|| {
            format!("failed to save remote state to {}", globals.remote_state.display())
        })?;

        if failed {
            return Ok(ExitCode::from(EXIT_RECONCILE_FAILED));
        }
        Ok(ExitCode::SUCCESS)
    }
}
