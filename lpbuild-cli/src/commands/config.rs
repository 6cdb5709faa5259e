//! `lpbuild config`: the declared config after defaults and merges.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use super::GlobalArgs;
use crate::report;

/// Arguments for `lpbuild config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {}

impl ConfigArgs {
    pub fn run(self, globals: &GlobalArgs) -> Result<ExitCode> {
        let registry = globals.load_registry()?;
        let projects = globals.select(&registry)?;
        let yaml = report::render_config(&projects).context("failed to serialize config")?;
        print!("{yaml}");
        Ok(ExitCode::SUCCESS)
    }
}
