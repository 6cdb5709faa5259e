//! `lpbuild list`: table of the declared projects.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::GlobalArgs;
use crate::report;

/// Arguments for `lpbuild list`.
#[derive(Args, Debug)]
pub struct ListArgs {}

impl ListArgs {
    pub fn run(self, globals: &GlobalArgs) -> Result<ExitCode> {
        let registry = globals.load_registry()?;
        let projects = globals.select(&registry)?;
        println!("{}", report::render_list(&projects));
        Ok(ExitCode::SUCCESS)
    }
}
