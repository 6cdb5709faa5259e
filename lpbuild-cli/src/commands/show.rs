//! `lpbuild show`: remote recipes for the declared branches.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use super::{for_each_read_only, print_error_line, GlobalArgs};
use crate::report;

/// Arguments for `lpbuild show`.
#[derive(Args, Debug)]
pub struct ShowArgs {}

impl ShowArgs {
    pub fn run(self, globals: &GlobalArgs) -> Result<ExitCode> {
        for_each_read_only(
            globals,
            |result| println!("{}", report::render_show(result)),
            print_error_line,
        )
    }
}
