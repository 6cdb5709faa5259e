//! `lpbuild diff`: what `sync` would change, without changing it.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;

use super::{for_each_read_only, print_error_line, GlobalArgs};
use crate::report::{self, DiffJson};

/// Arguments for `lpbuild diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Itemize orphans, creates, updates and missing branches.
    #[arg(long)]
    pub detail: bool,

    /// Emit machine-readable JSON.
    #[arg(long, conflicts_with = "detail")]
    pub json: bool,
}

impl DiffArgs {
    pub fn run(self, globals: &GlobalArgs) -> Result<ExitCode> {
        if !self.json {
            let detail = self.detail;
            return for_each_read_only(
                globals,
                |result| println!("{}", report::render_diff(result, detail)),
                print_error_line,
            );
        }

        let mut entries = Vec::new();
        let mut errors = Vec::new();
        let code = for_each_read_only(
            globals,
            |result| entries.push(DiffJson::from_result(result)),
            |spec, e| errors.push(DiffJson::from_error(&spec.name.0, &format!("{e:#}"))),
        )?;
        entries.extend(errors);
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("failed to serialize diff JSON")?
        );
        Ok(code)
    }
}
