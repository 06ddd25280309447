//! `quarry check` — runs a generation, then validates visibility and
//! `testonly` rules across the whole resolved graph.

use std::path::Path;

use clap::Args as ClapArgs;
use quarry::config::parse_cli_args;
use quarry::ops;
use quarry::util::errors::QuarryResult;
use quarry::util::shell::Shell;

use super::common::{build_dir, default_jobs};

#[derive(ClapArgs)]
pub struct Args {
    #[arg(long, default_value = "out/Default")]
    pub out_dir: String,

    #[arg(long, default_value = "")]
    pub args: String,
}

pub fn exec(root: &Path, args: Args, shell: &mut Shell) -> QuarryResult<()> {
    let cli_args = parse_cli_args(&args.args);
    let result = ops::gen(root, build_dir(&args.out_dir), &cli_args, default_jobs(), shell)?;
    ops::check::check(&result.registry)?;
    shell.status("Checked", format!("{} targets, no violations", result.registry.len()))?;
    Ok(())
}
