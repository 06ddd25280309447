//! `quarry gen` — runs one load + resolve pass and reports how many
//! declarations it resolved.

use std::path::Path;

use clap::Args as ClapArgs;
use quarry::config::parse_cli_args;
use quarry::ops;
use quarry::util::errors::QuarryResult;
use quarry::util::shell::Shell;

use super::common::{build_dir, default_jobs};

#[derive(ClapArgs)]
pub struct Args {
    /// Build output directory, relative to the source root.
    #[arg(default_value = "out/Default")]
    pub out_dir: String,

    /// Worker threads; defaults to the number of available cores.
    #[arg(short = 'j', long)]
    pub jobs: Option<usize>,

    /// `key=value,key=value` build-arg overrides.
    #[arg(long, default_value = "")]
    pub args: String,
}

pub fn exec(root: &Path, args: Args, shell: &mut Shell) -> QuarryResult<()> {
    let cli_args = parse_cli_args(&args.args);
    let jobs = args.jobs.unwrap_or_else(default_jobs);
    ops::gen(root, build_dir(&args.out_dir), &cli_args, jobs, shell)?;
    Ok(())
}
