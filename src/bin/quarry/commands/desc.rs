//! `quarry desc <label>` — runs a generation, then prints one target's
//! resolved view as JSON.

use std::path::Path;

use clap::Args as ClapArgs;
use quarry::config::parse_cli_args;
use quarry::ops;
use quarry::util::errors::QuarryResult;
use quarry::util::shell::Shell;
use quarry_platform::{Label, SourceDir};

use super::common::{build_dir, default_jobs};

#[derive(ClapArgs)]
pub struct Args {
    /// The target to describe, e.g. `//chrome/renderer:renderer`.
    pub label: String,

    #[arg(long, default_value = "out/Default")]
    pub out_dir: String,

    #[arg(long, default_value = "")]
    pub args: String,
}

pub fn exec(root: &Path, args: Args, shell: &mut Shell) -> QuarryResult<()> {
    let cli_args = parse_cli_args(&args.args);
    let result = ops::gen(root, build_dir(&args.out_dir), &cli_args, default_jobs(), shell)?;

    let label = Label::parse(&SourceDir::root(), Some(&result.default_toolchain), &args.label)
        .map_err(|e| anyhow::anyhow!("invalid label `{}`: {}", args.label, e))?;

    println!("{}", ops::desc::run(&result.registry, &label)?);
    Ok(())
}
