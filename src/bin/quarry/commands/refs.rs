//! `quarry refs <pattern>` — runs a generation, then lists every target that
//! directly depends on something the given label pattern admits.

use std::path::Path;

use clap::Args as ClapArgs;
use quarry::config::parse_cli_args;
use quarry::core::label_pattern::LabelPattern;
use quarry::ops;
use quarry::util::errors::QuarryResult;
use quarry::util::shell::Shell;
use quarry_platform::SourceDir;

use super::common::{build_dir, default_jobs};

#[derive(ClapArgs)]
pub struct Args {
    /// A label or pattern, e.g. `//base:base`, `//base:*`, `//base/*`.
    pub pattern: String,

    #[arg(long, default_value = "out/Default")]
    pub out_dir: String,

    #[arg(long, default_value = "")]
    pub args: String,
}

pub fn exec(root: &Path, args: Args, shell: &mut Shell) -> QuarryResult<()> {
    let cli_args = parse_cli_args(&args.args);
    let result = ops::gen(root, build_dir(&args.out_dir), &cli_args, default_jobs(), shell)?;

    let pattern = LabelPattern::parse(&SourceDir::root(), Some(&result.default_toolchain), &args.pattern)
        .map_err(|e| anyhow::anyhow!("invalid pattern `{}`: {}", args.pattern, e))?;

    for label in ops::refs::refs(&result.registry, &[pattern]) {
        println!("{}", label.display_name(false));
    }
    Ok(())
}
