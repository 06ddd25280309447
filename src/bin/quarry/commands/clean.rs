//! `quarry clean` — removes the build output directory without running a
//! generation at all.

use std::path::Path;

use clap::Args as ClapArgs;
use quarry::ops;
use quarry::util::errors::QuarryResult;
use quarry::util::shell::Shell;

use super::common::build_dir;

#[derive(ClapArgs)]
pub struct Args {
    #[arg(long, default_value = "out/Default")]
    pub out_dir: String,
}

pub fn exec(root: &Path, args: Args, shell: &mut Shell) -> QuarryResult<()> {
    let dir = build_dir(&args.out_dir);
    let physical = root.join(dir.as_str().trim_start_matches("//"));
    ops::clean::clean(&physical)?;
    shell.status("Cleaned", physical.display())?;
    Ok(())
}
