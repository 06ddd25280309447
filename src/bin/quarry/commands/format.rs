//! `quarry format <file>` — stub, explicitly out of scope (spec.md §9
//! "Open question — the formatter").

use std::path::PathBuf;

use clap::Args as ClapArgs;
use quarry::ops;
use quarry::util::errors::QuarryResult;

#[derive(ClapArgs)]
pub struct Args {
    pub file: PathBuf,
}

pub fn exec(args: Args) -> QuarryResult<()> {
    ops::format::format(&args.file)
}
