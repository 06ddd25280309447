//! One module per verb, mirroring the teacher's `src/bin/cargo/commands/`
//! split — each file owns its `clap::Args` struct and its `exec` function.

pub mod check;
pub mod clean;
pub mod common;
pub mod desc;
pub mod format;
pub mod gen;
pub mod refs;
