//! `quarry`: parses a tree of declarative build files and resolves them
//! into a per-target, per-toolchain build graph for a downstream executor.
//!
//! Modeled on Chromium's `gn`, reworked around the crates this workspace
//! already leans on elsewhere: `anyhow`/`thiserror` for errors, `indexmap`
//! for the ordered-uniqued collections the data model needs, and a small
//! `termcolor`-backed shell for status/error output.

pub mod config;
pub mod core;
pub mod evaluator;
pub mod loader;
pub mod ops;
pub mod util;

pub use util::errors::{QuarryResult, ResolutionError};
