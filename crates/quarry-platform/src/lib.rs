//! Interning, path and label primitives shared by the rest of Quarry.
//!
//! Kept as a satellite crate, in the same spirit as cargo's own
//! `cargo-platform`: small, dependency-light types that both the core graph
//! engine and any downstream tooling want without pulling in the whole
//! build.

mod atom;
mod label;
mod path;

pub use atom::Atom;
pub use label::{Label, LabelParseError};
pub use path::{normalize, resolve_relative, SourceDir, SourceFile};
