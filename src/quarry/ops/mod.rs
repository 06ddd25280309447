//! Verb implementations, one module per CLI command — mirrors the teacher's
//! own `ops::cargo_compile`/`ops::cargo_doc`/... layout of "one function (or
//! small cluster) per verb, `src/bin/<name>/commands/*.rs` just calls into
//! it". `gen` is the only verb that runs the loader; every other verb reads
//! the registry `gen` already built.

pub mod check;
pub mod clean;
pub mod desc;
pub mod format;
pub mod gen;
pub mod refs;

pub use gen::{gen, GenResult};
