//! Error plumbing shared across the crate.
//!
//! cargo's own `util::errors` built `CargoResult` on top of the old `failure`
//! crate and a hand-rolled `chain_err`; `anyhow::Context` gives us the same
//! "attach a human sentence on the way up" behavior for free, so `quarry`
//! uses that instead, plus `thiserror` for the handful of error shapes that
//! callers need to match on rather than just print.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub use anyhow::{anyhow, bail, Context as ResultExt, Error};

/// The result type returned from essentially every fallible function in the
/// crate.
pub type QuarryResult<T> = anyhow::Result<T>;

/// A 1-based line/column position within a source file, attached to
/// diagnostics so the shell can print a caret under the offending token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Location {
        Location { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// An error produced while lexing, parsing or evaluating a single build
/// file. Carries the file and location so the top-level error list can print
/// a useful "requested from here" trail without re-deriving it from the
/// `anyhow::Error` chain.
#[derive(Debug, Error)]
#[error("{file}:{location}: {message}")]
pub struct DiagnosticError {
    pub file: PathBuf,
    pub location: Location,
    pub message: String,
    pub help: Option<String>,
}

impl DiagnosticError {
    pub fn new(file: PathBuf, location: Location, message: impl Into<String>) -> DiagnosticError {
        DiagnosticError {
            file,
            location,
            message: message.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> DiagnosticError {
        self.help = Some(help.into());
        self
    }
}

/// Errors surfaced by the dependency resolver once the loader has drained.
#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("{label} was not declared by any build file")]
    MissingItem { label: String, requested_from: String },

    #[error("dependency cycle detected:\n{}", .0.join("\n-> "))]
    Cycle(Vec<String>),

    #[error("duplicate declaration of {label}, first declared at {first_location}")]
    DuplicateLabel { label: String, first_location: String },

    #[error("{dependent} cannot depend on {dependency}: disallowed by its visibility list")]
    VisibilityViolation {
        dependent: String,
        dependency: String,
    },
}

/// An accumulator for errors raised by independent worker threads. The loader
/// drains its queue even after errors appear (in-flight parses finish), then
/// the run aborts and prints everything gathered here — mirrors the "collect,
/// don't fail fast" policy described for the loader's error handling.
#[derive(Debug, Default)]
pub struct ErrorSink {
    errors: std::sync::Mutex<Vec<anyhow::Error>>,
}

impl ErrorSink {
    pub fn new() -> ErrorSink {
        ErrorSink::default()
    }

    pub fn push(&self, err: anyhow::Error) {
        self.errors.lock().unwrap().push(err);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.lock().unwrap().is_empty()
    }

    pub fn into_errors(self) -> Vec<anyhow::Error> {
        self.errors.into_inner().unwrap()
    }

    /// Renders every collected error to a string without consuming `self` —
    /// for reporting from behind a shared `Arc<ErrorSink>`, where
    /// `into_errors` can't be called.
    pub fn snapshot_messages(&self) -> Vec<String> {
        self.errors.lock().unwrap().iter().map(|e| e.to_string()).collect()
    }
}
