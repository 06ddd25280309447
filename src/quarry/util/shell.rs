//! Status and error output.
//!
//! Structurally this follows cargo's own `core::shell`: a `Shell` wraps the
//! process's stdout/stderr behind a `Verbosity` and color policy so the rest
//! of the crate never touches `println!` directly. The actual terminal
//! handling is `termcolor` rather than the `term` crate the sampled teacher
//! source used, since that's what this workspace's `Cargo.toml` already
//! depends on.

use std::fmt;
use std::io::Write;

use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::util::errors::QuarryResult;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verbosity {
    Verbose,
    Normal,
    Quiet,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ColorConfig {
    Auto,
    Always,
    Never,
}

impl From<ColorConfig> for ColorChoice {
    fn from(c: ColorConfig) -> ColorChoice {
        match c {
            ColorConfig::Auto => ColorChoice::Auto,
            ColorConfig::Always => ColorChoice::Always,
            ColorConfig::Never => ColorChoice::Never,
        }
    }
}

/// The process's combined stdout/stderr, gated by verbosity and color.
pub struct Shell {
    out: StandardStream,
    err: StandardStream,
    verbosity: Verbosity,
}

impl Shell {
    pub fn new(color: ColorConfig, verbosity: Verbosity) -> Shell {
        Shell {
            out: StandardStream::stdout(color.into()),
            err: StandardStream::stderr(color.into()),
            verbosity,
        }
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn set_verbosity(&mut self, verbosity: Verbosity) {
        self.verbosity = verbosity;
    }

    /// A one-line `action: message`, colored green/bold on the action, used
    /// for progress like `Loading //chrome/renderer:renderer`.
    pub fn status(&mut self, action: impl fmt::Display, message: impl fmt::Display) -> QuarryResult<()> {
        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        self.print(action, Some(message), Color::Green, true)
    }

    pub fn verbose(&mut self, action: impl fmt::Display, message: impl fmt::Display) -> QuarryResult<()> {
        if self.verbosity != Verbosity::Verbose {
            return Ok(());
        }
        self.print(action, Some(message), Color::Cyan, true)
    }

    pub fn warn(&mut self, message: impl fmt::Display) -> QuarryResult<()> {
        if self.verbosity == Verbosity::Quiet {
            return Ok(());
        }
        self.print("warning", Some(message), Color::Yellow, false)
    }

    pub fn error(&mut self, message: impl fmt::Display) -> QuarryResult<()> {
        self.err.reset()?;
        self.err.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        write!(self.err, "error")?;
        self.err.reset()?;
        writeln!(self.err, ": {}", message)?;
        Ok(())
    }

    fn print(
        &mut self,
        action: impl fmt::Display,
        message: Option<impl fmt::Display>,
        color: Color,
        justified: bool,
    ) -> QuarryResult<()> {
        self.out.reset()?;
        self.out
            .set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
        if justified {
            write!(self.out, "{:>12}", action.to_string())?;
        } else {
            write!(self.out, "{}", action)?;
        }
        self.out.reset()?;
        match message {
            Some(message) => writeln!(self.out, " {}", message)?,
            None => writeln!(self.out)?,
        }
        Ok(())
    }
}

impl Default for Shell {
    fn default() -> Shell {
        Shell::new(ColorConfig::Auto, Verbosity::Normal)
    }
}
