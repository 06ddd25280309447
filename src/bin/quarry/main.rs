//! The `quarry` CLI binary: parses arguments and dispatches to the `ops`
//! module, one verb per arm. Follows the teacher's own split of a thin
//! `main.rs` plus one file per verb under `commands/`, modernized onto
//! `clap`'s derive API (the version this workspace already depends on)
//! rather than the older `App`-builder style a sampled teacher commit used.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use quarry::util::shell::{ColorConfig, Shell, Verbosity};

#[derive(Parser)]
#[command(name = "quarry", about = "A meta-build generator", version)]
struct Cli {
    /// The project's source root; must contain a `.quarry` dotfile.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = CliColor::Auto)]
    color: CliColor,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::ValueEnum, Clone, Copy, Default)]
enum CliColor {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<CliColor> for ColorConfig {
    fn from(c: CliColor) -> ColorConfig {
        match c {
            CliColor::Auto => ColorConfig::Auto,
            CliColor::Always => ColorConfig::Always,
            CliColor::Never => ColorConfig::Never,
        }
    }
}

#[derive(clap::Subcommand)]
enum Command {
    Gen(commands::gen::Args),
    Desc(commands::desc::Args),
    Check(commands::check::Args),
    Refs(commands::refs::Args),
    Format(commands::format::Args),
    Clean(commands::clean::Args),
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else if cli.verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    let mut shell = Shell::new(cli.color.into(), verbosity);

    let result = match cli.command {
        Command::Gen(args) => commands::gen::exec(&cli.root, args, &mut shell),
        Command::Desc(args) => commands::desc::exec(&cli.root, args, &mut shell),
        Command::Check(args) => commands::check::exec(&cli.root, args, &mut shell),
        Command::Refs(args) => commands::refs::exec(&cli.root, args, &mut shell),
        Command::Format(args) => commands::format::exec(args),
        Command::Clean(args) => commands::clean::exec(&cli.root, args, &mut shell),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = shell.error(e);
            ExitCode::FAILURE
        }
    }
}
