use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ember_build::{bootstrap, toolchain, BuildError, BuildSession, Compiler, Project, RoleRegistry, Toolchain};
use std::path::PathBuf;
use std::process::ExitCode;

/// Ember build tool.
///
/// Builds a project to the level of a named target, first compiling the
/// project's own build tooling and, transitively, the tooling it depends on.
/// Only stale sources are recompiled.
///
/// EXAMPLES:
///     ember build wet/sprocket builder     Build a project's tooling
///     ember build wet.sprocket object-f    Targets may be abbreviated
#[derive(Parser)]
#[command(name = "ember")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a project to the level of a target
    ///
    /// The project may be named by its proper package (`wet.sprocket`) or
    /// proper path (`wet/sprocket`).  The target may be abbreviated to any
    /// substring that matches exactly one of the project's targets.
    Build {
        /// The project, as a proper package or proper path
        project: String,
        /// The target name, or a unique substring of it
        target: String,
        /// Base directory of the source tree (defaults to the working
        /// directory)
        #[arg(long)]
        base_dir: Option<PathBuf>,
        /// Compiled-output directory (defaults to a root under the system
        /// temporary directory)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Build {
            project,
            target,
            base_dir,
            out_dir,
        } => run_build(&project, &target, base_dir, out_dir),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if error
                .downcast_ref::<BuildError>()
                .is_some_and(BuildError::is_user_error)
            {
                eprintln!("ember: {error}");
                ExitCode::from(1)
            } else {
                eprintln!("ember: unexpected failure");
                eprintln!("{error:?}");
                ExitCode::from(2)
            }
        }
    }
}

fn run_build(
    project: &str,
    target: &str,
    base_dir: Option<PathBuf>,
    out_dir: Option<PathBuf>,
) -> Result<()> {
    let project = parse_project(project)?;
    let base_dir = match base_dir {
        Some(directory) => directory,
        None => std::env::current_dir().context("Cannot determine the working directory")?,
    };
    let out_dir = out_dir.unwrap_or_else(toolchain::default_output_root);

    let toolchain = Toolchain::locate()?;
    bootstrap::run(&toolchain, &base_dir, &out_dir)?;

    let registry = RoleRegistry::new();
    let mut session = BuildSession::new(&registry, Compiler::new(toolchain, base_dir, out_dir));
    session.build(&project, target)?;
    Ok(())
}

/// A path separator selects the proper-path form; otherwise the argument is
/// read as a proper package.
fn parse_project(name: &str) -> Result<Project, BuildError> {
    if name.contains('/') || name.contains(std::path::MAIN_SEPARATOR) {
        Project::from_path(name)
    } else {
        Project::from_package(name)
    }
}
