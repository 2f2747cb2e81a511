//! Stage-zero compilation of the build machinery's own sources
//!
//! Before any session exists there is nothing compiled to resolve roles
//! with, so this stage compiles the home project's sources using nothing
//! beyond direct filesystem queries and one subprocess call.  It runs exactly
//! once, at process start, ahead of the first session; its only target is
//! the mandatory `builder` target.

use crate::error::{BuildError, BuildResult};
use crate::project;
use crate::toolchain::{
    Toolchain, ARGUMENT_FILE, COMPILER_NAME, OBJECT_EXTENSION, SOURCE_EXTENSION,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Compiles the home project's stale sources.  The home directory's own
/// child files only; its `builder/` subtree belongs to the ordinary protocol
/// that runs afterwards.
pub fn run(toolchain: &Toolchain, base_dir: &Path, output_root: &Path) -> BuildResult<()> {
    let home = project::home_path();
    let home_dir = base_dir.join(&home);
    let mut sources = Vec::new();

    let entries = fs::read_dir(&home_dir).map_err(|error| BuildError::io(&home_dir, error))?;
    for entry in entries {
        let entry = entry.map_err(|error| BuildError::io(&home_dir, error))?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = home.join(entry.file_name());
        if name.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
            continue;
        }
        if needs_compile(base_dir, &name, output_root)? {
            sources.push(name);
        }
    }
    sources.sort();
    if sources.is_empty() {
        return Ok(());
    }

    println!("{} (bootstrap)", project::HOME_PACKAGE);
    print!("    {COMPILER_NAME} ");
    let _ = std::io::stdout().flush();

    let mut arguments = vec!["-d".to_string(), output_root.display().to_string()];
    if base_dir.join(ARGUMENT_FILE).is_file() {
        arguments.push(format!("@{ARGUMENT_FILE}"));
    }
    arguments.extend(sources.iter().map(|source| source.display().to_string()));

    let run = toolchain.run(base_dir, &arguments)?;
    print!("{}", sources.len());
    if run.captured.is_empty() {
        println!();
    } else {
        println!(" …");
        print!("{}", run.captured);
        let _ = std::io::stdout().flush();
    }
    run.classify()
}

/// Minimal staleness check, local to this stage: the object file is missing,
/// or the source's modification time is greater than or equal to its own.
fn needs_compile(base_dir: &Path, source: &Path, output_root: &Path) -> BuildResult<bool> {
    let stem = source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| {
            BuildError::config(format!("Unusable source file name: {}", source.display()))
        })?;
    let object: PathBuf =
        output_root.join(source.with_file_name(format!("{stem}.{OBJECT_EXTENSION}")));
    if !object.exists() {
        return Ok(true);
    }
    let source_time = fs::metadata(base_dir.join(source))
        .and_then(|metadata| metadata.modified())
        .map_err(|error| BuildError::io(base_dir.join(source), error))?;
    let object_time = fs::metadata(&object)
        .and_then(|metadata| metadata.modified())
        .map_err(|error| BuildError::io(&object, error))?;
    Ok(source_time >= object_time)
}
