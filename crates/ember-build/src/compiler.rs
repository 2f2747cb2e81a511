//! Batched compilation over stale sources
//!
//! The `Compiler` is the capability handed to role implementations: it
//! assembles the stale subset of a directory's sources and compiles a batch
//! in one subprocess invocation, printing line-oriented progress as it goes.

use crate::error::{BuildError, BuildResult};
use crate::project::HOME_PACKAGE;
use crate::staleness;
use crate::toolchain::{Toolchain, ARGUMENT_FILE, COMPILER_NAME, SOURCE_EXTENSION};
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub struct Compiler {
    toolchain: Toolchain,
    base_dir: PathBuf,
    output_root: PathBuf,
    /// Owner named by the last progress header, once any was printed.
    showing: Option<Option<String>>,
}

impl Compiler {
    pub fn new(
        toolchain: Toolchain,
        base_dir: impl Into<PathBuf>,
        output_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            toolchain,
            base_dir: base_dir.into(),
            output_root: output_root.into(),
            showing: None,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Appends to `names` the proper path of each source file of `directory`
    /// that needs to be compiled or recompiled.  Does not descend into
    /// subdirectories.
    pub fn add_compilable_sources(
        &self,
        names: &mut Vec<PathBuf>,
        directory: &Path,
    ) -> BuildResult<()> {
        self.add_compilable_sources_matching(names, directory, |_| true)
    }

    /// As [`add_compilable_sources`](Self::add_compilable_sources), keeping
    /// only files whose paths test true with `keep`.
    pub fn add_compilable_sources_matching(
        &self,
        names: &mut Vec<PathBuf>,
        directory: &Path,
        keep: impl Fn(&Path) -> bool,
    ) -> BuildResult<()> {
        for entry in WalkDir::new(self.base_dir.join(directory))
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry =
                entry.map_err(|error| BuildError::config(format!("Unreadable directory: {error}")))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = directory.join(entry.file_name());
            if name.extension().and_then(|ext| ext.to_str()) != Some(SOURCE_EXTENSION) {
                continue;
            }
            if !keep(&name) {
                continue;
            }
            if staleness::needs_recompile(&self.base_dir, &name, &self.output_root)? {
                names.push(name);
            }
        }
        Ok(())
    }

    /// Compiles `sources` to object files in one subprocess invocation.
    /// An empty batch performs no invocation.
    ///
    /// `owner` is the proper package of the project whose code is compiled,
    /// or `None` for the build machinery itself.
    pub fn compile(&mut self, owner: Option<&str>, sources: &[PathBuf]) -> BuildResult<()> {
        self.compile_with(owner, &[], sources)
    }

    /// As [`compile`](Self::compile), inserting `additional_arguments` before
    /// the source names.
    pub fn compile_with(
        &mut self,
        owner: Option<&str>,
        additional_arguments: &[String],
        sources: &[PathBuf],
    ) -> BuildResult<()> {
        if sources.is_empty() {
            return Ok(());
        }
        self.print_progress_leader(owner);

        let mut arguments = vec!["-d".to_string(), self.output_root.display().to_string()];
        if self.base_dir.join(ARGUMENT_FILE).is_file() {
            arguments.push(format!("@{ARGUMENT_FILE}"));
        }
        arguments.extend(additional_arguments.iter().cloned());
        arguments.extend(sources.iter().map(|source| source.display().to_string()));

        let run = self.toolchain.run(&self.base_dir, &arguments)?;
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

    /// Prints the beginning of a progress message, naming the owning project
    /// once per change of owner.
    fn print_progress_leader(&mut self, owner: Option<&str>) {
        if self.showing.as_ref().map(|shown| shown.as_deref()) != Some(owner) {
            self.showing = Some(owner.map(str::to_owned));
            match owner {
                Some(package) => println!("{package}"),
                None => println!("{HOME_PACKAGE} (bootstrap)"),
            }
        }
        print!("    {COMPILER_NAME} ");
        let _ = std::io::stdout().flush();
    }
}
