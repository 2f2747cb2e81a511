//! Toolchain discovery and the compiler subprocess contract
//!
//! The `emberc` compiler ships in the same installation as the build tool; it
//! is located beside the running executable and is not configurable beyond
//! that.  Every invocation blocks until the compiler exits, with standard
//! error merged into the captured output.

use crate::error::{BuildError, BuildResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Extension of Ember source files.
pub const SOURCE_EXTENSION: &str = "ember";

/// Extension of compiled object files.
pub const OBJECT_EXTENSION: &str = "emo";

/// File name of the compiler executable.
pub const COMPILER_NAME: &str = "emberc";

/// Proper path of the fixed compiler argument file, one literal flag per
/// line, passed on every invocation when present.
pub const ARGUMENT_FILE: &str = "build/ember/emberc_arguments";

/// Root of the compiled-output cache shared by every run on this machine.
pub fn default_output_root() -> PathBuf {
    std::env::temp_dir().join("ember-build")
}

/// Captured result of one compiler run, before exit-status classification.
#[derive(Debug)]
pub struct CompilerRun {
    /// The full command line, for diagnostics.
    pub command_line: String,
    /// Standard output with standard error appended.
    pub captured: String,
    /// Raw exit status.
    pub status: i32,
}

impl CompilerRun {
    /// Classifies the exit status.  Zero is success; one is a failure the
    /// compiler has already described to the user; anything else aborts with
    /// the command line attached.
    pub fn classify(self) -> BuildResult<()> {
        match self.status {
            0 => Ok(()),
            1 => Err(BuildError::user(format!(
                "Stopped on `{COMPILER_NAME}` error"
            ))),
            status => Err(BuildError::Subprocess {
                status,
                command_line: self.command_line,
            }),
        }
    }
}

/// The installed Ember compiler.
#[derive(Debug, Clone)]
pub struct Toolchain {
    compiler: PathBuf,
}

impl Toolchain {
    /// Locates the compiler installed beside the running executable.
    pub fn locate() -> BuildResult<Self> {
        let executable = std::env::current_exe().map_err(|error| {
            BuildError::config(format!("Cannot locate the running executable: {error}"))
        })?;
        let bin = executable.parent().ok_or_else(|| {
            BuildError::config(format!(
                "Executable has no parent directory: {}",
                executable.display()
            ))
        })?;
        let compiler = bin.join(COMPILER_NAME);
        if !compiler.is_file() {
            return Err(BuildError::config(format!(
                "No `{COMPILER_NAME}` in the installation at {}",
                bin.display()
            )));
        }
        Ok(Self { compiler })
    }

    /// A toolchain with an explicit compiler path, for embedders and tests.
    pub fn with_compiler(compiler: impl Into<PathBuf>) -> Self {
        Self {
            compiler: compiler.into(),
        }
    }

    pub fn compiler(&self) -> &Path {
        &self.compiler
    }

    /// Runs the compiler once over `arguments` with `base_dir` as the working
    /// directory.  Failure to start or reap the process is an I/O error; the
    /// exit status is left to [`CompilerRun::classify`].
    pub fn run(&self, base_dir: &Path, arguments: &[String]) -> BuildResult<CompilerRun> {
        let output = Command::new(&self.compiler)
            .args(arguments)
            .current_dir(base_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|error| BuildError::io(&self.compiler, error))?;

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(CompilerRun {
            command_line: format!("{} {}", self.compiler.display(), arguments.join(" ")),
            captured,
            status: output.status.code().unwrap_or(-1),
        })
    }
}
