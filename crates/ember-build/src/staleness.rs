//! Timestamp-based recompilation checks
//!
//! A compiled object is stale when its source's modification time is greater
//! than *or equal to* the object's.  A same-instant pair recompiles rather
//! than risking a skipped edit inside the filesystem's timestamp granularity.

use crate::error::{BuildError, BuildResult};
use crate::toolchain::OBJECT_EXTENSION;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A source file paired with its derived compiled-output location.
///
/// The output path mirrors the source's directory structure under the output
/// root, with the simple type name plus the object extension; it is
/// deterministic from the source path alone.
#[derive(Debug, Clone)]
pub struct SourceArtifact {
    source: PathBuf,
    simple_name: String,
    output: PathBuf,
}

impl SourceArtifact {
    /// Derives the artifact for a source at proper path `source`.
    pub fn new(source: impl Into<PathBuf>, output_root: &Path) -> BuildResult<Self> {
        let source = source.into();
        if source.is_absolute() {
            return Err(BuildError::config(format!(
                "Absolute source path: {}",
                source.display()
            )));
        }
        let simple_name = simple_type_name(&source)?;
        let output = output_root.join(
            source.with_file_name(format!("{simple_name}.{OBJECT_EXTENSION}")),
        );
        Ok(Self {
            source,
            simple_name,
            output,
        })
    }

    /// Proper path of the source file.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Simple name of the type proper to the source file.
    pub fn simple_name(&self) -> &str {
        &self.simple_name
    }

    /// Expected path of the compiled output.
    pub fn output(&self) -> &Path {
        &self.output
    }
}

/// Gives the simple name of the type proper to a source file, its file name
/// less the extension.
pub fn simple_type_name(source: &Path) -> BuildResult<String> {
    source
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| {
            BuildError::config(format!("Unusable source file name: {}", source.display()))
        })
}

/// The comparison policy: equal timestamps count as stale.
pub fn is_stale_pair(source_time: SystemTime, output_time: SystemTime) -> bool {
    source_time >= output_time
}

/// Whether the source at proper path `source` under `base_dir` needs to be
/// compiled or recompiled into `output_root`.
///
/// A missing output means never built.  Failure to stat a file that exists is
/// an I/O error, never a reason to skip.
pub fn needs_recompile(base_dir: &Path, source: &Path, output_root: &Path) -> BuildResult<bool> {
    let artifact = SourceArtifact::new(source, output_root)?;
    if !artifact.output().exists() {
        return Ok(true);
    }
    let source_time = modified(&base_dir.join(source))?;
    let output_time = modified(artifact.output())?;
    Ok(is_stale_pair(source_time, output_time))
}

fn modified(path: &Path) -> BuildResult<SystemTime> {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .map_err(|error| BuildError::io(path, error))
}
