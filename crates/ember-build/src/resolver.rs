//! Override resolution for the pluggable build roles
//!
//! Each role's implementation source is the project's override file when one
//! exists, else the system default in the home project.  Whichever is stale
//! gets compiled; the default is compiled even under an override, which may
//! delegate to it.  Instantiation goes through the [`RoleRegistry`]: the
//! override file's presence selects the registered factory, its absence the
//! built-in default.
//!
//! The override file names are distinct from the default implementations'
//! file names, so the home project's own tooling never shadows the sources it
//! is built from.

use crate::compiler::Compiler;
use crate::error::{BuildError, BuildResult};
use crate::project::{self, Project, RESERVED_SEGMENT};
use crate::registry::{
    Builder, BuilderBuilder, DefaultBuilder, DefaultBuilderBuilder, Role, RoleContext,
    RoleRegistry,
};
use crate::staleness;
use std::path::{Path, PathBuf};

/// Primary file name of a project's target enumeration, inside its internal
/// build code.
pub const TARGET_FILE: &str = "build_target.ember";

/// Fallback file name of the target enumeration.
pub const TARGET_FILE_FALLBACK: &str = "target.ember";

impl Role {
    /// File name of a project-supplied override for this role.
    pub fn override_file_name(&self) -> &'static str {
        match self {
            Self::Builder => "builder.ember",
            Self::BuilderBuilder => "builder_builder.ember",
        }
    }

    /// File name of the system default implementation for this role.
    pub fn default_file_name(&self) -> &'static str {
        match self {
            Self::Builder => "builder_default.ember",
            Self::BuilderBuilder => "builder_builder_default.ember",
        }
    }
}

/// Gives the proper path of the directory holding a project's internal build
/// code: `<path>/builder/` when that directory exists, else `<path>/` itself.
pub fn internal_build_code(base_dir: &Path, project_path: &Path) -> PathBuf {
    let dedicated = project_path.join(RESERVED_SEGMENT);
    if base_dir.join(&dedicated).is_dir() {
        dedicated
    } else {
        project_path.to_path_buf()
    }
}

/// Gives the proper path of the file defining a project's build targets:
/// `build_target.ember` when present, else `target.ember`.
pub fn target_file(base_dir: &Path, project_path: &Path) -> PathBuf {
    let directory = internal_build_code(base_dir, project_path);
    let primary = directory.join(TARGET_FILE);
    if base_dir.join(&primary).is_file() {
        primary
    } else {
        directory.join(TARGET_FILE_FALLBACK)
    }
}

/// Proper path of the system default implementation source for `role`.
pub fn default_implementation_file(role: Role) -> PathBuf {
    project::home_path().join(role.default_file_name())
}

/// Gives the proper path of a project's implementation source for `role`:
/// the override inside the internal build code when present, else the
/// default.
pub fn implementation_file(base_dir: &Path, project_path: &Path, role: Role) -> PathBuf {
    let candidate = internal_build_code(base_dir, project_path).join(role.override_file_name());
    if base_dir.join(&candidate).is_file() {
        candidate
    } else {
        default_implementation_file(role)
    }
}

/// Resolves role implementations against a registry.
pub struct RoleResolver<'r> {
    registry: &'r RoleRegistry,
}

impl<'r> RoleResolver<'r> {
    pub fn new(registry: &'r RoleRegistry) -> Self {
        Self { registry }
    }

    /// Gives a builder builder for `project`, first compiling its role
    /// sources where stale.
    pub fn resolve_builder_builder(
        &self,
        project: &Project,
        compiler: &mut Compiler,
    ) -> BuildResult<Box<dyn BuilderBuilder>> {
        let override_file = self.compile_role(project, Role::BuilderBuilder, compiler)?;
        let context = self.context_of(project);
        match override_file {
            Some(file) => {
                let factory = self
                    .registry
                    .builder_builder_override(project.package())
                    .ok_or_else(|| BuildError::UnregisteredOverride {
                        package: project.package().to_string(),
                        role: "builder builder",
                        file,
                    })?;
                Ok(factory.construct(&context))
            }
            None => Ok(Box::new(DefaultBuilderBuilder::from_context(&context))),
        }
    }

    /// Gives a builder for `project`, first compiling its role sources where
    /// stale.
    pub fn resolve_builder(
        &self,
        project: &Project,
        compiler: &mut Compiler,
    ) -> BuildResult<Box<dyn Builder>> {
        let override_file = self.compile_role(project, Role::Builder, compiler)?;
        let context = self.context_of(project);
        match override_file {
            Some(file) => {
                let factory = self
                    .registry
                    .builder_override(project.package())
                    .ok_or_else(|| BuildError::UnregisteredOverride {
                        package: project.package().to_string(),
                        role: "builder",
                        file,
                    })?;
                Ok(factory.construct(&context))
            }
            None => Ok(Box::new(DefaultBuilder::new(&context))),
        }
    }

    fn context_of(&self, project: &Project) -> RoleContext {
        RoleContext {
            package: project.package().to_string(),
            path: project.path().to_path_buf(),
            targets: self.registry.targets(project.package()),
        }
    }

    /// Compiles the stale members of the role's implementation set in one
    /// batch.  Returns the override file's proper path when one is present.
    fn compile_role(
        &self,
        project: &Project,
        role: Role,
        compiler: &mut Compiler,
    ) -> BuildResult<Option<PathBuf>> {
        let default_file = default_implementation_file(role);
        if !compiler.base_dir().join(&default_file).is_file() {
            return Err(BuildError::config(format!(
                "Missing default {role} source: {}",
                default_file.display()
            )));
        }

        let candidate =
            internal_build_code(compiler.base_dir(), project.path()).join(role.override_file_name());
        let override_file = compiler
            .base_dir()
            .join(&candidate)
            .is_file()
            .then_some(candidate);

        // The default belongs in the compile set regardless: an override may
        // depend on it.
        let mut sources = Vec::new();
        for file in override_file.iter().chain([&default_file]) {
            if staleness::needs_recompile(compiler.base_dir(), file, compiler.output_root())? {
                sources.push(file.clone());
            }
        }
        compiler.compile(None, &sources)?;
        Ok(override_file)
    }
}
