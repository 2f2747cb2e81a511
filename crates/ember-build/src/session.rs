//! Build sessions: dependency ordering and duplicate suppression
//!
//! A session owns the set of projects committed to a build in the current
//! run.  The set only grows; membership is the sole cycle and duplicate
//! detection mechanism.  Execution is synchronous throughout: every external
//! dependency's tooling is built, transitively, before the owning project's
//! own build code compiles.

use crate::compiler::Compiler;
use crate::error::{BuildError, BuildResult};
use crate::project::Project;
use crate::registry::RoleRegistry;
use crate::resolver::RoleResolver;
use std::collections::HashSet;

pub struct BuildSession<'r> {
    registry: &'r RoleRegistry,
    compiler: Compiler,
    under_build: HashSet<String>,
}

impl<'r> BuildSession<'r> {
    pub fn new(registry: &'r RoleRegistry, compiler: Compiler) -> Self {
        Self {
            registry,
            compiler,
            under_build: HashSet::new(),
        }
    }

    /// Builds `project` to the level of the target matching `query`.
    ///
    /// The project's build tooling (and, transitively, its external
    /// dependencies') is built first; then the resolved builder executes the
    /// matched target.
    pub fn build(&mut self, project: &Project, query: &str) -> BuildResult<()> {
        self.build_tooling(project)?;
        let resolver = RoleResolver::new(self.registry);
        let builder = resolver.resolve_builder(project, &mut self.compiler)?;
        let targets = self.registry.targets(project.package());
        let target = targets.find_matching(query)?.to_string();
        builder.build(&target, &mut self.compiler)
    }

    /// Compiles the build tooling of `project`, its external dependencies
    /// first.
    ///
    /// Re-entry for a project already under build in this session is a fatal
    /// caller error; externals already under build are skipped, which is what
    /// keeps overlapping dependency chains from compiling anything twice.
    pub fn build_tooling(&mut self, project: &Project) -> BuildResult<()> {
        let package = project.package();
        if !self.under_build.insert(package.to_string()) {
            return Err(BuildError::Reentry {
                package: package.to_string(),
            });
        }

        let resolver = RoleResolver::new(self.registry);
        let builder_builder = resolver.resolve_builder_builder(project, &mut self.compiler)?;

        // Iteration order among externals is insignificant; each is built
        // before the owning project's own code either way.
        for external in builder_builder.external_build_code() {
            if external != package && self.under_build.contains(&external) {
                continue;
            }
            // A project declaring itself as external re-enters here, and the
            // session guard reports it.
            self.build_tooling(&Project::from_package(external)?)?;
        }

        let sources = builder_builder.compilable_build_code(&self.compiler)?;
        if !sources.is_empty() {
            self.compiler.compile(Some(project.package()), &sources)?;
        }
        Ok(())
    }
}
