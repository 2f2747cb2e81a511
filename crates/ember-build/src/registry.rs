//! Pluggable build roles and their factory registry
//!
//! Two roles are pluggable per project: the *builder* (compiles the project's
//! own target-specific build steps) and the *builder builder* (describes and
//! compiles the project's build tooling).  A project overrides a role by
//! placing the role's override source file in its internal build code and
//! registering a matching factory here; otherwise the system default is used.
//!
//! The two legal construction shapes are fixed at registration time:
//! [`Contextual`](BuilderFactory::Contextual) receives the full project
//! context, as the default implementations do; [`Plain`](BuilderFactory::Plain)
//! takes nothing, the contract for a hand-written override.

use crate::compiler::Compiler;
use crate::error::{BuildError, BuildResult};
use crate::project::{self, HOME_PACKAGE};
use crate::resolver;
use crate::targets::{TargetSet, BUILDER_TARGET, OBJECT_FILES_TARGET};
use std::collections::{BTreeSet, HashMap};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};

/// The two pluggable roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Builds a project's software to the level of a named target.
    Builder,
    /// Describes and compiles a project's build tooling.
    BuilderBuilder,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builder => write!(f, "builder"),
            Self::BuilderBuilder => write!(f, "builder builder"),
        }
    }
}

/// A builder of a project's software.
pub trait Builder {
    /// Builds the code to the level of `target`, a full target name.
    fn build(&self, target: &str, compiler: &mut Compiler) -> BuildResult<()>;
}

/// A builder of software builders: describes the build-code dependencies of
/// its owning project.
pub trait BuilderBuilder: fmt::Debug {
    /// The proper package of the owning project.
    fn project_package(&self) -> &str;

    /// The proper path of the owning project.
    fn project_path(&self) -> &Path;

    /// The proper package of each project, less the owning project, whose
    /// build code the builder may depend on.
    fn external_build_code(&self) -> BTreeSet<String> {
        BTreeSet::from([HOME_PACKAGE.to_string()])
    }

    /// Packages of build code additional to the internal build code, each
    /// contributing the source files of its equivalent directory.
    fn added_build_code(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Assembles the stale build-code sources of the owning project: the
    /// internal build code plus any added packages.
    ///
    /// With the primary target file present, only internal files named
    /// `build*` are build code; under the fallback name, every source file of
    /// the directory is.
    fn compilable_build_code(&self, compiler: &Compiler) -> BuildResult<Vec<PathBuf>> {
        let base_dir = compiler.base_dir();
        let directory = resolver::internal_build_code(base_dir, self.project_path());
        let target_file = resolver::target_file(base_dir, self.project_path());
        let mut sources = Vec::new();
        if target_file.file_name() == Some(OsStr::new(resolver::TARGET_FILE_FALLBACK)) {
            compiler.add_compilable_sources(&mut sources, &directory)?;
        } else {
            compiler.add_compilable_sources_matching(&mut sources, &directory, |path| {
                path.file_name()
                    .map(|name| name.to_string_lossy().starts_with("build"))
                    .unwrap_or(false)
            })?;
        }
        for package in self.added_build_code() {
            compiler.add_compilable_sources(&mut sources, &project::path_of(&package))?;
        }
        Ok(sources)
    }
}

/// The context a default role implementation is constructed from.
#[derive(Debug, Clone)]
pub struct RoleContext {
    /// Proper package of the project.
    pub package: String,
    /// Proper path of the project.
    pub path: PathBuf,
    /// The project's declared build targets.
    pub targets: TargetSet,
}

/// Construction shape of a registered builder factory.
pub enum BuilderFactory {
    Contextual(Box<dyn Fn(&RoleContext) -> Box<dyn Builder>>),
    Plain(Box<dyn Fn() -> Box<dyn Builder>>),
}

impl BuilderFactory {
    pub fn contextual(f: impl Fn(&RoleContext) -> Box<dyn Builder> + 'static) -> Self {
        Self::Contextual(Box::new(f))
    }

    pub fn plain(f: impl Fn() -> Box<dyn Builder> + 'static) -> Self {
        Self::Plain(Box::new(f))
    }

    pub fn construct(&self, context: &RoleContext) -> Box<dyn Builder> {
        match self {
            Self::Contextual(f) => f(context),
            Self::Plain(f) => f(),
        }
    }
}

/// Construction shape of a registered builder-builder factory.
pub enum BuilderBuilderFactory {
    Contextual(Box<dyn Fn(&RoleContext) -> Box<dyn BuilderBuilder>>),
    Plain(Box<dyn Fn() -> Box<dyn BuilderBuilder>>),
}

impl BuilderBuilderFactory {
    pub fn contextual(f: impl Fn(&RoleContext) -> Box<dyn BuilderBuilder> + 'static) -> Self {
        Self::Contextual(Box::new(f))
    }

    pub fn plain(f: impl Fn() -> Box<dyn BuilderBuilder> + 'static) -> Self {
        Self::Plain(Box::new(f))
    }

    pub fn construct(&self, context: &RoleContext) -> Box<dyn BuilderBuilder> {
        match self {
            Self::Contextual(f) => f(context),
            Self::Plain(f) => f(),
        }
    }
}

/// Default implementation of a builder builder: carries the project identity
/// and the default dependency declarations.  An override may hold one and
/// delegate to it.
#[derive(Debug, Clone)]
pub struct DefaultBuilderBuilder {
    package: String,
    path: PathBuf,
}

impl DefaultBuilderBuilder {
    pub fn new(package: impl Into<String>, path: impl Into<PathBuf>) -> BuildResult<Self> {
        let package = package.into();
        let path = path.into();
        project::validate_package(&package)?;
        project::validate_path(&path)?;
        project::validate_pair(&package, &path)?;
        Ok(Self { package, path })
    }

    /// Construction from an already-validated context.
    pub fn from_context(context: &RoleContext) -> Self {
        Self {
            package: context.package.clone(),
            path: context.path.clone(),
        }
    }
}

impl BuilderBuilder for DefaultBuilderBuilder {
    fn project_package(&self) -> &str {
        &self.package
    }

    fn project_path(&self) -> &Path {
        &self.path
    }
}

/// Default implementation of a software builder.  It supports the mandatory
/// `builder` target (nothing to do; the session built the tooling already)
/// and `object_files`, which compiles the project's proper code.
pub struct DefaultBuilder {
    package: String,
    targets: TargetSet,
    object_code: BTreeSet<String>,
}

impl DefaultBuilder {
    pub fn new(context: &RoleContext) -> Self {
        Self {
            package: context.package.clone(),
            targets: context.targets.clone(),
            object_code: BTreeSet::from([context.package.clone()]),
        }
    }

    /// Replaces the packages of code proper to the owning project, exclusive
    /// of build code.  The default is the owning package alone.
    pub fn with_object_code(mut self, packages: BTreeSet<String>) -> Self {
        self.object_code = packages;
        self
    }

    fn build_object_files(&self, compiler: &mut Compiler) -> BuildResult<()> {
        let mut sources = Vec::new();
        for package in &self.object_code {
            compiler.add_compilable_sources(&mut sources, &project::path_of(package))?;
        }
        compiler.compile(Some(&self.package), &sources)
    }
}

impl Builder for DefaultBuilder {
    fn build(&self, target: &str, compiler: &mut Compiler) -> BuildResult<()> {
        if !self.targets.contains(target) {
            return Err(BuildError::user(format!(
                "Undefined build target for `{}`: {target}",
                self.package
            )));
        }
        match target {
            BUILDER_TARGET => Ok(()),
            OBJECT_FILES_TARGET => self.build_object_files(compiler),
            other => Err(BuildError::UnsupportedTarget {
                package: self.package.clone(),
                target: other.to_string(),
            }),
        }
    }
}

/// The builder builder of the home project itself.  It has no external
/// build-code dependencies, terminating the recursion that every other
/// project's default declaration starts.
#[derive(Debug)]
struct HomeBuilderBuilder {
    path: PathBuf,
}

impl BuilderBuilder for HomeBuilderBuilder {
    fn project_package(&self) -> &str {
        HOME_PACKAGE
    }

    fn project_path(&self) -> &Path {
        &self.path
    }

    fn external_build_code(&self) -> BTreeSet<String> {
        BTreeSet::new()
    }
}

/// The builder of the home project itself: its single target is already
/// satisfied once the session has compiled the tooling.
struct HomeBuilder;

impl Builder for HomeBuilder {
    fn build(&self, target: &str, _compiler: &mut Compiler) -> BuildResult<()> {
        if target != BUILDER_TARGET {
            return Err(BuildError::user(format!(
                "Undefined build target for `{HOME_PACKAGE}`: {target}"
            )));
        }
        Ok(())
    }
}

/// Registry of per-project role overrides and target sets.
///
/// An override factory is consulted only when the project's override source
/// file is present; the file is the discriminant, the registration supplies
/// the behavior.  The home project's own overrides are pre-registered.
pub struct RoleRegistry {
    builder_builders: HashMap<String, BuilderBuilderFactory>,
    builders: HashMap<String, BuilderFactory>,
    targets: HashMap<String, TargetSet>,
}

impl RoleRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            builder_builders: HashMap::new(),
            builders: HashMap::new(),
            targets: HashMap::new(),
        };
        registry.register_builder_builder(
            HOME_PACKAGE,
            BuilderBuilderFactory::plain(|| {
                Box::new(HomeBuilderBuilder {
                    path: project::home_path(),
                })
            }),
        );
        registry.register_builder(HOME_PACKAGE, BuilderFactory::plain(|| Box::new(HomeBuilder)));
        registry.register_targets(HOME_PACKAGE, TargetSet::default());
        registry
    }

    pub fn register_builder_builder(
        &mut self,
        package: impl Into<String>,
        factory: BuilderBuilderFactory,
    ) {
        self.builder_builders.insert(package.into(), factory);
    }

    pub fn register_builder(&mut self, package: impl Into<String>, factory: BuilderFactory) {
        self.builders.insert(package.into(), factory);
    }

    /// Declares a project's build targets.  Unregistered projects get the
    /// minimal default set.
    pub fn register_targets(&mut self, package: impl Into<String>, targets: TargetSet) {
        self.targets.insert(package.into(), targets);
    }

    pub fn builder_builder_override(&self, package: &str) -> Option<&BuilderBuilderFactory> {
        self.builder_builders.get(package)
    }

    pub fn builder_override(&self, package: &str) -> Option<&BuilderFactory> {
        self.builders.get(package)
    }

    /// The declared targets of `package`, or the default set.
    pub fn targets(&self, package: &str) -> TargetSet {
        self.targets.get(package).cloned().unwrap_or_default()
    }
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
