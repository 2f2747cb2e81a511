//! Integration tests for the build protocol
//!
//! Each test drives a session against a fixture source tree, with a stub
//! `emberc` that logs every invocation and creates the expected object files.

use ember_build::registry::{
    Builder, BuilderBuilder, BuilderBuilderFactory, BuilderFactory, RoleRegistry,
};
use ember_build::{bootstrap, BuildError, BuildResult, BuildSession, Compiler, Project, TargetSet, Toolchain};
use std::collections::BTreeSet;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

struct Fixture {
    base: TempDir,
    out: TempDir,
    log: PathBuf,
    stub: PathBuf,
}

impl Fixture {
    /// A source tree holding the home project and a stub compiler that
    /// exits with `status`.
    fn with_compiler_status(status: i32) -> Self {
        let base = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let log = base.path().join("bin/emberc.log");
        let stub = base.path().join("bin/emberc");

        fs::create_dir_all(base.path().join("bin")).unwrap();
        let script = format!(
            r#"#!/bin/sh
out=
prev=
for a in "$@"; do
  [ "$prev" = "-d" ] && out="$a"
  prev="$a"
done
echo "RUN $@" >> "{log}"
for a in "$@"; do
  case "$a" in
    *.ember)
      rel="${{a%.ember}}.emo"
      mkdir -p "$out/$(dirname "$rel")"
      : > "$out/$rel"
      ;;
  esac
done
[ {status} -ne 0 ] && echo 'stub: deliberate failure'
exit {status}
"#,
            log = log.display(),
            status = status,
        );
        fs::write(&stub, script).unwrap();
        fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();

        let fixture = Self {
            base,
            out,
            log,
            stub,
        };
        fixture.write("build/ember/builder_builder_default.ember", "default bb");
        fixture.write("build/ember/builder_default.ember", "default b");
        fixture.write("build/ember/emberc_arguments", "-strict\n");
        fixture.write("build/ember/builder/target.ember", "builder");
        fixture.write("build/ember/builder/builder_builder.ember", "home bb");
        fixture
    }

    fn new() -> Self {
        Self::with_compiler_status(0)
    }

    fn write(&self, relative: &str, content: &str) {
        let path = self.base.path().join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn compiler(&self) -> Compiler {
        Compiler::new(
            Toolchain::with_compiler(&self.stub),
            self.base.path(),
            self.out.path(),
        )
    }

    fn runs(&self) -> Vec<String> {
        match fs::read_to_string(&self.log) {
            Ok(content) => content.lines().map(str::to_owned).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// How many invocations named `source` in their argument list.
    fn compiles_of(&self, source: &str) -> usize {
        self.runs().iter().filter(|run| run.contains(source)).count()
    }
}

/// A builder builder declaring an explicit external dependency set.
#[derive(Debug)]
struct DeclaredBuilderBuilder {
    package: String,
    path: PathBuf,
    externals: BTreeSet<String>,
}

impl DeclaredBuilderBuilder {
    fn factory(package: &str, externals: &[&str]) -> BuilderBuilderFactory {
        let package = package.to_string();
        let externals: BTreeSet<String> = externals.iter().map(|s| s.to_string()).collect();
        BuilderBuilderFactory::plain(move || {
            Box::new(DeclaredBuilderBuilder {
                package: package.clone(),
                path: PathBuf::from(package.replace('.', "/")),
                externals: externals.clone(),
            })
        })
    }
}

impl BuilderBuilder for DeclaredBuilderBuilder {
    fn project_package(&self) -> &str {
        &self.package
    }

    fn project_path(&self) -> &Path {
        &self.path
    }

    fn external_build_code(&self) -> BTreeSet<String> {
        self.externals.clone()
    }
}

/// A builder that records having run.
struct RecordingBuilder {
    ran: Arc<AtomicBool>,
}

impl Builder for RecordingBuilder {
    fn build(&self, _target: &str, _compiler: &mut Compiler) -> BuildResult<()> {
        self.ran.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn builds_a_plain_project_through_the_home_project() {
    let fixture = Fixture::new();
    fixture.write("wet/sprocket/target.ember", "targets");
    let registry = RoleRegistry::new();
    let mut session = BuildSession::new(&registry, fixture.compiler());

    let project = Project::from_package("wet.sprocket").unwrap();
    session.build(&project, "builder").unwrap();

    // The home project's tooling was built before the project's own code.
    assert_eq!(fixture.compiles_of("build/ember/builder/target.ember"), 1);
    assert_eq!(fixture.compiles_of("wet/sprocket/target.ember"), 1);
}

#[test]
fn overlapping_dependency_chains_compile_the_shared_project_once() {
    let fixture = Fixture::new();
    fixture.write("a/target.ember", "targets");
    fixture.write("a/builder_builder.ember", "custom bb");
    fixture.write("b/target.ember", "targets");
    fixture.write("c/target.ember", "targets");
    fixture.write("c/builder_builder.ember", "custom bb");

    let mut registry = RoleRegistry::new();
    registry.register_builder_builder("a", DeclaredBuilderBuilder::factory("a", &["b"]));
    registry.register_builder_builder("c", DeclaredBuilderBuilder::factory("c", &["b"]));

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("a").unwrap())
        .unwrap();
    session
        .build_tooling(&Project::from_package("c").unwrap())
        .unwrap();

    assert_eq!(fixture.compiles_of("b/target.ember"), 1);
}

#[test]
fn self_cycle_fails_fatally_on_reentry() {
    let fixture = Fixture::new();
    fixture.write("a/target.ember", "targets");
    fixture.write("a/builder_builder.ember", "custom bb");

    let mut registry = RoleRegistry::new();
    registry.register_builder_builder("a", DeclaredBuilderBuilder::factory("a", &["a"]));

    let mut session = BuildSession::new(&registry, fixture.compiler());
    let error = session
        .build_tooling(&Project::from_package("a").unwrap())
        .unwrap_err();
    assert!(matches!(error, BuildError::Reentry { package } if package == "a"));
}

#[test]
fn rebuilding_the_same_project_in_one_session_is_fatal() {
    let fixture = Fixture::new();
    fixture.write("a/target.ember", "targets");
    let registry = RoleRegistry::new();
    let mut session = BuildSession::new(&registry, fixture.compiler());

    let project = Project::from_package("a").unwrap();
    session.build_tooling(&project).unwrap();
    let error = session.build_tooling(&project).unwrap_err();
    assert!(matches!(error, BuildError::Reentry { .. }));
}

#[test]
fn a_fresh_tree_compiles_nothing_on_the_second_run() {
    let fixture = Fixture::new();
    fixture.write("a/target.ember", "targets");
    let registry = RoleRegistry::new();

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("a").unwrap())
        .unwrap();
    let runs_after_first = fixture.runs().len();
    assert!(runs_after_first > 0);

    // A later session over the same output cache finds nothing stale.
    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("a").unwrap())
        .unwrap();
    assert_eq!(fixture.runs().len(), runs_after_first);
}

#[test]
fn an_edited_source_is_recompiled() {
    let fixture = Fixture::new();
    fixture.write("a/target.ember", "targets");
    let registry = RoleRegistry::new();

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("a").unwrap())
        .unwrap();

    std::thread::sleep(std::time::Duration::from_millis(20));
    fixture.write("a/target.ember", "targets, edited");

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("a").unwrap())
        .unwrap();
    assert_eq!(fixture.compiles_of("a/target.ember"), 2);
}

#[test]
fn builder_override_shadows_the_default_which_still_compiles() {
    let fixture = Fixture::new();
    fixture.write("p/target.ember", "targets");
    fixture.write("p/builder.ember", "custom builder");

    let ran = Arc::new(AtomicBool::new(false));
    let ran_in_factory = Arc::clone(&ran);
    let mut registry = RoleRegistry::new();
    registry.register_builder(
        "p",
        BuilderFactory::plain(move || {
            Box::new(RecordingBuilder {
                ran: Arc::clone(&ran_in_factory),
            })
        }),
    );

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build(&Project::from_package("p").unwrap(), "builder")
        .unwrap();

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(fixture.compiles_of("p/builder.ember"), 1);
    assert_eq!(fixture.compiles_of("build/ember/builder_default.ember"), 1);
}

#[test]
fn target_query_errors_are_user_errors() {
    let fixture = Fixture::new();
    fixture.write("p/target.ember", "targets");
    let mut registry = RoleRegistry::new();
    registry.register_targets(
        "p",
        TargetSet::new(["builder", "compile", "compile_tests"]).unwrap(),
    );

    let mut session = BuildSession::new(&registry, fixture.compiler());
    let error = session
        .build(&Project::from_package("p").unwrap(), "zzz")
        .unwrap_err();
    assert!(error.is_user_error());
    assert!(error.to_string().contains("Unmatched"));
}

#[test]
fn ambiguous_target_query_is_a_user_error() {
    let fixture = Fixture::new();
    fixture.write("p/target.ember", "targets");
    let mut registry = RoleRegistry::new();
    registry.register_targets(
        "p",
        TargetSet::new(["builder", "compile", "compile_tests"]).unwrap(),
    );

    let mut session = BuildSession::new(&registry, fixture.compiler());
    let error = session
        .build(&Project::from_package("p").unwrap(), "comp")
        .unwrap_err();
    assert!(error.is_user_error());
    assert!(error.to_string().contains("Ambiguous"));
}

#[test]
fn matched_target_without_default_support_is_fatal() {
    let fixture = Fixture::new();
    fixture.write("p/target.ember", "targets");
    let mut registry = RoleRegistry::new();
    registry.register_targets("p", TargetSet::new(["builder", "compile"]).unwrap());

    let mut session = BuildSession::new(&registry, fixture.compiler());
    let error = session
        .build(&Project::from_package("p").unwrap(), "compile")
        .unwrap_err();
    assert!(!error.is_user_error());
    assert!(matches!(error, BuildError::UnsupportedTarget { .. }));
}

#[test]
fn object_files_target_compiles_the_project_code() {
    let fixture = Fixture::new();
    fixture.write("p/builder/target.ember", "targets");
    fixture.write("p/main.ember", "main");
    let mut registry = RoleRegistry::new();
    registry.register_targets("p", TargetSet::new(["builder", "object_files"]).unwrap());

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build(&Project::from_package("p").unwrap(), "object-f")
        .unwrap();
    assert_eq!(fixture.compiles_of("p/main.ember"), 1);
}

#[test]
fn compiler_reported_failure_propagates_as_a_user_error() {
    let fixture = Fixture::with_compiler_status(1);
    fixture.write("p/target.ember", "targets");
    let registry = RoleRegistry::new();

    let mut session = BuildSession::new(&registry, fixture.compiler());
    let error = session
        .build_tooling(&Project::from_package("p").unwrap())
        .unwrap_err();
    assert!(error.is_user_error());
    assert!(error.to_string().contains("emberc"));
}

#[test]
fn unexpected_compiler_status_is_fatal_with_the_command_line() {
    let fixture = Fixture::with_compiler_status(3);
    fixture.write("p/target.ember", "targets");
    let registry = RoleRegistry::new();

    let mut session = BuildSession::new(&registry, fixture.compiler());
    let error = session
        .build_tooling(&Project::from_package("p").unwrap())
        .unwrap_err();
    assert!(matches!(
        error,
        BuildError::Subprocess { status: 3, .. }
    ));
    assert!(error.to_string().contains("builder_builder_default.ember"));
}

#[test]
fn build_target_file_narrows_build_code_to_build_prefixed_sources() {
    let fixture = Fixture::new();
    fixture.write("p/builder/build_target.ember", "targets");
    fixture.write("p/builder/build_helper.ember", "helper");
    fixture.write("p/builder/notes.ember", "not build code");
    let registry = RoleRegistry::new();

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("p").unwrap())
        .unwrap();

    assert_eq!(fixture.compiles_of("p/builder/build_target.ember"), 1);
    assert_eq!(fixture.compiles_of("p/builder/build_helper.ember"), 1);
    assert_eq!(fixture.compiles_of("p/builder/notes.ember"), 0);
}

#[test]
fn bootstrap_compiles_the_home_sources_once() {
    let fixture = Fixture::new();
    let toolchain = Toolchain::with_compiler(&fixture.stub);

    bootstrap::run(&toolchain, fixture.base.path(), fixture.out.path()).unwrap();
    assert_eq!(
        fixture.compiles_of("build/ember/builder_builder_default.ember"),
        1
    );
    assert_eq!(fixture.compiles_of("build/ember/builder_default.ember"), 1);
    // The home project's builder/ subtree belongs to the ordinary protocol.
    assert_eq!(fixture.compiles_of("build/ember/builder/target.ember"), 0);

    bootstrap::run(&toolchain, fixture.base.path(), fixture.out.path()).unwrap();
    assert_eq!(
        fixture.compiles_of("build/ember/builder_builder_default.ember"),
        1
    );
}

#[test]
fn fixed_argument_file_is_passed_when_present() {
    let fixture = Fixture::new();
    fixture.write("p/target.ember", "targets");
    let registry = RoleRegistry::new();

    let mut session = BuildSession::new(&registry, fixture.compiler());
    session
        .build_tooling(&Project::from_package("p").unwrap())
        .unwrap();
    assert!(fixture
        .runs()
        .iter()
        .all(|run| run.contains("@build/ember/emberc_arguments")));
}
