//! Ember build tooling infrastructure
//!
//! Provides the self-hosting build protocol for Ember projects:
//! - Project identity (proper package ⇔ proper path mapping and validation)
//! - Timestamp-based staleness checks against the compiled-output cache
//! - Two-tier pluggable roles (builder, builder builder) with per-project
//!   override resolution
//! - Session-scoped dependency ordering with duplicate-build suppression
//! - Stage-zero bootstrap of the machinery's own sources
//! - Abbreviated target-name matching
//!
//! The compiler itself is an external collaborator: one `emberc` subprocess
//! per batch of stale sources.

pub mod bootstrap;
pub mod compiler;
pub mod error;
pub mod project;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod staleness;
pub mod targets;
pub mod toolchain;

// Re-export main types
pub use compiler::Compiler;
pub use error::{BuildError, BuildResult};
pub use project::Project;
pub use registry::{
    Builder, BuilderBuilder, BuilderBuilderFactory, BuilderFactory, DefaultBuilder,
    DefaultBuilderBuilder, Role, RoleContext, RoleRegistry,
};
pub use resolver::RoleResolver;
pub use session::BuildSession;
pub use staleness::SourceArtifact;
pub use targets::TargetSet;
pub use toolchain::{CompilerRun, Toolchain};
