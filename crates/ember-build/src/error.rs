/// Build tool error types
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

/// Errors raised by the build tool.
///
/// Only the `User` variant is ever shown to the user as such; its message is
/// relayed verbatim. Every other variant is an internal failure that aborts
/// the process, carrying diagnostic context for the operator.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    User(String),

    #[error("Invalid project configuration: {0}")]
    Config(String),

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Exit status {status} from compiler process: {command_line}")]
    Subprocess { status: i32, command_line: String },

    #[error("No {role} factory registered for override `{file}` of project `{package}`")]
    UnregisteredOverride {
        package: String,
        role: &'static str,
        file: PathBuf,
    },

    #[error("Project already under build in this session: {package}")]
    Reentry { package: String },

    #[error("Target `{target}` of `{package}` is unsupported by the default builder")]
    UnsupportedTarget { package: String, target: String },
}

impl BuildError {
    /// Create a user-correctable error whose message is shown verbatim
    pub fn user(message: impl Into<String>) -> Self {
        Self::User(message.into())
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Whether this is a condition the user can correct by changing the
    /// target query or the project's own sources
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::User(_))
    }
}
