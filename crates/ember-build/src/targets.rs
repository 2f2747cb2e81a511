//! Build target sets and target-name matching

use crate::error::{BuildError, BuildResult};

/// The target every project must declare: its build tooling is compiled and
/// ready.  All other targets implicitly include it.
pub const BUILDER_TARGET: &str = "builder";

/// The default builder's target for the project's own compiled object files.
pub const OBJECT_FILES_TARGET: &str = "object_files";

/// A project's build targets, ordered by declaration.
///
/// Always contains the mandatory `builder` target; a set registered without
/// it is a configuration error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSet {
    names: Vec<String>,
}

impl TargetSet {
    /// Create a target set from names in declaration order.
    pub fn new<I, S>(names: I) -> BuildResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if !names.iter().any(|name| name == BUILDER_TARGET) {
            return Err(BuildError::config(format!(
                "Target set lacks the mandatory `{BUILDER_TARGET}` target"
            )));
        }
        for (index, name) in names.iter().enumerate() {
            if names[..index].contains(name) {
                return Err(BuildError::config(format!(
                    "Duplicate build target: `{name}`"
                )));
            }
        }
        Ok(Self { names })
    }

    /// Target names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }

    /// Finds the target name uniquely matching `query`.
    ///
    /// Letter case is insignificant, a dash matches an underscore, and the
    /// query may be any substring of the target name that appears in no other
    /// target name.  Anything else is a user error; ambiguity is never
    /// resolved by preference.
    pub fn find_matching(&self, query: &str) -> BuildResult<&str> {
        let sought = query.to_lowercase().replace('-', "_");
        let mut found: Option<&str> = None;
        for name in &self.names {
            if name.to_lowercase().contains(&sought) {
                if found.is_some() {
                    return Err(BuildError::user(format!(
                        "Ambiguous build target: {query}"
                    )));
                }
                found = Some(name);
            }
        }
        found.ok_or_else(|| BuildError::user(format!("Unmatched build target: {query}")))
    }
}

impl Default for TargetSet {
    /// The minimal legal set: the mandatory `builder` target alone.
    fn default() -> Self {
        Self {
            names: vec![BUILDER_TARGET.to_string()],
        }
    }
}
