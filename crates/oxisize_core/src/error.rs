use std::{io, path::PathBuf};
use thiserror::Error;

use crate::schema::Violation;

/// Failures that abort the whole run.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Could not find .git directory in any parent folder of {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("Packages directory does not exist: {}", .0.display())]
    PackagesDirMissing(PathBuf),

    #[error("Invalid fixture pattern: {0}")]
    Pattern(#[from] globset::Error),

    #[error("Failed to walk packages directory: {0}")]
    Walk(#[from] ignore::Error),

    #[error("Failed to read current directory: {0}")]
    CurrentDir(#[source] io::Error),
}

/// Failures isolated to a single fixture.
#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse: {}", .0.join("; "))]
    Parse(Vec<String>),

    #[error("default export is not statically evaluable: {0}")]
    MetadataEvaluation(String),

    #[error("metadata does not match schema: {}", format_violations(.0))]
    MetadataSchema(Vec<Violation>),

    #[error("bundling failed: {}", .0.join("\n"))]
    Bundle(Vec<String>),

    #[error("minification failed: {0}")]
    Minify(String),

    #[error("timed out before {stage}")]
    TimedOut { stage: &'static str },
}

impl FixtureError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FixtureError::Io { path: path.into(), source }
    }

    /// Stable name of the error kind, used in failure reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FixtureError::Io { .. } => "IOError",
            FixtureError::Parse(_) => "ParseError",
            FixtureError::MetadataEvaluation(_) => "MetadataEvaluationError",
            FixtureError::MetadataSchema(_) => "MetadataSchemaError",
            FixtureError::Bundle(_) => "BundleError",
            FixtureError::Minify(_) => "MinifyError",
            FixtureError::TimedOut { .. } => "TimeoutError",
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}
