use std::path::PathBuf;

/// A fixture module discovered under the packages directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    pub source_path: PathBuf,
    /// Path relative to the packages directory, mirrored under the staging directory
    pub relative_path: PathBuf,
}

impl Fixture {
    pub fn id(&self) -> String {
        self.relative_path.to_string_lossy().to_string()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureMetadata {
    pub name: String,
    pub threshold: Option<f64>,
}

/// A fixture with its metadata export stripped, written to the staging directory.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedFixture {
    pub output_path: PathBuf,
    pub name: String,
    pub threshold: Option<f64>,
}
