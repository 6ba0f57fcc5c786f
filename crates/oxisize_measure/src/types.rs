use oxisize_core::{FixtureError, PreparedFixture};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub output_path: PathBuf,
    pub name: String,
    pub threshold: Option<f64>,
    pub minified_size: String,
    pub gzipped_size: String,
    pub minified_bytes: u64,
    pub gzipped_bytes: u64,
}

impl Measurement {
    pub fn new(prepared: PreparedFixture, minified_bytes: u64, gzipped_bytes: u64) -> Self {
        Measurement {
            output_path: prepared.output_path,
            name: prepared.name,
            threshold: prepared.threshold,
            minified_size: crate::size::bytes_to_kb(minified_bytes),
            gzipped_size: crate::size::bytes_to_kb(gzipped_bytes),
            minified_bytes,
            gzipped_bytes,
        }
    }
}

#[derive(Debug)]
pub struct FixtureFailure {
    /// Fixture path relative to the packages directory
    pub fixture: String,
    pub error: FixtureError,
}

#[derive(Debug)]
pub struct RunResult {
    /// Sorted by output path
    pub measurements: Vec<Measurement>,
    pub failures: Vec<FixtureFailure>,
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
