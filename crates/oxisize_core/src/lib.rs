//! Core of the oxisize bundle-size tool.
//!
//! This crate covers everything that happens before bundling:
//! - Resolving the repository root
//! - Discovering `*.fixture.js` files under the packages directory
//! - Statically evaluating each fixture's `export default` metadata
//! - Validating that metadata and writing the stripped fixture to staging

mod collector;
mod config;
mod error;
mod evaluate;
mod extractor;
mod schema;
mod types;

// Re-export public API
pub use collector::{FIXTURE_GLOB, collect_fixtures};
pub use config::find_git_root;
pub use error::{DiscoveryError, FixtureError};
pub use evaluate::{StaticEvaluator, StaticValue};
pub use extractor::{prepare_fixture, sibling_path, strip_metadata};
pub use schema::{Violation, validate_metadata};
pub use types::{Fixture, FixtureMetadata, PreparedFixture};
