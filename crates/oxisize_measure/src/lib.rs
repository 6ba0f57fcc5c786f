//! Bundle-and-measure pipeline for oxisize.
//!
//! Each fixture prepared by `oxisize_core` is bundled with webpack, minified
//! twice (a readable variant for inspection and a compact one for sizing) and
//! measured raw and gzipped. Fixtures run concurrently on a rayon pool and fail
//! independently.
//!
//! # Examples
//!
//! ```no_run
//! use clap::Parser;
//! use oxisize_measure::{
//!     Config, WebpackBundler, discover_fixtures, measure_fixtures, prepare_staging_dir, print_report,
//! };
//! use std::io::{BufWriter, Write};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut cfg = Config::parse_from(["oxisize", "--root", "/path/to/repo"]);
//! cfg.initialize()?;
//!
//! prepare_staging_dir(&cfg.out_dir)?;
//! let fixtures = discover_fixtures(&cfg)?;
//!
//! let bundler = WebpackBundler::new(cfg.bundler_program()?);
//! let result = measure_fixtures(&cfg, &fixtures, &bundler)?;
//!
//! let mut stdout = BufWriter::new(std::io::stdout());
//! print_report(&mut stdout, &result.measurements)?;
//! stdout.flush()?;
//! # Ok(())
//! # }
//! ```

mod bundler;
mod config;
mod minifier;
mod pipeline;
mod reporter;
mod runner;
mod size;
mod types;

// Re-export public API
pub use bundler::{BundleRequest, Bundler, EXTERNALS, WebpackBundler};
pub use config::Config;
pub use minifier::{MinifyMode, minify, minify_both};
pub use pipeline::process_fixture;
pub use reporter::{
    print_completed, print_failures, print_fixture_list, print_report, render_table,
    sort_measurements,
};
pub use runner::{discover_fixtures, measure_fixtures, prepare_staging_dir};
pub use size::{bytes_to_kb, file_size, format_duration, format_seconds, gzip_file_size, gzip_size};
pub use types::{FixtureFailure, Measurement, RunResult};
