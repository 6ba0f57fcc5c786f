use log::{debug, info};
use oxisize_core::{FixtureError, PreparedFixture, sibling_path};
use std::{fs, path::Path, time::Instant};

use crate::{
    bundler::{BundleRequest, Bundler},
    minifier::minify_both,
    size::{file_size, format_duration, gzip_file_size},
    types::Measurement,
};

/// Bundles a prepared fixture, writes its readable and compact minified
/// variants and measures the compact one.
pub fn process_fixture(
    prepared: PreparedFixture,
    bundler: &dyn Bundler,
    deadline: Option<Instant>,
) -> Result<Measurement, FixtureError> {
    let display_name = file_name(&prepared.output_path);
    let bundle_path = sibling_path(&prepared.output_path, ".output.js");
    let minified_path = sibling_path(&prepared.output_path, ".min.js");

    check_deadline(deadline, "bundling")?;
    let build_start = Instant::now();
    bundler.bundle(&BundleRequest::production(&prepared.output_path, &bundle_path), deadline)?;
    info!("✔ Webpack built \"{}\" in {}", display_name, format_duration(build_start.elapsed()));

    check_deadline(deadline, "minification")?;
    let minify_start = Instant::now();
    let bundle = fs::read_to_string(&bundle_path).map_err(|e| FixtureError::io(&bundle_path, e))?;
    let (readable, compact) = minify_both(&bundle)?;

    fs::write(&bundle_path, readable).map_err(|e| FixtureError::io(&bundle_path, e))?;
    fs::write(&minified_path, compact).map_err(|e| FixtureError::io(&minified_path, e))?;
    info!("✔ Minified \"{}\" in {}", display_name, format_duration(minify_start.elapsed()));

    let minified_bytes = file_size(&minified_path).map_err(|e| FixtureError::io(&minified_path, e))?;
    let gzipped_bytes =
        gzip_file_size(&minified_path).map_err(|e| FixtureError::io(&minified_path, e))?;
    debug!("{}: {} bytes minified, {} bytes gzipped", display_name, minified_bytes, gzipped_bytes);

    Ok(Measurement::new(prepared, minified_bytes, gzipped_bytes))
}

pub(crate) fn check_deadline(
    deadline: Option<Instant>,
    stage: &'static str,
) -> Result<(), FixtureError> {
    match deadline {
        Some(deadline) if Instant::now() >= deadline => Err(FixtureError::TimedOut { stage }),
        _ => Ok(()),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default()
}
