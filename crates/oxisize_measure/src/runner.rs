use anyhow::{Context, Result, anyhow};
use log::{debug, error, info, trace, warn};
use oxisize_core::{Fixture, FixtureError, collect_fixtures, prepare_fixture};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::{fs, path::Path, thread, time::Instant};

use crate::{
    bundler::Bundler,
    config::Config,
    pipeline::{check_deadline, process_fixture},
    reporter::sort_measurements,
    types::{FixtureFailure, Measurement, RunResult},
};

/// Wipe and recreate the staging directory.
pub fn prepare_staging_dir(out_dir: &Path) -> Result<()> {
    if out_dir.exists() {
        debug!("Removing staging directory: {}", out_dir.display());
        fs::remove_dir_all(out_dir)
            .with_context(|| format!("Failed to remove {}", out_dir.display()))?;
    }
    fs::create_dir_all(out_dir).with_context(|| format!("Failed to create {}", out_dir.display()))?;
    Ok(())
}

pub fn discover_fixtures(cfg: &Config) -> Result<Vec<Fixture>> {
    let packages = cfg.packages_path()?;
    debug!("Collecting fixtures under {}", packages.display());
    let fixtures = collect_fixtures(&packages)?;
    if fixtures.is_empty() {
        warn!("No fixtures found under {}", packages.display());
    }
    info!("Found {} fixtures", fixtures.len());
    Ok(fixtures)
}

/// Prepare and measure every fixture concurrently. A failing fixture is
/// recorded in [`RunResult::failures`] and never affects the others.
pub fn measure_fixtures(
    cfg: &Config,
    fixtures: &[Fixture],
    bundler: &dyn Bundler,
) -> Result<RunResult> {
    let deadline = cfg.timeout_duration().map(|t| Instant::now() + t);

    // 0 lets rayon pick one thread per CPU
    let pool = ThreadPoolBuilder::new()
        .num_threads(cfg.jobs.unwrap_or(0))
        .build()
        .map_err(|e| anyhow!("Failed to build worker pool: {}", e))?;

    info!(
        "Processing {} fixtures (using {} threads)",
        fixtures.len(),
        pool.current_num_threads()
    );

    let outcomes: Vec<Result<Measurement, FixtureFailure>> = pool.install(|| {
        fixtures
            .par_iter()
            .map(|fixture| {
                trace!("Thread {:?} processing: {}", thread::current().id(), fixture.id());
                measure_fixture(fixture, &cfg.out_dir, bundler, deadline).map_err(|error| {
                    error!("✖ {} failed with {}: {}", fixture.id(), error.kind(), error);
                    FixtureFailure { fixture: fixture.id(), error }
                })
            })
            .collect()
    });

    let mut measurements = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(measurement) => measurements.push(measurement),
            Err(failure) => failures.push(failure),
        }
    }

    sort_measurements(&mut measurements);
    failures.sort_by(|a, b| a.fixture.cmp(&b.fixture));

    info!("Measured {} fixtures, {} failed", measurements.len(), failures.len());
    Ok(RunResult { measurements, failures })
}

fn measure_fixture(
    fixture: &Fixture,
    out_dir: &Path,
    bundler: &dyn Bundler,
    deadline: Option<Instant>,
) -> Result<Measurement, FixtureError> {
    check_deadline(deadline, "preparation")?;
    let prepared = prepare_fixture(fixture, out_dir)?;
    process_fixture(prepared, bundler, deadline)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_prepare_staging_dir_wipes_previous_run() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("dist");
        fs::create_dir_all(out_dir.join("old")).unwrap();
        fs::write(out_dir.join("old/stale.min.js"), "x").unwrap();

        prepare_staging_dir(&out_dir).unwrap();

        assert!(out_dir.is_dir());
        assert_eq!(fs::read_dir(&out_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_prepare_staging_dir_creates_missing() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("a/b/dist");
        prepare_staging_dir(&out_dir).unwrap();
        assert!(out_dir.is_dir());
    }
}
