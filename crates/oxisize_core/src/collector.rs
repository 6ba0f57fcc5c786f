use globset::GlobBuilder;
use ignore::WalkBuilder;
use log::{debug, trace};
use std::path::Path;

use crate::{error::DiscoveryError, types::Fixture};

/// Fixture location relative to the packages directory.
pub const FIXTURE_GLOB: &str = "*/bundle-size/*.fixture.js";

pub fn collect_fixtures(packages_dir: &Path) -> Result<Vec<Fixture>, DiscoveryError> {
    debug!("Collecting fixtures matching {:?}", FIXTURE_GLOB);
    if !packages_dir.is_dir() {
        return Err(DiscoveryError::PackagesDirMissing(packages_dir.to_path_buf()));
    }

    // `*` must not cross directory boundaries
    let matcher = GlobBuilder::new(FIXTURE_GLOB).literal_separator(true).build()?.compile_matcher();

    debug!("Walking directory tree from: {}", packages_dir.display());
    let walker = WalkBuilder::new(packages_dir)
        .hidden(true)
        .ignore(true)
        .git_ignore(true)
        .max_depth(Some(3))
        .build();

    let mut fixtures = Vec::new();
    for res in walker {
        let dent = res?;
        let p = dent.path();
        if !p.is_file() {
            continue;
        }

        let Ok(rel_path) = p.strip_prefix(packages_dir) else {
            continue;
        };
        if matcher.is_match(rel_path) {
            trace!("Found fixture: {}", rel_path.display());
            fixtures.push(Fixture {
                source_path: p.to_path_buf(),
                relative_path: rel_path.to_path_buf(),
            });
        }
    }

    fixtures.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    debug!("Collected {} fixtures", fixtures.len());
    Ok(fixtures)
}
