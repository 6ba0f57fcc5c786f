use log::{debug, trace};
use std::{env, path::PathBuf};

use crate::error::DiscoveryError;

pub fn find_git_root() -> Result<PathBuf, DiscoveryError> {
    debug!("Searching for git root");
    let start_dir = env::current_dir().map_err(DiscoveryError::CurrentDir)?;
    let mut current_dir = start_dir.clone();
    trace!("Starting search from: {:?}", current_dir);

    loop {
        let git_dir = current_dir.join(".git");
        trace!("Checking for .git at: {:?}", git_dir);
        if git_dir.exists() {
            debug!("Found git root at: {:?}", current_dir);
            return Ok(current_dir);
        }

        // Try to move up to parent directory
        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => {
                debug!("Could not find .git directory in any parent folder");
                return Err(DiscoveryError::RootNotFound(start_dir));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // Both cases live in one test since they change the process-wide current directory.
    #[test]
    fn test_find_git_root() {
        let original_dir = env::current_dir().unwrap();

        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join(".git")).unwrap();
        let subdir = root.join("packages").join("react-text");
        fs::create_dir_all(&subdir).unwrap();

        env::set_current_dir(&subdir).unwrap();
        let git_root = find_git_root();

        let no_git = TempDir::new().unwrap();
        let nested = no_git.path().join("nested").join("deep");
        fs::create_dir_all(&nested).unwrap();
        env::set_current_dir(&nested).unwrap();
        let not_found = find_git_root();

        env::set_current_dir(original_dir).unwrap();

        // Normalize paths for comparison (canonicalize can add /private prefix on macOS)
        assert_eq!(git_root.unwrap().canonicalize().unwrap(), root.canonicalize().unwrap());
        assert!(matches!(not_found, Err(DiscoveryError::RootNotFound(_))));
    }
}
