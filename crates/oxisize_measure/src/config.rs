use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{debug, info};
use std::{env, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Parser)]
#[command(name = "oxisize")]
#[command(about = "Measure the bundle size of fixtures in a JavaScript monorepo", long_about = None)]
pub struct Config {
    /// Run with verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Root directory of the repository (defaults to git root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Directory holding the packages, relative to the root
    #[arg(long, default_value = "packages")]
    pub packages_dir: PathBuf,

    /// Staging directory for prepared fixtures and bundles (wiped on every run)
    #[arg(long, default_value = "dist")]
    pub out_dir: PathBuf,

    /// Path to the webpack CLI (defaults to node_modules/.bin/webpack under the root)
    #[arg(long)]
    pub bundler: Option<PathBuf>,

    /// Maximum number of fixtures processed at once (defaults to one per CPU)
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Abort fixtures still running after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Config {
    /// Resolve the root, staging directory and bundler into absolute paths
    pub fn initialize(&mut self) -> Result<()> {
        let root = if let Some(r) = self.root.take() {
            debug!("Using provided root directory: {:?}", r);
            r.canonicalize().unwrap_or(r)
        } else {
            debug!("No root provided, searching for git root");
            oxisize_core::find_git_root()?
        };
        info!("Using root directory: {}", root.display());

        if self.out_dir.is_relative() {
            let cwd = env::current_dir().context("Failed to read current directory")?;
            self.out_dir = cwd.join(&self.out_dir);
        }
        debug!("Using staging directory: {}", self.out_dir.display());

        if self.bundler.is_none() {
            let local = root.join("node_modules").join(".bin").join("webpack");
            self.bundler = Some(if local.exists() { local } else { PathBuf::from("webpack") });
        }
        debug!("Using bundler: {:?}", self.bundler);

        self.root = Some(root);
        Ok(())
    }

    /// Get the root directory, returning an error if not initialized
    pub fn root(&self) -> Result<&PathBuf> {
        self.root
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    pub fn packages_path(&self) -> Result<PathBuf> {
        Ok(self.root()?.join(&self.packages_dir))
    }

    pub fn bundler_program(&self) -> Result<&PathBuf> {
        self.bundler
            .as_ref()
            .ok_or_else(|| anyhow!("Config not initialized - call initialize() first"))
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let cfg = Config::parse_from(["oxisize"]);
        assert!(!cfg.verbose);
        assert_eq!(cfg.packages_dir, PathBuf::from("packages"));
        assert_eq!(cfg.out_dir, PathBuf::from("dist"));
        assert_eq!(cfg.jobs, None);
        assert_eq!(cfg.timeout_duration(), None);
    }

    #[test]
    fn test_verbose_flag() {
        assert!(Config::parse_from(["oxisize", "-v"]).verbose);
        assert!(Config::parse_from(["oxisize", "--verbose"]).verbose);
    }

    #[test]
    fn test_initialize_with_root() {
        let temp_dir = TempDir::new().unwrap();
        let bin = temp_dir.path().join("node_modules/.bin");
        fs::create_dir_all(&bin).unwrap();
        fs::write(bin.join("webpack"), "").unwrap();

        let mut cfg = Config::parse_from([
            "oxisize",
            "--root",
            temp_dir.path().to_str().unwrap(),
            "--out-dir",
            temp_dir.path().join("dist").to_str().unwrap(),
        ]);
        cfg.initialize().unwrap();

        let root = temp_dir.path().canonicalize().unwrap();
        assert_eq!(cfg.root().unwrap(), &root);
        assert_eq!(cfg.packages_path().unwrap(), root.join("packages"));
        assert_eq!(cfg.bundler_program().unwrap(), &root.join("node_modules/.bin/webpack"));
        assert_eq!(cfg.out_dir, temp_dir.path().join("dist"));
    }

    #[test]
    fn test_bundler_falls_back_to_path() {
        let temp_dir = TempDir::new().unwrap();
        let mut cfg = Config::parse_from(["oxisize", "--root", temp_dir.path().to_str().unwrap()]);
        cfg.initialize().unwrap();
        assert_eq!(cfg.bundler_program().unwrap(), &PathBuf::from("webpack"));
    }

    #[test]
    fn test_root_before_initialize() {
        let cfg = Config::parse_from(["oxisize"]);
        assert!(cfg.root().is_err());
    }
}
