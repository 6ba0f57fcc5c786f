//! Bundler service.
//!
//! Bundling is delegated to an external tool behind the [`Bundler`] trait.
//! [`WebpackBundler`] drives the webpack CLI: it writes a config module next to
//! the entry, runs webpack with `--json <file>` and reads the stats back.
//! Errors and warnings reported in the stats both fail the fixture.

use log::{debug, trace, warn};
use oxisize_core::FixtureError;
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

/// Packages provided by the host page, mapped to their global names.
pub const EXTERNALS: &[(&str, &str)] = &[("react", "react"), ("react-dom", "reactDOM")];

const POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct BundleRequest<'a> {
    pub entry_path: &'a Path,
    pub output_path: &'a Path,
    pub externals: &'a [(&'a str, &'a str)],
    pub mode: &'a str,
    pub target: &'a str,
}

impl<'a> BundleRequest<'a> {
    /// Production browser bundle with minimization left to the minifier.
    pub fn production(entry_path: &'a Path, output_path: &'a Path) -> Self {
        Self { entry_path, output_path, externals: EXTERNALS, mode: "production", target: "web" }
    }
}

pub trait Bundler: Send + Sync {
    /// Bundle `request.entry_path` into `request.output_path`. Implementations
    /// must give up once `deadline` has passed.
    fn bundle(&self, request: &BundleRequest<'_>, deadline: Option<Instant>)
    -> Result<(), FixtureError>;
}

pub struct WebpackBundler {
    program: PathBuf,
}

impl WebpackBundler {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into() }
    }
}

impl Bundler for WebpackBundler {
    fn bundle(
        &self,
        request: &BundleRequest<'_>,
        deadline: Option<Instant>,
    ) -> Result<(), FixtureError> {
        let config_path = request.output_path.with_extension("webpack.config.js");
        let stats_path = request.output_path.with_extension("stats.json");
        let stderr_path = request.output_path.with_extension("stderr.log");

        let config = format!("module.exports = {};\n", webpack_config(request));
        fs::write(&config_path, config).map_err(|e| FixtureError::io(&config_path, e))?;
        trace!("Wrote webpack config: {}", config_path.display());

        // Output goes to files so a chatty webpack can never block on a full pipe
        let stderr = File::create(&stderr_path).map_err(|e| FixtureError::io(&stderr_path, e))?;
        let child = Command::new(&self.program)
            .arg("--config")
            .arg(&config_path)
            .arg("--json")
            .arg(&stats_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(stderr)
            .spawn()
            .map_err(|e| {
                FixtureError::Bundle(vec![format!(
                    "failed to spawn {}: {}",
                    self.program.display(),
                    e
                )])
            })?;
        debug!("Spawned webpack for {}", request.entry_path.display());

        let status = wait_with_deadline(child, deadline)?;

        let stats = fs::read_to_string(&stats_path).ok();
        let mut messages = match &stats {
            Some(raw) => stats_problems(raw),
            None => Vec::new(),
        };

        if !status.success() && messages.is_empty() {
            let stderr = fs::read_to_string(&stderr_path).unwrap_or_default();
            messages.push(format!("webpack exited with {}: {}", status, stderr.trim()));
        }
        if messages.is_empty() && !request.output_path.exists() {
            messages.push(format!("webpack did not write {}", request.output_path.display()));
        }

        if messages.is_empty() { Ok(()) } else { Err(FixtureError::Bundle(messages)) }
    }
}

fn wait_with_deadline(
    mut child: Child,
    deadline: Option<Instant>,
) -> Result<ExitStatus, FixtureError> {
    let Some(deadline) = deadline else {
        return child.wait().map_err(|e| FixtureError::Bundle(vec![e.to_string()]));
    };

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(e) => return Err(FixtureError::Bundle(vec![e.to_string()])),
        }

        if Instant::now() >= deadline {
            warn!("Bundler still running at deadline, killing pid {}", child.id());
            let _ = child.kill();
            let _ = child.wait();
            return Err(FixtureError::TimedOut { stage: "bundling finished" });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

fn webpack_config(request: &BundleRequest<'_>) -> Value {
    let externals: serde_json::Map<String, Value> = request
        .externals
        .iter()
        .map(|(module, global)| (module.to_string(), Value::String(global.to_string())))
        .collect();

    let file_name = request.output_path.file_name().map(|n| n.to_string_lossy().to_string());
    let dir = request.output_path.parent().map(|p| p.to_string_lossy().to_string());

    json!({
        "name": "client",
        "target": request.target,
        "mode": request.mode,
        "cache": { "type": "memory" },
        "externals": externals,
        "entry": request.entry_path.to_string_lossy(),
        "output": {
            "filename": file_name,
            "path": dir,
            "pathinfo": true,
        },
        "performance": { "hints": false },
        "optimization": { "minimize": false },
        "stats": { "optimizationBailout": true },
    })
}

#[derive(Debug, Default, Deserialize)]
struct WebpackStats {
    #[serde(default)]
    errors: Vec<StatsMessage>,
    #[serde(default)]
    warnings: Vec<StatsMessage>,
}

/// webpack 5 reports objects, webpack 4 plain strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatsMessage {
    Text(String),
    Detailed {
        message: String,
        #[serde(default, rename = "moduleName")]
        module_name: Option<String>,
    },
}

impl StatsMessage {
    fn render(&self, severity: &str) -> String {
        match self {
            StatsMessage::Text(text) => format!("{}: {}", severity, text),
            StatsMessage::Detailed { message, module_name: Some(module) } => {
                format!("{} in {}: {}", severity, module, message)
            }
            StatsMessage::Detailed { message, module_name: None } => {
                format!("{}: {}", severity, message)
            }
        }
    }
}

/// Errors and warnings from a stats JSON document. Unparseable stats count as an error.
fn stats_problems(raw: &str) -> Vec<String> {
    let stats: WebpackStats = match serde_json::from_str(raw) {
        Ok(stats) => stats,
        Err(e) => return vec![format!("could not parse webpack stats: {}", e)],
    };

    stats
        .errors
        .iter()
        .map(|m| m.render("error"))
        .chain(stats.warnings.iter().map(|m| m.render("warning")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_webpack_config() {
        let entry = Path::new("/dist/pkg/bundle-size/Foo.fixture.js");
        let output = Path::new("/dist/pkg/bundle-size/Foo.output.js");
        let config = webpack_config(&BundleRequest::production(entry, output));

        assert_eq!(config["mode"], "production");
        assert_eq!(config["target"], "web");
        assert_eq!(config["entry"], "/dist/pkg/bundle-size/Foo.fixture.js");
        assert_eq!(config["output"]["filename"], "Foo.output.js");
        assert_eq!(config["output"]["path"], "/dist/pkg/bundle-size");
        assert_eq!(config["externals"]["react"], "react");
        assert_eq!(config["externals"]["react-dom"], "reactDOM");
        assert_eq!(config["optimization"]["minimize"], false);
    }

    #[test]
    fn test_stats_without_problems() {
        assert!(stats_problems(r#"{"errors": [], "warnings": [], "hash": "abc"}"#).is_empty());
        assert!(stats_problems(r#"{}"#).is_empty());
    }

    #[test]
    fn test_stats_errors_and_warnings() {
        let raw = r#"{
            "errors": [{ "message": "Module not found", "moduleName": "./Foo.fixture.js" }],
            "warnings": ["size limit exceeded"]
        }"#;
        let problems = stats_problems(raw);
        assert_eq!(
            problems,
            vec![
                "error in ./Foo.fixture.js: Module not found".to_string(),
                "warning: size limit exceeded".to_string()
            ]
        );
    }

    #[test]
    fn test_unparseable_stats() {
        let problems = stats_problems("not json");
        assert_eq!(problems.len(), 1);
        assert!(problems[0].starts_with("could not parse webpack stats"));
    }

    #[test]
    fn test_missing_program_is_bundle_error() {
        let temp_dir = TempDir::new().unwrap();
        let entry = temp_dir.path().join("Foo.fixture.js");
        let output = temp_dir.path().join("Foo.output.js");
        fs::write(&entry, "export const x = 1;").unwrap();

        let bundler = WebpackBundler::new(temp_dir.path().join("no-such-webpack"));
        let err = bundler.bundle(&BundleRequest::production(&entry, &output), None).unwrap_err();
        assert_eq!(err.kind(), "BundleError");
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[cfg(unix)]
    #[test]
    fn test_deadline_kills_bundler() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let script = temp_dir.path().join("slow-webpack");
        fs::write(&script, "#!/bin/sh\nsleep 10\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        let entry = temp_dir.path().join("Foo.fixture.js");
        let output = temp_dir.path().join("Foo.output.js");

        let started = Instant::now();
        let deadline = Some(started + Duration::from_millis(200));
        let err = WebpackBundler::new(&script)
            .bundle(&BundleRequest::production(&entry, &output), deadline)
            .unwrap_err();

        assert_eq!(err.kind(), "TimeoutError");
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
