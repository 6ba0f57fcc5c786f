use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use log::{debug, info};
use oxisize_measure::{Config, WebpackBundler};
use std::io::{BufWriter, Write};
use std::time::Instant;

fn main() -> Result<()> {
    let mut cfg = Config::parse();

    // --verbose surfaces the per-step progress logged at info level; RUST_LOG still wins
    let default_filter = if cfg.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();
    debug!("Parsed CLI arguments: {:?}", cfg);

    // stdio is blocked by LineWriter, use a BufWriter to reduce syscalls.
    // See https://github.com/rust-lang/rust/issues/60673
    let mut stdout = BufWriter::new(std::io::stdout());

    let start = Instant::now();

    cfg.initialize()?;
    oxisize_measure::prepare_staging_dir(&cfg.out_dir)?;
    if cfg.verbose {
        writeln!(stdout, "{}", "✔ Dist is cleared".blue())?;
    }

    let fixtures = oxisize_measure::discover_fixtures(&cfg)?;
    writeln!(
        stdout,
        "{}",
        format!("Measuring bundle size for {} fixtures...", fixtures.len()).green()
    )?;
    if cfg.verbose {
        let ids: Vec<String> = fixtures.iter().map(|f| f.id()).collect();
        oxisize_measure::print_fixture_list(&mut stdout, &ids)?;
    }
    stdout.flush()?;

    let bundler = WebpackBundler::new(cfg.bundler_program()?);
    let result = oxisize_measure::measure_fixtures(&cfg, &fixtures, &bundler)?;
    debug!("{} measurements, {} failures", result.measurements.len(), result.failures.len());

    oxisize_measure::print_report(&mut stdout, &result.measurements)?;
    oxisize_measure::print_failures(&mut stdout, &result.failures)?;
    oxisize_measure::print_completed(&mut stdout, start.elapsed())?;
    stdout.flush()?;

    if !result.is_success() {
        info!("{} fixtures failed", result.failures.len());
        // Non-zero exit to fail CI
        std::process::exit(1);
    }

    Ok(())
}
