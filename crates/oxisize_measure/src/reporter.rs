use colored::Colorize;
use log::debug;
use std::{
    io::{self, Write},
    time::Duration,
};
use tabled::{builder::Builder, settings::Style};

use crate::{
    size::format_duration,
    types::{FixtureFailure, Measurement},
};

const HEADER: [&str; 3] = ["Fixture name", "Minified size", "Gzip size"];

/// Report order: ascending by output path.
pub fn sort_measurements(measurements: &mut [Measurement]) {
    measurements.sort_by(|a, b| a.output_path.as_os_str().cmp(b.output_path.as_os_str()));
}

pub fn render_table(measurements: &[Measurement]) -> String {
    let mut builder = Builder::default();
    builder.push_record(HEADER.map(String::from));
    for m in measurements {
        builder.push_record([m.name.clone(), m.minified_size.clone(), m.gzipped_size.clone()]);
    }

    let mut table = builder.build();
    table.with(Style::modern());
    table.to_string()
}

pub fn print_report<W: Write>(writer: &mut W, measurements: &[Measurement]) -> io::Result<()> {
    debug!("Printing report for {} measurements", measurements.len());
    let mut sorted = measurements.to_vec();
    sort_measurements(&mut sorted);
    writeln!(writer, "{}", render_table(&sorted))?;
    Ok(())
}

pub fn print_failures<W: Write>(writer: &mut W, failures: &[FixtureFailure]) -> io::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    writeln!(
        writer,
        "\n{} {} fixture(s) failed:",
        "✖".red().bold(),
        failures.len().to_string().red().bold()
    )?;
    for failure in failures {
        writeln!(
            writer,
            "  {} {} {}",
            failure.fixture.blue(),
            format!("[{}]", failure.error.kind()).red(),
            failure.error.to_string().replace('\n', "\n      ")
        )?;
    }
    Ok(())
}

pub fn print_fixture_list<W: Write>(writer: &mut W, fixtures: &[String]) -> io::Result<()> {
    for fixture in fixtures {
        writeln!(writer, "{}", format!("  - {}", fixture).blue())?;
    }
    Ok(())
}

pub fn print_completed<W: Write>(writer: &mut W, elapsed: Duration) -> io::Result<()> {
    writeln!(writer, "{}", format!("✔ Completed in {}", format_duration(elapsed)).green())?;
    writer.flush()?;
    Ok(())
}
