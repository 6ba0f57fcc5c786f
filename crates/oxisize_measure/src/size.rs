use flate2::{Compression, write::GzEncoder};
use std::{
    fs,
    io::{self, Write},
    path::Path,
    time::Duration,
};

pub fn bytes_to_kb(bytes: u64) -> String {
    format!("{:.2} KB", bytes as f64 / 1024.0)
}

pub fn format_seconds(seconds: f64) -> String {
    format!("{:.2}s", seconds)
}

pub fn format_duration(elapsed: Duration) -> String {
    format_seconds(elapsed.as_secs_f64())
}

pub fn file_size(path: &Path) -> io::Result<u64> {
    Ok(fs::metadata(path)?.len())
}

/// Size of `data` after gzip compression at the highest level.
pub fn gzip_size(data: &[u8]) -> io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?.len() as u64)
}

pub fn gzip_file_size(path: &Path) -> io::Result<u64> {
    gzip_size(&fs::read(path)?)
}
