//! Memory usage sampling

use std::io;
use std::path::PathBuf;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// System memory usage at one point in time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MemorySnapshot {
    /// Used memory as a percentage of total
    pub percent: f64,
    pub used_gb: f64,
    pub available_gb: f64,
    pub total_gb: f64,
}

impl MemorySnapshot {
    /// Build from total and available byte counts; used = total - available
    pub fn from_bytes(total: u64, available: u64) -> Self {
        let used = total.saturating_sub(available);
        let percent = if total == 0 {
            0.0
        } else {
            used as f64 / total as f64 * 100.0
        };
        Self {
            percent,
            used_gb: used as f64 / BYTES_PER_GB,
            available_gb: available as f64 / BYTES_PER_GB,
            total_gb: total as f64 / BYTES_PER_GB,
        }
    }

    /// Build from a usage percent and total size
    pub fn from_percent(percent: f64, total_gb: f64) -> Self {
        let used_gb = total_gb * percent / 100.0;
        Self {
            percent,
            used_gb,
            available_gb: total_gb - used_gb,
            total_gb,
        }
    }
}

/// Anything that can report current memory usage
pub trait MemorySource: Send + Sync {
    fn sample(&self) -> io::Result<MemorySnapshot>;
}

/// Reads `/proc/meminfo` (Linux)
#[derive(Debug, Clone)]
pub struct ProcMeminfo {
    path: PathBuf,
}

impl Default for ProcMeminfo {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl ProcMeminfo {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl MemorySource for ProcMeminfo {
    fn sample(&self) -> io::Result<MemorySnapshot> {
        let contents = std::fs::read_to_string(&self.path)?;
        parse_meminfo(&contents)
    }
}

/// Parse `MemTotal` and `MemAvailable` (kB) from meminfo text
pub fn parse_meminfo(contents: &str) -> io::Result<MemorySnapshot> {
    let mut total = None;
    let mut available = None;

    for line in contents.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let slot = match key.trim() {
            "MemTotal" => &mut total,
            "MemAvailable" => &mut available,
            _ => continue,
        };
        let kb = value
            .split_whitespace()
            .next()
            .and_then(|v| v.parse::<u64>().ok())
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidData, format!("bad meminfo line: {}", line))
            })?;
        *slot = Some(kb * 1024);
    }

    match (total, available) {
        (Some(total), Some(available)) => Ok(MemorySnapshot::from_bytes(total, available)),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "meminfo lacks MemTotal or MemAvailable",
        )),
    }
}
