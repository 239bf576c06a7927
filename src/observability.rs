use crate::errors::{BenchError, BenchResult};
use crate::report::Reporter;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Read};
use std::path::Path;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Wall-clock durations of the one-off stages of a run (loads, writes).
#[derive(Debug, Serialize)]
pub struct Metrics {
    #[serde(skip)]
    start_time: Instant,
    pub stage_durations_ms: BTreeMap<String, u64>,
    /// Set by [`Metrics::finish`].
    pub total_duration_ms: Option<u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            stage_durations_ms: BTreeMap::new(),
            total_duration_ms: None,
        }
    }

    pub fn record_stage(&mut self, stage: &str, duration: Duration) {
        self.stage_durations_ms
            .insert(stage.to_string(), duration.as_millis() as u64);
    }

    pub fn total_duration(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Freeze the wall-clock time of the whole run.
    pub fn finish(&mut self) {
        self.total_duration_ms = Some(self.total_duration().as_millis() as u64);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct InputFileStats {
    pub path: String,
    pub hash: String, // SHA256 hex
    pub size_bytes: u64,
}

impl InputFileStats {
    pub fn of<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.display().to_string(),
            hash: compute_file_hash(path)?,
            size_bytes: std::fs::metadata(path)?.len(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct Lineage {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
    pub inputs: Vec<InputFileStats>,
}

impl Lineage {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            run_id: run_id.to_string(),
            timestamp: Utc::now(),
            inputs: Vec::new(),
        }
    }

    pub fn add_input<P: AsRef<Path>>(&mut self, path: P) -> io::Result<()> {
        let stats = InputFileStats::of(path)?;
        if !self.inputs.iter().any(|i| i.path == stats.path) {
            self.inputs.push(stats);
        }
        Ok(())
    }
}

/// Everything one invocation measured, as written by `--report-json`.
#[derive(Debug, Serialize)]
pub struct RunRecord {
    pub lineage: Lineage,
    pub metrics: Metrics,
    pub benchmarks: Vec<Reporter>,
}

impl RunRecord {
    pub fn new(run_id: Uuid) -> Self {
        Self {
            lineage: Lineage::new(run_id),
            metrics: Metrics::new(),
            benchmarks: Vec::new(),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> BenchResult<()> {
        let file = File::create(path.as_ref()).map_err(BenchError::IoError)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| BenchError::Unknown(e.into()))?;
        Ok(())
    }
}

pub fn compute_file_hash<P: AsRef<Path>>(path: P) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0; 8192];

    loop {
        let count = file.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
