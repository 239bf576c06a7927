//! Reporter
//!
//! Reduces each candidate's trial durations to its fastest trial and prints
//! one line per candidate.

use crate::errors::{BenchError, BenchResult};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::time::Duration;

/// How fastest-trial times are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStyle {
    /// Fastest trial, covering all repetitions.
    Total,
    /// Fastest trial divided by the repetition count, under a count header.
    PerCall,
}

/// Reduction of one candidate's trials. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    pub label: String,
    pub trials: usize,
    pub min_s: f64,
    pub mean_s: f64,
    pub max_s: f64,
    pub per_call_s: f64,
}

impl TrialSummary {
    pub fn from_durations(
        label: &str,
        durations: &[Duration],
        repetitions: usize,
    ) -> BenchResult<Self> {
        let min = durations.iter().min().ok_or_else(|| {
            BenchError::Unknown(anyhow::anyhow!("No trials recorded for '{}'", label))
        })?;
        let max = durations.iter().max().copied().unwrap_or(*min);
        let total: Duration = durations.iter().sum();
        let min_s = min.as_secs_f64();

        Ok(Self {
            label: label.to_string(),
            trials: durations.len(),
            min_s,
            mean_s: total.as_secs_f64() / durations.len() as f64,
            max_s: max.as_secs_f64(),
            per_call_s: min_s / repetitions.max(1) as f64,
        })
    }
}

/// Results of one benchmark, in the order candidates were added.
#[derive(Debug, Clone, Serialize)]
pub struct Reporter {
    pub benchmark: String,
    pub style: ReportStyle,
    pub repetitions: usize,
    pub replications: usize,
    pub summaries: Vec<TrialSummary>,
}

impl Reporter {
    pub fn new(
        benchmark: &str,
        style: ReportStyle,
        repetitions: usize,
        replications: usize,
    ) -> Self {
        Self {
            benchmark: benchmark.to_string(),
            style,
            repetitions,
            replications,
            summaries: Vec::new(),
        }
    }

    pub fn add(&mut self, label: &str, durations: &[Duration]) -> BenchResult<&TrialSummary> {
        let summary = TrialSummary::from_durations(label, durations, self.repetitions)?;
        self.summaries.push(summary);
        Ok(&self.summaries[self.summaries.len() - 1])
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match self.style {
            ReportStyle::Total => {
                for s in &self.summaries {
                    writeln!(out, "Total time for {}: {} s", s.label, s.min_s)?;
                }
            }
            ReportStyle::PerCall => {
                writeln!(out, "Repetitions : {:>6}", self.repetitions)?;
                writeln!(out, "Replications: {:>6}", self.replications)?;
                for s in &self.summaries {
                    writeln!(out, "Average time for {}: {} s", s.label, s.per_call_s)?;
                }
            }
        }
        Ok(())
    }

    /// Print the report on standard output.
    pub fn print(&self) -> BenchResult<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_to(&mut lock)?;
        Ok(())
    }
}
