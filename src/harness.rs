//! Timing harness
//!
//! Runs a candidate `repetitions` times back to back inside one timed region
//! and repeats that for `trials` regions. There is no warm-up phase.

use crate::errors::{BenchError, BenchResult};
use indicatif::ProgressBar;
use std::hint::black_box;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Clone)]
pub struct Harness {
    trials: usize,
    repetitions: usize,
    progress: Option<ProgressBar>,
}

impl Harness {
    pub fn new(trials: usize, repetitions: usize) -> BenchResult<Self> {
        if trials == 0 || repetitions == 0 {
            return Err(BenchError::config(format!(
                "trials ({}) and repetitions ({}) must both be at least 1",
                trials, repetitions
            )));
        }
        Ok(Self {
            trials,
            repetitions,
            progress: None,
        })
    }

    /// Tick `bar` once per finished trial.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Time `candidate`, returning one duration per trial.
    ///
    /// The first error returned by the candidate aborts the run.
    pub fn run<T, F>(&self, mut candidate: F) -> BenchResult<Vec<Duration>>
    where
        F: FnMut() -> BenchResult<T>,
    {
        if let Some(bar) = &self.progress {
            bar.set_length(self.trials as u64);
            bar.set_position(0);
        }

        let mut durations = Vec::with_capacity(self.trials);
        for trial in 0..self.trials {
            let start = Instant::now();
            for _ in 0..self.repetitions {
                black_box(candidate()?);
            }
            let elapsed = start.elapsed();
            debug!(trial, elapsed_s = elapsed.as_secs_f64(), "trial finished");
            durations.push(elapsed);

            if let Some(bar) = &self.progress {
                bar.inc(1);
            }
        }

        if let Some(bar) = &self.progress {
            bar.finish_and_clear();
        }
        Ok(durations)
    }
}

/// Time a one-off stage such as loading a file and log how long it took.
pub fn time_stage<T, F>(label: &str, f: F) -> BenchResult<(T, Duration)>
where
    F: FnOnce() -> BenchResult<T>,
{
    let start = Instant::now();
    let value = f()?;
    let elapsed = start.elapsed();
    info!(stage = label, elapsed_s = elapsed.as_secs_f64(), "stage finished");
    Ok((value, elapsed))
}
