use crate::candidates::{self, ListStrategy, RemapStrategy, SelectStrategy};
use crate::config::{BenchConfig, ListConfig, RemapConfig, SelectConfig};
use crate::dataset::{self, TableInfo};
use crate::errors::{BenchError, BenchResult};
use crate::harness::{time_stage, Harness};
use crate::io;
use crate::observability::RunRecord;
use crate::report::{ReportStyle, Reporter};
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

/// Runs benchmarks and keeps what they measured for the JSON report.
pub struct Runner {
    show_progress: bool,
    hash_inputs: bool,
    record: RunRecord,
}

impl Runner {
    pub fn new(run_id: Uuid, show_progress: bool) -> Self {
        Self {
            show_progress,
            hash_inputs: false,
            record: RunRecord::new(run_id),
        }
    }

    /// Hash every data file read into the lineage. Only worth it when the
    /// record is saved, since the files can be large.
    pub fn with_lineage(mut self, hash_inputs: bool) -> Self {
        self.hash_inputs = hash_inputs;
        self
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }

    /// Stop the run clock and hand out the record for saving.
    pub fn finish(&mut self) -> &RunRecord {
        self.record.metrics.finish();
        &self.record
    }

    fn add_input(&mut self, path: &Path) -> BenchResult<()> {
        if self.hash_inputs {
            self.record.lineage.add_input(path)?;
        }
        Ok(())
    }

    fn progress_bar(&self, label: &str, trials: usize) -> BenchResult<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let pb = ProgressBar::new(trials as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] {msg} {pos}/{len}")
                .map_err(|e| BenchError::Unknown(e.into()))?
                .progress_chars("#>-"),
        );
        pb.set_message(label.to_string());
        Ok(pb)
    }

    /// Time every candidate in turn and print the report.
    fn time_candidates<S, T, F>(
        &mut self,
        mut reporter: Reporter,
        strategies: &[S],
        label: fn(&S) -> &'static str,
        mut candidate: F,
    ) -> BenchResult<Reporter>
    where
        F: FnMut(&S) -> BenchResult<T>,
    {
        let harness = Harness::new(reporter.replications, reporter.repetitions)?;
        for strategy in strategies {
            let name = label(strategy);
            info!("Timing candidate {}", name);
            let bar = self.progress_bar(name, harness.trials())?;
            let durations = harness
                .clone()
                .with_progress(bar)
                .run(|| candidate(strategy))?;
            reporter.add(name, &durations)?;
        }

        reporter.print()?;
        self.record.benchmarks.push(reporter.clone());
        Ok(reporter)
    }

    fn stage<T, F>(&mut self, name: &str, f: F) -> BenchResult<T>
    where
        F: FnOnce() -> BenchResult<T>,
    {
        let (value, elapsed) = time_stage(name, f)?;
        print_stage_time(elapsed);
        self.record.metrics.record_stage(name, elapsed);
        Ok(value)
    }

    pub fn run_list(&mut self, config: &ListConfig) -> BenchResult<Reporter> {
        info!(
            "Creating normal table: {} rows x {} columns",
            config.rows, config.columns
        );
        let df = dataset::create_dataframe_norm(&config.norm_spec())?;

        let to_vec = |s: &ListStrategy| candidates::column_to_vec(&df, &config.column, *s);
        let results = run_once(&config.candidates, ListStrategy::label, &to_vec)?;
        candidates::verify_agreement(&results, |a, b| candidates::same_values(a, b))?;

        let reporter = Reporter::new(
            "list",
            ReportStyle::Total,
            config.repetitions,
            config.replications,
        );
        self.time_candidates(reporter, &config.candidates, ListStrategy::label, to_vec)
    }

    pub fn run_remap(&mut self, config: &RemapConfig) -> BenchResult<Reporter> {
        let df = dataset::month_table(config.year)?;
        let mapping = dataset::quarter_mapping(config.year)?;
        info!("Remapping {} month codes of {}", df.height(), config.year);

        let remap = |s: &RemapStrategy| {
            candidates::remap_column(&df, &config.source, &config.target, &mapping, *s)
        };
        let results = run_once(&config.candidates, RemapStrategy::label, &remap)?;
        candidates::verify_agreement(&results, |a, b| Ok(a.equals_missing(b)))?;

        let reporter = Reporter::new(
            "remap",
            ReportStyle::Total,
            config.repetitions,
            config.replications,
        );
        self.time_candidates(reporter, &config.candidates, RemapStrategy::label, remap)
    }

    /// Benchmark row selection on the feather file, then on the CSV file.
    pub fn run_select(&mut self, config: &SelectConfig) -> BenchResult<Vec<Reporter>> {
        if config.generate {
            self.generate_files(config)?;
        }

        print_heading("Analysis using feather file");
        println!("Read feather file, create table");
        let df = self.stage("feather: read", || io::read_table(&config.feather_path))?;
        self.add_input(&config.feather_path)?;
        self.describe(&df, "feather: info");
        let feather = self.compare_selections(&df, config, "select (feather)")?;
        drop(df);

        print_heading("Analysis using csv file");
        println!("Reading csv file chunks");
        let chunks = self.stage("csv: read chunks", || {
            io::read_csv_chunked(&config.csv_path, config.chunk_size)
        })?;
        self.add_input(&config.csv_path)?;
        println!("Creating table from csv file chunks");
        let df = self.stage("csv: concat", || Ok(io::concat_chunks(chunks)))?;
        self.describe(&df, "csv: info");
        let csv = self.compare_selections(&df, config, "select (csv)")?;

        Ok(vec![feather, csv])
    }

    fn compare_selections(
        &mut self,
        df: &DataFrame,
        config: &SelectConfig,
        benchmark: &str,
    ) -> BenchResult<Reporter> {
        let select = |s: &SelectStrategy| {
            candidates::select_rows(df, &config.column, &config.value, *s)
        };
        let results = run_once(&config.candidates, SelectStrategy::label, &select)?;
        candidates::verify_agreement(&results, candidates::same_rows)?;
        if let Some((_, rows)) = results.first() {
            info!(
                "{} of {} rows match {} == {:?}",
                rows.height(),
                df.height(),
                config.column,
                config.value
            );
        }
        drop(results);

        let reporter = Reporter::new(
            benchmark,
            ReportStyle::PerCall,
            config.repetitions,
            config.replications,
        );
        let reporter =
            self.time_candidates(reporter, &config.candidates, SelectStrategy::label, select)?;
        println!();
        Ok(reporter)
    }

    fn describe(&mut self, df: &DataFrame, stage: &str) {
        println!("Information about the table:");
        let (info, elapsed) = {
            let start = std::time::Instant::now();
            let info = TableInfo::of(df);
            (info, start.elapsed())
        };
        println!("{}", info);
        print_stage_time(elapsed);
        self.record.metrics.record_stage(stage, elapsed);
    }

    /// Write the CSV file, then the (optionally optimised) feather file.
    pub fn generate_files(&mut self, config: &SelectConfig) -> BenchResult<()> {
        info!(
            "Generating {} rows x {} integer columns",
            config.rows_per_category * dataset::CATEGORIES.len(),
            config.int_columns
        );
        let mut df = dataset::create_category_table(
            config.rows_per_category,
            config.int_columns,
            config.seed,
        )?;
        io::write_table(&mut df, &config.csv_path)?;
        println!("Create a table and save as a csv file");
        println!();

        let mut df = if config.optimize {
            let optimized = dataset::optimize_columns(df)?;
            println!("Information about the table after optimization of columns");
            println!("{}", TableInfo::of(&optimized));
            optimized
        } else {
            df
        };
        io::write_table(&mut df, &config.feather_path)?;
        println!("Save the table as a feather file");
        println!();
        Ok(())
    }

    /// Run the in-memory benchmarks, then row selection when its files exist.
    pub fn run_all(&mut self, config: &BenchConfig) -> BenchResult<()> {
        self.run_list(&config.list)?;
        println!();
        self.run_remap(&config.remap)?;
        println!();

        if config.select.inputs_available() {
            self.run_select(&config.select)?;
        } else {
            warn!(
                "Skipping row selection: {:?} or {:?} not found. Run `framebench select --generate` first.",
                config.select.feather_path, config.select.csv_path
            );
        }
        Ok(())
    }
}

/// Call every candidate once, keeping its labelled result.
fn run_once<S, T, F>(
    strategies: &[S],
    label: fn(&S) -> &'static str,
    mut candidate: F,
) -> BenchResult<Vec<(String, T)>>
where
    F: FnMut(&S) -> BenchResult<T>,
{
    let mut results = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        results.push((label(strategy).to_string(), candidate(strategy)?));
    }
    Ok(results)
}

fn print_heading(title: &str) {
    println!("{}", title);
    println!("{}", "-".repeat(title.len()));
    println!();
}

fn print_stage_time(elapsed: Duration) {
    println!("Execution time : {:.3} s", elapsed.as_secs_f64());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn quick_runner() -> Runner {
        Runner::new(Uuid::new_v4(), false)
    }

    #[test]
    fn test_run_list_reports_every_candidate() {
        let config = ListConfig {
            repetitions: 3,
            replications: 2,
            seed: Some(5),
            ..Default::default()
        };
        let reporter = quick_runner().run_list(&config).unwrap();

        let labels: Vec<&str> = reporter.summaries.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["native", "generic", "array", "export"]);
        assert!(reporter.summaries.iter().all(|s| s.trials == 2));
    }

    #[test]
    fn test_run_list_unknown_column_fails() {
        let config = ListConfig {
            column: "missing".to_string(),
            repetitions: 1,
            replications: 1,
            ..Default::default()
        };
        assert!(quick_runner().run_list(&config).is_err());
    }

    #[test]
    fn test_run_remap() {
        let config = RemapConfig {
            repetitions: 2,
            replications: 2,
            ..Default::default()
        };
        let mut runner = quick_runner();
        let reporter = runner.run_remap(&config).unwrap();

        assert_eq!(reporter.summaries.len(), 2);
        assert_eq!(runner.record().benchmarks.len(), 1);
    }

    #[test]
    fn test_run_select_generates_and_measures_both_files() {
        let dir = tempdir().unwrap();
        let config = SelectConfig {
            feather_path: dir.path().join("rows.feather"),
            csv_path: dir.path().join("rows.csv"),
            repetitions: 2,
            replications: 2,
            chunk_size: 7,
            generate: true,
            rows_per_category: 10,
            int_columns: 3,
            seed: Some(8),
            ..Default::default()
        };
        let mut runner = quick_runner().with_lineage(true);
        let reports = runner.run_select(&config).unwrap();

        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].benchmark, "select (feather)");
        assert_eq!(reports[1].benchmark, "select (csv)");
        assert!(reports.iter().all(|r| r.summaries.len() == 3));
        assert_eq!(runner.record().lineage.inputs.len(), 2);
        assert!(runner
            .record()
            .metrics
            .stage_durations_ms
            .contains_key("csv: read chunks"));
    }

    #[test]
    fn test_run_select_skips_hashing_without_lineage() {
        let dir = tempdir().unwrap();
        let config = SelectConfig {
            feather_path: dir.path().join("rows.feather"),
            csv_path: dir.path().join("rows.csv"),
            repetitions: 1,
            replications: 1,
            generate: true,
            rows_per_category: 4,
            int_columns: 2,
            seed: Some(3),
            ..Default::default()
        };
        let mut runner = quick_runner();
        runner.run_select(&config).unwrap();

        assert!(runner.record().lineage.inputs.is_empty());
        assert!(runner.finish().metrics.total_duration_ms.is_some());
    }

    #[test]
    fn test_run_select_columnar_file_by_extension() {
        let dir = tempdir().unwrap();
        let config = SelectConfig {
            feather_path: dir.path().join("rows.parquet"),
            csv_path: dir.path().join("rows.csv"),
            repetitions: 1,
            replications: 2,
            generate: true,
            rows_per_category: 6,
            int_columns: 2,
            seed: Some(21),
            ..Default::default()
        };
        let reports = quick_runner().run_select(&config).unwrap();

        assert!(config.feather_path.exists());
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.summaries.len() == 3));
    }

    #[test]
    fn test_list_agreement_accepts_nan_values() {
        let config = ListConfig {
            repetitions: 1,
            replications: 1,
            ..Default::default()
        };
        let df = df! { "v" => [0.5f64, f64::NAN] }.unwrap();
        let to_vec = |s: &ListStrategy| candidates::column_to_vec(&df, "v", *s);
        let results = run_once(&config.candidates, ListStrategy::label, &to_vec).unwrap();

        candidates::verify_agreement(&results, |a, b| candidates::same_values(a, b)).unwrap();
    }

    #[test]
    fn test_run_select_missing_file_propagates() {
        let dir = tempdir().unwrap();
        let config = SelectConfig {
            feather_path: dir.path().join("absent.feather"),
            csv_path: dir.path().join("absent.csv"),
            ..Default::default()
        };
        let err = quick_runner().run_select(&config).unwrap_err();
        assert!(matches!(err, BenchError::IoError(_)));
    }
}
