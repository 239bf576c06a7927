use clap::{Args, Parser, Subcommand, ValueEnum};
use framebench::candidates::{ListStrategy, RemapStrategy, SelectStrategy};
use framebench::config::{BenchConfig, ListConfig, RemapConfig, SelectConfig};
use framebench::runner::Runner;
use miette::Result;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

#[derive(Clone, ValueEnum, Debug)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "framebench")]
#[command(version = "0.1.0")]
#[command(about = "Time alternative polars strategies for common table operations", long_about = None)]
struct Cli {
    /// Benchmark to run (all of them when omitted)
    #[command(subcommand)]
    command: Option<Commands>,

    /// Increase logging verbosity (Info -> Debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Silence all logs and progress bars
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format (text or json)
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// YAML file overriding the built-in benchmark parameters
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Write the measured results, stage timings and input hashes as JSON
    #[arg(long, value_name = "PATH", global = true)]
    report_json: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy one column of a synthetic normal table into a Vec
    List(ListArgs),
    /// Remap YYYY/MM month codes to YYYY-nQ quarter codes
    Remap(RemapArgs),
    /// Select rows by value from a feather file and a CSV file
    Select(SelectArgs),
    /// Run every benchmark whose inputs are available
    All,
}

#[derive(Args)]
struct TimingArgs {
    /// Consecutive calls inside one timed trial
    #[arg(long)]
    repetitions: Option<usize>,

    /// Number of timed trials per candidate
    #[arg(long)]
    replications: Option<usize>,
}

impl TimingArgs {
    fn apply(&self, repetitions: &mut usize, replications: &mut usize) {
        if let Some(n) = self.repetitions {
            *repetitions = n;
        }
        if let Some(n) = self.replications {
            *replications = n;
        }
    }
}

#[derive(Args)]
struct ListArgs {
    #[command(flatten)]
    timing: TimingArgs,

    /// Column to convert
    #[arg(long)]
    column: Option<String>,

    /// Rows of the synthetic table
    #[arg(long)]
    rows: Option<usize>,

    /// Columns of the synthetic table
    #[arg(long)]
    columns: Option<usize>,

    /// Seed for the synthetic table
    #[arg(long)]
    seed: Option<u64>,

    /// Candidates to time
    #[arg(long, value_enum, value_delimiter = ',')]
    candidates: Option<Vec<ListStrategy>>,
}

impl ListArgs {
    fn apply(self, config: &mut ListConfig) {
        self.timing
            .apply(&mut config.repetitions, &mut config.replications);
        if let Some(column) = self.column {
            config.column = column;
        }
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(columns) = self.columns {
            config.columns = columns;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(candidates) = self.candidates {
            config.candidates = candidates;
        }
    }
}

#[derive(Args)]
struct RemapArgs {
    #[command(flatten)]
    timing: TimingArgs,

    /// Year of the month codes
    #[arg(long)]
    year: Option<u16>,

    /// Candidates to time
    #[arg(long, value_enum, value_delimiter = ',')]
    candidates: Option<Vec<RemapStrategy>>,
}

impl RemapArgs {
    fn apply(self, config: &mut RemapConfig) {
        self.timing
            .apply(&mut config.repetitions, &mut config.replications);
        if let Some(year) = self.year {
            config.year = year;
        }
        if let Some(candidates) = self.candidates {
            config.candidates = candidates;
        }
    }
}

#[derive(Args)]
struct SelectArgs {
    #[command(flatten)]
    timing: TimingArgs,

    /// Feather (Arrow IPC) data file
    #[arg(long, value_name = "PATH")]
    feather: Option<PathBuf>,

    /// CSV data file
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Column compared against the value
    #[arg(long)]
    column: Option<String>,

    /// Value the selected rows hold
    #[arg(long)]
    value: Option<String>,

    /// Rows per CSV read batch
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Write both data files before benchmarking
    #[arg(long)]
    generate: bool,

    /// Rows per category when generating
    #[arg(long)]
    rows_per_category: Option<usize>,

    /// Integer columns when generating
    #[arg(long)]
    int_columns: Option<usize>,

    /// Keep the generated feather file's column types as written to CSV
    #[arg(long)]
    no_optimize: bool,

    /// Seed for the generated table
    #[arg(long)]
    seed: Option<u64>,

    /// Candidates to time
    #[arg(long, value_enum, value_delimiter = ',')]
    candidates: Option<Vec<SelectStrategy>>,
}

impl SelectArgs {
    fn apply(self, config: &mut SelectConfig) {
        self.timing
            .apply(&mut config.repetitions, &mut config.replications);
        if let Some(path) = self.feather {
            config.feather_path = path;
        }
        if let Some(path) = self.csv {
            config.csv_path = path;
        }
        if let Some(column) = self.column {
            config.column = column;
        }
        if let Some(value) = self.value {
            config.value = value;
        }
        if let Some(chunk_size) = self.chunk_size {
            config.chunk_size = chunk_size;
        }
        if self.generate {
            config.generate = true;
        }
        if let Some(rows) = self.rows_per_category {
            config.rows_per_category = rows;
        }
        if let Some(columns) = self.int_columns {
            config.int_columns = columns;
        }
        if self.no_optimize {
            config.optimize = false;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(candidates) = self.candidates {
            config.candidates = candidates;
        }
    }
}

fn main() -> Result<()> {
    // Parse CLI args first
    let cli = Cli::parse();

    let default_level = if cli.quiet {
        Level::ERROR
    } else if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    // FRAMEBENCH_LOG takes precedence over --verbose/--quiet
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("FRAMEBENCH_LOG")
        .from_env_lossy();

    let run_id = Uuid::new_v4();

    match cli.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .json()
                .with_span_list(false)
                .with_current_span(false)
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    let _span = tracing::info_span!("root", run_id = %run_id).entered();

    let mut config = match &cli.config {
        Some(path) => BenchConfig::from_path(path)?,
        None => BenchConfig::default(),
    };
    let mut runner = Runner::new(run_id, !cli.quiet).with_lineage(cli.report_json.is_some());

    match cli.command.unwrap_or(Commands::All) {
        Commands::List(args) => {
            args.apply(&mut config.list);
            runner.run_list(&config.list)?;
        }
        Commands::Remap(args) => {
            args.apply(&mut config.remap);
            runner.run_remap(&config.remap)?;
        }
        Commands::Select(args) => {
            args.apply(&mut config.select);
            runner.run_select(&config.select)?;
        }
        Commands::All => runner.run_all(&config)?,
    }

    if let Some(path) = &cli.report_json {
        runner.finish().save(path)?;
        tracing::info!("Wrote report to {:?}", path);
    }

    Ok(())
}
