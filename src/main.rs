use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use brc_pipeline::chunked::aggregate_file_chunked;
use brc_pipeline::*;
use clap::{Parser, ValueEnum};
use similar::{ChangeTag, TextDiff};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Engine {
    /// Reader thread, parser workers and one aggregator over channels
    Pipeline,
    /// Whole file in memory, chunks folded on the rayon pool
    Chunked,
}

/// Per-key min/mean/max over a `key;value` file
#[derive(Parser, Debug)]
#[command(name = "brc", version, long_about = None)]
struct Cli {
    /// Input file, one `key;value` record per line
    path: PathBuf,

    /// Print debug logs (otherwise RUST_LOG, default warn)
    #[arg(short, long)]
    debug: bool,

    /// Number of parser workers / chunks (default: available CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Value parser: exact, fast or general
    #[arg(long, default_value = "exact")]
    parser: ParseStrategy,

    /// Longer lines are truncated
    #[arg(long, default_value_t = MAX_LINE_LEN)]
    max_line_len: usize,

    #[arg(long, value_enum, default_value = "pipeline")]
    engine: Engine,

    /// Compare the summary with this file and fail on mismatch
    #[arg(long, value_name = "FILE")]
    expect: Option<PathBuf>,
}

fn init_logging(debug: bool) {
    let mut builder = if debug {
        let mut b = env_logger::Builder::new();
        b.filter_level(log::LevelFilter::Debug);
        b
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
    };
    builder.target(env_logger::Target::Stderr).init();
}

fn pipeline_config(cli: &Cli) -> PipelineConfig {
    let mut c = PipelineConfig::default()
        .with_max_line_len(cli.max_line_len)
        .with_strategy(cli.parser);
    if let Some(w) = cli.workers {
        c = c.with_workers(w);
    }
    c
}

fn aggregate(cli: &Cli) -> Result<AggregateMap> {
    let config = pipeline_config(cli);
    log::debug!("{:?} engine, {:?}", cli.engine, config);
    match cli.engine {
        Engine::Pipeline => {
            let mut source = ReaderLineSource::open(&cli.path)?;
            Ok(Pipeline::new(config)?.run(&mut source)?.stats)
        }
        Engine::Chunked => aggregate_file_chunked(&cli.path, &config),
    }
}

/// Prints a line diff to stderr; returns whether both sides match.
fn check_expected(summary: &str, path: &Path) -> Result<bool> {
    let expected = fs::read_to_string(path)
        .map_err(|source| PipelineError::FileOpen { path: path.to_path_buf(), source })?;
    let expected = expected.trim_end();
    if expected == summary {
        return Ok(true);
    }
    // one record per line makes the diff readable
    let split = |s: &str| s.trim_matches(|c: char| c == '{' || c == '}').replace(", ", "\n") + "\n";
    let (old, new) = (split(expected), split(summary));
    let diff = TextDiff::from_lines(&old, &new);
    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => "-",
            ChangeTag::Insert => "+",
            ChangeTag::Equal => continue,
        };
        eprint!("{sign}{change}");
    }
    Ok(false)
}

fn run(cli: &Cli) -> Result<bool> {
    let stats = aggregate(cli)?;
    WriterReporter::new(io::stdout().lock()).report(&stats)?;
    match &cli.expect {
        Some(path) => check_expected(&format_summary(&stats), path),
        None => Ok(true),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let now = Instant::now();
    let result = run(&cli);
    log::info!("took {:?}", now.elapsed());

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            eprintln!("summary does not match expectation");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
