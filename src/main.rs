//! Estimate the probability that a population of traces satisfies a formula.
//!
//! ```text
//! fleance [OPTIONS] <csv_dir> <property>...
//! fleance [OPTIONS] <confidence> <csv_dir> <property>...
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use fleance::formula::AlgebraError;
use fleance::ingest::{load_trace, IngestError, IngestOptions, TimeSource};
use fleance::parser::{parse_formula, ParseError};
use fleance::statistics::{SatisfactionRate, StatisticsError, Verifier};
use fleance::{Config, EvaluationError, PointEvaluator, Robustness, VectorizedEvaluator};

const DEFAULT_CONFIDENCE: f64 = 0.95;

#[derive(Parser, Debug)]
#[command(name = "fleance")]
#[command(about = "Statistical model checking of Signal Temporal Logic formulas over CSV traces")]
#[command(version)]
struct Cli {
    /// Optional confidence level, the directory of CSV traces, and the formula to check
    #[arg(value_name = "ARGS", num_args = 2.., required = true)]
    args: Vec<String>,

    /// Read sample times from this column instead of using a fixed step
    #[arg(long)]
    time_column: Option<String>,

    /// Time between consecutive samples when no time column is given
    #[arg(long, default_value_t = 1.0)]
    time_step: f64,

    /// Robustness assigned to the true constant
    #[arg(long, default_value_t = fleance::config::DEFAULT_MAXIMUM_ROBUSTNESS)]
    maximum_robustness: f64,

    /// Evaluate with the recursive point evaluator
    #[arg(long, default_value_t = false)]
    point: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Confidence level {0} must lie strictly between 0 and 1")]
    Confidence(f64),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Statistics(#[from] StatisticsError),

    #[error("Could not read directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No CSV traces found in {0}")]
    NoTraces(PathBuf),

    #[error("{path}: {source}")]
    Ingest {
        path: PathBuf,
        #[source]
        source: IngestError,
    },

    #[error("{path}: {source}")]
    Trace {
        path: PathBuf,
        #[source]
        source: EvaluationError,
    },
}

/// Positional arguments after resolving the optional leading confidence level.
#[derive(Debug, PartialEq)]
struct Positionals {
    confidence: f64,
    directory: PathBuf,
    property: String,
}

fn positionals(args: &[String]) -> Positionals {
    if let [first, directory, property @ ..] = args {
        if let (Ok(confidence), false) = (first.parse::<f64>(), property.is_empty()) {
            return Positionals {
                confidence,
                directory: PathBuf::from(directory),
                property: property.join(" "),
            };
        }
    }

    let (directory, property) = args.split_first().map_or(("", &[][..]), |(first, rest)| (first.as_str(), rest));

    Positionals {
        confidence: DEFAULT_CONFIDENCE,
        directory: PathBuf::from(directory),
        property: property.join(" "),
    }
}

fn is_csv(path: &Path) -> bool {
    matches!(path.extension().and_then(|ext| ext.to_str()), Some("csv" | "CSV"))
}

fn trace_files(directory: &Path) -> Result<Vec<PathBuf>, CliError> {
    let entries = fs::read_dir(directory).map_err(|source| CliError::Directory {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();

    for entry in entries {
        let path = entry
            .map_err(|source| CliError::Directory {
                path: directory.to_path_buf(),
                source,
            })?
            .path();

        if path.is_file() && is_csv(&path) {
            files.push(path);
        } else {
            warn!(path = %path.display(), "skipping entry that is not a CSV file");
        }
    }

    files.sort();

    if files.is_empty() {
        return Err(CliError::NoTraces(directory.to_path_buf()));
    }

    Ok(files)
}

fn run(cli: Cli) -> Result<(), CliError> {
    let Positionals {
        confidence,
        directory,
        property,
    } = positionals(&cli.args);

    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(CliError::Confidence(confidence));
    }

    let formula = parse_formula(&property)?.expand_concatenations()?;
    debug!(%formula, "parsed property");

    let config = Config::new().with_maximum_robustness(cli.maximum_robustness);
    let evaluator: Box<dyn Robustness> = if cli.point {
        Box::new(PointEvaluator::new(formula, config)?)
    } else {
        Box::new(VectorizedEvaluator::compile(&formula, config)?)
    };

    let options = IngestOptions {
        time: match cli.time_column {
            Some(column) => TimeSource::Column(column),
            None => TimeSource::Step(cli.time_step),
        },
    };

    let verifier = Verifier::new(evaluator, confidence)?;
    let mut satisfaction = SatisfactionRate::default();

    for path in trace_files(&directory)? {
        let trace = load_trace(&path, &options).map_err(|source| CliError::Ingest {
            path: path.clone(),
            source,
        })?;
        let robustness = verifier
            .record(&mut satisfaction, &trace)
            .map_err(|source| CliError::Trace {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), robustness, "evaluated trace");
    }

    let report = verifier.report(satisfaction)?;
    println!("{report}");

    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
