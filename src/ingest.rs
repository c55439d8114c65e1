//! Loading traces from CSV files.
//!
//! The first row of the file names the variables and every following row holds one sample.
//! Sample times are either read from a named column or generated from a fixed step starting at
//! zero.
//!
//! ```text
//! time,x,y
//! 0.0,8,2
//! 0.5,8,3
//! 1.5,11,1
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;
use tracing::debug;

use crate::trace::{Trace, TraceError};

#[derive(Debug, Clone, PartialEq)]
pub enum TimeSource {
    /// Read the sample times from the column with this name
    Column(String),
    /// Samples are this many time units apart, starting at zero
    Step(f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IngestOptions {
    pub time: TimeSource,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            time: TimeSource::Step(1.0),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Could not open trace file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("Row {row}, column {column}: could not parse \"{value}\" as a number")]
    Format { row: usize, column: String, value: String },

    #[error("Time column {0} is not present in the header")]
    MissingColumn(String),

    #[error("Column {0} appears more than once in the header")]
    DuplicateColumn(String),

    #[error(transparent)]
    Trace(#[from] TraceError),
}

fn parse_row(row: usize, record: &StringRecord, headers: &StringRecord) -> Result<Vec<f64>, IngestError> {
    record
        .iter()
        .zip(headers)
        .map(|(value, column)| {
            f64::from_str(value).map_err(|_| IngestError::Format {
                row,
                column: column.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}

/// Read a trace from any source of CSV data.
pub fn read_trace<R: Read>(reader: R, options: &IngestOptions) -> Result<Trace, IngestError> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();

    for (index, name) in headers.iter().enumerate() {
        if headers.iter().take(index).any(|earlier| earlier == name) {
            return Err(IngestError::DuplicateColumn(name.to_string()));
        }
    }

    let time_index = match &options.time {
        TimeSource::Column(name) => Some(
            headers
                .iter()
                .position(|header| header == name)
                .ok_or_else(|| IngestError::MissingColumn(name.clone()))?,
        ),
        TimeSource::Step(_) => None,
    };

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];

    for (index, record) in reader.records().enumerate() {
        let values = parse_row(index + 1, &record?, &headers)?;

        for (column, value) in columns.iter_mut().zip(values) {
            column.push(value);
        }
    }

    let mut times = None;
    let mut variables = BTreeMap::new();

    for (index, (name, values)) in headers.iter().zip(columns).enumerate() {
        if Some(index) == time_index {
            times = Some(values);
        } else {
            variables.insert(name.to_string(), values);
        }
    }

    let trace = match (&options.time, times) {
        (TimeSource::Column(_), Some(times)) => Trace::new(times, variables)?,
        (TimeSource::Step(step), _) => Trace::uniform(*step, variables)?,
        (TimeSource::Column(name), None) => return Err(IngestError::MissingColumn(name.clone())),
    };

    debug!(samples = trace.len(), variables = headers.len(), "read trace");

    Ok(trace)
}

/// Read a trace from a CSV file.
pub fn load_trace<P: AsRef<Path>>(path: P, options: &IngestOptions) -> Result<Trace, IngestError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    read_trace(file, options)
}
