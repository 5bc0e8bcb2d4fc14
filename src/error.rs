use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),
}

/// A problem with one row of the input. Rows never abort an import; these are
/// collected and reported as warnings.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("line {line}: unreadable row: {source}")]
    Csv {
        line: u64,
        #[source]
        source: csv::Error,
    },

    #[error("line {line}: cannot parse {column} date {value:?}")]
    UnparseableDate {
        line: u64,
        column: &'static str,
        value: String,
    },
}
