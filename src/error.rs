use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Every way a report can fail to become a page. None of these are recovered.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to read report input: {0}")]
    InputRead(#[source] io::Error),

    #[error("Failed to decode report: {0}")]
    InputDecode(#[from] serde_json::Error),

    #[error("Invalid date label {value:?} at visitors entry {index}: {source}")]
    DateParse {
        index: usize,
        value: String,
        #[source]
        source: DateLabelError,
    },

    #[error("Failed to render chart markup: {0}")]
    Markup(String),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Failed to read template {path:?}: {source}")]
    TemplateIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to write output: {0}")]
    OutputWrite(#[source] io::Error),
}

/// Why a `YYYYMMDD` label was rejected.
#[derive(Error, Debug)]
pub enum DateLabelError {
    #[error("expected exactly 8 digits (YYYYMMDD)")]
    Shape,
    #[error(transparent)]
    Calendar(#[from] chrono::ParseError),
}

pub type Result<T> = std::result::Result<T, ReportError>;
