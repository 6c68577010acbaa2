//! Error taxonomy for report parsing and projection.
//!
//! Parse-time failures always carry the offending file and line; projection
//! failures name the filter or column that was at fault.

use crate::model::InsertError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("read power report {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A record-shaped line whose numeric field did not parse.
    #[error(
        "power report parse error at {path}:{line}: expected {field} to be a number, found {token:?} in line {content:?}"
    )]
    StructuralMismatch {
        path: String,
        line: usize,
        field: &'static str,
        token: String,
        content: String,
    },

    #[error("power report parse error at {path}:{line}: cannot place {hierarchy}: {source}")]
    AmbiguousTreeInsertion {
        path: String,
        line: usize,
        hierarchy: String,
        #[source]
        source: InsertError,
    },

    #[error(
        "power report parse error at {path}:{line}: instance {instance:?} at depth {level} skips a level (previous depth {previous})"
    )]
    IndentJump {
        path: String,
        line: usize,
        instance: String,
        level: usize,
        previous: isize,
    },

    #[error("power report {path} ends at line {line} right after the {marker:?} marker; expected a separator line")]
    TruncatedSection {
        path: String,
        line: usize,
        marker: &'static str,
    },

    #[error("no power records found in {path}")]
    NoRecords { path: String },

    #[error("filter(s) did not collect any data: {}", quoted(.patterns))]
    UnmatchedFilters { patterns: Vec<String> },

    #[error("no filtered data was collected for filter(s): {}", quoted(.patterns))]
    EmptyFilter { patterns: Vec<String> },

    #[error("invalid filter pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("column not found: {column:?} (available: {})", quoted(.available))]
    UnknownColumn {
        column: String,
        available: Vec<String>,
    },

    #[error("cannot pick a top-level instance to anchor filters; roots are: {}", quoted(.roots))]
    UnknownTop { roots: Vec<String> },

    #[error("max entries must be at least 1")]
    InvalidEntryLimit,

    #[error("configuration error: {0}")]
    Config(String),
}

fn quoted(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("{:?}", s))
        .collect::<Vec<_>>()
        .join(", ")
}
