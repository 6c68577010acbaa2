//! Hierarchical power reports (Power Compiler and Prime Power): records and parsing.

pub mod parse;
pub mod record;

pub use parse::{ParseOptions, parse_report_file};
pub use record::{Dialect, PowerField, PowerRecord, TYPE_NAME_HEADER};
