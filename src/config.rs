//! Report settings (optional JSON file) layered under command-line flags.
//!
//! JSON shape (every key optional):
//! {
//!   "max_depth": 3,
//!   "path_combine": false,
//!   "top": "chip_top",
//!   "filters": ["u_core\\.\\w+$", "u_io$"],
//!   "column": "Pct of Total Power",
//!   "kind": "pie",
//!   "max_entries": 20,
//!   "verbose": false
//! }

use crate::error::ReportError;
use crate::report::ParseOptions;
use crate::view::filter::{ChartKind, DEFAULT_MAX_ENTRIES, FilterOptions};

use serde::Deserialize;
use std::fs;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportConfig {
    #[serde(default)]
    pub max_depth: Option<usize>,

    #[serde(default)]
    pub path_combine: bool,

    #[serde(default)]
    pub top: Option<String>,

    #[serde(default)]
    pub filters: Vec<String>,

    #[serde(default)]
    pub column: Option<String>,

    #[serde(default)]
    pub kind: Option<ChartKind>,

    #[serde(default)]
    pub max_entries: Option<usize>,

    #[serde(default)]
    pub verbose: bool,
}

/// Settings split into what the parser and the projector consume.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub parse: ParseOptions,
    pub filter: FilterOptions,
    pub path_combine: bool,
    pub verbose: bool,
}

impl ReportConfig {
    pub fn load(path: &str) -> Result<Self, ReportError> {
        let text = fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_string(),
            source,
        })?;
        serde_json::from_str(&text)
            .map_err(|e| ReportError::Config(format!("{}: {}", path, e)))
    }

    /// Layer `overrides` on top of `self`. Set options win; flags are ORed;
    /// a non-empty filter list replaces the base list.
    pub fn merge(self, overrides: ReportConfig) -> ReportConfig {
        ReportConfig {
            max_depth: overrides.max_depth.or(self.max_depth),
            path_combine: self.path_combine || overrides.path_combine,
            top: overrides.top.or(self.top),
            filters: if overrides.filters.is_empty() {
                self.filters
            } else {
                overrides.filters
            },
            column: overrides.column.or(self.column),
            kind: overrides.kind.or(self.kind),
            max_entries: overrides.max_entries.or(self.max_entries),
            verbose: self.verbose || overrides.verbose,
        }
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ReportError> {
        if self.max_entries == Some(0) {
            return Err(ReportError::InvalidEntryLimit);
        }
        if self.filters.iter().any(|f| f.trim().is_empty()) {
            return Err(ReportError::Config("filter patterns cannot be empty".to_string()));
        }
        let top = match self.top.as_deref().map(str::trim) {
            Some("") => {
                return Err(ReportError::Config("top instance name cannot be empty".to_string()));
            }
            other => other.map(str::to_string),
        };

        let defaults = FilterOptions::default();
        Ok(ValidatedConfig {
            parse: ParseOptions {
                max_depth: self.max_depth,
                verbose: self.verbose,
            },
            filter: FilterOptions {
                top,
                patterns: self.filters.clone(),
                column: self.column.clone().unwrap_or(defaults.column),
                kind: self.kind.unwrap_or_default(),
                max_entries: self.max_entries.unwrap_or(DEFAULT_MAX_ENTRIES),
            },
            path_combine: self.path_combine,
            verbose: self.verbose,
        })
    }
}
