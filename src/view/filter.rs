use crate::error::ReportError;
use crate::report::{Dialect, PowerField, TYPE_NAME_HEADER};
use crate::model::HierarchyTree;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Label and type name of the rolled-up row.
pub const OTHER_LABEL: &str = "Other";

/// Direct children of the top instance.
pub const DEFAULT_FILTER: &str = r"\w+$";

pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// Chart the filtered table is meant for. Pie charts get the rolled-up row
/// sorted back in so neighbouring slices differ.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    #[default]
    Pie,
    Bar,
    Barh,
}

#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Canonical top-level instance; defaults to the tree's only root.
    pub top: Option<String>,
    /// Regexes searched against dot-joined paths; ORed together.
    pub patterns: Vec<String>,
    /// Sort column, by header text or snake-case key.
    pub column: String,
    pub kind: ChartKind,
    /// Row cap including the "Other" row.
    pub max_entries: usize,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            top: None,
            patterns: Vec::new(),
            column: PowerField::Pct.key().to_string(),
            kind: ChartKind::default(),
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredRow {
    pub label: String,
    pub values: Vec<f64>,
    pub type_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredTable {
    pub dialect: Dialect,
    pub column: PowerField,
    /// Filters after anchoring to the top instance.
    pub filters: Vec<String>,
    pub headers: Vec<String>,
    pub rows: Vec<FilteredRow>,
    /// Number of rows folded into the "Other" row.
    pub collapsed: usize,
}

#[cfg(test)]
impl FilteredTable {
    pub fn get(&self, label: &str) -> Option<&FilteredRow> {
        self.rows.iter().find(|r| r.label == label)
    }
}

/// Filter records by dot-path, sort descending by the chosen column, and fold
/// everything past the row cap into one "Other" row.
pub fn filtered(tree: &HierarchyTree, opts: &FilterOptions) -> Result<FilteredTable, ReportError> {
    if opts.max_entries == 0 {
        return Err(ReportError::InvalidEntryLimit);
    }

    let dialect = tree.dialect;
    let column = dialect
        .column(&opts.column)
        .ok_or_else(|| ReportError::UnknownColumn {
            column: opts.column.clone(),
            available: dialect
                .fields()
                .iter()
                .flat_map(|f| [f.key().to_string(), f.header(dialect)])
                .collect(),
        })?;
    let col = dialect
        .fields()
        .iter()
        .position(|f| *f == column)
        .unwrap_or_default();

    let top = resolve_top(tree, opts.top.as_deref())?;
    let patterns: Vec<&str> = if opts.patterns.is_empty() {
        vec![DEFAULT_FILTER]
    } else {
        opts.patterns.iter().map(String::as_str).collect()
    };

    let mut filters: Vec<String> = Vec::new();
    let mut regexes: Vec<Regex> = Vec::new();
    for (i, pattern) in patterns.iter().enumerate() {
        let anchored = anchor(pattern, &top);
        log::debug!("filter string {}: {:?}", i, anchored);
        let re = Regex::new(&anchored).map_err(|source| ReportError::InvalidPattern {
            pattern: anchored.clone(),
            source,
        })?;
        filters.push(anchored);
        regexes.push(re);
    }

    let mut used = vec![false; regexes.len()];
    let mut rows: Vec<FilteredRow> = Vec::new();
    for (path, rec) in tree.leaves() {
        let label = path.join(".");
        let mut keep = false;
        for (re, hit) in regexes.iter().zip(used.iter_mut()) {
            if re.is_match(&label) {
                *hit = true;
                keep = true;
            }
        }
        if keep {
            rows.push(FilteredRow {
                label,
                values: rec.values(),
                type_name: rec.type_name.clone(),
            });
        }
    }

    let unused: Vec<String> = filters
        .iter()
        .zip(&used)
        .filter(|(_, hit)| !**hit)
        .map(|(f, _)| f.clone())
        .collect();
    if !unused.is_empty() {
        return Err(ReportError::UnmatchedFilters { patterns: unused });
    }
    if rows.is_empty() {
        return Err(ReportError::EmptyFilter { patterns: filters });
    }

    sort_desc(&mut rows, col);

    let mut collapsed = 0;
    if rows.len() > opts.max_entries {
        let first = opts.max_entries - 1;
        let last = rows.len() - 1;
        let tail = rows.split_off(first);
        collapsed = tail.len();
        log::debug!(
            "condensing rows {} to {} into {:?} due to {} max entries",
            first,
            last,
            OTHER_LABEL,
            opts.max_entries
        );
        rows.push(other_row(&tail, dialect.fields().len()));

        if opts.kind == ChartKind::Pie {
            sort_desc(&mut rows, col);
        }
    }

    let mut headers: Vec<String> = dialect.fields().iter().map(|f| f.header(dialect)).collect();
    headers.push(TYPE_NAME_HEADER.to_string());

    Ok(FilteredTable {
        dialect,
        column,
        filters,
        headers,
        rows,
        collapsed,
    })
}

fn resolve_top(tree: &HierarchyTree, top: Option<&str>) -> Result<String, ReportError> {
    if let Some(top) = top {
        return Ok(top.to_string());
    }
    let roots = tree.root_names();
    match roots.as_slice() {
        [only] => Ok(only.clone()),
        _ => Err(ReportError::UnknownTop { roots }),
    }
}

/// Anchor a pattern to the children of `top` unless it already names `top`
/// at its start.
fn anchor(pattern: &str, top: &str) -> String {
    let escaped = regex::escape(top);
    let rest = pattern.trim_start_matches('^');
    let names_top = [escaped.as_str(), top].iter().any(|t| {
        rest.strip_prefix(*t).is_some_and(|r| {
            r.is_empty() || r.starts_with('.') || r.starts_with(r"\.") || r.starts_with('$')
        })
    });
    if names_top {
        pattern.to_string()
    } else {
        format!(r"^{}\.{}", escaped, pattern)
    }
}

fn sort_desc(rows: &mut [FilteredRow], col: usize) {
    rows.sort_by(|a, b| b.values[col].total_cmp(&a.values[col]));
}

fn other_row(tail: &[FilteredRow], width: usize) -> FilteredRow {
    let mut values = vec![0.0; width];
    for row in tail {
        for (sum, v) in values.iter_mut().zip(&row.values) {
            *sum += v;
        }
    }
    FilteredRow {
        label: OTHER_LABEL.to_string(),
        values,
        type_name: OTHER_LABEL.to_string(),
    }
}
