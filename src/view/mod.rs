//! Read-only projections of a parsed hierarchy: the full flattened table and
//! the filtered, "Other"-rolled table used for charts.

pub mod filter;

pub use filter::{ChartKind, FilteredTable, OTHER_LABEL, filtered};

use crate::report::Dialect;
use crate::model::HierarchyTree;
use serde::Serialize;

pub const HIERARCHY_HEADER: &str = "Hierarchy";

/// One cell of an emitted row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

/// One power record with its hierarchy path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedRow {
    /// Path segments from a top-level instance down to the record, padded with
    /// `None` up to the deepest path; a single dot-joined entry in
    /// path-combine mode.
    pub hierarchy: Vec<Option<String>>,
    pub values: Vec<f64>,
    pub type_name: String,
}

impl FlattenedRow {
    pub fn cells(&self) -> Vec<Cell> {
        let mut out: Vec<Cell> = self
            .hierarchy
            .iter()
            .map(|seg| match seg {
                Some(s) => Cell::Text(s.clone()),
                None => Cell::Empty,
            })
            .collect();
        out.extend(self.values.iter().map(|v| Cell::Number(*v)));
        out.push(Cell::Text(self.type_name.clone()));
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlattenedTable {
    pub dialect: Dialect,
    pub headers: Vec<String>,
    pub rows: Vec<FlattenedRow>,
}

/// Flatten every record in pre-order. Shallow rows are padded right after
/// their last segment so the numeric columns line up.
pub fn to_rows(tree: &HierarchyTree, path_combine: bool) -> FlattenedTable {
    let mut rows: Vec<FlattenedRow> = tree
        .leaves()
        .map(|(path, rec)| FlattenedRow {
            hierarchy: if path_combine {
                vec![Some(path.join("."))]
            } else {
                path.iter().map(|s| Some(s.to_string())).collect()
            },
            values: rec.values(),
            type_name: rec.type_name.clone(),
        })
        .collect();

    let depth = rows.iter().map(|r| r.hierarchy.len()).max().unwrap_or(0);
    for row in &mut rows {
        row.hierarchy.resize(depth, None);
    }

    let mut headers = vec![HIERARCHY_HEADER.to_string(); depth];
    headers.extend(tree.dialect.headers());

    FlattenedTable {
        dialect: tree.dialect,
        headers,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ParseOptions;
    use crate::report::parse::parse_report;
    use pretty_assertions::assert_eq;

    fn sample(text: &str) -> HierarchyTree {
        parse_report(text.as_bytes(), "sample.rpt", &ParseOptions::default())
            .unwrap()
            .tree
    }

    #[test]
    fn every_row_has_the_same_width() {
        for text in [
            include_str!("../../testdata/power_compiler.rpt"),
            include_str!("../../testdata/prime_power.rpt"),
        ] {
            let tree = sample(text);
            let table = to_rows(&tree, false);
            assert_eq!(table.rows.len(), tree.leaves().count());
            for row in &table.rows {
                assert_eq!(row.cells().len(), table.headers.len());
            }
        }
    }

    #[test]
    fn padding_abuts_numeric_columns() {
        let tree = sample(include_str!("../../testdata/power_compiler.rpt"));
        let table = to_rows(&tree, false);

        assert_eq!(
            table.headers[..4].to_vec(),
            vec!["Hierarchy", "Hierarchy", "Hierarchy", "Switching Power (mW)"]
        );
        assert_eq!(
            table.rows[0].cells(),
            vec![
                Cell::Text("chip_top".to_string()),
                Cell::Empty,
                Cell::Empty,
                Cell::Number(1.234),
                Cell::Number(5.678),
                Cell::Number(3450.0),
                Cell::Number(10.362),
                Cell::Number(100.0),
                Cell::Text(String::new()),
            ]
        );
        assert_eq!(
            table.rows[2].hierarchy,
            vec![
                Some("chip_top".to_string()),
                Some("u_core".to_string()),
                Some("u_alu".to_string())
            ]
        );
    }

    #[test]
    fn rows_follow_report_order() {
        let tree = sample(include_str!("../../testdata/prime_power.rpt"));
        let names: Vec<String> = to_rows(&tree, true)
            .rows
            .into_iter()
            .filter_map(|r| r.hierarchy.into_iter().next().flatten())
            .collect();
        assert_eq!(
            names,
            vec![
                "chip_top",
                "chip_top.u_core",
                "chip_top.u_core.u_alu",
                "chip_top.u_io"
            ]
        );
    }

    #[test]
    fn path_combine_uses_one_hierarchy_column() {
        let tree = sample(include_str!("../../testdata/prime_power.rpt"));
        let table = to_rows(&tree, true);
        assert_eq!(table.headers[0], "Hierarchy");
        assert_eq!(table.headers.len(), 1 + 7 + 1);
        assert!(table.rows.iter().all(|r| r.hierarchy.len() == 1));
        assert_eq!(table.rows[2].type_name, "alu");
    }
}
