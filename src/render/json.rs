use crate::report::Dialect;
use crate::view::{Cell, FilteredTable, FlattenedTable};
use serde::Serialize;

#[derive(Serialize)]
struct TableJson<'a> {
    dialect: Dialect,
    headers: &'a [String],
    rows: Vec<Vec<Cell>>,
}

/// Flattened table as `{dialect, headers, rows}` with one array per row.
pub fn render_table_json(table: &FlattenedTable) -> anyhow::Result<String> {
    let doc = TableJson {
        dialect: table.dialect,
        headers: &table.headers,
        rows: table.rows.iter().map(|r| r.cells()).collect(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

pub fn render_filtered_json(table: &FilteredTable) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(table)?)
}
