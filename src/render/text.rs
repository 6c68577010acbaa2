use crate::view::FilteredTable;
use std::fmt::Write;

/// Fixed-width listing of the filtered table, sort column first.
pub fn render_filtered_text(table: &FilteredTable) -> String {
    let col = table
        .dialect
        .fields()
        .iter()
        .position(|f| *f == table.column)
        .unwrap_or_default();
    let width = table.rows.iter().map(|r| r.label.len()).max().unwrap_or(0);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>14}  {}",
        "Hierarchy Element",
        table.column.header(table.dialect),
        "Type",
        width = width
    );
    for row in &table.rows {
        let _ = writeln!(
            out,
            "{:<width$}  {:>14.6}  {}",
            row.label,
            row.values[col],
            row.type_name,
            width = width
        );
    }
    out
}
