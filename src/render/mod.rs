//! Output for the projected tables. Charting and spreadsheet export are left
//! to downstream tools; this module emits JSON and a plain-text summary.

pub mod json;
pub mod text;

pub use json::{render_filtered_json, render_table_json};
pub use text::render_filtered_text;
