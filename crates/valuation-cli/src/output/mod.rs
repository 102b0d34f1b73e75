pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// Flatten a nested result object into (dotted path, rendered value) rows.
///
/// Valuation results nest several levels deep (report -> dcf_valuation ->
/// base_case -> projections), so tables and CSV render the flattened form.
/// Scalar arrays are joined in place; arrays of objects are indexed into
/// the path.
pub(crate) fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut rows = Vec::new();
    flatten_into(value, String::new(), &mut rows);
    rows
}

fn flatten_into(value: &Value, prefix: String, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_into(val, path, rows);
            }
        }
        Value::Array(arr) if arr.iter().all(|v| !v.is_object() && !v.is_array()) => {
            let items: Vec<String> = arr.iter().map(render_scalar).collect();
            rows.push((prefix, items.join(", ")));
        }
        Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                flatten_into(item, format!("{prefix}[{i}]"), rows);
            }
        }
        scalar => rows.push((prefix, render_scalar(scalar))),
    }
}

pub(crate) fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
