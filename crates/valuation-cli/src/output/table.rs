use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::flatten;

/// Render the computation envelope as a two-column table, with warnings and
/// the methodology below it.
pub fn print_table(value: &Value) {
    let Some(map) = value.as_object() else {
        println!("{}", value);
        return;
    };

    let result = map.get("result").unwrap_or(value);

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (path, rendered) in flatten(result) {
        builder.push_record([path.as_str(), rendered.as_str()]);
    }
    println!("{}", Table::from(builder));

    if let Some(Value::Array(warnings)) = map.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings {
                if let Value::String(s) = w {
                    println!("  - {}", s);
                }
            }
        }
    }

    if let Some(Value::String(methodology)) = map.get("methodology") {
        println!("\nMethodology: {}", methodology);
    }
}
