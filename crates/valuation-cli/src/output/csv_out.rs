use serde_json::Value;
use std::io;

use super::flatten;

/// Write the flattened result as field,value CSV rows to stdout.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let _ = wtr.write_record(["field", "value"]);
    for (path, rendered) in flatten(result) {
        let _ = wtr.write_record([path.as_str(), rendered.as_str()]);
    }

    let _ = wtr.flush();
}
