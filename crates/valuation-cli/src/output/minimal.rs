use serde_json::Value;

use super::render_scalar;

/// Print just the headline number from the output.
///
/// Heuristic: look for well-known result fields in priority order, then
/// fall back to the first field of the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "composite_intrinsic_value",
        "weighted_intrinsic_value",
        "wacc",
        "graham_number",
        "criteria_passed",
    ];

    if let Value::Object(map) = result_obj {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() && !val.is_object() {
                    println!("{}", render_scalar(val));
                    return;
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, render_scalar(val));
            return;
        }
    }

    println!("{}", render_scalar(result_obj));
}
