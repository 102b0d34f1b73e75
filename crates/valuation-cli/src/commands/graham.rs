use serde_json::Value;

use valuation_core::valuation::{calculate_graham_number, evaluate_defensive_screen};

use super::{load_record, RecordArgs};

pub fn run_graham_number(args: RecordArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record = load_record(&args)?;
    let result = calculate_graham_number(&record)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_screen(args: RecordArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record = load_record(&args)?;
    let result = evaluate_defensive_screen(&record)?;
    Ok(serde_json::to_value(result)?)
}
