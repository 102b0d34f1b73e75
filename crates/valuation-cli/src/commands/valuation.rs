use serde_json::Value;

use valuation_core::valuation::{calculate_dcf, calculate_valuation, calculate_wacc};

use super::{load_record, RecordArgs};

pub fn run_value(args: RecordArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record = load_record(&args)?;
    let result = calculate_valuation(&record)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_wacc(args: RecordArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record = load_record(&args)?;
    let result = calculate_wacc(&record)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_dcf(args: RecordArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let record = load_record(&args)?;
    let result = calculate_dcf(&record)?;
    Ok(serde_json::to_value(result)?)
}
