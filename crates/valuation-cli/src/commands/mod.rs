pub mod graham;
pub mod valuation;

use clap::Args;
use rust_decimal::Decimal;

use valuation_core::record::FinancialStatementRecord;

use crate::input;

/// Shared arguments: every subcommand reads the same normalized record and
/// optionally overrides the market assumptions an analyst most often wants
/// to vary.
#[derive(Args)]
pub struct RecordArgs {
    /// Path to the financial-statement record (.json, .yaml, or .yml)
    #[arg(long)]
    pub input: Option<String>,

    /// Override the record's risk-free rate (e.g. 0.045 for 4.5%)
    #[arg(long)]
    pub risk_free_rate: Option<Decimal>,

    /// Override the record's equity risk premium
    #[arg(long, alias = "erp")]
    pub equity_risk_premium: Option<Decimal>,

    /// Override the record's beta
    #[arg(long)]
    pub beta: Option<Decimal>,

    /// Override the record's current share price
    #[arg(long)]
    pub current_price: Option<Decimal>,
}

/// Load the record from `--input` or piped stdin, then apply any overrides.
pub fn load_record(args: &RecordArgs) -> Result<FinancialStatementRecord, Box<dyn std::error::Error>> {
    let mut record: FinancialStatementRecord = if let Some(ref path) = args.input {
        input::file::read_record(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input is required (or pipe a record JSON via stdin)".into());
    };

    if let Some(rf) = args.risk_free_rate {
        record.risk_free_rate = rf;
    }
    if let Some(erp) = args.equity_risk_premium {
        record.equity_risk_premium = erp;
    }
    if let Some(beta) = args.beta {
        record.beta = Some(beta);
    }
    if let Some(price) = args.current_price {
        record.current_price = price;
    }

    Ok(record)
}
