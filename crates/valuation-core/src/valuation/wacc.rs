use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::record::FinancialStatementRecord;
use crate::types::{with_metadata, ComputationOutput, Rate};
use crate::valuation::TAX_RATE;
use crate::ValuationResult;

/// Credit spread tiers keyed by interest coverage ratio. Scanned in order;
/// the first threshold the coverage is strictly less than wins, and the
/// open-ended final bucket gets [`TOP_RATING_SPREAD`].
const CREDIT_SPREAD_TABLE: [(Decimal, Rate); 5] = [
    (dec!(1.5), dec!(0.04)),  // CCC
    (dec!(3.0), dec!(0.03)),  // B
    (dec!(5.0), dec!(0.02)),  // BB
    (dec!(8.0), dec!(0.015)), // BBB
    (dec!(12.0), dec!(0.01)), // A
];

/// Spread for coverage at or below zero, or when coverage is unavailable.
const DISTRESSED_SPREAD: Rate = dec!(0.05);

/// Spread for coverage of 12x and above (AA/AAA).
const TOP_RATING_SPREAD: Rate = dec!(0.007);

/// WACC and every component that went into it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccBreakdown {
    pub risk_free_rate: Rate,
    pub beta: Decimal,
    pub equity_risk_premium: Rate,
    /// CAPM: risk-free rate + beta * equity risk premium.
    pub cost_of_equity: Rate,
    pub credit_spread: Rate,
    pub cost_of_debt_pretax: Rate,
    pub tax_rate: Rate,
    pub cost_of_debt_aftertax: Rate,
    pub equity_weight: Rate,
    pub debt_weight: Rate,
    pub wacc: Rate,
}

/// Select the credit spread for an interest coverage ratio.
fn credit_spread(interest_coverage: Option<Decimal>) -> Rate {
    let coverage = match interest_coverage {
        Some(ic) if ic > Decimal::ZERO => ic,
        _ => return DISTRESSED_SPREAD,
    };
    for (threshold, spread) in CREDIT_SPREAD_TABLE {
        if coverage < threshold {
            return spread;
        }
    }
    TOP_RATING_SPREAD
}

/// Calculate the Weighted Average Cost of Capital.
///
/// Ke = Rf + Beta * ERP (CAPM); Kd = Rf + credit spread from the coverage
/// table; WACC = We * Ke + Wd * Kd * (1 - t) with market-value capital
/// weights. When both market cap and total debt are non-positive the
/// structure falls back to 100% equity.
pub fn calculate_wacc(
    record: &FinancialStatementRecord,
) -> ValuationResult<ComputationOutput<WaccBreakdown>> {
    record.validate()?;

    let mut warnings: Vec<String> = Vec::new();

    // --- Cost of equity (CAPM) ---
    let beta = record.effective_beta();
    let cost_of_equity = record.risk_free_rate + beta * record.equity_risk_premium;

    // --- Cost of debt ---
    let spread = credit_spread(record.interest_coverage);
    match record.interest_coverage {
        None => warnings.push(
            "Interest coverage unavailable; assuming distressed credit spread (5.0%)".to_string(),
        ),
        Some(ic) if ic <= Decimal::ZERO => warnings.push(format!(
            "Interest coverage of {ic} indicates distress; applying 5.0% credit spread"
        )),
        _ => {}
    }
    let cost_of_debt_pretax = record.risk_free_rate + spread;
    let cost_of_debt_aftertax = cost_of_debt_pretax * (Decimal::ONE - TAX_RATE);

    // --- Capital structure weights ---
    let market_cap = record.effective_market_cap().max(Decimal::ZERO);
    let total_debt = record.total_debt.max(Decimal::ZERO);
    let total_capital = market_cap + total_debt;

    let (equity_weight, debt_weight) = if total_capital <= Decimal::ZERO {
        warnings
            .push("Market cap and total debt both non-positive; assuming 100% equity".to_string());
        (Decimal::ONE, Decimal::ZERO)
    } else {
        (market_cap / total_capital, total_debt / total_capital)
    };

    let wacc = equity_weight * cost_of_equity + debt_weight * cost_of_debt_aftertax;

    let output = WaccBreakdown {
        risk_free_rate: record.risk_free_rate,
        beta,
        equity_risk_premium: record.equity_risk_premium,
        cost_of_equity,
        credit_spread: spread,
        cost_of_debt_pretax,
        tax_rate: TAX_RATE,
        cost_of_debt_aftertax,
        equity_weight,
        debt_weight,
        wacc,
    };

    Ok(with_metadata(
        "WACC via CAPM with coverage-based credit spread",
        &json!({
            "ticker": record.ticker,
            "risk_free_rate": record.risk_free_rate,
            "beta": beta,
            "equity_risk_premium": record.equity_risk_premium,
            "interest_coverage": record.interest_coverage,
        }),
        warnings,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
