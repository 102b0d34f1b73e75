//! Graham's seven criteria for the defensive investor, from "The
//! Intelligent Investor".
//!
//! 1. Adequate size: TTM revenue >= $700M
//! 2. Strong financial condition: current ratio >= 2.0
//! 3. Earnings stability: 10 years of positive net income
//! 4. Dividend record: pays a dividend (relaxed from Graham's 20-year
//!    requirement — deliberate simplification, kept as documented behavior)
//! 5. Earnings growth: EPS up at least 33% over 10 years
//! 6. Moderate P/E: P/E <= 15
//! 7. Moderate P/B: P/B <= 1.5
//!
//! Criteria 6 and 7 each also pass when P/E * P/B < 22.5. A stock passes
//! the screen at 5 of 7.

use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::record::FinancialStatementRecord;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ValuationResult;

const MIN_REVENUE: Money = dec!(700000000);
const MIN_CURRENT_RATIO: Decimal = dec!(2.0);
const MIN_POSITIVE_YEARS: u32 = 10;
/// Graham's original dividend-record requirement, reported for context even
/// though the criterion itself is relaxed to "pays any dividend".
const GRAHAM_DIVIDEND_YEARS: u32 = 20;
const MIN_EPS_GROWTH: Rate = dec!(0.33);
const MAX_PE: Multiple = dec!(15.0);
const MAX_PB: Multiple = dec!(1.5);
const MAX_PE_PB_PRODUCT: Multiple = dec!(22.5);
const MIN_CRITERIA_PASS: u8 = 5;
const TOTAL_CRITERIA: u8 = 7;

/// Pass/fail results for all seven criteria, with thresholds and observed
/// values carried for auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrahamDefensiveCriteria {
    // 1. Adequate size
    pub adequate_size: bool,
    pub revenue_minimum: Money,
    pub actual_revenue: Money,

    // 2. Strong financial condition
    pub strong_financial_condition: bool,
    pub current_ratio_minimum: Decimal,
    pub actual_current_ratio: Decimal,

    // 3. Earnings stability
    pub earnings_stability: bool,
    pub years_positive_earnings: u32,
    pub required_years: u32,

    // 4. Dividend record (relaxed)
    pub dividend_record: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_dividend_yield: Option<Rate>,
    pub required_dividend_years: u32,

    // 5. Earnings growth
    pub earnings_growth: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps_10y_growth: Option<Rate>,
    pub required_growth: Rate,

    // 6. Moderate P/E
    pub moderate_pe: bool,
    pub pe_maximum: Multiple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_pe: Option<Multiple>,

    // 7. Moderate P/B
    pub moderate_pb: bool,
    pub pb_maximum: Multiple,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_pb: Option<Multiple>,

    // Combined product test, OR-ed into criteria 6 and 7
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graham_product: Option<Multiple>,
    pub graham_product_passes: bool,

    // Summary
    pub criteria_passed: u8,
    pub total_criteria: u8,
    pub passes_screen: bool,
}

/// Ten-year EPS growth: oldest-vs-newest historical EPS when at least ten
/// years of history exist, otherwise estimated from the 10-year CAGR via
/// `(1 + cagr)^10 - 1`. `None` when neither source is usable.
fn eps_10y_growth(record: &FinancialStatementRecord) -> Option<Rate> {
    if record.historical_financials.len() >= MIN_POSITIVE_YEARS as usize {
        let newest = record.historical_financials.first()?.eps?;
        let oldest = record.historical_financials.last()?.eps?;
        if oldest > Decimal::ZERO {
            return Some((newest - oldest) / oldest.abs());
        }
        return None;
    }
    record
        .earnings_growth_10y_cagr
        .map(|cagr| (Decimal::ONE + cagr).powd(dec!(10)) - Decimal::ONE)
}

/// Evaluate all seven defensive criteria against the record.
pub fn evaluate_defensive_screen(
    record: &FinancialStatementRecord,
) -> ValuationResult<ComputationOutput<GrahamDefensiveCriteria>> {
    record.validate()?;

    // ---- 1. Adequate size ----
    let adequate_size = record.ttm_revenue >= MIN_REVENUE;

    // ---- 2. Strong financial condition ----
    let actual_current_ratio = record.effective_current_ratio();
    let strong_financial_condition = actual_current_ratio >= MIN_CURRENT_RATIO;

    // ---- 3. Earnings stability ----
    // Counts whatever history is available; short histories fail outright.
    let years_positive_earnings = record
        .historical_financials
        .iter()
        .filter(|h| h.net_income.is_some_and(|ni| ni > Decimal::ZERO))
        .count() as u32;
    let earnings_stability = years_positive_earnings >= MIN_POSITIVE_YEARS;

    // ---- 4. Dividend record ----
    let actual_dividend_yield = record.dividend_yield;
    let dividend_record = actual_dividend_yield.is_some_and(|y| y > Decimal::ZERO);

    // ---- 5. Earnings growth ----
    let growth = eps_10y_growth(record);
    let earnings_growth = growth.is_some_and(|g| g >= MIN_EPS_GROWTH);

    // ---- 6. Moderate P/E ----
    let pe = record.pe_ratio;
    let moderate_pe = pe.is_some_and(|pe| pe > Decimal::ZERO && pe <= MAX_PE);

    // ---- 7. Moderate P/B ----
    let pb = record.price_to_book;
    let moderate_pb = pb.is_some_and(|pb| pb > Decimal::ZERO && pb <= MAX_PB);

    // ---- Combined product test ----
    let graham_product = match (pe, pb) {
        (Some(pe), Some(pb)) if pe > Decimal::ZERO && pb > Decimal::ZERO => Some(pe * pb),
        _ => None,
    };
    let graham_product_passes = graham_product.is_some_and(|p| p < MAX_PE_PB_PRODUCT);

    // ---- Tally ----
    // The product test can lift criteria 6 and 7 simultaneously.
    let criteria = [
        adequate_size,
        strong_financial_condition,
        earnings_stability,
        dividend_record,
        earnings_growth,
        moderate_pe || graham_product_passes,
        moderate_pb || graham_product_passes,
    ];
    let criteria_passed = criteria.iter().filter(|&&c| c).count() as u8;
    let passes_screen = criteria_passed >= MIN_CRITERIA_PASS;

    let output = GrahamDefensiveCriteria {
        adequate_size,
        revenue_minimum: MIN_REVENUE,
        actual_revenue: record.ttm_revenue,
        strong_financial_condition,
        current_ratio_minimum: MIN_CURRENT_RATIO,
        actual_current_ratio,
        earnings_stability,
        years_positive_earnings,
        required_years: MIN_POSITIVE_YEARS,
        dividend_record,
        actual_dividend_yield,
        required_dividend_years: GRAHAM_DIVIDEND_YEARS,
        earnings_growth,
        eps_10y_growth: growth,
        required_growth: MIN_EPS_GROWTH,
        moderate_pe,
        pe_maximum: MAX_PE,
        actual_pe: pe,
        moderate_pb,
        pb_maximum: MAX_PB,
        actual_pb: pb,
        graham_product,
        graham_product_passes,
        criteria_passed,
        total_criteria: TOTAL_CRITERIA,
        passes_screen,
    };

    Ok(with_metadata(
        "Graham defensive screen (7 criteria, pass at 5)",
        &json!({
            "ticker": record.ticker,
            "history_years": record.historical_financials.len(),
        }),
        Vec::new(),
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
