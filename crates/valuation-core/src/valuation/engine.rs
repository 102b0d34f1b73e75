use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ValuationError;
use crate::record::FinancialStatementRecord;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::dcf::{calculate_dcf, DcfValuation};
use crate::valuation::graham::{calculate_graham_number, GrahamNumber};
use crate::valuation::screen::{evaluate_defensive_screen, GrahamDefensiveCriteria};
use crate::valuation::TAX_RATE;
use crate::ValuationResult;

// Composite weighting
const COMPOSITE_DCF_WEIGHT: Rate = dec!(0.60);
const COMPOSITE_GRAHAM_WEIGHT: Rate = dec!(0.40);

// Verdict thresholds on composite upside
const SIGNIFICANTLY_UNDERVALUED_ABOVE: Rate = dec!(0.40);
const UNDERVALUED_ABOVE: Rate = dec!(0.15);
const FAIRLY_VALUED_DOWN_TO: Rate = dec!(-0.15);
const OVERVALUED_DOWN_TO: Rate = dec!(-0.40);

/// Investment verdict derived from composite upside/downside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValuationVerdict {
    SignificantlyUndervalued,
    Undervalued,
    FairlyValued,
    Overvalued,
    SignificantlyOvervalued,
}

/// The engine's final output: all three sub-valuations plus the composite
/// verdict. Constructed once per calculation and immutable afterwards;
/// external caches key it by (ticker, extraction timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    // Identity
    pub ticker: String,
    pub company_name: String,
    pub calculation_timestamp: DateTime<Utc>,

    // Market snapshot
    pub current_price: Money,
    pub market_cap: Money,
    pub enterprise_value: Money,
    pub shares_outstanding: Decimal,

    // Sub-valuations
    pub dcf_valuation: DcfValuation,
    pub graham_number: GrahamNumber,
    pub graham_defensive_screen: GrahamDefensiveCriteria,

    // Composite
    pub valuation_methods_used: Vec<String>,
    pub composite_intrinsic_value: Money,
    pub composite_methodology: String,

    // Assessment
    pub upside_downside_pct: Rate,
    /// upside / (1 + upside), clamped to -1.0 near total wipeout.
    pub margin_of_safety: Rate,
    pub verdict: ValuationVerdict,
    pub confidence_score: Decimal,

    // Context for downstream narrative generation
    pub key_assumptions: BTreeMap<String, String>,
    pub risk_factors: Vec<String>,
    pub data_quality_score: Decimal,
}

/// Blend the weighted DCF value with the Graham number.
///
/// 60/40 when the Graham number applies; pure DCF otherwise, with the
/// methodology label recording which it was.
pub fn resolve_composite(dcf_weighted_value: Money, graham_number: Money) -> (Money, String) {
    if graham_number > Decimal::ZERO {
        let composite = dcf_weighted_value * COMPOSITE_DCF_WEIGHT
            + graham_number * COMPOSITE_GRAHAM_WEIGHT;
        (composite, "60% DCF + 40% Graham Number".to_string())
    } else {
        (
            dcf_weighted_value,
            "100% DCF (Graham Number not applicable)".to_string(),
        )
    }
}

/// Map composite upside to a discrete verdict.
pub fn determine_verdict(upside_pct: Rate) -> ValuationVerdict {
    if upside_pct > SIGNIFICANTLY_UNDERVALUED_ABOVE {
        ValuationVerdict::SignificantlyUndervalued
    } else if upside_pct > UNDERVALUED_ABOVE {
        ValuationVerdict::Undervalued
    } else if upside_pct >= FAIRLY_VALUED_DOWN_TO {
        ValuationVerdict::FairlyValued
    } else if upside_pct >= OVERVALUED_DOWN_TO {
        ValuationVerdict::Overvalued
    } else {
        ValuationVerdict::SignificantlyOvervalued
    }
}

/// Margin of safety implied by an upside: upside / (1 + upside), clamped to
/// -1.0 once upside falls to -99% to avoid the blow-up near total wipeout.
fn margin_of_safety(upside_pct: Rate) -> Rate {
    if upside_pct > dec!(-0.99) {
        upside_pct / (Decimal::ONE + upside_pct)
    } else {
        dec!(-1.0)
    }
}

/// Confidence in the valuation: 50% extraction quality, 25% history
/// completeness (10 years expected), 25% scenario consistency.
fn confidence_score(record: &FinancialStatementRecord, dcf: &DcfValuation) -> Decimal {
    let base_score = record.data_confidence_score;

    let years_available = Decimal::from(record.historical_financials.len() as u32);
    let history_score = (years_available / dec!(10)).min(Decimal::ONE);

    let conservative_iv = dcf.conservative.intrinsic_value_per_share;
    let optimistic_iv = dcf.optimistic.intrinsic_value_per_share;
    // Wildly divergent scenarios signal unstable assumptions.
    let consistency_score = if conservative_iv > Decimal::ZERO && optimistic_iv > Decimal::ZERO {
        let ratio = optimistic_iv / conservative_iv;
        if ratio <= dec!(3) {
            Decimal::ONE
        } else if ratio <= dec!(5) {
            dec!(0.8)
        } else {
            dec!(0.5)
        }
    } else {
        dec!(0.5)
    };

    let confidence =
        base_score * dec!(0.50) + history_score * dec!(0.25) + consistency_score * dec!(0.25);
    confidence.clamp(Decimal::ZERO, Decimal::ONE)
}

fn fmt_pct(rate: Rate, decimals: usize) -> String {
    format!("{:.*}%", decimals, rate * dec!(100))
}

fn key_assumptions(dcf: &DcfValuation) -> BTreeMap<String, String> {
    let mut assumptions = BTreeMap::new();
    assumptions.insert("risk_free_rate".into(), fmt_pct(dcf.wacc.risk_free_rate, 2));
    assumptions.insert(
        "equity_risk_premium".into(),
        fmt_pct(dcf.wacc.equity_risk_premium, 2),
    );
    assumptions.insert("beta".into(), format!("{:.2}", dcf.wacc.beta));
    assumptions.insert("wacc".into(), fmt_pct(dcf.wacc.wacc, 2));
    assumptions.insert("tax_rate".into(), fmt_pct(TAX_RATE, 0));
    assumptions.insert(
        "base_case_growth".into(),
        fmt_pct(dcf.base_case.revenue_growth_rate, 1),
    );
    assumptions.insert(
        "terminal_growth".into(),
        fmt_pct(dcf.base_case.terminal_growth_rate, 1),
    );
    assumptions.insert(
        "operating_margin".into(),
        fmt_pct(dcf.base_case.operating_margin_assumption, 1),
    );
    assumptions.insert("dcf_weight".into(), fmt_pct(COMPOSITE_DCF_WEIGHT, 0));
    assumptions.insert("graham_weight".into(), fmt_pct(COMPOSITE_GRAHAM_WEIGHT, 0));
    assumptions.insert(
        "projection_years".into(),
        dcf.base_case.projection_years.to_string(),
    );
    assumptions
}

fn risk_factors(
    record: &FinancialStatementRecord,
    dcf: &DcfValuation,
    screen: &GrahamDefensiveCriteria,
) -> Vec<String> {
    let mut risks: Vec<String> = Vec::new();

    // Data quality
    risks.extend(record.data_anomalies.iter().cloned());

    // Financial health
    let debt_to_equity = record.effective_debt_to_equity();
    if debt_to_equity > dec!(2.0) {
        risks.push(format!(
            "High leverage: Debt/Equity ratio of {debt_to_equity:.1}x"
        ));
    }
    let current_ratio = record.effective_current_ratio();
    if current_ratio > Decimal::ZERO && current_ratio < Decimal::ONE {
        risks.push(format!("Liquidity concern: Current ratio of {current_ratio:.2}"));
    }
    if let Some(coverage) = record.interest_coverage {
        if coverage < dec!(3.0) {
            risks.push(format!("Low interest coverage: {coverage:.1}x"));
        }
    }

    // Valuation assumptions
    if dcf.base_case.revenue_growth_rate > dec!(0.20) {
        risks.push("Valuation assumes aggressive growth (>20% annually)".to_string());
    }
    if dcf.wacc.wacc < dec!(0.06) {
        risks.push("Low discount rate may overstate intrinsic value".to_string());
    }

    // Defensive screen
    if !screen.passes_screen {
        risks.push(format!(
            "Fails Graham defensive screen ({}/{} criteria)",
            screen.criteria_passed, screen.total_criteria
        ));
    }

    // Missing inputs
    if !record.fields_missing.is_empty() {
        let shown: Vec<&str> = record
            .fields_missing
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        risks.push(format!("Missing data fields: {}", shown.join(", ")));
    }

    risks
}

fn calculation_error(ticker: &str, e: ValuationError) -> ValuationError {
    match e {
        // Input problems keep their own taxonomy
        e @ ValuationError::InvalidInput { .. } | e @ ValuationError::InsufficientData(_) => e,
        other => ValuationError::Calculation {
            ticker: ticker.to_string(),
            reason: other.to_string(),
        },
    }
}

/// Run the complete valuation pipeline for one record.
///
/// Validates the record, computes the DCF, Graham number, and defensive
/// screen, then blends them into the composite verdict. Returns either a
/// complete [`ValuationReport`] or an error; never a partial result.
pub fn calculate_valuation(
    record: &FinancialStatementRecord,
) -> ValuationResult<ComputationOutput<ValuationReport>> {
    record.validate()?;

    let mut warnings: Vec<String> = Vec::new();

    let dcf_out = calculate_dcf(record).map_err(|e| calculation_error(&record.ticker, e))?;
    for w in &dcf_out.warnings {
        warnings.push(format!("[DCF] {w}"));
    }
    let graham_out =
        calculate_graham_number(record).map_err(|e| calculation_error(&record.ticker, e))?;
    for w in &graham_out.warnings {
        warnings.push(format!("[Graham] {w}"));
    }
    let screen_out =
        evaluate_defensive_screen(record).map_err(|e| calculation_error(&record.ticker, e))?;

    let dcf_valuation = dcf_out.result;
    let graham_number = graham_out.result;
    let defensive_screen = screen_out.result;

    // --- Composite value and assessment ---
    let (composite_value, composite_methodology) = resolve_composite(
        dcf_valuation.weighted_intrinsic_value,
        graham_number.graham_number,
    );

    let upside_pct = if record.current_price > Decimal::ZERO {
        (composite_value - record.current_price) / record.current_price
    } else {
        Decimal::ZERO
    };
    let margin = margin_of_safety(upside_pct);
    let verdict = determine_verdict(upside_pct);
    let confidence = confidence_score(record, &dcf_valuation);

    let assumptions = key_assumptions(&dcf_valuation);
    let risks = risk_factors(record, &dcf_valuation, &defensive_screen);

    let report = ValuationReport {
        ticker: record.ticker.clone(),
        company_name: record.company_name.clone(),
        calculation_timestamp: Utc::now(),
        current_price: record.current_price,
        market_cap: record.effective_market_cap(),
        enterprise_value: record.effective_enterprise_value(),
        shares_outstanding: record.shares_outstanding,
        dcf_valuation,
        graham_number,
        graham_defensive_screen: defensive_screen,
        valuation_methods_used: vec![
            "DCF (FCFF)".to_string(),
            "Graham Number".to_string(),
            "Graham Defensive Screen".to_string(),
        ],
        composite_intrinsic_value: composite_value,
        composite_methodology,
        upside_downside_pct: upside_pct,
        margin_of_safety: margin,
        verdict,
        confidence_score: confidence,
        key_assumptions: assumptions,
        risk_factors: risks,
        data_quality_score: record.data_confidence_score,
    };

    Ok(with_metadata(
        "Composite intrinsic value: multi-scenario DCF blended with Graham heuristics",
        &json!({
            "ticker": record.ticker,
            "extraction_timestamp": record.extraction_timestamp,
        }),
        warnings,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
