use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::record::FinancialStatementRecord;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::valuation::scenario::{project_scenario, DcfScenario, PROJECTION_YEARS};
use crate::valuation::wacc::{calculate_wacc, WaccBreakdown};
use crate::valuation::TAX_RATE;
use crate::ValuationResult;

// Scenario probability weights
const WEIGHT_CONSERVATIVE: Rate = dec!(0.25);
const WEIGHT_BASE_CASE: Rate = dec!(0.50);
const WEIGHT_OPTIMISTIC: Rate = dec!(0.25);

// Base-growth guardrails
const NEGATIVE_GROWTH_FLOOR: Rate = dec!(0.03);
const CONSERVATIVE_GROWTH_MIN: Rate = dec!(0.02);
const OPTIMISTIC_GROWTH_CAP: Rate = dec!(0.25);
const OPTIMISTIC_MARGIN_CAP: Rate = dec!(0.35);

/// Probability weights applied to the three scenarios.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioWeights {
    pub conservative: Rate,
    pub base_case: Rate,
    pub optimistic: Rate,
}

/// Base-case intrinsic value recomputed at WACC +/- 1%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaccSensitivity {
    pub wacc_minus_1pct: Money,
    pub wacc_plus_1pct: Money,
}

/// Base-case intrinsic value recomputed at terminal growth +/- 1%.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthSensitivity {
    pub growth_minus_1pct: Money,
    pub growth_plus_1pct: Money,
}

/// Complete three-scenario DCF valuation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfValuation {
    pub methodology: String,
    pub tax_rate: Rate,
    /// Discount rate and all of its CAPM / credit-spread components.
    pub wacc: WaccBreakdown,
    pub conservative: DcfScenario,
    pub base_case: DcfScenario,
    pub optimistic: DcfScenario,
    pub scenario_weights: ScenarioWeights,
    /// 25/50/25 probability-weighted intrinsic value per share.
    pub weighted_intrinsic_value: Money,
    pub sensitivity_to_wacc: WaccSensitivity,
    pub sensitivity_to_growth: GrowthSensitivity,
}

/// Run the full three-scenario DCF.
///
/// Scenario assumptions derive deterministically from the record's base
/// revenue growth and current operating margin:
///
/// | scenario     | growth               | terminal | margin                  |
/// |--------------|----------------------|----------|-------------------------|
/// | conservative | max(2%, base * 0.5)  | 2.0%     | current * 0.85          |
/// | base_case    | base                 | 2.5%     | current                 |
/// | optimistic   | min(25%, base * 1.5) | 3.0%     | min(current*1.15, 35%)  |
///
/// Negative observed growth is floored at 3% before the grid is applied.
/// Malformed-but-valid inputs (zero revenue, degenerate margins) flow
/// through as degenerate valuations rather than errors; the caller is
/// responsible for reading them as data-quality conditions.
pub fn calculate_dcf(
    record: &FinancialStatementRecord,
) -> ValuationResult<ComputationOutput<DcfValuation>> {
    record.validate()?;

    let mut warnings: Vec<String> = Vec::new();

    // --- Discount rate ---
    let wacc_out = calculate_wacc(record)?;
    for w in &wacc_out.warnings {
        warnings.push(format!("[WACC] {w}"));
    }
    let wacc = wacc_out.result.wacc;

    // --- Base assumptions ---
    let observed_growth = record.base_revenue_growth();
    let base_growth = if observed_growth < Decimal::ZERO {
        warnings.push(format!(
            "Observed revenue growth {observed_growth} is negative; projecting at the 3% floor"
        ));
        NEGATIVE_GROWTH_FLOOR
    } else {
        observed_growth
    };
    let current_margin = record.effective_operating_margin();

    // --- Three scenarios ---
    let conservative = project_scenario(
        record,
        "conservative",
        CONSERVATIVE_GROWTH_MIN.max(base_growth * dec!(0.5)),
        dec!(0.02),
        current_margin * dec!(0.85),
        wacc,
        PROJECTION_YEARS,
    );
    let base_case = project_scenario(
        record,
        "base_case",
        base_growth,
        dec!(0.025),
        current_margin,
        wacc,
        PROJECTION_YEARS,
    );
    let optimistic = project_scenario(
        record,
        "optimistic",
        OPTIMISTIC_GROWTH_CAP.min(base_growth * dec!(1.5)),
        dec!(0.03),
        (current_margin * dec!(1.15)).min(OPTIMISTIC_MARGIN_CAP),
        wacc,
        PROJECTION_YEARS,
    );

    for s in [&conservative, &base_case, &optimistic] {
        if s.terminal_growth_clamped() {
            warnings.push(format!(
                "{}: terminal growth {} >= WACC {wacc}; clamped to {}",
                s.scenario_name, s.terminal_growth_rate, s.effective_terminal_growth
            ));
        }
    }

    // --- Probability weighting ---
    let weighted_intrinsic_value = conservative.intrinsic_value_per_share * WEIGHT_CONSERVATIVE
        + base_case.intrinsic_value_per_share * WEIGHT_BASE_CASE
        + optimistic.intrinsic_value_per_share * WEIGHT_OPTIMISTIC;

    // --- Sensitivity: base case at WACC +/- 1% and terminal growth +/- 1% ---
    let sensitivity_point = |terminal: Rate, wacc_shift: Rate| -> Money {
        project_scenario(
            record,
            "sensitivity",
            base_growth,
            terminal,
            current_margin,
            wacc + wacc_shift,
            PROJECTION_YEARS,
        )
        .intrinsic_value_per_share
    };
    let sensitivity_to_wacc = WaccSensitivity {
        wacc_minus_1pct: sensitivity_point(dec!(0.025), dec!(-0.01)),
        wacc_plus_1pct: sensitivity_point(dec!(0.025), dec!(0.01)),
    };
    let sensitivity_to_growth = GrowthSensitivity {
        growth_minus_1pct: sensitivity_point(dec!(0.015), Decimal::ZERO),
        growth_plus_1pct: sensitivity_point(dec!(0.035), Decimal::ZERO),
    };

    let output = DcfValuation {
        methodology: "Discounted Cash Flow (FCFF)".to_string(),
        tax_rate: TAX_RATE,
        wacc: wacc_out.result,
        conservative,
        base_case,
        optimistic,
        scenario_weights: ScenarioWeights {
            conservative: WEIGHT_CONSERVATIVE,
            base_case: WEIGHT_BASE_CASE,
            optimistic: WEIGHT_OPTIMISTIC,
        },
        weighted_intrinsic_value,
        sensitivity_to_wacc,
        sensitivity_to_growth,
    };

    Ok(with_metadata(
        "Three-scenario FCFF DCF, probability-weighted 25/50/25",
        &json!({
            "ticker": record.ticker,
            "base_growth": base_growth,
            "operating_margin": current_margin,
            "wacc": wacc,
            "projection_years": PROJECTION_YEARS,
        }),
        warnings,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
