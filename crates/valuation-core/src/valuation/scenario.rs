use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::record::FinancialStatementRecord;
use crate::types::{Money, Rate};
use crate::valuation::TAX_RATE;

/// Explicit forecast horizon for every scenario.
pub const PROJECTION_YEARS: u32 = 5;

/// Growth fades linearly toward the terminal rate over this many years,
/// even though only [`PROJECTION_YEARS`] are projected explicitly.
const GROWTH_FADE_YEARS: Decimal = dec!(10);

/// Reinvestment consumes at most this share of NOPAT.
const MAX_REINVESTMENT_RATE: Rate = dec!(0.80);

/// One growth/margin/discount-rate assumption set with its full projection.
/// Immutable once computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcfScenario {
    /// "conservative", "base_case", "optimistic", or "sensitivity".
    pub scenario_name: String,

    // Assumptions
    pub revenue_growth_rate: Rate,
    pub operating_margin_assumption: Rate,
    pub terminal_growth_rate: Rate,
    /// Terminal growth actually used in the Gordon model. Differs from
    /// `terminal_growth_rate` only when WACC <= terminal growth forced a
    /// clamp to WACC - 1%.
    pub effective_terminal_growth: Rate,
    pub wacc: Rate,
    pub projection_years: u32,

    // Per-year projections, index 0 = year 1
    pub projected_revenue: Vec<Money>,
    pub projected_ebit: Vec<Money>,
    pub projected_nopat: Vec<Money>,
    pub projected_fcf: Vec<Money>,

    // Terminal value (Gordon growth)
    pub terminal_fcf: Money,
    pub terminal_value: Money,

    // Present values
    pub pv_explicit_period: Money,
    pub pv_terminal_value: Money,

    // Valuation
    pub enterprise_value: Money,
    pub equity_value: Money,
    pub intrinsic_value_per_share: Money,
    pub current_price: Money,
    pub upside_downside_pct: Rate,
}

impl DcfScenario {
    /// True when the Gordon denominator forced the terminal growth down.
    pub fn terminal_growth_clamped(&self) -> bool {
        self.effective_terminal_growth != self.terminal_growth_rate
    }
}

/// Project a single DCF scenario.
///
/// Year growth decays from the initial rate toward the terminal rate:
/// `g(t) = g0 - (g0 - g_term) * t / 10`. Revenue compounds at g(t),
/// EBIT = revenue * margin, NOPAT = EBIT * (1 - tax), and FCF withholds a
/// reinvestment share of `min(g(t) / ROIC, 0.80)` (floored at zero).
/// Terminal value uses the Gordon growth model with the terminal rate
/// clamped to WACC - 1% whenever WACC <= terminal growth; the clamp is a
/// documented edge case, not an error, and is visible on the returned
/// scenario. Degenerate inputs (zero shares, zero price) produce zero
/// values rather than panics; the caller treats them as data-quality
/// conditions.
pub fn project_scenario(
    record: &FinancialStatementRecord,
    scenario_name: &str,
    growth_rate: Rate,
    terminal_growth: Rate,
    operating_margin: Rate,
    wacc: Rate,
    years: u32,
) -> DcfScenario {
    let roic = record.effective_roic();

    let mut projected_revenue = Vec::with_capacity(years as usize);
    let mut projected_ebit = Vec::with_capacity(years as usize);
    let mut projected_nopat = Vec::with_capacity(years as usize);
    let mut projected_fcf = Vec::with_capacity(years as usize);

    let mut revenue = record.ttm_revenue;
    for year in 1..=years {
        let t = Decimal::from(year);
        let year_growth = growth_rate - (growth_rate - terminal_growth) * t / GROWTH_FADE_YEARS;

        revenue *= Decimal::ONE + year_growth;
        let ebit = revenue * operating_margin;
        let nopat = ebit * (Decimal::ONE - TAX_RATE);

        // Growth requires reinvestment; faster growth or weaker ROIC
        // consumes more of NOPAT.
        let reinvestment_rate = (year_growth / roic)
            .min(MAX_REINVESTMENT_RATE)
            .max(Decimal::ZERO);
        let fcf = nopat * (Decimal::ONE - reinvestment_rate);

        projected_revenue.push(revenue);
        projected_ebit.push(ebit);
        projected_nopat.push(nopat);
        projected_fcf.push(fcf);
    }

    // --- Terminal value (Gordon growth) ---
    let effective_terminal_growth = if wacc <= terminal_growth {
        wacc - dec!(0.01)
    } else {
        terminal_growth
    };
    let last_fcf = projected_fcf.last().copied().unwrap_or(Decimal::ZERO);
    let terminal_fcf = last_fcf * (Decimal::ONE + effective_terminal_growth);
    let terminal_value = terminal_fcf / (wacc - effective_terminal_growth);

    // --- Present values, discounted at end of year ---
    let one_plus_wacc = Decimal::ONE + wacc;
    let pv_explicit_period: Money = projected_fcf
        .iter()
        .enumerate()
        .map(|(i, fcf)| *fcf / one_plus_wacc.powd(Decimal::from(i as u32 + 1)))
        .sum();
    let pv_terminal_value = terminal_value / one_plus_wacc.powd(Decimal::from(years));

    // --- Equity bridge ---
    let enterprise_value = pv_explicit_period + pv_terminal_value;
    let equity_value = enterprise_value - record.effective_net_debt();
    let intrinsic_value_per_share = if record.shares_outstanding > Decimal::ZERO {
        (equity_value / record.shares_outstanding).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    let upside_downside_pct = if record.current_price > Decimal::ZERO {
        (intrinsic_value_per_share - record.current_price) / record.current_price
    } else {
        Decimal::ZERO
    };

    DcfScenario {
        scenario_name: scenario_name.to_string(),
        revenue_growth_rate: growth_rate,
        operating_margin_assumption: operating_margin,
        terminal_growth_rate: terminal_growth,
        effective_terminal_growth,
        wacc,
        projection_years: years,
        projected_revenue,
        projected_ebit,
        projected_nopat,
        projected_fcf,
        terminal_fcf,
        terminal_value,
        pv_explicit_period,
        pv_terminal_value,
        enterprise_value,
        equity_value,
        intrinsic_value_per_share,
        current_price: record.current_price,
        upside_downside_pct,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
