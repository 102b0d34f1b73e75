//! Input contract for the valuation engine.
//!
//! A [`FinancialStatementRecord`] is the normalized per-ticker snapshot
//! produced by the upstream extraction layer. Most fields are optional;
//! the `effective_*` accessors compute documented fallbacks on read so the
//! calculation modules never branch on missing data themselves.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{Money, Multiple, Rate};
use crate::ValuationResult;

fn default_equity_risk_premium() -> Rate {
    dec!(0.05)
}

/// One fiscal year of annual financials, used for CAGR fallbacks and the
/// defensive screen's earnings-stability and growth tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalYear {
    pub fiscal_year: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_profit: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_income: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_income: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_cash_flow: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depreciation_amortization: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_expenditures: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_assets: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_liabilities: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shareholders_equity: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_and_equivalents: Option<Money>,
}

/// Normalized financial-statement snapshot for one ticker.
///
/// All monetary values are USD. All ratios and rates are decimal fractions
/// (0.15 = 15%), never percentages. `historical_financials` is sorted most
/// recent year first — the upstream contract guarantees it and
/// [`validate`](Self::validate) rejects anything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialStatementRecord {
    // --- Identity ---
    pub ticker: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    pub extraction_timestamp: DateTime<Utc>,
    /// Upstream extraction quality, in [0, 1].
    pub data_confidence_score: Decimal,

    // --- Market position ---
    pub current_price: Money,
    pub shares_outstanding: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enterprise_value: Option<Money>,

    // --- Income statement (trailing twelve months) ---
    pub ttm_revenue: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_cost_of_revenue: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_gross_profit: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_operating_expenses: Option<Money>,
    pub ttm_operating_income: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_interest_expense: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_pretax_income: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_tax_expense: Option<Money>,
    pub ttm_net_income: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_ebitda: Option<Money>,
    pub ttm_eps: Money,

    // --- Cash flow (trailing twelve months) ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_operating_cash_flow: Option<Money>,
    /// Capital expenditures as reported; sign is normalized away on read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_capital_expenditures: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_free_cash_flow: Option<Money>,
    pub ttm_depreciation_amortization: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_stock_based_compensation: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_dividends_paid: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttm_share_repurchases: Option<Money>,

    // --- Balance sheet (latest period, not summed) ---
    pub cash_and_equivalents: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term_investments: Option<Money>,
    pub total_cash: Money,
    pub accounts_receivable: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<Money>,
    pub total_current_assets: Money,
    pub property_plant_equipment: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub goodwill: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intangible_assets: Option<Money>,
    pub total_assets: Money,
    pub accounts_payable: Money,
    pub short_term_debt: Money,
    pub total_current_liabilities: Money,
    pub long_term_debt: Money,
    pub total_debt: Money,
    pub total_liabilities: Money,
    pub shareholders_equity: Money,
    pub retained_earnings: Money,

    // --- Derived position metrics (computed on read when absent) ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_debt: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_capital: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invested_capital: Option<Money>,

    // --- Profitability ratios ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gross_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operating_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ebitda_margin: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roe: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roa: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roic: Option<Rate>,

    // --- Efficiency / leverage / liquidity ratios ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_turnover: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debt_to_equity: Option<Decimal>,
    /// EBIT / interest expense; drives the credit-spread lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_coverage: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quick_ratio: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cash_ratio: Option<Decimal>,

    // --- Market multiples ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pe_ratio: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_pe: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ev_to_ebitda: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_to_book: Option<Multiple>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcf_yield: Option<Rate>,

    // --- Growth rates (annualized CAGRs) ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_1y: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_3y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_5y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revenue_growth_10y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_growth_1y: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_growth_3y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_growth_5y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub earnings_growth_10y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcf_growth_1y: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcf_growth_3y_cagr: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fcf_growth_5y_cagr: Option<Rate>,

    // --- Risk parameters ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beta: Option<Decimal>,
    /// 10-year Treasury yield as a decimal; sanity-bounded to [0, 0.20].
    pub risk_free_rate: Rate,
    #[serde(default = "default_equity_risk_premium")]
    pub equity_risk_premium: Rate,

    // --- Dividend data ---
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_per_share: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividend_yield: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_ratio: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub years_of_dividend_growth: Option<u32>,

    // --- Historical financials (most recent year first, up to 15) ---
    #[serde(default)]
    pub historical_financials: Vec<HistoricalYear>,

    // --- Data quality flags from extraction ---
    #[serde(default)]
    pub fields_missing: Vec<String>,
    #[serde(default)]
    pub fields_estimated: Vec<String>,
    #[serde(default)]
    pub data_anomalies: Vec<String>,
}

const MAX_HISTORY_YEARS: usize = 15;

impl FinancialStatementRecord {
    /// Check the invariants the calculation pipeline relies on.
    ///
    /// Violations fail fast with a descriptive error instead of flowing
    /// downstream as silent zero valuations.
    pub fn validate(&self) -> ValuationResult<()> {
        if self.current_price <= Decimal::ZERO {
            return Err(ValuationError::InvalidInput {
                field: "current_price".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.shares_outstanding <= Decimal::ZERO {
            return Err(ValuationError::InvalidInput {
                field: "shares_outstanding".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.total_assets <= Decimal::ZERO {
            return Err(ValuationError::InvalidInput {
                field: "total_assets".into(),
                reason: "Must be positive".into(),
            });
        }
        if self.risk_free_rate < Decimal::ZERO || self.risk_free_rate > dec!(0.20) {
            return Err(ValuationError::InvalidInput {
                field: "risk_free_rate".into(),
                reason: "Must be within [0, 0.20]".into(),
            });
        }
        if self.data_confidence_score < Decimal::ZERO || self.data_confidence_score > Decimal::ONE
        {
            return Err(ValuationError::InvalidInput {
                field: "data_confidence_score".into(),
                reason: "Must be within [0, 1]".into(),
            });
        }
        if self.historical_financials.len() > MAX_HISTORY_YEARS {
            return Err(ValuationError::InvalidInput {
                field: "historical_financials".into(),
                reason: format!("At most {MAX_HISTORY_YEARS} annual records are accepted"),
            });
        }
        // Upstream guarantees most-recent-first ordering; reject rather than re-sort.
        let ordered = self
            .historical_financials
            .windows(2)
            .all(|w| w[0].fiscal_year > w[1].fiscal_year);
        if !ordered {
            return Err(ValuationError::InvalidInput {
                field: "historical_financials".into(),
                reason: "Must be sorted by fiscal year, most recent first".into(),
            });
        }
        Ok(())
    }

    // --- Fallback derivations (pure, computed on read) ---

    pub fn effective_market_cap(&self) -> Money {
        match self.market_cap.filter(|v| *v > Decimal::ZERO) {
            Some(mc) => mc,
            None => self.current_price * self.shares_outstanding,
        }
    }

    pub fn effective_enterprise_value(&self) -> Money {
        match self.enterprise_value {
            Some(ev) => ev,
            None => self.effective_market_cap() + self.total_debt - self.total_cash,
        }
    }

    pub fn effective_net_debt(&self) -> Money {
        self.net_debt
            .unwrap_or(self.total_debt - self.total_cash)
    }

    pub fn effective_working_capital(&self) -> Money {
        self.working_capital
            .unwrap_or(self.total_current_assets - self.total_current_liabilities)
    }

    pub fn effective_invested_capital(&self) -> Money {
        self.invested_capital
            .unwrap_or(self.shareholders_equity + self.total_debt - self.total_cash)
    }

    /// FCF as given, or operating cash flow less |capex| when derivable.
    pub fn effective_free_cash_flow(&self) -> Option<Money> {
        if let Some(fcf) = self.ttm_free_cash_flow {
            return Some(fcf);
        }
        let ocf = self.ttm_operating_cash_flow?;
        let capex = self.ttm_capital_expenditures.unwrap_or(Decimal::ZERO).abs();
        Some(ocf - capex)
    }

    pub fn effective_operating_margin(&self) -> Rate {
        if let Some(margin) = self.operating_margin {
            return margin;
        }
        if self.ttm_revenue > Decimal::ZERO {
            self.ttm_operating_income / self.ttm_revenue
        } else {
            Decimal::ZERO
        }
    }

    /// ROIC, defaulting to 10% when absent or non-positive.
    pub fn effective_roic(&self) -> Rate {
        self.roic
            .filter(|r| *r > Decimal::ZERO)
            .unwrap_or(dec!(0.10))
    }

    pub fn effective_beta(&self) -> Decimal {
        self.beta.unwrap_or(Decimal::ONE)
    }

    pub fn effective_current_ratio(&self) -> Decimal {
        if let Some(cr) = self.current_ratio {
            return cr;
        }
        if self.total_current_liabilities > Decimal::ZERO {
            self.total_current_assets / self.total_current_liabilities
        } else {
            Decimal::ZERO
        }
    }

    pub fn effective_debt_to_equity(&self) -> Decimal {
        if let Some(de) = self.debt_to_equity {
            return de;
        }
        if self.shareholders_equity > Decimal::ZERO {
            self.total_debt / self.shareholders_equity
        } else {
            Decimal::ZERO
        }
    }

    /// Shareholders' equity per share; 0 when shares outstanding is not positive.
    pub fn book_value_per_share(&self) -> Money {
        if self.shares_outstanding > Decimal::ZERO {
            self.shareholders_equity / self.shares_outstanding
        } else {
            Decimal::ZERO
        }
    }

    /// Base revenue growth for DCF projections.
    ///
    /// Preference order: 5-year revenue CAGR, CAGR recomputed from history,
    /// 1-year revenue growth, then a 5% default.
    pub fn base_revenue_growth(&self) -> Rate {
        if let Some(g) = self.revenue_growth_5y_cagr {
            return g;
        }
        if let Some(g) = self.historical_revenue_cagr_5y() {
            return g;
        }
        if let Some(g) = self.revenue_growth_1y {
            return g;
        }
        dec!(0.05)
    }

    /// Five-period revenue CAGR from the historical list, when six or more
    /// years with positive endpoint revenues are available.
    fn historical_revenue_cagr_5y(&self) -> Option<Rate> {
        if self.historical_financials.len() < 6 {
            return None;
        }
        let newest = self.historical_financials[0].revenue?;
        let oldest = self.historical_financials[5].revenue?;
        if newest <= Decimal::ZERO || oldest <= Decimal::ZERO {
            return None;
        }
        Some((newest / oldest).powd(dec!(0.2)) - Decimal::ONE)
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{blank_history, sample_record};
    use super::*;

    #[test]
    fn test_validate_accepts_sample() {
        assert!(sample_record().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_shares() {
        let mut record = sample_record();
        record.shares_outstanding = Decimal::ZERO;
        let err = record.validate().unwrap_err();
        match err {
            ValuationError::InvalidInput { field, .. } => {
                assert_eq!(field, "shares_outstanding");
            }
            e => panic!("Expected InvalidInput, got {e:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_risk_free_rate() {
        let mut record = sample_record();
        record.risk_free_rate = dec!(0.25);
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsorted_history() {
        let mut record = sample_record();
        record.historical_financials = vec![blank_history(2022), blank_history(2023)];
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_net_debt_fallback() {
        let mut record = sample_record();
        record.net_debt = None;
        assert_eq!(record.effective_net_debt(), dec!(100000000));
        record.net_debt = Some(dec!(42));
        assert_eq!(record.effective_net_debt(), dec!(42));
    }

    #[test]
    fn test_free_cash_flow_derived_from_ocf_and_capex() {
        let record = sample_record();
        // OCF 160M - |CapEx| 40M = 120M
        assert_eq!(record.effective_free_cash_flow(), Some(dec!(120000000)));
    }

    #[test]
    fn test_roic_default_when_non_positive() {
        let mut record = sample_record();
        record.roic = Some(dec!(-0.05));
        assert_eq!(record.effective_roic(), dec!(0.10));
        record.roic = None;
        assert_eq!(record.effective_roic(), dec!(0.10));
    }

    #[test]
    fn test_base_growth_prefers_5y_cagr() {
        let record = sample_record();
        assert_eq!(record.base_revenue_growth(), dec!(0.08));
    }

    #[test]
    fn test_base_growth_from_history_when_cagr_absent() {
        let mut record = sample_record();
        record.revenue_growth_5y_cagr = None;
        record.revenue_growth_1y = None;
        let mut history = Vec::new();
        // Revenue doubling over five periods: CAGR = 2^(1/5) - 1 ~= 14.87%
        for (i, rev) in [200i64, 185, 170, 150, 120, 100].iter().enumerate() {
            let mut year = blank_history(2023 - i as i32);
            year.revenue = Some(Decimal::from(*rev));
            history.push(year);
        }
        record.historical_financials = history;
        let growth = record.base_revenue_growth();
        assert!(
            (growth - dec!(0.1487)).abs() < dec!(0.001),
            "Expected ~14.87% CAGR, got {growth}"
        );
    }

    #[test]
    fn test_base_growth_default_when_nothing_available() {
        let mut record = sample_record();
        record.revenue_growth_5y_cagr = None;
        record.revenue_growth_1y = None;
        record.historical_financials = Vec::new();
        assert_eq!(record.base_revenue_growth(), dec!(0.05));
    }

    #[test]
    fn test_book_value_per_share() {
        let record = sample_record();
        // 50M equity / 1M shares = 50
        assert_eq!(record.book_value_per_share(), dec!(50));
    }

    #[test]
    fn test_record_roundtrips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: FinancialStatementRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ticker, "ACME");
        assert_eq!(back.ttm_eps, dec!(5.0));
        assert_eq!(back.equity_risk_premium, dec!(0.05));
    }
}
