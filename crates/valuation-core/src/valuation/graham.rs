use rust_decimal::{Decimal, MathematicalOps};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::record::FinancialStatementRecord;
use crate::types::{with_metadata, ComputationOutput, Money, Multiple, Rate};
use crate::ValuationResult;

/// Graham's conservative valuation limit: 15 (max P/E) * 1.5 (max P/B).
const GRAHAM_MULTIPLIER: Multiple = dec!(22.5);

/// Benjamin Graham's closed-form intrinsic-value estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrahamNumber {
    pub methodology: String,
    pub eps_ttm: Money,
    pub book_value_per_share: Money,
    pub graham_multiplier: Multiple,
    /// sqrt(22.5 * EPS * BVPS); 0 when either input is non-positive — the
    /// formula is undefined for loss-making or negative-equity companies.
    pub graham_number: Money,
    pub current_price: Money,
    /// Upside vs. the current price; `None` means the number is not
    /// applicable, which is distinct from a real 100% downside.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upside_pct: Option<Rate>,
}

/// Calculate the Graham Number: `sqrt(22.5 * EPS * BVPS)`.
pub fn calculate_graham_number(
    record: &FinancialStatementRecord,
) -> ValuationResult<ComputationOutput<GrahamNumber>> {
    record.validate()?;

    let mut warnings: Vec<String> = Vec::new();

    let eps = record.ttm_eps;
    let bvps = record.book_value_per_share();

    let graham_number = if eps > Decimal::ZERO && bvps > Decimal::ZERO {
        (GRAHAM_MULTIPLIER * eps * bvps)
            .sqrt()
            .unwrap_or(Decimal::ZERO)
    } else {
        warnings.push(format!(
            "Graham number not applicable for {} (EPS {eps}, BVPS {bvps})",
            record.ticker
        ));
        Decimal::ZERO
    };

    let upside_pct = if graham_number > Decimal::ZERO && record.current_price > Decimal::ZERO {
        Some((graham_number - record.current_price) / record.current_price)
    } else {
        None
    };

    let output = GrahamNumber {
        methodology: "Graham Number = sqrt(22.5 * EPS * BVPS)".to_string(),
        eps_ttm: eps,
        book_value_per_share: bvps,
        graham_multiplier: GRAHAM_MULTIPLIER,
        graham_number,
        current_price: record.current_price,
        upside_pct,
    };

    Ok(with_metadata(
        "Graham Number",
        &json!({
            "ticker": record.ticker,
            "eps_ttm": eps,
            "book_value_per_share": bvps,
        }),
        warnings,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
