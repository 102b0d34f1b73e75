//! The valuation engine: cost of capital, multi-scenario DCF, Graham
//! heuristics, and the composite verdict.
//!
//! Every public operation is a pure function of a
//! [`FinancialStatementRecord`](crate::record::FinancialStatementRecord)
//! plus the fixed constants in these modules. Results are wrapped in the
//! [`ComputationOutput`](crate::types::ComputationOutput) envelope so that
//! reportable conditions (clamped terminal growth, distressed-spread
//! fallbacks) travel with the numbers as warnings.

pub mod dcf;
pub mod engine;
pub mod graham;
pub mod scenario;
pub mod screen;
pub mod wacc;

use rust_decimal_macros::dec;

use crate::types::Rate;

/// US federal corporate tax rate, applied to EBIT and the cost of debt.
pub const TAX_RATE: Rate = dec!(0.21);

pub use dcf::{calculate_dcf, DcfValuation};
pub use engine::{calculate_valuation, ValuationReport, ValuationVerdict};
pub use graham::{calculate_graham_number, GrahamNumber};
pub use scenario::{project_scenario, DcfScenario};
pub use screen::{evaluate_defensive_screen, GrahamDefensiveCriteria};
pub use wacc::{calculate_wacc, WaccBreakdown};
