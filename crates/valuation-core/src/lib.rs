pub mod error;
pub mod record;
pub mod types;
pub mod valuation;

pub use error::ValuationError;
pub use record::{FinancialStatementRecord, HistoricalYear};
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;
