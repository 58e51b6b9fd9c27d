pub mod error;
pub mod types;

pub mod aggregator;
pub mod engine;
pub mod holding;
pub mod reference;
pub mod registry;
pub mod report;
pub mod residence;
pub mod treaty;

#[cfg(feature = "builtin")]
mod builtin;

pub use engine::{calculate_tax_report, compute_tax_report, TaxEngine, TaxReportInput};
pub use error::PortfolioTaxError;
pub use reference::ReferenceData;
pub use report::TaxReport;
pub use treaty::STANDARD_NONTREATY_WITHHOLDING;
pub use types::*;

/// Standard result type for all portfolio-tax operations
pub type PortfolioTaxResult<T> = Result<T, PortfolioTaxError>;
