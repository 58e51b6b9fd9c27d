use rust_decimal::Decimal;
use thiserror::Error;

use crate::types::JurisdictionId;

#[derive(Debug, Error)]
pub enum PortfolioTaxError {
    #[error("Invalid holding '{ticker}': {field}: {reason}")]
    InvalidHolding {
        ticker: String,
        field: String,
        reason: String,
    },

    #[error("Unknown residence jurisdiction: {0}")]
    UnknownResidence(JurisdictionId),

    #[error("Unknown {role} jurisdiction: {id}")]
    UnknownJurisdiction { role: String, id: JurisdictionId },

    #[error("Report inconsistency: {figure} reported as {reported} but recomputed as {recomputed}")]
    ReportInconsistency {
        figure: String,
        reported: Decimal,
        recomputed: Decimal,
    },

    #[error("Invalid reference data: {field}: {reason}")]
    InvalidReferenceData { field: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for PortfolioTaxError {
    fn from(e: serde_json::Error) -> Self {
        PortfolioTaxError::SerializationError(e.to_string())
    }
}

impl From<serde_yaml::Error> for PortfolioTaxError {
    fn from(e: serde_yaml::Error) -> Self {
        PortfolioTaxError::SerializationError(e.to_string())
    }
}

impl PortfolioTaxError {
    pub(crate) fn invalid_holding(
        ticker: impl Into<String>,
        field: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        PortfolioTaxError::InvalidHolding {
            ticker: ticker.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_reference(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PortfolioTaxError::InvalidReferenceData {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
