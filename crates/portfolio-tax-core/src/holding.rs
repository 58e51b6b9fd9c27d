use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::error::PortfolioTaxError;
use crate::registry::JurisdictionRegistry;
use crate::types::{JurisdictionId, Money};
use crate::PortfolioTaxResult;

/// Upper bound on any single monetary field or quantity. Portfolio totals and
/// percentage products stay far inside `Decimal` range below it.
pub const MAX_HOLDING_AMOUNT: Decimal = dec!(1_000_000_000_000_000);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A holding as received from the portfolio snapshot. Fields are kept as
/// loose JSON values so that a missing or mistyped value is reported against
/// its holding and field instead of failing the whole document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHolding {
    #[serde(default)]
    pub ticker: Option<Value>,
    #[serde(default)]
    pub quantity: Option<Value>,
    #[serde(default, alias = "costBasis")]
    pub cost_basis: Option<Value>,
    #[serde(default, alias = "currentValue")]
    pub current_value: Option<Value>,
    #[serde(default, alias = "dividendYTD")]
    pub dividend_ytd: Option<Value>,
    #[serde(default, alias = "domicileCountry")]
    pub domicile_country: Option<Value>,
    #[serde(default, alias = "holdingPeriodDays")]
    pub holding_period_days: Option<Value>,
}

/// A validated position. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: String,
    pub quantity: Decimal,
    pub cost_basis: Money,
    pub current_value: Money,
    pub dividend_ytd: Money,
    pub domicile_country: JurisdictionId,
    /// Days since acquisition. Unknown periods count as long-term.
    pub holding_period_days: Option<u32>,
}

impl Holding {
    pub fn unrealized_gain_loss(&self) -> Money {
        self.current_value - self.cost_basis
    }
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn text(value: &Option<Value>) -> Result<Option<&str>, String> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim()).filter(|s| !s.is_empty())),
        Some(other) => Err(format!("Expected a string, got {}", other)),
    }
}

fn decimal(ticker: &str, field: &str, value: &Option<Value>) -> PortfolioTaxResult<Decimal> {
    let value = match value {
        None | Some(Value::Null) => {
            return Err(PortfolioTaxError::invalid_holding(ticker, field, "Field is required"))
        }
        Some(v) => v,
    };
    let parsed = <Decimal as Deserialize>::deserialize(value).map_err(|_| {
        PortfolioTaxError::invalid_holding(ticker, field, format!("Expected a number, got {}", value))
    })?;
    if parsed.abs() > MAX_HOLDING_AMOUNT {
        return Err(PortfolioTaxError::invalid_holding(
            ticker,
            field,
            format!("Exceeds the supported maximum of {}", MAX_HOLDING_AMOUNT),
        ));
    }
    Ok(parsed)
}

fn non_negative(ticker: &str, field: &str, value: &Option<Value>) -> PortfolioTaxResult<Decimal> {
    let v = decimal(ticker, field, value)?;
    if v < dec!(0) {
        return Err(PortfolioTaxError::invalid_holding(
            ticker,
            field,
            format!("Must be non-negative, got {}", v),
        ));
    }
    Ok(v)
}

fn holding_period(ticker: &str, value: &Option<Value>) -> PortfolioTaxResult<Option<u32>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => <u32 as Deserialize>::deserialize(v).map(Some).map_err(|_| {
            PortfolioTaxError::invalid_holding(
                ticker,
                "holding_period_days",
                format!("Expected a non-negative whole number of days, got {}", v),
            )
        }),
    }
}

/// Validate one raw record and shape it into a [`Holding`].
///
/// `index` only labels holdings that arrive without a ticker.
pub fn normalize_holding(
    raw: &RawHolding,
    index: usize,
    registry: &JurisdictionRegistry,
) -> PortfolioTaxResult<Holding> {
    let label = format!("#{}", index);
    let ticker = text(&raw.ticker)
        .map_err(|reason| PortfolioTaxError::invalid_holding(&label, "ticker", reason))?
        .ok_or_else(|| {
            PortfolioTaxError::invalid_holding(&label, "ticker", "Ticker must not be empty")
        })?;

    let quantity = decimal(ticker, "quantity", &raw.quantity)?;
    if quantity <= dec!(0) {
        return Err(PortfolioTaxError::invalid_holding(
            ticker,
            "quantity",
            format!("Must be positive, got {}", quantity),
        ));
    }
    let cost_basis = non_negative(ticker, "cost_basis", &raw.cost_basis)?;
    let current_value = non_negative(ticker, "current_value", &raw.current_value)?;
    let dividend_ytd = non_negative(ticker, "dividend_ytd", &raw.dividend_ytd)?;

    let domicile_country = text(&raw.domicile_country)
        .map_err(|reason| PortfolioTaxError::invalid_holding(ticker, "domicile_country", reason))?
        .map(JurisdictionId::new)
        .ok_or_else(|| {
            PortfolioTaxError::invalid_holding(ticker, "domicile_country", "Field is required")
        })?;
    if !registry.contains(&domicile_country) {
        return Err(PortfolioTaxError::invalid_holding(
            ticker,
            "domicile_country",
            format!("Unknown jurisdiction '{}'", domicile_country),
        ));
    }
    let holding_period_days = holding_period(ticker, &raw.holding_period_days)?;

    Ok(Holding {
        ticker: ticker.to_string(),
        quantity,
        cost_basis,
        current_value,
        dividend_ytd,
        domicile_country,
        holding_period_days,
    })
}

/// Normalize a portfolio. The first offending holding rejects the batch;
/// tickers must be unique within the portfolio.
pub fn normalize_holdings(
    raws: &[RawHolding],
    registry: &JurisdictionRegistry,
) -> PortfolioTaxResult<Vec<Holding>> {
    let mut seen: HashSet<String> = HashSet::with_capacity(raws.len());
    let mut holdings = Vec::with_capacity(raws.len());

    for (i, raw) in raws.iter().enumerate() {
        let holding = normalize_holding(raw, i, registry)?;
        if !seen.insert(holding.ticker.clone()) {
            return Err(PortfolioTaxError::invalid_holding(
                holding.ticker,
                "ticker",
                "Ticker appears more than once in the portfolio",
            ));
        }
        holdings.push(holding);
    }

    tracing::debug!(count = holdings.len(), "normalized holdings");
    Ok(holdings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
