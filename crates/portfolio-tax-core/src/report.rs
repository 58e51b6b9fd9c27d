use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::aggregator::{JurisdictionAggregation, JurisdictionBreakdown};
use crate::error::PortfolioTaxError;
use crate::residence::ResidenceTax;
use crate::types::{apply_percent, JurisdictionId, Money};
use crate::PortfolioTaxResult;

/// Largest divergence tolerated between a reported and a recomputed figure.
pub const CONSISTENCY_EPSILON: Decimal = dec!(0.000001);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxReport {
    pub residence_country: JurisdictionId,
    pub by_jurisdiction: Vec<JurisdictionBreakdown>,
    pub total_dividends: Money,
    pub total_foreign_withholding: Money,
    pub total_source_capital_gains_tax: Money,
    pub home_country_capital_gains_tax: Money,
    pub grand_total_tax_obligation: Money,
    pub total_treaty_savings: Money,
    pub residence: ResidenceTax,
}

fn check(figure: impl Into<String>, reported: Money, recomputed: Money) -> PortfolioTaxResult<()> {
    if (reported - recomputed).abs() > CONSISTENCY_EPSILON {
        return Err(PortfolioTaxError::ReportInconsistency {
            figure: figure.into(),
            reported,
            recomputed,
        });
    }
    Ok(())
}

fn check_breakdown(b: &JurisdictionBreakdown) -> PortfolioTaxResult<()> {
    let id = &b.jurisdiction_id;
    check(
        format!("by_jurisdiction[{}].dividend_withholding_tax", id),
        b.dividend_withholding_tax,
        apply_percent(b.total_dividends, b.withholding_rate_applied),
    )?;
    check(
        format!("by_jurisdiction[{}].source_capital_gains_tax", id),
        b.source_capital_gains_tax,
        apply_percent(b.total_capital_gains, b.source_capital_gains_rate_applied),
    )
}

/// Merge the per-jurisdiction and residence results into a report.
///
/// Totals are recomputed from the breakdowns and compared against the
/// upstream running sums. Any divergence is an engine bug and fails the
/// report rather than being corrected.
pub fn compose_report(
    residence_country: &JurisdictionId,
    aggregation: JurisdictionAggregation,
    residence: ResidenceTax,
) -> PortfolioTaxResult<TaxReport> {
    let mut total_dividends = Decimal::ZERO;
    let mut total_foreign_withholding = Decimal::ZERO;
    let mut total_source_capital_gains_tax = Decimal::ZERO;
    let mut total_treaty_savings = Decimal::ZERO;

    for b in &aggregation.breakdowns {
        check_breakdown(b)?;
        total_dividends += b.total_dividends;
        total_foreign_withholding += b.dividend_withholding_tax;
        total_source_capital_gains_tax += b.source_capital_gains_tax;
        total_treaty_savings += b.treaty_savings;
    }

    check("total_dividends", aggregation.total_dividends, total_dividends)?;
    check(
        "total_foreign_withholding",
        aggregation.total_withholding,
        total_foreign_withholding,
    )?;
    check(
        "total_source_capital_gains_tax",
        aggregation.total_source_capital_gains_tax,
        total_source_capital_gains_tax,
    )?;
    check(
        "total_treaty_savings",
        aggregation.total_treaty_savings,
        total_treaty_savings,
    )?;

    let home_country_capital_gains_tax = residence.tax;
    let grand_total_tax_obligation =
        total_foreign_withholding + total_source_capital_gains_tax + home_country_capital_gains_tax;

    Ok(TaxReport {
        residence_country: residence_country.clone(),
        by_jurisdiction: aggregation.breakdowns,
        total_dividends,
        total_foreign_withholding,
        total_source_capital_gains_tax,
        home_country_capital_gains_tax,
        grand_total_tax_obligation,
        total_treaty_savings,
        residence,
    })
}
