//! The report pipeline: normalize holdings, aggregate per domicile, apply the
//! residence policy, compose and cross-check.
//!
//! Computation is pure and synchronous. The residence is always an explicit
//! argument; the engine keeps no notion of a "current" selection.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::aggregator::aggregate_by_jurisdiction;
use crate::holding::{normalize_holdings, RawHolding};
use crate::reference::ReferenceData;
use crate::registry::PolicyKind;
use crate::report::{compose_report, TaxReport};
use crate::residence::{compute_residence_tax, PortfolioGains};
use crate::treaty::{RateBasis, STANDARD_NONTREATY_WITHHOLDING};
use crate::types::{with_metadata, ComputationOutput, JurisdictionId};
use crate::PortfolioTaxResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxReportInput {
    pub holdings: Vec<RawHolding>,
    #[serde(alias = "residenceCountryId", alias = "residence_country_id")]
    pub residence_country: JurisdictionId,
    /// Overrides the built-in tables when present.
    #[serde(default, alias = "referenceData", skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<ReferenceData>,
}

/// Engine bound to one set of reference data. Cheap to copy and safe to
/// share: it only borrows immutable tables.
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    reference: &'a ReferenceData,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl<'a> TaxEngine<'a> {
    pub fn new(reference: &'a ReferenceData) -> Self {
        TaxEngine { reference }
    }

    pub fn reference(&self) -> &'a ReferenceData {
        self.reference
    }

    pub fn compute(
        &self,
        holdings: &[RawHolding],
        residence_country: &JurisdictionId,
    ) -> PortfolioTaxResult<TaxReport> {
        let registry = self.reference.jurisdictions();
        let residence = registry.resolve_residence(residence_country)?;
        let holdings = normalize_holdings(holdings, registry)?;

        let aggregation =
            aggregate_by_jurisdiction(&holdings, residence_country, self.reference.treaties());

        let gains = PortfolioGains::for_policy(&holdings, &residence.capital_gains);
        let residence_tax = compute_residence_tax(residence, &gains);

        let report = compose_report(residence_country, aggregation, residence_tax)?;
        tracing::debug!(
            residence = %residence_country,
            jurisdictions = report.by_jurisdiction.len(),
            grand_total = %report.grand_total_tax_obligation,
            "tax report composed"
        );
        Ok(report)
    }
}

/// Compute the tax report for `holdings` held by a resident of
/// `residence_country`.
pub fn compute_tax_report(
    holdings: &[RawHolding],
    residence_country: &JurisdictionId,
    reference: &ReferenceData,
) -> PortfolioTaxResult<TaxReport> {
    TaxEngine::new(reference).compute(holdings, residence_country)
}

#[cfg(feature = "builtin")]
fn resolve_reference(input: &TaxReportInput) -> PortfolioTaxResult<&ReferenceData> {
    Ok(input
        .reference_data
        .as_ref()
        .unwrap_or_else(|| ReferenceData::builtin()))
}

#[cfg(not(feature = "builtin"))]
fn resolve_reference(input: &TaxReportInput) -> PortfolioTaxResult<&ReferenceData> {
    input.reference_data.as_ref().ok_or_else(|| {
        crate::error::PortfolioTaxError::invalid_reference(
            "reference_data",
            "Reference data is required when built-in tables are disabled",
        )
    })
}

fn report_warnings(report: &TaxReport, holding_count: usize) -> Vec<String> {
    let mut warnings = Vec::new();

    if holding_count == 0 {
        warnings.push("Portfolio has no holdings; all obligations are zero.".to_string());
    }
    for b in &report.by_jurisdiction {
        if b.rate_basis == RateBasis::StandardDefault {
            warnings.push(format!(
                "No treaty data for {} -> {}: standard non-treaty withholding of {}% applied.",
                report.residence_country, b.jurisdiction_id, STANDARD_NONTREATY_WITHHOLDING
            ));
        }
    }
    if report.residence.policy == PolicyKind::Exempt {
        warnings.push(format!(
            "{} does not tax capital gains; home-country capital gains tax is zero.",
            report.residence_country
        ));
    }
    warnings
}

/// Compute a tax report wrapped in the standard computation envelope.
pub fn calculate_tax_report(
    input: &TaxReportInput,
) -> PortfolioTaxResult<ComputationOutput<TaxReport>> {
    let start = Instant::now();

    let reference = resolve_reference(input)?;
    let report = compute_tax_report(&input.holdings, &input.residence_country, reference)?;
    let warnings = report_warnings(&report, input.holdings.len());

    let assumptions = serde_json::json!({
        "residence_country": input.residence_country,
        "num_holdings": input.holdings.len(),
        "standard_nontreaty_withholding_pct": STANDARD_NONTREATY_WITHHOLDING.to_string(),
        "reference_data": if input.reference_data.is_some() { "supplied" } else { "builtin" },
        "loss_netting": "within term bucket only, no carry-forward",
    });

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Per-domicile dividend withholding and source capital gains tax with treaty lookup, \
         plus residence capital gains tax on aggregate unrealized gains",
        &assumptions,
        warnings,
        elapsed,
        report,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
