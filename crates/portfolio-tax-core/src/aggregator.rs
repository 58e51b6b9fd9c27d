//! Per-domicile aggregation of dividend withholding and source capital gains
//! tax.
//!
//! Each domicile country taxes its own holdings independently: withholding
//! applies to every dividend, source capital gains tax only to holdings with
//! a positive unrealized gain. Losses are never netted at source.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::holding::Holding;
use crate::treaty::{RateBasis, TreatyTable, WithholdingTerms, STANDARD_NONTREATY_WITHHOLDING};
use crate::types::{apply_percent, JurisdictionId, Money, Percent};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionBreakdown {
    pub jurisdiction_id: JurisdictionId,
    pub holding_count: usize,
    pub total_dividends: Money,
    pub dividend_withholding_tax: Money,
    /// Sum of positive unrealized gains taxed at source.
    pub total_capital_gains: Money,
    pub source_capital_gains_tax: Money,
    pub withholding_rate_applied: Percent,
    pub source_capital_gains_rate_applied: Percent,
    pub treaty_applied: bool,
    pub rate_basis: RateBasis,
    pub treaty_name: Option<String>,
    /// Withholding that would apply at the standard non-treaty rate.
    pub standard_withholding_tax: Money,
    pub treaty_savings: Money,
}

/// Aggregator output: breakdowns sorted by jurisdiction id plus the running
/// totals the composer cross-checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionAggregation {
    pub breakdowns: Vec<JurisdictionBreakdown>,
    pub total_dividends: Money,
    pub total_withholding: Money,
    pub total_source_capital_gains_tax: Money,
    pub total_treaty_savings: Money,
}

#[derive(Default)]
struct GroupTotals {
    holding_count: usize,
    dividends: Money,
    positive_gains: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Group holdings by domicile and apply each domicile's rates for a resident
/// of `residence`. The result does not depend on the order of `holdings`.
pub fn aggregate_by_jurisdiction(
    holdings: &[Holding],
    residence: &JurisdictionId,
    treaties: &TreatyTable,
) -> JurisdictionAggregation {
    let mut groups: BTreeMap<&JurisdictionId, GroupTotals> = BTreeMap::new();
    for holding in holdings {
        let group = groups.entry(&holding.domicile_country).or_default();
        group.holding_count += 1;
        group.dividends += holding.dividend_ytd;

        let gain = holding.unrealized_gain_loss();
        if gain > dec!(0) {
            group.positive_gains += gain;
        }
    }

    let mut aggregation = JurisdictionAggregation {
        breakdowns: Vec::with_capacity(groups.len()),
        total_dividends: Decimal::ZERO,
        total_withholding: Decimal::ZERO,
        total_source_capital_gains_tax: Decimal::ZERO,
        total_treaty_savings: Decimal::ZERO,
    };

    for (domicile, group) in groups {
        let terms = treaties.withholding_terms(residence, domicile);
        let breakdown = breakdown_for(domicile, &group, terms);

        tracing::debug!(
            domicile = %domicile,
            holdings = breakdown.holding_count,
            withholding = %breakdown.dividend_withholding_tax,
            source_cgt = %breakdown.source_capital_gains_tax,
            "aggregated jurisdiction"
        );

        aggregation.total_dividends += breakdown.total_dividends;
        aggregation.total_withholding += breakdown.dividend_withholding_tax;
        aggregation.total_source_capital_gains_tax += breakdown.source_capital_gains_tax;
        aggregation.total_treaty_savings += breakdown.treaty_savings;
        aggregation.breakdowns.push(breakdown);
    }

    aggregation
}

fn breakdown_for(
    domicile: &JurisdictionId,
    group: &GroupTotals,
    terms: WithholdingTerms,
) -> JurisdictionBreakdown {
    let dividend_withholding_tax = apply_percent(group.dividends, terms.dividend_withholding_rate);

    // A zero source rate levies nothing, so no gains are reported as taxed.
    let (total_capital_gains, source_rate) = if terms.source_capital_gains_tax_rate > dec!(0) {
        (group.positive_gains, terms.source_capital_gains_tax_rate)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };
    let source_capital_gains_tax = apply_percent(total_capital_gains, source_rate);

    let standard_withholding_tax = apply_percent(group.dividends, STANDARD_NONTREATY_WITHHOLDING);
    let treaty_savings = (standard_withholding_tax - dividend_withholding_tax).max(Decimal::ZERO);

    JurisdictionBreakdown {
        jurisdiction_id: domicile.clone(),
        holding_count: group.holding_count,
        total_dividends: group.dividends,
        dividend_withholding_tax,
        total_capital_gains,
        source_capital_gains_tax,
        withholding_rate_applied: terms.dividend_withholding_rate,
        source_capital_gains_rate_applied: source_rate,
        treaty_applied: terms.treaty_applied,
        rate_basis: terms.basis,
        treaty_name: terms.treaty_name,
        standard_withholding_tax,
        treaty_savings,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
