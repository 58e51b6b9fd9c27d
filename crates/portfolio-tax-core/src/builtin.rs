//! Built-in reference tables.
//!
//! Rates are percentages. Regions such as "EU" are treated as a single
//! domicile with a representative rate.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::registry::{CapitalGainsPolicy, JurisdictionProfile};
use crate::treaty::TreatyEntry;
use crate::types::Percent;

fn profile(
    id: &str,
    name: &str,
    domestic_dividend_tax_rate: Percent,
    capital_gains: CapitalGainsPolicy,
) -> JurisdictionProfile {
    JurisdictionProfile {
        id: id.into(),
        name: name.to_string(),
        domestic_dividend_tax_rate,
        capital_gains,
    }
}

fn split(short: Percent, long: Percent, threshold: Decimal, days: u32) -> CapitalGainsPolicy {
    CapitalGainsPolicy::Split {
        short_term_rate: short,
        long_term_rate: long,
        long_term_exemption_threshold: threshold,
        long_term_holding_days: days,
    }
}

pub(crate) fn profiles() -> Vec<JurisdictionProfile> {
    vec![
        // Residences
        profile("MY", "Malaysia", dec!(0), CapitalGainsPolicy::Exempt),
        profile("SG", "Singapore", dec!(0), CapitalGainsPolicy::Exempt),
        profile("HK", "Hong Kong", dec!(0), CapitalGainsPolicy::Exempt),
        profile("IN", "India", dec!(30), split(dec!(20), dec!(12.5), dec!(100_000), 730)),
        profile("US", "United States", dec!(15), split(dec!(37), dec!(20), dec!(0), 365)),
        // Domicile regions
        profile("AU", "Australia", dec!(30), split(dec!(45), dec!(22.5), dec!(0), 365)),
        profile("CA", "Canada", dec!(25), CapitalGainsPolicy::Flat { rate: dec!(25) }),
        profile("UK", "United Kingdom", dec!(8.75), CapitalGainsPolicy::Flat { rate: dec!(20) }),
        profile("EU", "European Union", dec!(25), CapitalGainsPolicy::Flat { rate: dec!(25) }),
    ]
}

fn treaty(
    residence: &str,
    domicile: &str,
    wht: Percent,
    has_treaty: bool,
    name: Option<&str>,
) -> TreatyEntry {
    TreatyEntry {
        residence: residence.into(),
        domicile: domicile.into(),
        dividend_withholding_rate: wht,
        source_capital_gains_tax_rate: dec!(0),
        has_treaty,
        name: name.map(str::to_string),
    }
}

/// Pairs absent here (e.g. HK -> AU) fall back to the standard
/// non-treaty rate.
pub(crate) fn treaties() -> Vec<TreatyEntry> {
    vec![
        // Malaysia
        treaty("MY", "US", dec!(15), true, Some("Malaysia-US treaty rate")),
        treaty("MY", "AU", dec!(0), true, Some("Malaysia-Australia DTA")),
        treaty("MY", "CA", dec!(15), true, Some("Malaysia-Canada DTA")),
        treaty("MY", "UK", dec!(0), true, Some("Malaysia-UK DTA")),
        treaty("MY", "EU", dec!(15), true, Some("Malaysia-EU member DTAs")),
        // Singapore
        treaty("SG", "US", dec!(30), false, None),
        treaty("SG", "AU", dec!(0), true, Some("Singapore-Australia DTA")),
        treaty("SG", "CA", dec!(15), true, Some("Singapore-Canada DTA")),
        treaty("SG", "UK", dec!(0), true, Some("Singapore-UK DTA")),
        treaty("SG", "EU", dec!(15), true, Some("Singapore-EU member DTAs")),
        // Hong Kong
        treaty("HK", "US", dec!(30), false, None),
        treaty("HK", "CA", dec!(25), false, None),
        treaty("HK", "UK", dec!(0), true, Some("Hong Kong-UK DTA")),
        treaty("HK", "EU", dec!(15), true, Some("Hong Kong-EU member DTAs")),
        // India
        treaty("IN", "US", dec!(25), true, Some("India-US DTAA")),
        treaty("IN", "AU", dec!(15), true, Some("India-Australia DTAA")),
        treaty("IN", "CA", dec!(25), true, Some("India-Canada DTAA")),
        treaty("IN", "UK", dec!(0), true, Some("India-UK DTAA")),
        treaty("IN", "EU", dec!(15), true, Some("India-EU member DTAAs")),
        // United States
        treaty("US", "US", dec!(0), false, Some("Domestic")),
        treaty("US", "AU", dec!(15), true, Some("US-Australia Income Tax Treaty")),
        treaty("US", "CA", dec!(15), true, Some("US-Canada Income Tax Treaty")),
        treaty("US", "UK", dec!(0), true, Some("US-UK Double Taxation Convention")),
        treaty("US", "EU", dec!(15), true, Some("US-EU member income tax treaties")),
    ]
}
