use portfolio_tax_core::aggregator::JurisdictionBreakdown;
use portfolio_tax_core::holding::{RawHolding, MAX_HOLDING_AMOUNT};
use portfolio_tax_core::registry::PolicyKind;
use portfolio_tax_core::treaty::RateBasis;
use portfolio_tax_core::{
    calculate_tax_report, compute_tax_report, JurisdictionId, Money, PortfolioTaxError,
    ReferenceData, TaxReport, TaxReportInput, STANDARD_NONTREATY_WITHHOLDING,
};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;

// ===========================================================================
// Fixtures
// ===========================================================================

fn raw(
    ticker: &str,
    domicile: &str,
    cost: Money,
    value: Money,
    dividend: Money,
    days: Option<u32>,
) -> RawHolding {
    RawHolding {
        ticker: Some(json!(ticker)),
        quantity: Some(json!(10)),
        cost_basis: Some(json!(cost.to_string())),
        current_value: Some(json!(value.to_string())),
        dividend_ytd: Some(json!(dividend.to_string())),
        domicile_country: Some(json!(domicile)),
        holding_period_days: days.map(|d| json!(d)),
    }
}

/// A mixed portfolio across every built-in domicile, with gains and losses
/// in both holding-period buckets.
fn mixed_portfolio() -> Vec<RawHolding> {
    vec![
        raw("VOO", "US", dec!(40_000), dec!(52_000), dec!(640.50), None),
        raw("AAPL", "US", dec!(9_000), dec!(7_500), dec!(48.25), Some(120)),
        raw("BHP", "AU", dec!(5_000), dec!(6_250), dec!(310), Some(900)),
        raw("SHOP", "CA", dec!(8_000), dec!(6_000), dec!(0), Some(400)),
        raw("VUSA", "UK", dec!(12_000), dec!(13_100), dec!(210.75), Some(30)),
        raw("ASML", "EU", dec!(15_000), dec!(21_000), dec!(95), None),
    ]
}

/// Tables with a non-zero source capital gains tax for one domicile.
fn source_cgt_reference() -> ReferenceData {
    ReferenceData::from_json_str(
        r#"{
            "jurisdictions": [
                { "id": "SG", "name": "Singapore", "capital_gains": { "type": "exempt" } },
                { "id": "CN", "name": "China", "capital_gains": { "type": "flat", "rate": 20 } },
                { "id": "US", "name": "United States", "capital_gains": { "type": "flat", "rate": 20 } }
            ],
            "treaties": [
                { "residence": "SG", "domicile": "CN", "dividend_withholding_rate": 5,
                  "source_capital_gains_tax_rate": 10, "has_treaty": true },
                { "residence": "SG", "domicile": "US", "dividend_withholding_rate": 30,
                  "has_treaty": false }
            ]
        }"#,
    )
    .unwrap()
}

fn report(holdings: &[RawHolding], residence: &str) -> TaxReport {
    compute_tax_report(holdings, &residence.into(), ReferenceData::builtin()).unwrap()
}

fn breakdown<'a>(report: &'a TaxReport, id: &str) -> &'a JurisdictionBreakdown {
    report
        .by_jurisdiction
        .iter()
        .find(|b| b.jurisdiction_id.as_str() == id)
        .unwrap_or_else(|| panic!("No breakdown for {}", id))
}

fn permutations<T: Clone>(items: &[T]) -> Vec<Vec<T>> {
    if items.len() <= 1 {
        return vec![items.to_vec()];
    }
    let mut out = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            tail.insert(0, head.clone());
            out.push(tail);
        }
    }
    out
}

const RESIDENCES: [&str; 5] = ["MY", "SG", "HK", "IN", "US"];

// ===========================================================================
// Scenarios
// ===========================================================================

#[test]
fn test_malaysia_resident_holding_voo() {
    let holdings = vec![raw("VOO", "US", dec!(4_800), dec!(5_600), dec!(185.20), None)];
    let r = report(&holdings, "MY");
    let us = breakdown(&r, "US");

    assert_eq!(us.withholding_rate_applied, dec!(15));
    assert!(us.treaty_applied);
    assert_eq!(us.dividend_withholding_tax, dec!(27.78));
    assert_eq!(us.source_capital_gains_tax, dec!(0));
    assert_eq!(r.home_country_capital_gains_tax, dec!(0));
    assert_eq!(r.grand_total_tax_obligation, dec!(27.78));
    // 30% standard would have withheld 55.56
    assert_eq!(r.total_treaty_savings, dec!(27.78));
}

#[test]
fn test_india_long_term_gain_within_exemption() {
    let holdings = vec![raw("VOO", "US", dec!(100_000), dec!(150_000), dec!(0), Some(1_000))];
    let r = report(&holdings, "IN");

    assert_eq!(r.residence.policy, PolicyKind::Split);
    assert_eq!(r.residence.long_term_gain, dec!(50_000));
    assert_eq!(r.residence.taxable_long_term_gain, Some(dec!(0)));
    assert_eq!(r.home_country_capital_gains_tax, dec!(0));
}

#[test]
fn test_india_long_term_gain_above_exemption() {
    let holdings = vec![raw("VOO", "US", dec!(100_000), dec!(260_000), dec!(0), None)];
    let r = report(&holdings, "IN");

    // (160,000 - 100,000) x 12.5%
    assert_eq!(r.home_country_capital_gains_tax, dec!(7_500));
}

#[test]
fn test_us_resident_short_and_long_term() {
    let holdings = vec![
        raw("BHP", "AU", dec!(1_000), dec!(2_000), dec!(0), Some(100)),
        raw("ASML", "EU", dec!(1_000), dec!(3_000), dec!(0), Some(500)),
    ];
    let r = report(&holdings, "US");

    // 1,000 x 37% + 2,000 x 20%
    assert_eq!(r.home_country_capital_gains_tax, dec!(770));
}

#[test]
fn test_unknown_domicile_rejected_without_report() {
    let holdings = vec![
        raw("VOO", "US", dec!(100), dec!(120), dec!(5), None),
        raw("7203", "JP", dec!(100), dec!(90), dec!(2), None),
    ];
    let result = compute_tax_report(&holdings, &"MY".into(), ReferenceData::builtin());

    match result {
        Err(PortfolioTaxError::InvalidHolding { ticker, field, .. }) => {
            assert_eq!(ticker, "7203");
            assert_eq!(field, "domicile_country");
        }
        other => panic!("Expected InvalidHolding, got {:?}", other),
    }
}

#[test]
fn test_unknown_residence_rejected() {
    let result = compute_tax_report(&mixed_portfolio(), &"JP".into(), ReferenceData::builtin());
    match result {
        Err(PortfolioTaxError::UnknownResidence(id)) => assert_eq!(id, JurisdictionId::new("JP")),
        other => panic!("Expected UnknownResidence, got {:?}", other),
    }
}

#[test]
fn test_negative_dividend_rejected() {
    let holdings = vec![raw("VOO", "US", dec!(100), dec!(120), dec!(-5), None)];
    let result = compute_tax_report(&holdings, &"MY".into(), ReferenceData::builtin());
    assert!(matches!(
        result,
        Err(PortfolioTaxError::InvalidHolding { ref field, .. }) if field == "dividend_ytd"
    ));
}

#[test]
fn test_oversized_dividend_rejected_as_invalid_holding() {
    let holdings = vec![raw(
        "BIG",
        "US",
        dec!(100),
        dec!(120),
        dec!(10_000_000_000_000_000_000_000_000_000),
        None,
    )];
    let result = compute_tax_report(&holdings, &"MY".into(), ReferenceData::builtin());
    match result {
        Err(PortfolioTaxError::InvalidHolding { ticker, field, .. }) => {
            assert_eq!(ticker, "BIG");
            assert_eq!(field, "dividend_ytd");
        }
        other => panic!("Expected InvalidHolding, got {:?}", other),
    }
}

#[test]
fn test_largest_accepted_amounts_compute() {
    let holdings: Vec<RawHolding> = ["US", "AU", "CA", "UK", "EU"]
        .iter()
        .enumerate()
        .map(|(i, domicile)| {
            raw(
                &format!("MAX{}", i),
                domicile,
                dec!(0),
                MAX_HOLDING_AMOUNT,
                MAX_HOLDING_AMOUNT,
                Some(10),
            )
        })
        .collect();

    for residence in RESIDENCES {
        let r = report(&holdings, residence);
        assert_eq!(r.total_dividends, MAX_HOLDING_AMOUNT * dec!(5));
    }
}

#[test]
fn test_mistyped_holding_field_in_document() {
    let input: TaxReportInput = serde_json::from_value(json!({
        "residenceCountryId": "MY",
        "holdings": [
            { "ticker": "VOO", "quantity": 10, "costBasis": 4800, "currentValue": 5600,
              "dividendYTD": 185.20, "domicileCountry": "US" },
            { "ticker": "BHP", "quantity": "ten", "costBasis": 100, "currentValue": 120,
              "dividendYTD": 5, "domicileCountry": "AU", "holdingPeriodDays": -3 }
        ]
    }))
    .unwrap();

    match calculate_tax_report(&input) {
        Err(PortfolioTaxError::InvalidHolding { ticker, field, .. }) => {
            assert_eq!(ticker, "BHP");
            assert_eq!(field, "quantity");
        }
        other => panic!("Expected InvalidHolding, got {:?}", other),
    }
}

// ===========================================================================
// Properties
// ===========================================================================

#[test]
fn test_grouping_invariance_under_permutation() {
    let holdings = mixed_portfolio();
    for residence in RESIDENCES {
        let expected = report(&holdings, residence);
        for permuted in permutations(&holdings) {
            assert_eq!(report(&permuted, residence), expected);
        }
    }
}

#[test]
fn test_grand_total_additivity() {
    for residence in RESIDENCES {
        let r = report(&mixed_portfolio(), residence);

        assert_eq!(
            r.grand_total_tax_obligation,
            r.total_foreign_withholding
                + r.total_source_capital_gains_tax
                + r.home_country_capital_gains_tax
        );
        let wht: Decimal = r.by_jurisdiction.iter().map(|b| b.dividend_withholding_tax).sum();
        let cgt: Decimal = r.by_jurisdiction.iter().map(|b| b.source_capital_gains_tax).sum();
        assert_eq!(r.total_foreign_withholding, wht);
        assert_eq!(r.total_source_capital_gains_tax, cgt);
    }
}

#[test]
fn test_breakdown_rate_invariants() {
    for residence in RESIDENCES {
        let r = report(&mixed_portfolio(), residence);
        for b in &r.by_jurisdiction {
            assert_eq!(
                b.dividend_withholding_tax,
                b.total_dividends * b.withholding_rate_applied / dec!(100)
            );
            assert_eq!(
                b.source_capital_gains_tax,
                b.total_capital_gains * b.source_capital_gains_rate_applied / dec!(100)
            );
        }
    }
}

#[test]
fn test_tax_exempt_residences_never_pay_home_cgt() {
    let portfolios = vec![
        mixed_portfolio(),
        vec![raw("VOO", "US", dec!(1), dec!(10_000_000), dec!(0), Some(1))],
        vec![raw("SHOP", "CA", dec!(10_000), dec!(1), dec!(50), None)],
    ];
    for residence in ["MY", "SG", "HK"] {
        for holdings in &portfolios {
            let r = report(holdings, residence);
            assert_eq!(r.home_country_capital_gains_tax, dec!(0));
            assert_eq!(r.residence.policy, PolicyKind::Exempt);
        }
    }
}

#[test]
fn test_missing_treaty_uses_standard_default() {
    // The built-in tables carry no Hong Kong -> Australia entry
    let holdings = vec![raw("BHP", "AU", dec!(5_000), dec!(6_000), dec!(400), None)];
    let r = report(&holdings, "HK");
    let au = breakdown(&r, "AU");

    assert_eq!(au.withholding_rate_applied, STANDARD_NONTREATY_WITHHOLDING);
    assert!(!au.treaty_applied);
    assert_eq!(au.rate_basis, RateBasis::StandardDefault);
    assert_eq!(au.dividend_withholding_tax, dec!(120));
    assert_eq!(au.treaty_savings, dec!(0));
}

#[test]
fn test_empty_treaty_table_defaults_every_pair() {
    let reference = ReferenceData::from_json_str(
        r#"{
            "jurisdictions": [
                { "id": "MY", "name": "Malaysia", "capital_gains": { "type": "exempt" } },
                { "id": "US", "name": "United States", "capital_gains": { "type": "exempt" } },
                { "id": "EU", "name": "European Union", "capital_gains": { "type": "exempt" } }
            ]
        }"#,
    )
    .unwrap();
    let holdings = vec![
        raw("VOO", "US", dec!(100), dec!(100), dec!(100), None),
        raw("ASML", "EU", dec!(100), dec!(100), dec!(50), None),
    ];
    let r = compute_tax_report(&holdings, &"MY".into(), &reference).unwrap();

    for b in &r.by_jurisdiction {
        assert_eq!(b.withholding_rate_applied, dec!(30));
        assert!(!b.treaty_applied);
    }
    assert_eq!(r.total_foreign_withholding, dec!(45));
}

#[test]
fn test_losses_never_contribute_to_source_cgt() {
    let holdings = vec![
        raw("BABA", "CN", dec!(10_000), dec!(4_000), dec!(0), None),
        raw("TCEHY", "CN", dec!(2_000), dec!(2_000), dec!(0), None),
    ];
    let r = compute_tax_report(&holdings, &"SG".into(), &source_cgt_reference()).unwrap();
    let cn = breakdown(&r, "CN");

    assert_eq!(cn.total_capital_gains, dec!(0));
    assert_eq!(cn.source_capital_gains_tax, dec!(0));
}

#[test]
fn test_source_cgt_not_netted_across_holdings() {
    let holdings = vec![
        raw("BABA", "CN", dec!(10_000), dec!(4_000), dec!(0), None),
        raw("PDD", "CN", dec!(1_000), dec!(3_500), dec!(0), None),
        raw("VOO", "US", dec!(1_000), dec!(9_000), dec!(20), None),
    ];
    let r = compute_tax_report(&holdings, &"SG".into(), &source_cgt_reference()).unwrap();
    let cn = breakdown(&r, "CN");

    // Only PDD's 2,500 gain is taxed; BABA's loss does not offset it
    assert_eq!(cn.total_capital_gains, dec!(2_500));
    assert_eq!(cn.source_capital_gains_tax, dec!(250));
    // No source CGT rate for the US entry
    assert_eq!(breakdown(&r, "US").source_capital_gains_tax, dec!(0));
    assert_eq!(r.total_source_capital_gains_tax, dec!(250));
    assert_eq!(r.grand_total_tax_obligation, dec!(256));
}

#[test]
fn test_dividend_withholding_independent_of_gain_sign() {
    let holdings = vec![raw("SHOP", "CA", dec!(10_000), dec!(2_000), dec!(300), None)];
    let r = report(&holdings, "IN");

    assert_eq!(breakdown(&r, "CA").dividend_withholding_tax, dec!(75));
    assert_eq!(r.home_country_capital_gains_tax, dec!(0));
}
