//! Home-country capital gains tax.
//!
//! Works only from aggregate gain figures and the residence's own policy; it
//! has no notion of domicile countries or treaties. Losses net within their
//! own term bucket and floor at zero there: no cross-term netting and no
//! carry-forward between periods.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::holding::Holding;
use crate::registry::{CapitalGainsPolicy, JurisdictionProfile, PolicyKind, DEFAULT_LONG_TERM_HOLDING_DAYS};
use crate::types::{apply_percent, JurisdictionId, Money};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Portfolio-wide unrealized gain/loss split by holding period.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioGains {
    pub short_term: Money,
    pub long_term: Money,
}

impl PortfolioGains {
    /// Classify each holding as short-term when held for fewer than
    /// `long_term_holding_days`. Holdings with no known period are long-term.
    pub fn from_holdings(holdings: &[Holding], long_term_holding_days: u32) -> Self {
        holdings.iter().fold(PortfolioGains::default(), |mut acc, h| {
            let gain = h.unrealized_gain_loss();
            match h.holding_period_days {
                Some(days) if days < long_term_holding_days => acc.short_term += gain,
                _ => acc.long_term += gain,
            }
            acc
        })
    }

    /// Gains classified with the holding period the policy uses.
    pub fn for_policy(holdings: &[Holding], policy: &CapitalGainsPolicy) -> Self {
        let days = match policy {
            CapitalGainsPolicy::Split {
                long_term_holding_days,
                ..
            } => *long_term_holding_days,
            _ => DEFAULT_LONG_TERM_HOLDING_DAYS,
        };
        PortfolioGains::from_holdings(holdings, days)
    }

    pub fn net(&self) -> Money {
        self.short_term + self.long_term
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidenceTax {
    pub residence_id: JurisdictionId,
    pub policy: PolicyKind,
    pub short_term_gain: Money,
    pub long_term_gain: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxable_short_term_gain: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxable_long_term_gain: Option<Money>,
    pub exemption_applied: Money,
    pub taxable_gain: Money,
    pub tax: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn compute_residence_tax(residence: &JurisdictionProfile, gains: &PortfolioGains) -> ResidenceTax {
    let mut result = ResidenceTax {
        residence_id: residence.id.clone(),
        policy: residence.capital_gains.kind(),
        short_term_gain: gains.short_term,
        long_term_gain: gains.long_term,
        taxable_short_term_gain: None,
        taxable_long_term_gain: None,
        exemption_applied: Decimal::ZERO,
        taxable_gain: Decimal::ZERO,
        tax: Decimal::ZERO,
    };

    match &residence.capital_gains {
        CapitalGainsPolicy::Exempt => {}
        CapitalGainsPolicy::Flat { rate } => {
            result.taxable_gain = gains.net().max(Decimal::ZERO);
            result.tax = apply_percent(result.taxable_gain, *rate);
        }
        CapitalGainsPolicy::Split {
            short_term_rate,
            long_term_rate,
            long_term_exemption_threshold,
            ..
        } => {
            let taxable_short = gains.short_term.max(Decimal::ZERO);
            let net_long = gains.long_term.max(Decimal::ZERO);
            let exemption = net_long.min(*long_term_exemption_threshold);
            let taxable_long = net_long - exemption;

            result.taxable_short_term_gain = Some(taxable_short);
            result.taxable_long_term_gain = Some(taxable_long);
            result.exemption_applied = exemption;
            result.taxable_gain = taxable_short + taxable_long;
            result.tax = apply_percent(taxable_short, *short_term_rate)
                + apply_percent(taxable_long, *long_term_rate);
        }
    }

    tracing::debug!(
        residence = %result.residence_id,
        policy = ?result.policy,
        taxable = %result.taxable_gain,
        tax = %result.tax,
        "computed residence capital gains tax"
    );
    result
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn profile(capital_gains: CapitalGainsPolicy) -> JurisdictionProfile {
        JurisdictionProfile {
            id: "XX".into(),
            name: "Test".into(),
            domestic_dividend_tax_rate: dec!(0),
            capital_gains,
        }
    }

    fn india() -> JurisdictionProfile {
        profile(CapitalGainsPolicy::Split {
            short_term_rate: dec!(20),
            long_term_rate: dec!(12.5),
            long_term_exemption_threshold: dec!(100_000),
            long_term_holding_days: 730,
        })
    }

    fn holding(gain: Money, days: Option<u32>) -> Holding {
        Holding {
            ticker: format!("T{}", gain),
            quantity: dec!(1),
            cost_basis: dec!(100_000),
            current_value: dec!(100_000) + gain,
            dividend_ytd: dec!(0),
            domicile_country: "US".into(),
            holding_period_days: days,
        }
    }

    #[test]
    fn test_exempt_residence_pays_nothing() {
        let gains = PortfolioGains {
            short_term: dec!(250_000),
            long_term: dec!(1_000_000),
        };
        let r = compute_residence_tax(&profile(CapitalGainsPolicy::Exempt), &gains);
        assert_eq!(r.tax, dec!(0));
        assert_eq!(r.policy, PolicyKind::Exempt);
    }

    #[test]
    fn test_long_term_gain_below_threshold() {
        let gains = PortfolioGains {
            short_term: dec!(0),
            long_term: dec!(50_000),
        };
        let r = compute_residence_tax(&india(), &gains);
        assert_eq!(r.taxable_long_term_gain, Some(dec!(0)));
        assert_eq!(r.exemption_applied, dec!(50_000));
        assert_eq!(r.tax, dec!(0));
    }

    #[test]
    fn test_long_term_gain_above_threshold() {
        let gains = PortfolioGains {
            short_term: dec!(0),
            long_term: dec!(180_000),
        };
        let r = compute_residence_tax(&india(), &gains);
        assert_eq!(r.taxable_long_term_gain, Some(dec!(80_000)));
        assert_eq!(r.tax, dec!(10_000));
    }

    #[test]
    fn test_short_term_loss_does_not_offset_long_term() {
        let gains = PortfolioGains {
            short_term: dec!(-40_000),
            long_term: dec!(140_000),
        };
        let r = compute_residence_tax(&india(), &gains);
        assert_eq!(r.taxable_short_term_gain, Some(dec!(0)));
        assert_eq!(r.taxable_long_term_gain, Some(dec!(40_000)));
        assert_eq!(r.tax, dec!(5_000));
    }

    #[test]
    fn test_short_term_taxed_without_exemption() {
        let gains = PortfolioGains {
            short_term: dec!(10_000),
            long_term: dec!(0),
        };
        let r = compute_residence_tax(&india(), &gains);
        assert_eq!(r.tax, dec!(2_000));
    }

    #[test]
    fn test_flat_policy_nets_and_floors() {
        let flat = profile(CapitalGainsPolicy::Flat { rate: dec!(20) });

        let gains = PortfolioGains {
            short_term: dec!(-3_000),
            long_term: dec!(10_000),
        };
        assert_eq!(compute_residence_tax(&flat, &gains).tax, dec!(1_400));

        let losses = PortfolioGains {
            short_term: dec!(-3_000),
            long_term: dec!(1_000),
        };
        let r = compute_residence_tax(&flat, &losses);
        assert_eq!(r.taxable_gain, dec!(0));
        assert_eq!(r.tax, dec!(0));
    }

    #[test]
    fn test_classification_by_holding_period() {
        let holdings = vec![
            holding(dec!(1_000), Some(100)),
            holding(dec!(-200), Some(729)),
            holding(dec!(5_000), Some(730)),
            holding(dec!(7_000), None),
        ];
        let gains = PortfolioGains::for_policy(&holdings, &india().capital_gains);
        assert_eq!(gains.short_term, dec!(800));
        assert_eq!(gains.long_term, dec!(12_000));
        assert_eq!(gains.net(), dec!(12_800));
    }
}
