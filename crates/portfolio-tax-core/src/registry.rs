//! Jurisdiction registry: the catalog of domestic tax policies per country.
//!
//! A profile describes how a country taxes its own residents. It is consulted
//! when the country is the investor's residence (capital gains policy) and to
//! confirm that a holding's domicile is a known jurisdiction.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PortfolioTaxError;
use crate::types::{JurisdictionId, Money, Percent};
use crate::PortfolioTaxResult;

/// Holding period from which a gain is treated as long-term when a profile
/// does not say otherwise.
pub const DEFAULT_LONG_TERM_HOLDING_DAYS: u32 = 365;

fn default_long_term_holding_days() -> u32 {
    DEFAULT_LONG_TERM_HOLDING_DAYS
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// How a country taxes its residents' capital gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CapitalGainsPolicy {
    /// Capital gains are not taxed.
    Exempt,
    /// A single rate on net gains, no holding-period distinction.
    Flat { rate: Percent },
    /// Separate short-term and long-term rates. Only long-term gains benefit
    /// from the exemption threshold.
    Split {
        short_term_rate: Percent,
        long_term_rate: Percent,
        #[serde(default)]
        long_term_exemption_threshold: Money,
        #[serde(default = "default_long_term_holding_days")]
        long_term_holding_days: u32,
    },
}

impl CapitalGainsPolicy {
    pub fn kind(&self) -> PolicyKind {
        match self {
            CapitalGainsPolicy::Exempt => PolicyKind::Exempt,
            CapitalGainsPolicy::Flat { .. } => PolicyKind::Flat,
            CapitalGainsPolicy::Split { .. } => PolicyKind::Split,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    Exempt,
    Flat,
    Split,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JurisdictionProfile {
    pub id: JurisdictionId,
    pub name: String,
    /// Domestic tax on dividends received by residents. Informational: the
    /// engine only levies withholding at source.
    #[serde(default)]
    pub domestic_dividend_tax_rate: Percent,
    pub capital_gains: CapitalGainsPolicy,
}

impl JurisdictionProfile {
    pub fn taxes_capital_gains(&self) -> bool {
        !matches!(self.capital_gains, CapitalGainsPolicy::Exempt)
    }
}

/// Profiles keyed by jurisdiction id. Immutable once built.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(
    try_from = "Vec<JurisdictionProfile>",
    into = "Vec<JurisdictionProfile>"
)]
pub struct JurisdictionRegistry {
    profiles: HashMap<JurisdictionId, JurisdictionProfile>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_rate(field: String, rate: Percent) -> PortfolioTaxResult<()> {
    if rate < dec!(0) || rate > dec!(100) {
        return Err(PortfolioTaxError::invalid_reference(
            field,
            format!("Rate {} must be between 0 and 100 percent", rate),
        ));
    }
    Ok(())
}

fn validate_profile(profile: &JurisdictionProfile) -> PortfolioTaxResult<()> {
    let prefix = format!("jurisdictions[{}]", profile.id);

    if profile.id.is_empty() {
        return Err(PortfolioTaxError::invalid_reference(
            "jurisdictions.id",
            "Jurisdiction id must not be empty",
        ));
    }
    validate_rate(
        format!("{}.domestic_dividend_tax_rate", prefix),
        profile.domestic_dividend_tax_rate,
    )?;

    match &profile.capital_gains {
        CapitalGainsPolicy::Exempt => {}
        CapitalGainsPolicy::Flat { rate } => {
            validate_rate(format!("{}.capital_gains.rate", prefix), *rate)?;
        }
        CapitalGainsPolicy::Split {
            short_term_rate,
            long_term_rate,
            long_term_exemption_threshold,
            ..
        } => {
            validate_rate(
                format!("{}.capital_gains.short_term_rate", prefix),
                *short_term_rate,
            )?;
            validate_rate(
                format!("{}.capital_gains.long_term_rate", prefix),
                *long_term_rate,
            )?;
            if *long_term_exemption_threshold < dec!(0) {
                return Err(PortfolioTaxError::invalid_reference(
                    format!("{}.capital_gains.long_term_exemption_threshold", prefix),
                    "Exemption threshold must be non-negative",
                ));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl JurisdictionRegistry {
    /// Build a registry, rejecting duplicate ids and out-of-range rates.
    pub fn new(profiles: Vec<JurisdictionProfile>) -> PortfolioTaxResult<Self> {
        let mut map = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            validate_profile(&profile)?;
            let id = profile.id.clone();
            if map.insert(id.clone(), profile).is_some() {
                return Err(PortfolioTaxError::invalid_reference(
                    "jurisdictions.id",
                    format!("Duplicate jurisdiction '{}'", id),
                ));
            }
        }
        Ok(JurisdictionRegistry { profiles: map })
    }

    /// Build from data already known to be valid, such as the built-in set.
    pub(crate) fn from_trusted(profiles: Vec<JurisdictionProfile>) -> Self {
        JurisdictionRegistry {
            profiles: profiles.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    pub fn get(&self, id: &JurisdictionId) -> Option<&JurisdictionProfile> {
        self.profiles.get(id)
    }

    pub fn contains(&self, id: &JurisdictionId) -> bool {
        self.profiles.contains_key(id)
    }

    /// Resolve the investor's residence. An unknown residence is fatal for
    /// the whole report.
    pub fn resolve_residence(&self, id: &JurisdictionId) -> PortfolioTaxResult<&JurisdictionProfile> {
        self.get(id)
            .ok_or_else(|| PortfolioTaxError::UnknownResidence(id.clone()))
    }

    /// Profiles in jurisdiction id order.
    pub fn iter(&self) -> impl Iterator<Item = &JurisdictionProfile> {
        let mut profiles: Vec<&JurisdictionProfile> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles.into_iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl TryFrom<Vec<JurisdictionProfile>> for JurisdictionRegistry {
    type Error = PortfolioTaxError;

    fn try_from(profiles: Vec<JurisdictionProfile>) -> Result<Self, Self::Error> {
        JurisdictionRegistry::new(profiles)
    }
}

impl From<JurisdictionRegistry> for Vec<JurisdictionProfile> {
    fn from(registry: JurisdictionRegistry) -> Self {
        let mut profiles: Vec<JurisdictionProfile> = registry.profiles.into_values().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
