//! Bilateral treaty table keyed by (residence, domicile).
//!
//! An entry records what the domicile country levies on a resident of the
//! residence country: dividend withholding and, where applicable, capital
//! gains tax on non-residents. A pair without an entry is treated as having
//! no treaty and falls back to [`STANDARD_NONTREATY_WITHHOLDING`].

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PortfolioTaxError;
use crate::types::{JurisdictionId, Percent};
use crate::PortfolioTaxResult;

/// Dividend withholding assumed when no treaty entry exists for a pair.
/// Missing data is never read as a tax holiday.
pub const STANDARD_NONTREATY_WITHHOLDING: Percent = dec!(30);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TreatyKey {
    pub residence: JurisdictionId,
    pub domicile: JurisdictionId,
}

impl TreatyKey {
    pub fn new(residence: &JurisdictionId, domicile: &JurisdictionId) -> Self {
        TreatyKey {
            residence: residence.clone(),
            domicile: domicile.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatyEntry {
    pub residence: JurisdictionId,
    pub domicile: JurisdictionId,
    /// Withheld by the domicile country on dividends paid to a resident of
    /// the residence country.
    pub dividend_withholding_rate: Percent,
    /// Levied by the domicile country on a non-resident's gains from
    /// securities registered there.
    #[serde(default)]
    pub source_capital_gains_tax_rate: Percent,
    pub has_treaty: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TreatyEntry {
    pub fn key(&self) -> TreatyKey {
        TreatyKey::new(&self.residence, &self.domicile)
    }
}

/// Where the withholding rate for a pair came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBasis {
    /// An entry exists and a treaty is in force.
    Treaty,
    /// An entry exists but records no treaty (statutory or domestic rate).
    NonTreatyEntry,
    /// No entry for the pair: the standard non-treaty rate applies.
    StandardDefault,
}

/// Rates resolved for one (residence, domicile) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingTerms {
    pub residence: JurisdictionId,
    pub domicile: JurisdictionId,
    pub dividend_withholding_rate: Percent,
    pub source_capital_gains_tax_rate: Percent,
    pub treaty_applied: bool,
    pub basis: RateBasis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub treaty_name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<TreatyEntry>", into = "Vec<TreatyEntry>")]
pub struct TreatyTable {
    entries: HashMap<TreatyKey, TreatyEntry>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_entry(entry: &TreatyEntry) -> PortfolioTaxResult<()> {
    let prefix = format!("treaties[{}->{}]", entry.residence, entry.domicile);

    if entry.residence.is_empty() || entry.domicile.is_empty() {
        return Err(PortfolioTaxError::invalid_reference(
            prefix,
            "Residence and domicile must not be empty",
        ));
    }
    for (field, rate) in [
        ("dividend_withholding_rate", entry.dividend_withholding_rate),
        (
            "source_capital_gains_tax_rate",
            entry.source_capital_gains_tax_rate,
        ),
    ] {
        if rate < dec!(0) || rate > dec!(100) {
            return Err(PortfolioTaxError::invalid_reference(
                format!("{}.{}", prefix, field),
                format!("Rate {} must be between 0 and 100 percent", rate),
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

impl TreatyTable {
    pub fn new(entries: Vec<TreatyEntry>) -> PortfolioTaxResult<Self> {
        let mut map = HashMap::with_capacity(entries.len());
        for entry in entries {
            validate_entry(&entry)?;
            let key = entry.key();
            if map.contains_key(&key) {
                return Err(PortfolioTaxError::invalid_reference(
                    "treaties",
                    format!(
                        "Duplicate treaty entry for {} -> {}",
                        key.residence, key.domicile
                    ),
                ));
            }
            map.insert(key, entry);
        }
        Ok(TreatyTable { entries: map })
    }

    /// Build from data already known to be valid, such as the built-in set.
    pub(crate) fn from_trusted(entries: Vec<TreatyEntry>) -> Self {
        TreatyTable {
            entries: entries.into_iter().map(|e| (e.key(), e)).collect(),
        }
    }

    /// Direct lookup. `None` means no treaty data for the pair.
    pub fn lookup(
        &self,
        residence: &JurisdictionId,
        domicile: &JurisdictionId,
    ) -> Option<&TreatyEntry> {
        self.entries.get(&TreatyKey::new(residence, domicile))
    }

    /// Resolve the rates a domicile applies to a resident of `residence`,
    /// falling back to the standard non-treaty rate for unknown pairs.
    pub fn withholding_terms(
        &self,
        residence: &JurisdictionId,
        domicile: &JurisdictionId,
    ) -> WithholdingTerms {
        match self.lookup(residence, domicile) {
            Some(entry) => WithholdingTerms {
                residence: residence.clone(),
                domicile: domicile.clone(),
                dividend_withholding_rate: entry.dividend_withholding_rate,
                source_capital_gains_tax_rate: entry.source_capital_gains_tax_rate,
                treaty_applied: entry.has_treaty,
                basis: if entry.has_treaty {
                    RateBasis::Treaty
                } else {
                    RateBasis::NonTreatyEntry
                },
                treaty_name: entry.name.clone(),
            },
            None => {
                tracing::warn!(
                    residence = %residence,
                    domicile = %domicile,
                    rate = %STANDARD_NONTREATY_WITHHOLDING,
                    "no treaty entry, applying standard non-treaty withholding"
                );
                WithholdingTerms {
                    residence: residence.clone(),
                    domicile: domicile.clone(),
                    dividend_withholding_rate: STANDARD_NONTREATY_WITHHOLDING,
                    source_capital_gains_tax_rate: dec!(0),
                    treaty_applied: false,
                    basis: RateBasis::StandardDefault,
                    treaty_name: None,
                }
            }
        }
    }

    /// Entries in (residence, domicile) order.
    pub fn iter(&self) -> impl Iterator<Item = &TreatyEntry> {
        let mut entries: Vec<&TreatyEntry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.key());
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl TryFrom<Vec<TreatyEntry>> for TreatyTable {
    type Error = PortfolioTaxError;

    fn try_from(entries: Vec<TreatyEntry>) -> Result<Self, Self::Error> {
        TreatyTable::new(entries)
    }
}

impl From<TreatyTable> for Vec<TreatyEntry> {
    fn from(table: TreatyTable) -> Self {
        let mut entries: Vec<TreatyEntry> = table.entries.into_values().collect();
        entries.sort_by_key(|e| e.key());
        entries
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
