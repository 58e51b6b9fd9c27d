//! Reference data: the jurisdiction registry and treaty table the engine
//! evaluates against.
//!
//! Reference data is configuration. It is either the built-in production set
//! or loaded from JSON/YAML, and is read-only once constructed, so a single
//! instance can be shared across threads without locking.

use serde::{Deserialize, Serialize};
#[cfg(feature = "builtin")]
use std::sync::OnceLock;

use crate::error::PortfolioTaxError;
use crate::registry::{JurisdictionProfile, JurisdictionRegistry};
use crate::treaty::{TreatyEntry, TreatyTable, WithholdingTerms};
use crate::types::JurisdictionId;
use crate::PortfolioTaxResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "ReferenceDataSpec", into = "ReferenceDataSpec")]
pub struct ReferenceData {
    jurisdictions: JurisdictionRegistry,
    treaties: TreatyTable,
}

/// Serialised form of [`ReferenceData`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDataSpec {
    pub jurisdictions: Vec<JurisdictionProfile>,
    #[serde(default)]
    pub treaties: Vec<TreatyEntry>,
}

impl ReferenceData {
    /// Build reference data, checking that every treaty entry names
    /// jurisdictions present in the registry.
    pub fn new(jurisdictions: JurisdictionRegistry, treaties: TreatyTable) -> PortfolioTaxResult<Self> {
        for entry in treaties.iter() {
            for (role, id) in [("residence", &entry.residence), ("domicile", &entry.domicile)] {
                if !jurisdictions.contains(id) {
                    return Err(PortfolioTaxError::invalid_reference(
                        format!("treaties[{}->{}].{}", entry.residence, entry.domicile, role),
                        format!("Unknown jurisdiction '{}'", id),
                    ));
                }
            }
        }
        Ok(ReferenceData {
            jurisdictions,
            treaties,
        })
    }

    /// The production data set: residences Malaysia, Singapore, Hong Kong,
    /// India and the United States against domiciles US, AU, CA, UK and EU.
    #[cfg(feature = "builtin")]
    pub fn builtin() -> &'static ReferenceData {
        static BUILTIN: OnceLock<ReferenceData> = OnceLock::new();
        BUILTIN.get_or_init(|| ReferenceData {
            jurisdictions: JurisdictionRegistry::from_trusted(crate::builtin::profiles()),
            treaties: TreatyTable::from_trusted(crate::builtin::treaties()),
        })
    }

    pub fn from_json_str(s: &str) -> PortfolioTaxResult<Self> {
        let spec: ReferenceDataSpec = serde_json::from_str(s)?;
        ReferenceData::try_from(spec)
    }

    pub fn from_yaml_str(s: &str) -> PortfolioTaxResult<Self> {
        let spec: ReferenceDataSpec = serde_yaml::from_str(s)?;
        ReferenceData::try_from(spec)
    }

    pub fn jurisdictions(&self) -> &JurisdictionRegistry {
        &self.jurisdictions
    }

    pub fn treaties(&self) -> &TreatyTable {
        &self.treaties
    }

    /// Withholding terms for a pair of registered jurisdictions. Unlike
    /// [`TreatyTable::withholding_terms`], an unregistered country is an
    /// error rather than a silent fall back to the standard rate.
    pub fn treaty_terms(
        &self,
        residence: &JurisdictionId,
        domicile: &JurisdictionId,
    ) -> PortfolioTaxResult<WithholdingTerms> {
        for (role, id) in [("residence", residence), ("domicile", domicile)] {
            if !self.jurisdictions.contains(id) {
                return Err(PortfolioTaxError::UnknownJurisdiction {
                    role: role.to_string(),
                    id: id.clone(),
                });
            }
        }
        Ok(self.treaties.withholding_terms(residence, domicile))
    }
}

impl TryFrom<ReferenceDataSpec> for ReferenceData {
    type Error = PortfolioTaxError;

    fn try_from(spec: ReferenceDataSpec) -> Result<Self, Self::Error> {
        ReferenceData::new(
            JurisdictionRegistry::new(spec.jurisdictions)?,
            TreatyTable::new(spec.treaties)?,
        )
    }
}

impl From<ReferenceData> for ReferenceDataSpec {
    fn from(data: ReferenceData) -> Self {
        ReferenceDataSpec {
            jurisdictions: data.jurisdictions.into(),
            treaties: data.treaties.into(),
        }
    }
}
