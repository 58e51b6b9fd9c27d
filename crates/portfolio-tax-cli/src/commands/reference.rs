use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use portfolio_tax_core::registry::{CapitalGainsPolicy, JurisdictionProfile, PolicyKind};
use portfolio_tax_core::{JurisdictionId, PortfolioTaxError, ReferenceData};

use crate::input;

/// Arguments for listing jurisdiction profiles
#[derive(Args)]
pub struct JurisdictionsArgs {
    /// JSON or YAML file replacing the built-in tables
    #[arg(long)]
    pub reference_data: Option<String>,
}

/// Arguments for a single treaty lookup
#[derive(Args)]
pub struct TreatyArgs {
    /// Investor's country of tax residence
    #[arg(long)]
    pub residence: String,

    /// Country where the security is domiciled
    #[arg(long)]
    pub domicile: String,

    /// JSON or YAML file replacing the built-in tables
    #[arg(long)]
    pub reference_data: Option<String>,
}

/// Flattened profile for table and CSV output.
#[derive(Debug, Serialize)]
struct JurisdictionRow {
    id: JurisdictionId,
    name: String,
    policy: PolicyKind,
    domestic_dividend_tax_rate: Decimal,
    flat_rate: Option<Decimal>,
    short_term_rate: Option<Decimal>,
    long_term_rate: Option<Decimal>,
    long_term_exemption_threshold: Option<Decimal>,
    long_term_holding_days: Option<u32>,
}

impl From<&JurisdictionProfile> for JurisdictionRow {
    fn from(p: &JurisdictionProfile) -> Self {
        let mut row = JurisdictionRow {
            id: p.id.clone(),
            name: p.name.clone(),
            policy: p.capital_gains.kind(),
            domestic_dividend_tax_rate: p.domestic_dividend_tax_rate,
            flat_rate: None,
            short_term_rate: None,
            long_term_rate: None,
            long_term_exemption_threshold: None,
            long_term_holding_days: None,
        };
        match &p.capital_gains {
            CapitalGainsPolicy::Exempt => {}
            CapitalGainsPolicy::Flat { rate } => row.flat_rate = Some(*rate),
            CapitalGainsPolicy::Split {
                short_term_rate,
                long_term_rate,
                long_term_exemption_threshold,
                long_term_holding_days,
            } => {
                row.short_term_rate = Some(*short_term_rate);
                row.long_term_rate = Some(*long_term_rate);
                row.long_term_exemption_threshold = Some(*long_term_exemption_threshold);
                row.long_term_holding_days = Some(*long_term_holding_days);
            }
        }
        row
    }
}

/// Load reference data from a JSON or YAML file, or fall back to the
/// built-in tables. The format follows the file extension.
pub fn load_reference(path: Option<&str>) -> Result<ReferenceData, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ReferenceData::builtin().clone());
    };

    let (resolved, contents) = input::file::read_text(path)?;
    let is_yaml = matches!(
        resolved.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let parsed = if is_yaml {
        ReferenceData::from_yaml_str(&contents)
    } else {
        ReferenceData::from_json_str(&contents)
    };
    let reference = parsed.map_err(|e: PortfolioTaxError| {
        format!("Failed to load reference data '{}': {}", resolved.display(), e)
    })?;

    tracing::debug!(
        path = %resolved.display(),
        jurisdictions = reference.jurisdictions().len(),
        treaties = reference.treaties().len(),
        "loaded reference data"
    );
    Ok(reference)
}

pub fn run_jurisdictions(args: JurisdictionsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let reference = load_reference(args.reference_data.as_deref())?;
    let rows: Vec<JurisdictionRow> = reference
        .jurisdictions()
        .iter()
        .map(JurisdictionRow::from)
        .collect();
    Ok(serde_json::to_value(rows)?)
}

pub fn run_treaty(args: TreatyArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let reference = load_reference(args.reference_data.as_deref())?;
    let terms = reference.treaty_terms(
        &JurisdictionId::new(&args.residence),
        &JurisdictionId::new(&args.domicile),
    )?;
    Ok(serde_json::to_value(terms)?)
}
