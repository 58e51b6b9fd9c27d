use napi::Result as NapiResult;
use napi_derive::napi;

use portfolio_tax_core::{calculate_tax_report, JurisdictionId, ReferenceData, TaxReportInput};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse caller-supplied tables, or use the built-in set.
fn reference_from(reference_json: Option<String>) -> NapiResult<ReferenceData> {
    match reference_json {
        Some(json) => ReferenceData::from_json_str(&json).map_err(to_napi_error),
        None => Ok(ReferenceData::builtin().clone()),
    }
}

// ---------------------------------------------------------------------------
// Tax report
// ---------------------------------------------------------------------------

/// `input_json`: `{ "holdings": [...], "residenceCountryId": "MY", "referenceData"?: {...} }`
#[napi]
pub fn compute_tax_report(input_json: String) -> NapiResult<String> {
    let input: TaxReportInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = calculate_tax_report(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reference data
// ---------------------------------------------------------------------------

#[napi]
pub fn list_jurisdictions(reference_json: Option<String>) -> NapiResult<String> {
    let reference = reference_from(reference_json)?;
    let profiles: Vec<_> = reference.jurisdictions().iter().collect();
    serde_json::to_string(&profiles).map_err(to_napi_error)
}

#[napi]
pub fn lookup_treaty(
    residence: String,
    domicile: String,
    reference_json: Option<String>,
) -> NapiResult<String> {
    let reference = reference_from(reference_json)?;
    let terms = reference
        .treaty_terms(&JurisdictionId::new(residence), &JurisdictionId::new(domicile))
        .map_err(to_napi_error)?;
    serde_json::to_string(&terms).map_err(to_napi_error)
}

