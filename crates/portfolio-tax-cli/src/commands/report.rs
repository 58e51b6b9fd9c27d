use clap::Args;
use serde_json::Value;

use portfolio_tax_core::holding::RawHolding;
use portfolio_tax_core::{calculate_tax_report, TaxReportInput};

use crate::commands::reference::load_reference;
use crate::input;

/// Arguments for a portfolio tax report
#[derive(Args)]
pub struct ReportArgs {
    /// Path to JSON file: a holdings array, or an object with `holdings`
    /// and `residence_country`. Read from stdin when omitted.
    #[arg(long)]
    pub input: Option<String>,

    /// Investor's country of tax residence (e.g. MY, SG, HK, IN, US)
    #[arg(long)]
    pub residence: Option<String>,

    /// JSON or YAML file replacing the built-in jurisdiction and treaty tables
    #[arg(long)]
    pub reference_data: Option<String>,
}

const RESIDENCE_KEYS: [&str; 3] = ["residence_country", "residenceCountryId", "residence_country_id"];

fn parse_report_input(
    value: Value,
    residence: Option<String>,
) -> Result<TaxReportInput, Box<dyn std::error::Error>> {
    match value {
        Value::Array(_) => {
            let holdings: Vec<RawHolding> = serde_json::from_value(value)?;
            let residence = residence
                .ok_or("--residence is required when the input is a holdings array")?;
            Ok(TaxReportInput {
                holdings,
                residence_country: residence.into(),
                reference_data: None,
            })
        }
        Value::Object(mut map) => {
            // The command-line residence wins over the document's own.
            if let Some(residence) = residence {
                for key in RESIDENCE_KEYS {
                    map.remove(key);
                }
                map.insert("residence_country".to_string(), Value::String(residence));
            }
            Ok(serde_json::from_value(Value::Object(map))?)
        }
        _ => Err("Input must be a holdings array or a report object".into()),
    }
}

pub fn run_report(args: ReportArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let document: Value = if let Some(ref path) = args.input {
        input::file::read_json_value(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        data
    } else {
        return Err("--input <file.json> or stdin required for a tax report".into());
    };

    let mut report_input = parse_report_input(document, args.residence)?;
    if let Some(ref path) = args.reference_data {
        report_input.reference_data = Some(load_reference(Some(path))?);
    }

    let result = calculate_tax_report(&report_input)?;
    Ok(serde_json::to_value(result)?)
}
