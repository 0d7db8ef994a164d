use serde::Serialize;

use super::domain::{LoanApplication, WireLabel};

/// Column names, in `ApplicationRow` field order.
pub const CSV_HEADER: [&str; 10] = [
    "application_id",
    "status",
    "full_name",
    "mobile",
    "loan_type",
    "loan_amount",
    "tenure_years",
    "monthly_income",
    "submitted_at",
    "last_updated",
];

#[derive(Debug, Serialize)]
struct ApplicationRow<'a> {
    application_id: &'a str,
    status: &'static str,
    full_name: &'a str,
    mobile: String,
    loan_type: &'static str,
    loan_amount: u64,
    tenure_years: u8,
    monthly_income: u64,
    submitted_at: String,
    last_updated: String,
}

/// Show only the last four digits of a mobile number.
pub fn mask_mobile(mobile: &str) -> String {
    let visible = mobile.len().saturating_sub(4);
    mobile
        .char_indices()
        .map(|(index, ch)| if index < visible { '*' } else { ch })
        .collect()
}

/// Render applications as CSV: a header row, then one line per application.
/// The header is present even when there are no applications.
pub fn applications_csv(applications: &[LoanApplication]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for application in applications {
        writer.serialize(ApplicationRow {
            application_id: &application.application_id.0,
            status: application.status.label(),
            full_name: &application.full_name,
            mobile: mask_mobile(&application.mobile),
            loan_type: application.loan_type.label(),
            loan_amount: application.loan_amount,
            tenure_years: application.tenure,
            monthly_income: application.monthly_income,
            submitted_at: application.submitted_at.to_rfc3339(),
            last_updated: application.last_updated.to_rfc3339(),
        })?;
    }

    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}
