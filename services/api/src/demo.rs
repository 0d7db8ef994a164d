use crate::infra::in_memory_intake;
use chrono::NaiveDate;
use clap::Args;
use finflow::config::SessionConfig;
use finflow::error::AppError;
use finflow::intake::{
    CibilCheckSubmission, ContactSubmission, IntakeService, LoanApplicationSubmission,
    RecordStore,
};
use serde::Serialize;

const DEMO_AGENT_EMAIL: &str = "agent@finflow.com";
const DEMO_AGENT_PASSWORD: &str = "admin123";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Applicant name for the sample lead
    #[arg(long, default_value = "Priya Sharma")]
    pub(crate) applicant: String,
    /// Applicant mobile number (10 digits, optional +91 prefix)
    #[arg(long, default_value = "9876543210")]
    pub(crate) mobile: String,
    /// PAN used for the application and the credit-score check
    #[arg(long, default_value = "ABCDE1234F")]
    pub(crate) pan: String,
    /// Applicant date of birth (YYYY-MM-DD)
    #[arg(long, value_parser = crate::infra::parse_date, default_value = "1990-05-20")]
    pub(crate) date_of_birth: NaiveDate,
    /// Requested loan amount in rupees
    #[arg(long, default_value_t = 500_000)]
    pub(crate) loan_amount: i64,
    /// Status the demo agent moves the application to
    #[arg(long, default_value = "under-review")]
    pub(crate) status: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let service = in_memory_intake(&SessionConfig::default());
    service.ensure_agent(DEMO_AGENT_EMAIL, "Demo Agent", DEMO_AGENT_PASSWORD)?;

    println!("FinFlow lead intake demo");
    walk_through(&service, &args)
}

fn walk_through<S>(service: &IntakeService<S>, args: &DemoArgs) -> Result<(), AppError>
where
    S: RecordStore + 'static,
{
    let date_of_birth = args.date_of_birth.format("%Y-%m-%d").to_string();

    let application = service.submit_application(&LoanApplicationSubmission {
        full_name: Some(args.applicant.clone()),
        date_of_birth: Some(date_of_birth.clone()),
        mobile: Some(args.mobile.clone()),
        email: Some("applicant@example.com".to_string()),
        pan_card: Some(args.pan.clone()),
        gender: Some("female".to_string()),
        current_address: Some("221 MG Road, Indiranagar, Bengaluru 560038".to_string()),
        employment_type: Some("salaried".to_string()),
        monthly_income: Some(85_000),
        company_name: Some("Acme Infotech".to_string()),
        work_experience: Some("5 years".to_string()),
        existing_emis: None,
        account_type: Some("savings".to_string()),
        loan_type: Some("personal".to_string()),
        loan_amount: Some(args.loan_amount),
        tenure: Some(5),
        purpose: Some("Home renovation".to_string()),
        terms_accepted: Some(true),
    })?;
    print_section("Application submitted", &application);

    let tracked = service.track_application(&application.application_id.0, Some(&args.mobile))?;
    println!(
        "\nTracker lookup for {}: status {}",
        tracked.application_id, tracked.status
    );

    let grant = service.login(DEMO_AGENT_EMAIL, DEMO_AGENT_PASSWORD)?;
    println!(
        "\nAgent {} logged in; token valid until {}",
        grant.agent.email,
        grant.expires_at.to_rfc3339()
    );
    let agent = service.authenticate(&grant.token)?;

    let reviewed =
        service.update_application_status(&agent, &application.application_id.0, &args.status)?;
    println!(
        "Agent moved {} to {}",
        reviewed.application_id, reviewed.status
    );

    let check = service.request_cibil_check(&CibilCheckSubmission {
        full_name: Some(args.applicant.clone()),
        date_of_birth: Some(date_of_birth),
        mobile: Some(args.mobile.clone()),
        pan_card: Some(args.pan.clone()),
        pincode: Some("560038".to_string()),
        consent_agreement: Some(true),
    })?;
    print_section("Credit score check", &check);

    let message = service.submit_contact(&ContactSubmission {
        first_name: Some("Rahul".to_string()),
        last_name: Some("Verma".to_string()),
        email: Some("rahul@example.com".to_string()),
        phone: None,
        subject: Some("loan-inquiry".to_string()),
        message: Some("Which documents are needed for a balance transfer?".to_string()),
    })?;
    print_section("Contact message", &message);

    let csv = service.export_applications_csv(&agent)?;
    println!("\nAgent CSV export");
    println!("{}", String::from_utf8_lossy(&csv));

    Ok(())
}

fn print_section<T: Serialize>(title: &str, value: &T) {
    println!("\n{title}");
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => println!("  <unable to render: {err}>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo_args() -> DemoArgs {
        DemoArgs {
            applicant: "Priya Sharma".to_string(),
            mobile: "+91 98765 43210".to_string(),
            pan: "ABCDE1234F".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 5, 20).expect("valid"),
            loan_amount: 500_000,
            status: "under-review".to_string(),
        }
    }

    #[test]
    fn demo_runs_end_to_end() {
        run_demo(demo_args()).expect("demo completes");
    }

    #[test]
    fn demo_surfaces_disallowed_transition() {
        let mut args = demo_args();
        args.status = "disbursed".to_string();

        let err = run_demo(args).expect_err("submitted cannot jump to disbursed");
        assert!(err.to_string().contains("cannot move application"));
    }
}
