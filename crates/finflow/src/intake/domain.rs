use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Public identifier for a loan application, e.g. `LN2025483920`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Public identifier for a credit-score lookup, e.g. `CB202512345678`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CibilRequestId(pub String);

impl fmt::Display for CibilRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of values exchanged on the wire as kebab-case labels.
pub trait WireLabel: Copy + Sized + 'static {
    const ALL: &'static [Self];

    fn label(self) -> &'static str;

    fn from_label(raw: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.label() == raw)
    }

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|value| value.label()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoanType {
    Personal,
    Home,
    Business,
    Professional,
    LoanAgainstProperty,
    Gold,
    Car,
    Overdraft,
    BalanceTransfer,
}

impl WireLabel for LoanType {
    const ALL: &'static [Self] = &[
        Self::Personal,
        Self::Home,
        Self::Business,
        Self::Professional,
        Self::LoanAgainstProperty,
        Self::Gold,
        Self::Car,
        Self::Overdraft,
        Self::BalanceTransfer,
    ];

    fn label(self) -> &'static str {
        match self {
            LoanType::Personal => "personal",
            LoanType::Home => "home",
            LoanType::Business => "business",
            LoanType::Professional => "professional",
            LoanType::LoanAgainstProperty => "loan-against-property",
            LoanType::Gold => "gold",
            LoanType::Car => "car",
            LoanType::Overdraft => "overdraft",
            LoanType::BalanceTransfer => "balance-transfer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmploymentType {
    Salaried,
    SelfEmployed,
    Business,
    Freelancer,
    Retired,
}

impl WireLabel for EmploymentType {
    const ALL: &'static [Self] = &[
        Self::Salaried,
        Self::SelfEmployed,
        Self::Business,
        Self::Freelancer,
        Self::Retired,
    ];

    fn label(self) -> &'static str {
        match self {
            EmploymentType::Salaried => "salaried",
            EmploymentType::SelfEmployed => "self-employed",
            EmploymentType::Business => "business",
            EmploymentType::Freelancer => "freelancer",
            EmploymentType::Retired => "retired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl WireLabel for Gender {
    const ALL: &'static [Self] = &[Self::Male, Self::Female, Self::Other];

    fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccountType {
    Savings,
    Current,
    Salary,
}

impl WireLabel for AccountType {
    const ALL: &'static [Self] = &[Self::Savings, Self::Current, Self::Salary];

    fn label(self) -> &'static str {
        match self {
            AccountType::Savings => "savings",
            AccountType::Current => "current",
            AccountType::Salary => "salary",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContactSubject {
    ApplicationHelp,
    LoanInquiry,
    TechnicalSupport,
    Feedback,
    Other,
}

impl WireLabel for ContactSubject {
    const ALL: &'static [Self] = &[
        Self::ApplicationHelp,
        Self::LoanInquiry,
        Self::TechnicalSupport,
        Self::Feedback,
        Self::Other,
    ];

    fn label(self) -> &'static str {
        match self {
            ContactSubject::ApplicationHelp => "application-help",
            ContactSubject::LoanInquiry => "loan-inquiry",
            ContactSubject::TechnicalSupport => "technical-support",
            ContactSubject::Feedback => "feedback",
            ContactSubject::Other => "other",
        }
    }
}

/// Lifecycle label of a loan application. Allowed moves live in `status.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationStatus {
    Submitted,
    UnderReview,
    Approved,
    Rejected,
    Disbursed,
}

impl WireLabel for ApplicationStatus {
    const ALL: &'static [Self] = &[
        Self::Submitted,
        Self::UnderReview,
        Self::Approved,
        Self::Rejected,
        Self::Disbursed,
    ];

    fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::UnderReview => "under-review",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Disbursed => "disbursed",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CibilStatus {
    Pending,
    Completed,
}

impl WireLabel for CibilStatus {
    const ALL: &'static [Self] = &[Self::Pending, Self::Completed];

    fn label(self) -> &'static str {
        match self {
            CibilStatus::Pending => "pending",
            CibilStatus::Completed => "completed",
        }
    }
}

/// Validated, canonicalised loan application ready for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLoanApplication {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    /// Canonical 10-digit mobile number.
    pub mobile: String,
    pub email: String,
    pub pan_card: String,
    pub gender: Gender,
    pub current_address: String,
    pub employment_type: EmploymentType,
    pub monthly_income: u64,
    pub company_name: String,
    pub work_experience: String,
    pub existing_emis: Option<u64>,
    pub account_type: AccountType,
    pub loan_type: LoanType,
    pub loan_amount: u64,
    pub tenure: u8,
    pub purpose: String,
}

/// Stored loan application, as returned to the tracker and to agents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplication {
    pub id: u64,
    pub application_id: ApplicationId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub mobile: String,
    pub email: String,
    pub pan_card: String,
    pub gender: Gender,
    pub current_address: String,
    pub employment_type: EmploymentType,
    pub monthly_income: u64,
    pub company_name: String,
    pub work_experience: String,
    pub existing_emis: u64,
    pub account_type: AccountType,
    pub loan_type: LoanType,
    pub loan_amount: u64,
    pub tenure: u8,
    pub purpose: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl LoanApplication {
    pub(crate) fn from_new(
        id: u64,
        application_id: ApplicationId,
        input: NewLoanApplication,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            application_id,
            full_name: input.full_name,
            date_of_birth: input.date_of_birth,
            mobile: input.mobile,
            email: input.email,
            pan_card: input.pan_card,
            gender: input.gender,
            current_address: input.current_address,
            employment_type: input.employment_type,
            monthly_income: input.monthly_income,
            company_name: input.company_name,
            work_experience: input.work_experience,
            existing_emis: input.existing_emis.unwrap_or(0),
            account_type: input.account_type,
            loan_type: input.loan_type,
            loan_amount: input.loan_amount,
            tenure: input.tenure,
            purpose: input.purpose,
            status: ApplicationStatus::Submitted,
            submitted_at: now,
            last_updated: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: ContactSubject,
    pub message: String,
}

/// Contact form submission. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactMessage {
    pub id: u64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: ContactSubject,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCibilRequest {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub mobile: String,
    pub pan_card: String,
    pub pincode: String,
}

/// Credit-score lookup. `score` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CibilRequest {
    pub id: u64,
    pub request_id: CibilRequestId,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub mobile: String,
    pub pan_card: String,
    pub pincode: String,
    pub score: u16,
    pub status: CibilStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAgent {
    pub email: String,
    /// Argon2 PHC string, never the plaintext password.
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: u64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub is_active: bool,
}

/// Agent fields safe to hand back to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentView {
    pub id: u64,
    pub email: String,
    pub name: String,
}

impl From<&Agent> for AgentView {
    fn from(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            email: agent.email.clone(),
            name: agent.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_labels_match_serde_names() {
        for status in ApplicationStatus::ALL {
            let encoded = serde_json::to_value(status).expect("status serializes");
            assert_eq!(encoded, serde_json::json!(status.label()));
        }
        for loan_type in LoanType::ALL {
            let encoded = serde_json::to_value(loan_type).expect("loan type serializes");
            assert_eq!(encoded, serde_json::json!(loan_type.label()));
        }
        for subject in ContactSubject::ALL {
            let encoded = serde_json::to_value(subject).expect("subject serializes");
            assert_eq!(encoded, serde_json::json!(subject.label()));
        }
        for status in CibilStatus::ALL {
            let encoded = serde_json::to_value(status).expect("cibil status serializes");
            assert_eq!(encoded, serde_json::json!(status.label()));
        }
    }

    #[test]
    fn from_label_is_exact() {
        assert_eq!(
            EmploymentType::from_label("self-employed"),
            Some(EmploymentType::SelfEmployed)
        );
        assert_eq!(EmploymentType::from_label("Self-Employed"), None);
        assert_eq!(
            ApplicationStatus::from_label("under-review"),
            Some(ApplicationStatus::UnderReview)
        );
        assert_eq!(ApplicationStatus::from_label("under_review"), None);
    }

    #[test]
    fn agent_serialization_omits_password_hash() {
        let agent = Agent {
            id: 1,
            email: "agent@finflow.com".to_string(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
            name: "Default Agent".to_string(),
            is_active: true,
        };
        let encoded = serde_json::to_value(&agent).expect("agent serializes");
        assert!(encoded.get("passwordHash").is_none());
        assert_eq!(encoded.get("isActive"), Some(&serde_json::json!(true)));
    }
}
