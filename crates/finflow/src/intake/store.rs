use super::domain::{
    Agent, ApplicationId, ApplicationStatus, CibilRequest, CibilRequestId, ContactMessage,
    LoanApplication, NewAgent, NewCibilRequest, NewContactMessage, NewLoanApplication,
};

/// Keyed storage for every record kind the intake funnel writes.
///
/// Lookups return `Ok(None)` for absent records. Implementations do not
/// enforce business rules; callers validate before writing.
pub trait RecordStore: Send + Sync {
    /// Assigns a fresh unique `applicationId`, status `submitted`, and both timestamps.
    fn create_loan_application(
        &self,
        input: NewLoanApplication,
    ) -> Result<LoanApplication, StoreError>;

    fn loan_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, StoreError>;

    /// Matches only when the stored mobile equals `mobile` byte for byte.
    fn loan_application_by_id_and_mobile(
        &self,
        application_id: &ApplicationId,
        mobile: &str,
    ) -> Result<Option<LoanApplication>, StoreError>;

    /// Overwrites the status and moves `lastUpdated` forward.
    fn update_loan_application_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Option<LoanApplication>, StoreError>;

    /// Applies `status` only if `allowed(current, status)` holds, judged and
    /// written under one exclusive section so concurrent changes serialise.
    fn transition_loan_application_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
        allowed: fn(ApplicationStatus, ApplicationStatus) -> bool,
    ) -> Result<StatusChange, StoreError>;

    fn loan_applications(&self) -> Result<Vec<LoanApplication>, StoreError>;

    fn create_contact_message(
        &self,
        input: NewContactMessage,
    ) -> Result<ContactMessage, StoreError>;

    fn contact_messages(&self) -> Result<Vec<ContactMessage>, StoreError>;

    /// Scores the PAN once and stores the request as `completed`.
    fn create_cibil_request(&self, input: NewCibilRequest) -> Result<CibilRequest, StoreError>;

    fn cibil_request(&self, request_id: &CibilRequestId)
        -> Result<Option<CibilRequest>, StoreError>;

    fn create_agent(&self, input: NewAgent) -> Result<Agent, StoreError>;

    fn agent(&self, id: u64) -> Result<Option<Agent>, StoreError>;

    /// Case-sensitive exact match.
    fn agent_by_email(&self, email: &str) -> Result<Option<Agent>, StoreError>;
}

/// Outcome of a checked status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusChange {
    Applied {
        from: ApplicationStatus,
        record: LoanApplication,
    },
    Refused {
        current: ApplicationStatus,
    },
    Missing,
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record already exists")]
    Conflict,
    #[error("no unused identifier found after {attempts} attempts")]
    IdentifierSpaceExhausted { attempts: usize },
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
