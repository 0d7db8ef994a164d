//! Loan lead intake: applications, contact messages, mock credit-score
//! checks, and the agent console behind bearer-token login.

pub mod auth;
pub mod domain;
pub mod export;
pub mod identifiers;
pub mod memory;
pub mod router;
pub mod score;
pub mod service;
pub mod status;
pub mod store;
pub mod validation;

#[cfg(test)]
mod tests;

pub use auth::{AuthenticatedAgent, CredentialError, LoginGrant};
pub use domain::{
    AccountType, Agent, AgentView, ApplicationId, ApplicationStatus, CibilRequest,
    CibilRequestId, CibilStatus, ContactMessage, ContactSubject, EmploymentType, Gender,
    LoanApplication, LoanType, WireLabel,
};
pub use identifiers::{Clock, IdentifierError, IdentifierGenerator, IdentifierSource, SystemClock};
pub use memory::InMemoryRecordStore;
pub use router::intake_router;
pub use service::{AgentSeedOutcome, IntakeError, IntakeService};
pub use status::{allowed_transitions, can_transition, is_terminal};
pub use store::{RecordStore, StatusChange, StoreError};
pub use validation::{
    CibilCheckSubmission, ContactSubmission, FieldError, IntakeGuard, LoanApplicationSubmission,
    ValidationErrors,
};
