use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use super::auth::{
    hash_password, verify_password, AuthenticatedAgent, CredentialError, LoginGrant,
    SessionRegistry,
};
use super::domain::{
    AgentView, ApplicationId, ApplicationStatus, CibilRequest, CibilRequestId, ContactMessage,
    LoanApplication, NewAgent, WireLabel,
};
use super::export::applications_csv;
use super::identifiers::Clock;
use super::status::can_transition;
use super::store::{RecordStore, StatusChange, StoreError};
use super::validation::{
    normalize_email, CibilCheckSubmission, ContactSubmission, FieldError, IntakeGuard,
    LoanApplicationSubmission, ValidationErrors,
};
use crate::config::SessionConfig;

/// Facade over validation, the record store, and agent sessions.
///
/// Built once at startup and shared with request handlers.
pub struct IntakeService<S> {
    guard: IntakeGuard,
    store: Arc<S>,
    sessions: SessionRegistry,
    clock: Arc<dyn Clock>,
    decoy_hash: OnceLock<Option<String>>,
}

/// Result of seeding an agent account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentSeedOutcome {
    Created(AgentView),
    AlreadyPresent,
}

impl<S> IntakeService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, sessions: &SessionConfig) -> Self {
        Self {
            guard: IntakeGuard,
            store,
            sessions: SessionRegistry::new(sessions.ttl()),
            clock,
            decoy_hash: OnceLock::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Validate and persist a loan application.
    pub fn submit_application(
        &self,
        submission: &LoanApplicationSubmission,
    ) -> Result<LoanApplication, IntakeError> {
        let today = self.clock.now().date_naive();
        let input = self.guard.loan_application(submission, today)?;
        let record = self.store.create_loan_application(input)?;

        info!(
            application_id = %record.application_id,
            loan_type = record.loan_type.label(),
            "loan application submitted"
        );
        Ok(record)
    }

    /// Public tracker lookup. A wrong id and a wrong mobile are indistinguishable.
    pub fn track_application(
        &self,
        application_id: &str,
        mobile: Option<&str>,
    ) -> Result<LoanApplication, IntakeError> {
        let mobile = match mobile.map(str::trim) {
            Some(raw) if !raw.is_empty() => self.guard.tracking_mobile(Some(raw))?,
            _ => {
                return Err(ValidationErrors::single("mobile", "Mobile number is required").into())
            }
        };
        let id = public_id(application_id);

        self.store
            .loan_application_by_id_and_mobile(&ApplicationId(id), &mobile)?
            .ok_or(IntakeError::NotFound)
    }

    /// Move an application along the status table. The check and the write
    /// happen atomically in the store.
    pub fn update_application_status(
        &self,
        agent: &AuthenticatedAgent,
        application_id: &str,
        status: &str,
    ) -> Result<LoanApplication, IntakeError> {
        let next = ApplicationStatus::from_label(status.trim())
            .ok_or_else(|| IntakeError::UnknownStatus(status.trim().to_string()))?;
        let id = ApplicationId(public_id(application_id));

        let change = self
            .store
            .transition_loan_application_status(&id, next, can_transition)?;
        let (from, updated) = match change {
            StatusChange::Applied { from, record } => (from, record),
            StatusChange::Refused { current } => {
                return Err(IntakeError::InvalidTransition {
                    from: current,
                    to: next,
                })
            }
            StatusChange::Missing => return Err(IntakeError::NotFound),
        };

        info!(
            agent_id = agent.id(),
            application_id = %updated.application_id,
            from = from.label(),
            to = next.label(),
            "application status changed"
        );
        Ok(updated)
    }

    pub fn applications(
        &self,
        _agent: &AuthenticatedAgent,
    ) -> Result<Vec<LoanApplication>, IntakeError> {
        Ok(self.store.loan_applications()?)
    }

    pub fn export_applications_csv(
        &self,
        agent: &AuthenticatedAgent,
    ) -> Result<Vec<u8>, IntakeError> {
        let applications = self.applications(agent)?;
        let csv = applications_csv(&applications)?;
        info!(
            agent_id = agent.id(),
            rows = applications.len(),
            "applications exported"
        );
        Ok(csv)
    }

    pub fn submit_contact(
        &self,
        submission: &ContactSubmission,
    ) -> Result<ContactMessage, IntakeError> {
        let input = self.guard.contact_message(submission)?;
        let message = self.store.create_contact_message(input)?;
        info!(
            message_id = message.id,
            subject = message.subject.label(),
            "contact message received"
        );
        Ok(message)
    }

    pub fn contact_messages(
        &self,
        _agent: &AuthenticatedAgent,
    ) -> Result<Vec<ContactMessage>, IntakeError> {
        Ok(self.store.contact_messages()?)
    }

    /// Record a credit-score lookup. The score is the placeholder from `score.rs`.
    pub fn request_cibil_check(
        &self,
        submission: &CibilCheckSubmission,
    ) -> Result<CibilRequest, IntakeError> {
        let today = self.clock.now().date_naive();
        let input = self.guard.cibil_request(submission, today)?;
        let request = self.store.create_cibil_request(input)?;
        info!(request_id = %request.request_id, "cibil check completed");
        Ok(request)
    }

    pub fn cibil_check(&self, request_id: &str) -> Result<CibilRequest, IntakeError> {
        self.store
            .cibil_request(&CibilRequestId(public_id(request_id)))?
            .ok_or(IntakeError::NotFound)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// Unknown email, wrong password, and inactive account all fail with
    /// `InvalidCredentials`, and each path runs one hash verification.
    pub fn login(&self, email: &str, password: &str) -> Result<LoginGrant, IntakeError> {
        let email = normalize_email(email);
        let mut missing = Vec::new();
        if email.is_empty() {
            missing.push(FieldError {
                field: "email",
                message: "is required".to_string(),
            });
        }
        if password.is_empty() {
            missing.push(FieldError {
                field: "password",
                message: "is required".to_string(),
            });
        }
        if !missing.is_empty() {
            return Err(ValidationErrors(missing).into());
        }

        let agent = match self.store.agent_by_email(&email)? {
            Some(agent) => {
                let verified = verify_password(password, &agent.password_hash);
                (verified && agent.is_active).then_some(agent)
            }
            None => {
                if let Some(decoy) = self.decoy_hash() {
                    let _ = verify_password(password, decoy);
                }
                None
            }
        };

        let Some(agent) = agent else {
            warn!("agent login rejected");
            return Err(IntakeError::InvalidCredentials);
        };

        let (token, expires_at) = self.sessions.issue(agent.id, self.clock.now())?;
        info!(agent_id = agent.id, "agent logged in");
        Ok(LoginGrant {
            token,
            expires_at,
            agent: AgentView::from(&agent),
        })
    }

    /// Resolve a bearer token to a live, active agent.
    pub fn authenticate(&self, token: &str) -> Result<AuthenticatedAgent, IntakeError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(IntakeError::Unauthorized);
        }

        let Some(agent_id) = self.sessions.resolve(token, self.clock.now())? else {
            warn!("agent token rejected");
            return Err(IntakeError::Unauthorized);
        };

        match self.store.agent(agent_id)? {
            Some(agent) if agent.is_active => Ok(AuthenticatedAgent::from_agent(&agent)),
            _ => {
                warn!(agent_id, "token belongs to a missing or inactive agent");
                self.sessions.revoke(token)?;
                Err(IntakeError::Unauthorized)
            }
        }
    }

    /// Create the agent account if no agent uses `email` yet.
    pub fn ensure_agent(
        &self,
        email: &str,
        name: &str,
        password: &str,
    ) -> Result<AgentSeedOutcome, IntakeError> {
        let email = normalize_email(email);
        if self.store.agent_by_email(&email)?.is_some() {
            return Ok(AgentSeedOutcome::AlreadyPresent);
        }

        let password_hash = hash_password(password)?;
        match self.store.create_agent(NewAgent {
            email,
            password_hash,
            name: name.trim().to_string(),
        }) {
            Ok(agent) => {
                info!(agent_id = agent.id, "agent account seeded");
                Ok(AgentSeedOutcome::Created(AgentView::from(&agent)))
            }
            Err(StoreError::Conflict) => Ok(AgentSeedOutcome::AlreadyPresent),
            Err(err) => Err(err.into()),
        }
    }

    fn decoy_hash(&self) -> Option<&str> {
        self.decoy_hash
            .get_or_init(|| hash_password("finflow-decoy-credential").ok())
            .as_deref()
    }
}

fn public_id(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

/// Error raised by the intake service.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
    #[error("request body exceeds the configured limit")]
    BodyTooLarge,
    #[error("record not found")]
    NotFound,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("missing, invalid, or expired agent token")]
    Unauthorized,
    #[error("unknown application status '{0}'")]
    UnknownStatus(String),
    #[error("cannot move application from {from} to {to}")]
    InvalidTransition {
        from: ApplicationStatus,
        to: ApplicationStatus,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("credential task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
