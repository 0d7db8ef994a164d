use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

use super::domain::{
    Agent, ApplicationId, ApplicationStatus, CibilRequest, CibilRequestId, CibilStatus,
    ContactMessage, LoanApplication, NewAgent, NewCibilRequest, NewContactMessage,
    NewLoanApplication,
};
use super::identifiers::{
    Clock, IdentifierError, IdentifierGenerator, IdentifierSource, SystemClock,
};
use super::score::mock_cibil_score;
use super::store::{RecordStore, StatusChange, StoreError};

/// Regeneration budget for a public identifier before giving up.
pub const MAX_IDENTIFIER_ATTEMPTS: usize = 32;

#[derive(Default)]
struct State {
    applications: HashMap<ApplicationId, LoanApplication>,
    contact_messages: BTreeMap<u64, ContactMessage>,
    cibil_requests: HashMap<CibilRequestId, CibilRequest>,
    agents: BTreeMap<u64, Agent>,
    agent_emails: HashMap<String, u64>,
    next_application_id: u64,
    next_message_id: u64,
    next_cibil_id: u64,
    next_agent_id: u64,
}

impl State {
    fn bump(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }
}

/// Draw candidates until one is not `taken`.
fn fresh_id<K>(
    taken: impl Fn(&K) -> bool,
    mut draw: impl FnMut() -> Result<K, IdentifierError>,
) -> Result<K, StoreError> {
    for _ in 0..MAX_IDENTIFIER_ATTEMPTS {
        let candidate = draw().map_err(|err| StoreError::Unavailable(err.to_string()))?;
        if !taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(StoreError::IdentifierSpaceExhausted {
        attempts: MAX_IDENTIFIER_ATTEMPTS,
    })
}

/// `last_updated` never stands still, even if the clock has not moved.
fn set_status(record: &mut LoanApplication, status: ApplicationStatus, now: DateTime<Utc>) {
    record.status = status;
    record.last_updated = if now > record.last_updated {
        now
    } else {
        record.last_updated + Duration::milliseconds(1)
    };
}

/// Process-local `RecordStore`. Every write holds a single lock, so
/// identifier generation and insertion are atomic with respect to each other.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdentifierSource>,
}

impl InMemoryRecordStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdentifierSource>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
            ids,
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("record store lock poisoned".to_string()))
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(IdentifierGenerator::from_entropy()),
        )
    }
}

impl RecordStore for InMemoryRecordStore {
    fn create_loan_application(
        &self,
        input: NewLoanApplication,
    ) -> Result<LoanApplication, StoreError> {
        let now = self.clock.now();
        let mut state = self.state()?;

        let application_id = fresh_id(
            |candidate: &ApplicationId| state.applications.contains_key(candidate),
            || self.ids.application_id(now),
        )?;

        let id = State::bump(&mut state.next_application_id);
        let record = LoanApplication::from_new(id, application_id.clone(), input, now);
        state.applications.insert(application_id, record.clone());
        Ok(record)
    }

    fn loan_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, StoreError> {
        Ok(self.state()?.applications.get(application_id).cloned())
    }

    fn loan_application_by_id_and_mobile(
        &self,
        application_id: &ApplicationId,
        mobile: &str,
    ) -> Result<Option<LoanApplication>, StoreError> {
        let state = self.state()?;
        Ok(state
            .applications
            .get(application_id)
            .filter(|record| record.mobile == mobile)
            .cloned())
    }

    fn update_loan_application_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
    ) -> Result<Option<LoanApplication>, StoreError> {
        let now = self.clock.now();
        let mut state = self.state()?;
        let Some(record) = state.applications.get_mut(application_id) else {
            return Ok(None);
        };

        set_status(record, status, now);
        Ok(Some(record.clone()))
    }

    fn transition_loan_application_status(
        &self,
        application_id: &ApplicationId,
        status: ApplicationStatus,
        allowed: fn(ApplicationStatus, ApplicationStatus) -> bool,
    ) -> Result<StatusChange, StoreError> {
        let now = self.clock.now();
        let mut state = self.state()?;
        let Some(record) = state.applications.get_mut(application_id) else {
            return Ok(StatusChange::Missing);
        };

        let from = record.status;
        if !allowed(from, status) {
            return Ok(StatusChange::Refused { current: from });
        }
        set_status(record, status, now);
        Ok(StatusChange::Applied {
            from,
            record: record.clone(),
        })
    }

    fn loan_applications(&self) -> Result<Vec<LoanApplication>, StoreError> {
        let state = self.state()?;
        let mut records: Vec<_> = state.applications.values().cloned().collect();
        records.sort_by_key(|record| record.id);
        Ok(records)
    }

    fn create_contact_message(
        &self,
        input: NewContactMessage,
    ) -> Result<ContactMessage, StoreError> {
        let now = self.clock.now();
        let mut state = self.state()?;
        let id = State::bump(&mut state.next_message_id);

        let message = ContactMessage {
            id,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            phone: input.phone.filter(|phone| !phone.is_empty()),
            subject: input.subject,
            message: input.message,
            created_at: now,
        };
        state.contact_messages.insert(id, message.clone());
        Ok(message)
    }

    fn contact_messages(&self) -> Result<Vec<ContactMessage>, StoreError> {
        Ok(self.state()?.contact_messages.values().cloned().collect())
    }

    fn create_cibil_request(&self, input: NewCibilRequest) -> Result<CibilRequest, StoreError> {
        let now = self.clock.now();
        let score = mock_cibil_score(&input.pan_card);
        let mut state = self.state()?;

        let request_id = fresh_id(
            |candidate: &CibilRequestId| state.cibil_requests.contains_key(candidate),
            || self.ids.cibil_request_id(now),
        )?;

        let id = State::bump(&mut state.next_cibil_id);
        let request = CibilRequest {
            id,
            request_id: request_id.clone(),
            full_name: input.full_name,
            date_of_birth: input.date_of_birth,
            mobile: input.mobile,
            pan_card: input.pan_card,
            pincode: input.pincode,
            score,
            status: CibilStatus::Completed,
            created_at: now,
        };
        state.cibil_requests.insert(request_id, request.clone());
        Ok(request)
    }

    fn cibil_request(
        &self,
        request_id: &CibilRequestId,
    ) -> Result<Option<CibilRequest>, StoreError> {
        Ok(self.state()?.cibil_requests.get(request_id).cloned())
    }

    fn create_agent(&self, input: NewAgent) -> Result<Agent, StoreError> {
        let mut state = self.state()?;
        if state.agent_emails.contains_key(&input.email) {
            return Err(StoreError::Conflict);
        }

        let id = State::bump(&mut state.next_agent_id);
        let agent = Agent {
            id,
            email: input.email,
            password_hash: input.password_hash,
            name: input.name,
            is_active: true,
        };
        state.agent_emails.insert(agent.email.clone(), id);
        state.agents.insert(id, agent.clone());
        Ok(agent)
    }

    fn agent(&self, id: u64) -> Result<Option<Agent>, StoreError> {
        Ok(self.state()?.agents.get(&id).cloned())
    }

    fn agent_by_email(&self, email: &str) -> Result<Option<Agent>, StoreError> {
        let state = self.state()?;
        Ok(state
            .agent_emails
            .get(email)
            .and_then(|id| state.agents.get(id))
            .cloned())
    }
}

#[cfg(test)]
impl InMemoryRecordStore {
    /// Flip the activation flag, which no public operation exposes.
    pub(crate) fn set_agent_active(&self, id: u64, active: bool) {
        let mut state = self.state.lock().expect("record store lock poisoned");
        if let Some(agent) = state.agents.get_mut(&id) {
            agent.is_active = active;
        }
    }
}
