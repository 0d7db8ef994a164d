use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::config::SessionConfig;
use crate::intake::domain::{
    Agent, ApplicationId, ApplicationStatus, CibilRequest, CibilRequestId, ContactMessage,
    LoanApplication, NewAgent, NewCibilRequest, NewContactMessage, NewLoanApplication,
};
use crate::intake::identifiers::{
    Clock, IdentifierError, IdentifierGenerator, IdentifierSource,
};
use crate::intake::memory::InMemoryRecordStore;
use crate::intake::store::{RecordStore, StatusChange, StoreError};
use crate::intake::validation::{
    CibilCheckSubmission, ContactSubmission, LoanApplicationSubmission,
};
use crate::intake::IntakeService;

pub(super) const AGENT_EMAIL: &str = "agent@finflow.com";
pub(super) const AGENT_PASSWORD: &str = "admin123";
pub(super) const SESSION_MINUTES: i64 = 30;

/// Clock that only moves when a test advances it.
pub(super) struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub(super) fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock mutex poisoned")
    }
}

/// Hands out application ids from a fixed list, repeating the last one once
/// the list runs out. Counts every draw.
pub(super) struct ScriptedIds {
    script: Mutex<VecDeque<&'static str>>,
    last: &'static str,
    draws: Mutex<usize>,
}

impl ScriptedIds {
    pub(super) fn new(script: &[&'static str]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            last: script.last().copied().unwrap_or("LN2026000000"),
            draws: Mutex::new(0),
        }
    }

    pub(super) fn draws(&self) -> usize {
        *self.draws.lock().expect("draw counter poisoned")
    }
}

impl IdentifierSource for ScriptedIds {
    fn application_id(&self, _at: DateTime<Utc>) -> Result<ApplicationId, IdentifierError> {
        *self.draws.lock().expect("draw counter poisoned") += 1;
        let next = self.script.lock().expect("script poisoned").pop_front();
        Ok(ApplicationId(next.unwrap_or(self.last).to_string()))
    }

    fn cibil_request_id(&self, at: DateTime<Utc>) -> Result<CibilRequestId, IdentifierError> {
        let id = self.application_id(at)?;
        Ok(CibilRequestId(id.0.replacen("LN", "CB", 1)))
    }
}

/// Store plus service whose application ids follow `ids`.
pub(super) fn scripted_fixture(
    ids: Arc<ScriptedIds>,
) -> (Arc<InMemoryRecordStore>, IntakeService<InMemoryRecordStore>) {
    let clock = Arc::new(ManualClock::at(noon()));
    let store = Arc::new(InMemoryRecordStore::new(clock.clone(), ids));
    let service = IntakeService::new(store.clone(), clock, &SessionConfig::default());
    (store, service)
}

pub(super) fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<InMemoryRecordStore>,
    pub service: Arc<IntakeService<InMemoryRecordStore>>,
}

pub(super) fn fixture() -> Fixture {
    let clock = Arc::new(ManualClock::at(noon()));
    let store = Arc::new(InMemoryRecordStore::new(
        clock.clone(),
        Arc::new(IdentifierGenerator::seeded(2026)),
    ));
    let service = Arc::new(IntakeService::new(
        store.clone(),
        clock.clone(),
        &SessionConfig {
            ttl_minutes: SESSION_MINUTES,
        },
    ));
    Fixture {
        clock,
        store,
        service,
    }
}

/// Fixture with the default agent already seeded.
pub(super) fn staffed_fixture() -> Fixture {
    let fixture = fixture();
    fixture
        .service
        .ensure_agent(AGENT_EMAIL, "Default Agent", AGENT_PASSWORD)
        .expect("agent seeds");
    fixture
}

pub(super) fn login_token(fixture: &Fixture) -> String {
    fixture
        .service
        .login(AGENT_EMAIL, AGENT_PASSWORD)
        .expect("login succeeds")
        .token
}

pub(super) fn loan_submission() -> LoanApplicationSubmission {
    LoanApplicationSubmission {
        full_name: Some("Priya Sharma".to_string()),
        date_of_birth: Some("1990-05-20".to_string()),
        mobile: Some("+91 98765 43210".to_string()),
        email: Some("Priya.Sharma@Example.com".to_string()),
        pan_card: Some("abcde1234f".to_string()),
        gender: Some("female".to_string()),
        current_address: Some("221 MG Road, Indiranagar, Bengaluru".to_string()),
        employment_type: Some("salaried".to_string()),
        monthly_income: Some(85_000),
        company_name: Some("Acme Infotech".to_string()),
        work_experience: Some("5 years".to_string()),
        existing_emis: None,
        account_type: Some("savings".to_string()),
        loan_type: Some("personal".to_string()),
        loan_amount: Some(500_000),
        tenure: Some(5),
        purpose: Some("Home renovation".to_string()),
        terms_accepted: Some(true),
    }
}

pub(super) fn contact_submission() -> ContactSubmission {
    ContactSubmission {
        first_name: Some("Rahul".to_string()),
        last_name: Some("Verma".to_string()),
        email: Some("rahul@example.com".to_string()),
        phone: Some("  ".to_string()),
        subject: Some("loan-inquiry".to_string()),
        message: Some("What documents do I need for a gold loan?".to_string()),
    }
}

pub(super) fn cibil_submission() -> CibilCheckSubmission {
    CibilCheckSubmission {
        full_name: Some("Priya Sharma".to_string()),
        date_of_birth: Some("1990-05-20".to_string()),
        mobile: Some("9876543210".to_string()),
        pan_card: Some("ABCDE1234F".to_string()),
        pincode: Some("560038".to_string()),
        consent_agreement: Some(true),
    }
}

pub(super) fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

pub(super) fn authorized(mut request: Request<Body>, token: &str) -> Request<Body> {
    let value = format!("Bearer {token}").parse().expect("header value");
    request.headers_mut().insert(header::AUTHORIZATION, value);
    request
}

pub(super) fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

pub(super) async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable")
        .to_vec()
}

pub(super) async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).expect("json body")
}

/// Store whose backend is always down.
pub(super) struct UnavailableStore;

impl UnavailableStore {
    fn down<T>() -> Result<T, StoreError> {
        Err(StoreError::Unavailable("database offline".to_string()))
    }
}

impl RecordStore for UnavailableStore {
    fn create_loan_application(
        &self,
        _input: NewLoanApplication,
    ) -> Result<LoanApplication, StoreError> {
        Self::down()
    }

    fn loan_application(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Option<LoanApplication>, StoreError> {
        Self::down()
    }

    fn loan_application_by_id_and_mobile(
        &self,
        _application_id: &ApplicationId,
        _mobile: &str,
    ) -> Result<Option<LoanApplication>, StoreError> {
        Self::down()
    }

    fn update_loan_application_status(
        &self,
        _application_id: &ApplicationId,
        _status: ApplicationStatus,
    ) -> Result<Option<LoanApplication>, StoreError> {
        Self::down()
    }

    fn transition_loan_application_status(
        &self,
        _application_id: &ApplicationId,
        _status: ApplicationStatus,
        _allowed: fn(ApplicationStatus, ApplicationStatus) -> bool,
    ) -> Result<StatusChange, StoreError> {
        Self::down()
    }

    fn loan_applications(&self) -> Result<Vec<LoanApplication>, StoreError> {
        Self::down()
    }

    fn create_contact_message(
        &self,
        _input: NewContactMessage,
    ) -> Result<ContactMessage, StoreError> {
        Self::down()
    }

    fn contact_messages(&self) -> Result<Vec<ContactMessage>, StoreError> {
        Self::down()
    }

    fn create_cibil_request(&self, _input: NewCibilRequest) -> Result<CibilRequest, StoreError> {
        Self::down()
    }

    fn cibil_request(
        &self,
        _request_id: &CibilRequestId,
    ) -> Result<Option<CibilRequest>, StoreError> {
        Self::down()
    }

    fn create_agent(&self, _input: NewAgent) -> Result<Agent, StoreError> {
        Self::down()
    }

    fn agent(&self, _id: u64) -> Result<Option<Agent>, StoreError> {
        Self::down()
    }

    fn agent_by_email(&self, _email: &str) -> Result<Option<Agent>, StoreError> {
        Self::down()
    }
}

pub(super) fn unavailable_service() -> Arc<IntakeService<UnavailableStore>> {
    Arc::new(IntakeService::new(
        Arc::new(UnavailableStore),
        Arc::new(ManualClock::at(noon())),
        &SessionConfig::default(),
    ))
}
