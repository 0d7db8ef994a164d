use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::auth::AuthenticatedAgent;
use super::domain::WireLabel;
use super::service::{IntakeError, IntakeService};
use super::store::RecordStore;
use super::validation::{
    CibilCheckSubmission, ContactSubmission, LoanApplicationSubmission, ValidationErrors,
};

/// Router builder exposing the public intake endpoints and the agent console API.
pub fn intake_router<S>(service: Arc<IntakeService<S>>) -> Router
where
    S: RecordStore + 'static,
{
    Router::new()
        .route(
            "/api/loan-applications",
            post(submit_application_handler::<S>),
        )
        .route(
            "/api/loan-applications/:application_id",
            get(track_application_handler::<S>),
        )
        .route(
            "/api/loan-applications/:application_id/status",
            patch(update_status_handler::<S>),
        )
        .route("/api/agents/login", post(login_handler::<S>))
        .route(
            "/api/agents/applications",
            get(list_applications_handler::<S>),
        )
        .route(
            "/api/agents/applications.csv",
            get(export_applications_handler::<S>),
        )
        .route(
            "/api/agents/contact-messages",
            get(list_contact_messages_handler::<S>),
        )
        .route("/api/contact", post(contact_handler::<S>))
        .route("/api/cibil-check", post(cibil_check_handler::<S>))
        .route(
            "/api/cibil-check/:request_id",
            get(cibil_lookup_handler::<S>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TrackQuery {
    pub mobile: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct StatusUpdate {
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub(crate) type Service<S> = State<Arc<IntakeService<S>>>;

pub(crate) async fn submit_application_handler<S>(
    State(service): Service<S>,
    payload: Result<Json<LoanApplicationSubmission>, JsonRejection>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let Json(submission) = payload.map_err(malformed_body)?;
    let record = service.submit_application(&submission)?;
    let body = json!({
        "success": true,
        "applicationId": record.application_id.0,
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn track_application_handler<S>(
    State(service): Service<S>,
    Path(application_id): Path<String>,
    Query(query): Query<TrackQuery>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let record = service.track_application(&application_id, query.mobile.as_deref())?;
    Ok(Json(record).into_response())
}

pub(crate) async fn update_status_handler<S>(
    State(service): Service<S>,
    headers: HeaderMap,
    Path(application_id): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let agent = authorize(&service, &headers)?;
    let Json(update) = payload.map_err(malformed_body)?;
    let Some(status) = update.status.filter(|status| !status.trim().is_empty()) else {
        return Err(ValidationErrors::single("status", "is required").into());
    };

    let record = service.update_application_status(&agent, &application_id, &status)?;
    Ok(Json(record).into_response())
}

pub(crate) async fn login_handler<S>(
    State(service): Service<S>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let Json(request) = payload.map_err(malformed_body)?;
    let grant = tokio::task::spawn_blocking(move || {
        service.login(&request.email, &request.password)
    })
    .await??;

    let body = json!({
        "success": true,
        "token": grant.token,
        "expiresAt": grant.expires_at,
        "agent": grant.agent,
    });
    Ok(Json(body).into_response())
}

pub(crate) async fn list_applications_handler<S>(
    State(service): Service<S>,
    headers: HeaderMap,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let agent = authorize(&service, &headers)?;
    Ok(Json(service.applications(&agent)?).into_response())
}

pub(crate) async fn export_applications_handler<S>(
    State(service): Service<S>,
    headers: HeaderMap,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let agent = authorize(&service, &headers)?;
    let csv = service.export_applications_csv(&agent)?;
    Ok((
        [
            (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"loan-applications.csv\"",
            ),
        ],
        csv,
    )
        .into_response())
}

pub(crate) async fn list_contact_messages_handler<S>(
    State(service): Service<S>,
    headers: HeaderMap,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let agent = authorize(&service, &headers)?;
    Ok(Json(service.contact_messages(&agent)?).into_response())
}

pub(crate) async fn contact_handler<S>(
    State(service): Service<S>,
    payload: Result<Json<ContactSubmission>, JsonRejection>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let Json(submission) = payload.map_err(malformed_body)?;
    let message = service.submit_contact(&submission)?;
    let body = json!({
        "success": true,
        "messageId": message.id,
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn cibil_check_handler<S>(
    State(service): Service<S>,
    payload: Result<Json<CibilCheckSubmission>, JsonRejection>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    let Json(submission) = payload.map_err(malformed_body)?;
    let request = service.request_cibil_check(&submission)?;
    let body = json!({
        "success": true,
        "requestId": request.request_id.0,
        "score": request.score,
        "status": request.status.label(),
    });
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

pub(crate) async fn cibil_lookup_handler<S>(
    State(service): Service<S>,
    Path(request_id): Path<String>,
) -> Result<Response, IntakeError>
where
    S: RecordStore + 'static,
{
    Ok(Json(service.cibil_check(&request_id)?).into_response())
}

fn authorize<S>(
    service: &IntakeService<S>,
    headers: &HeaderMap,
) -> Result<AuthenticatedAgent, IntakeError>
where
    S: RecordStore + 'static,
{
    let token = bearer_token(headers).ok_or(IntakeError::Unauthorized)?;
    service.authenticate(token)
}

/// Token from an `Authorization: Bearer <token>` header.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

fn malformed_body(rejection: JsonRejection) -> IntakeError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return IntakeError::BodyTooLarge;
    }
    ValidationErrors::single("body", rejection.body_text()).into()
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let (status, payload) = match &self {
            IntakeError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": "Validation error", "errors": errors }),
            ),
            IntakeError::BodyTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({ "message": "Request body too large" }),
            ),
            IntakeError::NotFound => (
                StatusCode::NOT_FOUND,
                json!({ "message": "Record not found" }),
            ),
            IntakeError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Invalid credentials" }),
            ),
            IntakeError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Unauthorized" }),
            ),
            IntakeError::UnknownStatus(label) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "message": format!("Unknown status '{label}'"),
                    "allowed": super::domain::ApplicationStatus::labels(),
                }),
            ),
            IntakeError::InvalidTransition { from, to } => (
                StatusCode::CONFLICT,
                json!({
                    "message": format!("Cannot move application from {from} to {to}"),
                    "allowed": super::status::allowed_transitions(*from)
                        .iter()
                        .map(|status| status.label())
                        .collect::<Vec<_>>(),
                }),
            ),
            IntakeError::Store(_)
            | IntakeError::Credential(_)
            | IntakeError::Export(_)
            | IntakeError::Task(_) => {
                tracing::error!(error = %self, "intake request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal server error" }),
                )
            }
        };

        (status, Json(payload)).into_response()
    }
}
