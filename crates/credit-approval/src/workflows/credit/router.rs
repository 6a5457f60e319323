use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use super::collaborators::DecisionServices;
use super::controller::WorkflowError;
use super::domain::{FinancialDraft, RiskAnswers};
use super::service::{CreditWorkflowService, SessionError, SessionId, SessionView};

type SharedService<S> = State<Arc<CreditWorkflowService<S>>>;

#[derive(Debug, Deserialize)]
pub(crate) struct EmailUpdate {
    #[serde(default)]
    pub(crate) email: String,
}

/// Router builder exposing the credit workflow session endpoints.
pub fn credit_router<S>(service: Arc<CreditWorkflowService<S>>) -> Router
where
    S: DecisionServices + 'static,
{
    Router::new()
        .route("/api/v1/credit/sessions", post(open_handler::<S>))
        .route(
            "/api/v1/credit/sessions/:session_id",
            get(status_handler::<S>).delete(close_handler::<S>),
        )
        .route(
            "/api/v1/credit/sessions/:session_id/risk",
            put(risk_handler::<S>),
        )
        .route(
            "/api/v1/credit/sessions/:session_id/financial",
            put(financial_handler::<S>),
        )
        .route(
            "/api/v1/credit/sessions/:session_id/email",
            put(email_handler::<S>),
        )
        .route(
            "/api/v1/credit/sessions/:session_id/submit",
            post(submit_handler::<S>),
        )
        .route(
            "/api/v1/credit/sessions/:session_id/back",
            post(back_handler::<S>),
        )
        .route(
            "/api/v1/credit/sessions/:session_id/restart",
            post(restart_handler::<S>),
        )
        .with_state(service)
}

pub(crate) async fn open_handler<S>(State(service): SharedService<S>) -> Response
where
    S: DecisionServices + 'static,
{
    let view = service.open();
    (StatusCode::CREATED, axum::Json(view)).into_response()
}

pub(crate) async fn status_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.get(&SessionId(session_id)))
}

pub(crate) async fn close_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DecisionServices + 'static,
{
    match service.close(&SessionId(session_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => session_error_response(error),
    }
}

pub(crate) async fn risk_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
    axum::Json(answers): axum::Json<RiskAnswers>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.update_risk(&SessionId(session_id), answers))
}

pub(crate) async fn financial_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
    axum::Json(draft): axum::Json<FinancialDraft>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.update_financial(&SessionId(session_id), draft))
}

pub(crate) async fn email_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
    axum::Json(update): axum::Json<EmailUpdate>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.update_email(&SessionId(session_id), update.email))
}

pub(crate) async fn submit_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.submit(&SessionId(session_id)).await)
}

pub(crate) async fn back_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.back(&SessionId(session_id)))
}

pub(crate) async fn restart_handler<S>(
    State(service): SharedService<S>,
    Path(session_id): Path<String>,
) -> Response
where
    S: DecisionServices + 'static,
{
    respond(service.restart(&SessionId(session_id)))
}

fn respond(result: Result<SessionView, SessionError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => session_error_response(error),
    }
}

pub(crate) fn workflow_error_status(error: &WorkflowError) -> StatusCode {
    match error {
        WorkflowError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::Collaborator { .. } => StatusCode::BAD_GATEWAY,
        WorkflowError::Busy(_)
        | WorkflowError::InvalidAction { .. }
        | WorkflowError::MissingCreditResult => StatusCode::CONFLICT,
        WorkflowError::NoPendingCall | WorkflowError::UnexpectedOutcome { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn session_error_response(error: SessionError) -> Response {
    match error {
        SessionError::NotFound(id) => {
            let payload = json!({
                "error": "session not found",
                "session_id": id.0,
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        SessionError::Workflow { source, session } => {
            let payload = json!({
                "error": source.to_string(),
                "snapshot": session,
            });
            (workflow_error_status(&source), axum::Json(payload)).into_response()
        }
    }
}
