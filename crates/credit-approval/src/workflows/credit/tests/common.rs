use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;
use tokio::sync::Notify;

use crate::workflows::credit::collaborators::{
    ApprovalNotificationRequest, Collaborator, CollaboratorError, CreditCalculationResponse,
    DecisionServices, RiskScoreResponse,
};
use crate::workflows::credit::domain::{FinancialDraft, FinancialFigures, RiskAnswers};
use crate::workflows::credit::{
    credit_router, CreditWorkflowService, WorkflowController, WorkflowStep,
};

/// A call observed by [`ScriptedServices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum RecordedCall {
    AssessRisk(RiskAnswers),
    CalculateCredit(FinancialFigures),
    SendApproval(ApprovalNotificationRequest),
}

/// Decision services that replay queued replies and record every request.
#[derive(Default)]
pub(super) struct ScriptedServices {
    risk: Mutex<VecDeque<Result<RiskScoreResponse, CollaboratorError>>>,
    credit: Mutex<VecDeque<Result<CreditCalculationResponse, CollaboratorError>>>,
    notification: Mutex<VecDeque<Result<(), CollaboratorError>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedServices {
    pub(super) fn push_risk(&self, reply: Result<RiskScoreResponse, CollaboratorError>) -> &Self {
        self.risk.lock().expect("risk queue").push_back(reply);
        self
    }

    pub(super) fn push_credit(
        &self,
        reply: Result<CreditCalculationResponse, CollaboratorError>,
    ) -> &Self {
        self.credit.lock().expect("credit queue").push_back(reply);
        self
    }

    pub(super) fn push_notification(&self, reply: Result<(), CollaboratorError>) -> &Self {
        self.notification
            .lock()
            .expect("notification queue")
            .push_back(reply);
        self
    }

    pub(super) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("call log").clone()
    }

    pub(super) fn count(&self, collaborator: Collaborator) -> usize {
        self.calls()
            .iter()
            .filter(|call| match (call, collaborator) {
                (RecordedCall::AssessRisk(_), Collaborator::RiskScoring)
                | (RecordedCall::CalculateCredit(_), Collaborator::CreditCalculation)
                | (RecordedCall::SendApproval(_), Collaborator::Notification) => true,
                _ => false,
            })
            .count()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().expect("call log").push(call);
    }
}

fn unscripted(collaborator: Collaborator) -> CollaboratorError {
    CollaboratorError::Transport {
        collaborator,
        detail: "no scripted reply".to_string(),
    }
}

#[async_trait]
impl DecisionServices for ScriptedServices {
    async fn assess_risk(
        &self,
        answers: &RiskAnswers,
    ) -> Result<RiskScoreResponse, CollaboratorError> {
        self.record(RecordedCall::AssessRisk(*answers));
        self.risk
            .lock()
            .expect("risk queue")
            .pop_front()
            .unwrap_or_else(|| Err(unscripted(Collaborator::RiskScoring)))
    }

    async fn calculate_credit(
        &self,
        figures: &FinancialFigures,
    ) -> Result<CreditCalculationResponse, CollaboratorError> {
        self.record(RecordedCall::CalculateCredit(*figures));
        self.credit
            .lock()
            .expect("credit queue")
            .pop_front()
            .unwrap_or_else(|| Err(unscripted(Collaborator::CreditCalculation)))
    }

    async fn send_approval(
        &self,
        request: &ApprovalNotificationRequest,
    ) -> Result<(), CollaboratorError> {
        self.record(RecordedCall::SendApproval(request.clone()));
        self.notification
            .lock()
            .expect("notification queue")
            .pop_front()
            .unwrap_or_else(|| Err(unscripted(Collaborator::Notification)))
    }
}

/// Scoring service that holds every request until released.
#[derive(Default)]
pub(super) struct GatedServices {
    pub(super) entered: Notify,
    pub(super) release: Notify,
}

#[async_trait]
impl DecisionServices for GatedServices {
    async fn assess_risk(
        &self,
        _answers: &RiskAnswers,
    ) -> Result<RiskScoreResponse, CollaboratorError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(qualified_score())
    }

    async fn calculate_credit(
        &self,
        _figures: &FinancialFigures,
    ) -> Result<CreditCalculationResponse, CollaboratorError> {
        Ok(approved_credit())
    }

    async fn send_approval(
        &self,
        _request: &ApprovalNotificationRequest,
    ) -> Result<(), CollaboratorError> {
        Ok(())
    }
}

pub(super) fn qualified_answers() -> RiskAnswers {
    RiskAnswers {
        has_job: true,
        consistent_job: true,
        owns_home: true,
        owns_car: false,
        additional_income: false,
    }
}

pub(super) fn qualified_score() -> RiskScoreResponse {
    RiskScoreResponse {
        points: 8,
        approved: true,
        message: "Qualified".to_string(),
    }
}

pub(super) fn rejected_score() -> RiskScoreResponse {
    RiskScoreResponse {
        points: 3,
        approved: false,
        message: "Unfortunately, you do not qualify for credit".to_string(),
    }
}

pub(super) fn approved_credit() -> CreditCalculationResponse {
    CreditCalculationResponse {
        credit_amount: 5000,
        net_monthly_income: 2000,
        message: "Approved".to_string(),
    }
}

pub(super) fn rejected(collaborator: Collaborator, message: Option<&str>) -> CollaboratorError {
    CollaboratorError::Rejected {
        collaborator,
        status: 400,
        message: message.map(str::to_string),
    }
}

/// Controller already on the financial information step.
pub(super) async fn at_financial_info(services: &ScriptedServices) -> WorkflowController {
    services.push_risk(Ok(qualified_score()));
    let mut controller = WorkflowController::new();
    controller
        .set_risk_answers(qualified_answers())
        .expect("risk step editable");
    let step = controller.submit(services).await.expect("risk scored");
    assert_eq!(step, WorkflowStep::FinancialInfo);
    controller
}

/// Controller already on the email confirmation step with 3000/1000 accepted.
pub(super) async fn at_email_confirmation(services: &ScriptedServices) -> WorkflowController {
    let mut controller = at_financial_info(services).await;
    services.push_credit(Ok(approved_credit()));
    controller
        .set_financial_draft(FinancialDraft::new("3000", "1000"))
        .expect("financial step editable");
    let step = controller.submit(services).await.expect("credit calculated");
    assert_eq!(step, WorkflowStep::EmailConfirmation);
    controller
}

pub(super) fn router_with(services: Arc<ScriptedServices>) -> axum::Router {
    credit_router(Arc::new(CreditWorkflowService::new(services)))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
