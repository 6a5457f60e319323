use serde::Serialize;

use super::collaborators::Collaborator;
use super::controller::WorkflowController;
use super::domain::{
    CreditResult, FinancialDraft, RiskSignals, StepAction, WorkflowStep, DISPLAYED_MINIMUM_POINTS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTone {
    Success,
    Failure,
    Info,
}

/// A line of text the current step displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepNotice {
    pub tone: NoticeTone,
    pub text: String,
}

impl StepNotice {
    fn new(tone: NoticeTone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// Serializable picture of a workflow for API responses and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowSnapshot {
    pub step: WorkflowStep,
    pub title: &'static str,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub awaiting: Option<Collaborator>,
    pub message: Option<String>,
    pub error: Option<String>,
    pub notices: Vec<StepNotice>,
    pub available_actions: Vec<StepAction>,
    pub risk_assessment: RiskSignals,
    pub financial_info: FinancialDraft,
    pub credit_result: Option<CreditResult>,
    pub email: String,
}

impl WorkflowController {
    pub fn snapshot(&self) -> WorkflowSnapshot {
        let awaiting = match self.phase() {
            super::controller::Phase::Awaiting(collaborator) => Some(collaborator),
            super::controller::Phase::Idle => None,
        };

        WorkflowSnapshot {
            step: self.step(),
            title: self.step().title(),
            loading: self.is_loading(),
            awaiting,
            message: self.message().map(str::to_string),
            error: self.error().map(str::to_string),
            notices: step_notices(self),
            available_actions: self.available_actions(),
            risk_assessment: *self.risk_signals(),
            financial_info: self.financial_draft().clone(),
            credit_result: self.credit_result(),
            email: self.email().to_string(),
        }
    }
}

/// Which of the stored texts the current step shows, in display order.
///
/// An error is always shown first. The success message is only shown where the step
/// has a place for it, so a stale message never leaks onto another step.
pub fn step_notices(controller: &WorkflowController) -> Vec<StepNotice> {
    let mut notices = Vec::new();
    if let Some(error) = controller.error() {
        notices.push(StepNotice::new(NoticeTone::Failure, error));
    }

    let points = controller.risk_signals().points;
    match controller.step() {
        WorkflowStep::RiskAssessment => {}
        WorkflowStep::FinancialInfo => {
            if let Some(points) = points {
                notices.push(StepNotice::new(
                    NoticeTone::Success,
                    format!("Great! You scored {points} points and qualify for credit."),
                ));
            }
        }
        WorkflowStep::EmailConfirmation => {
            if let Some(message) = controller.message() {
                notices.push(StepNotice::new(NoticeTone::Success, message));
            }
            if let Some(credit) = controller.credit_result() {
                notices.push(StepNotice::new(
                    NoticeTone::Info,
                    format!("Net Monthly Income: ${}", credit.net_monthly_income),
                ));
                notices.push(StepNotice::new(
                    NoticeTone::Info,
                    format!("Approved Credit Amount: ${}", credit.credit_amount),
                ));
            }
        }
        WorkflowStep::Rejected => {
            if let Some(message) = controller.message() {
                notices.push(StepNotice::new(NoticeTone::Failure, message));
            }
            let scored = points.map_or_else(|| "no".to_string(), |points| points.to_string());
            notices.push(StepNotice::new(
                NoticeTone::Info,
                format!(
                    "You scored {scored} points (minimum required: {DISPLAYED_MINIMUM_POINTS})"
                ),
            ));
        }
    }

    notices
}
