//! The approval workflow state machine.
//!
//! Forward transitions are split into two halves so that at most one collaborator call
//! can be outstanding per workflow: [`WorkflowController::begin_submit`] validates the
//! current step, moves the controller into [`Phase::Awaiting`] and hands out a
//! [`PendingCall`]; the caller runs that call and returns the [`CallOutcome`] to
//! [`WorkflowController::complete`]. Every other trigger is refused while a call is
//! pending.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::collaborators::{
    ApprovalNotificationRequest, Collaborator, CollaboratorError, CreditCalculationResponse,
    DecisionServices, RiskScoreResponse,
};
use super::domain::{
    CreditResult, FinancialDraft, FinancialFigures, RiskAnswers, RiskSignals, StepAction,
    WorkflowStep,
};
use super::validation::{validate_email, validate_financial_draft, ValidationError};

/// Message shown once the approval PDF has been handed to the notification service.
pub const APPROVAL_SENT_MESSAGE: &str = "PDF has been sent to your email address!";

/// Whether the workflow is waiting on a collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "collaborator", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Awaiting(Collaborator),
}

/// Last outcome texts. Both may be stale; the step view decides what to show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkflowStatus {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl WorkflowStatus {
    fn clear(&mut self) {
        self.message = None;
        self.error = None;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("a {0} request is still in flight")]
    Busy(Collaborator),
    #[error("'{action}' is not available on the {step} step")]
    InvalidAction {
        step: WorkflowStep,
        action: StepAction,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{message}")]
    Collaborator {
        message: String,
        #[source]
        source: CollaboratorError,
    },
    #[error("no collaborator request is pending")]
    NoPendingCall,
    #[error("a {received} reply arrived while waiting on {expected}")]
    UnexpectedOutcome {
        expected: Collaborator,
        received: Collaborator,
    },
    #[error("credit has not been calculated for this application")]
    MissingCreditResult,
}

/// Request issued by [`WorkflowController::begin_submit`]. Not cloneable: exactly one
/// outcome can be produced from it.
#[derive(Debug)]
#[must_use = "a pending call must be run and completed to release the workflow"]
pub struct PendingCall {
    request: CallRequest,
}

#[derive(Debug)]
enum CallRequest {
    AssessRisk(RiskAnswers),
    CalculateCredit(FinancialFigures),
    SendApproval(ApprovalNotificationRequest),
}

impl PendingCall {
    pub fn collaborator(&self) -> Collaborator {
        match &self.request {
            CallRequest::AssessRisk(_) => Collaborator::RiskScoring,
            CallRequest::CalculateCredit(_) => Collaborator::CreditCalculation,
            CallRequest::SendApproval(_) => Collaborator::Notification,
        }
    }

    /// Perform the request against the given services.
    pub async fn run<S>(self, services: &S) -> CallOutcome
    where
        S: DecisionServices + ?Sized,
    {
        match self.request {
            CallRequest::AssessRisk(answers) => {
                CallOutcome::RiskScored(services.assess_risk(&answers).await)
            }
            CallRequest::CalculateCredit(figures) => CallOutcome::CreditCalculated {
                result: services.calculate_credit(&figures).await,
                figures,
            },
            CallRequest::SendApproval(request) => {
                CallOutcome::ApprovalSent(services.send_approval(&request).await)
            }
        }
    }
}

/// Result of a [`PendingCall`], handed back to [`WorkflowController::complete`].
#[derive(Debug)]
pub enum CallOutcome {
    RiskScored(Result<RiskScoreResponse, CollaboratorError>),
    CreditCalculated {
        figures: FinancialFigures,
        result: Result<CreditCalculationResponse, CollaboratorError>,
    },
    ApprovalSent(Result<(), CollaboratorError>),
}

impl CallOutcome {
    pub fn collaborator(&self) -> Collaborator {
        match self {
            CallOutcome::RiskScored(_) => Collaborator::RiskScoring,
            CallOutcome::CreditCalculated { .. } => Collaborator::CreditCalculation,
            CallOutcome::ApprovalSent(_) => Collaborator::Notification,
        }
    }
}

/// One applicant's pass through the approval steps.
#[derive(Debug, Clone, Default)]
pub struct WorkflowController {
    step: WorkflowStep,
    phase: Phase,
    risk: RiskSignals,
    financial: FinancialDraft,
    figures: Option<FinancialFigures>,
    credit: Option<CreditResult>,
    email: String,
    status: WorkflowStatus,
}

impl WorkflowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Awaiting(_))
    }

    pub fn risk_signals(&self) -> &RiskSignals {
        &self.risk
    }

    pub fn financial_draft(&self) -> &FinancialDraft {
        &self.financial
    }

    /// Figures accepted by the credit-calculation service.
    pub fn financial_figures(&self) -> Option<FinancialFigures> {
        self.figures
    }

    pub fn credit_result(&self) -> Option<CreditResult> {
        self.credit
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn status(&self) -> &WorkflowStatus {
        &self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.status.message.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.status.error.as_deref()
    }

    /// Triggers the workflow accepts right now.
    pub fn available_actions(&self) -> Vec<StepAction> {
        if self.is_loading() {
            return Vec::new();
        }

        match self.step {
            WorkflowStep::RiskAssessment => vec![StepAction::EditRiskSignals, StepAction::Submit],
            WorkflowStep::FinancialInfo => vec![
                StepAction::EditFinancialInfo,
                StepAction::Submit,
                StepAction::Back,
            ],
            WorkflowStep::EmailConfirmation => {
                vec![StepAction::EditEmail, StepAction::Submit, StepAction::Back]
            }
            WorkflowStep::Rejected => vec![StepAction::Restart],
        }
    }

    pub fn set_risk_answers(&mut self, answers: RiskAnswers) -> Result<(), WorkflowError> {
        self.ensure(StepAction::EditRiskSignals, WorkflowStep::RiskAssessment)?;
        self.risk.apply_answers(answers);
        Ok(())
    }

    pub fn set_financial_draft(&mut self, draft: FinancialDraft) -> Result<(), WorkflowError> {
        self.ensure(StepAction::EditFinancialInfo, WorkflowStep::FinancialInfo)?;
        self.financial = draft;
        Ok(())
    }

    pub fn set_email(&mut self, email: impl Into<String>) -> Result<(), WorkflowError> {
        self.ensure(StepAction::EditEmail, WorkflowStep::EmailConfirmation)?;
        self.email = email.into();
        Ok(())
    }

    /// Return to the previous step without touching collected data.
    pub fn back(&mut self) -> Result<WorkflowStep, WorkflowError> {
        self.ensure_idle()?;
        let previous = self.step.predecessor().ok_or(WorkflowError::InvalidAction {
            step: self.step,
            action: StepAction::Back,
        })?;

        debug!(from = %self.step, to = %previous, "workflow moved back");
        self.step = previous;
        self.status.clear();
        Ok(previous)
    }

    /// Start over after a rejection.
    pub fn restart(&mut self) -> Result<WorkflowStep, WorkflowError> {
        self.ensure(StepAction::Restart, WorkflowStep::Rejected)?;

        self.risk = RiskSignals::default();
        self.figures = None;
        self.credit = None;
        self.status.clear();
        self.step = WorkflowStep::RiskAssessment;
        info!("workflow restarted after rejection");
        Ok(self.step)
    }

    /// Validate the current step and claim the single in-flight slot.
    ///
    /// Validation failures are recorded in the status and no call is issued.
    pub fn begin_submit(&mut self) -> Result<PendingCall, WorkflowError> {
        self.ensure_idle()?;

        let request = match self.step {
            WorkflowStep::RiskAssessment => CallRequest::AssessRisk(self.risk.answers()),
            WorkflowStep::FinancialInfo => {
                let figures = self.validated(validate_financial_draft(&self.financial))?;
                CallRequest::CalculateCredit(figures)
            }
            WorkflowStep::EmailConfirmation => {
                let email = self.validated(validate_email(&self.email))?;
                let (figures, credit) = match (self.figures, self.credit) {
                    (Some(figures), Some(credit)) => (figures, credit),
                    _ => return Err(WorkflowError::MissingCreditResult),
                };
                CallRequest::SendApproval(ApprovalNotificationRequest {
                    email,
                    risk_assessment: self.risk,
                    financial_info: figures,
                    credit_amount: credit.credit_amount,
                })
            }
            WorkflowStep::Rejected => {
                return Err(WorkflowError::InvalidAction {
                    step: self.step,
                    action: StepAction::Submit,
                })
            }
        };

        let call = PendingCall { request };
        self.phase = Phase::Awaiting(call.collaborator());
        self.status.error = None;
        debug!(step = %self.step, collaborator = %call.collaborator(), "collaborator call started");
        Ok(call)
    }

    /// Apply the outcome of the pending call and release the in-flight slot.
    pub fn complete(&mut self, outcome: CallOutcome) -> Result<WorkflowStep, WorkflowError> {
        let expected = match self.phase {
            Phase::Awaiting(collaborator) => collaborator,
            Phase::Idle => return Err(WorkflowError::NoPendingCall),
        };
        if outcome.collaborator() != expected {
            return Err(WorkflowError::UnexpectedOutcome {
                expected,
                received: outcome.collaborator(),
            });
        }
        self.phase = Phase::Idle;

        match outcome {
            CallOutcome::RiskScored(Ok(response)) => {
                self.risk.points = Some(response.points);
                self.set_message(response.message);
                self.step = if response.approved {
                    WorkflowStep::FinancialInfo
                } else {
                    WorkflowStep::Rejected
                };
                info!(
                    points = response.points,
                    approved = response.approved,
                    step = %self.step,
                    "risk assessment scored"
                );
            }
            CallOutcome::CreditCalculated {
                figures,
                result: Ok(response),
            } => {
                self.figures = Some(figures);
                self.credit = Some(CreditResult {
                    credit_amount: response.credit_amount,
                    net_monthly_income: response.net_monthly_income,
                });
                self.set_message(response.message);
                self.step = WorkflowStep::EmailConfirmation;
                info!(
                    credit_amount = response.credit_amount,
                    net_monthly_income = response.net_monthly_income,
                    "credit calculated"
                );
            }
            CallOutcome::ApprovalSent(Ok(())) => {
                self.status.message = Some(APPROVAL_SENT_MESSAGE.to_string());
                info!("approval notification dispatched");
            }
            CallOutcome::RiskScored(Err(source))
            | CallOutcome::CreditCalculated {
                result: Err(source),
                ..
            }
            | CallOutcome::ApprovalSent(Err(source)) => {
                let message = source.display_message();
                warn!(step = %self.step, error = %source, "collaborator call failed");
                self.status.error = Some(message.clone());
                return Err(WorkflowError::Collaborator { message, source });
            }
        }

        Ok(self.step)
    }

    /// Run the current step's forward transition end to end.
    pub async fn submit<S>(&mut self, services: &S) -> Result<WorkflowStep, WorkflowError>
    where
        S: DecisionServices + ?Sized,
    {
        let call = self.begin_submit()?;
        let outcome = call.run(services).await;
        self.complete(outcome)
    }

    fn set_message(&mut self, message: String) {
        self.status.message = if message.is_empty() {
            None
        } else {
            Some(message)
        };
    }

    fn validated<T>(&mut self, result: Result<T, ValidationError>) -> Result<T, WorkflowError> {
        result.map_err(|error| {
            debug!(step = %self.step, kind = error.kind(), "step input rejected");
            self.status.error = Some(error.to_string());
            WorkflowError::Validation(error)
        })
    }

    fn ensure_idle(&self) -> Result<(), WorkflowError> {
        match self.phase {
            Phase::Idle => Ok(()),
            Phase::Awaiting(collaborator) => Err(WorkflowError::Busy(collaborator)),
        }
    }

    fn ensure(&self, action: StepAction, required: WorkflowStep) -> Result<(), WorkflowError> {
        self.ensure_idle()?;
        if self.step == required {
            Ok(())
        } else {
            Err(WorkflowError::InvalidAction {
                step: self.step,
                action,
            })
        }
    }
}
