//! Credit approval workflow: risk assessment, financial information and email
//! confirmation steps driven by external decision services.

pub mod collaborators;
pub mod controller;
pub mod domain;
pub mod http;
pub mod router;
pub mod service;
pub mod validation;
pub mod view;

#[cfg(test)]
mod tests;

pub use collaborators::{
    ApprovalNotificationRequest, Collaborator, CollaboratorError, CreditCalculationResponse,
    DecisionServices, RiskScoreResponse,
};
pub use controller::{
    CallOutcome, PendingCall, Phase, WorkflowController, WorkflowError, WorkflowStatus,
    APPROVAL_SENT_MESSAGE,
};
pub use domain::{
    CreditResult, FinancialDraft, FinancialFigures, RiskAnswers, RiskSignals, StepAction,
    WorkflowStep, DISPLAYED_MINIMUM_POINTS,
};
pub use http::HttpDecisionServices;
pub use router::credit_router;
pub use service::{CreditWorkflowService, SessionError, SessionId, SessionView};
pub use validation::{validate_email, validate_financial_input, FinancialField, ValidationError};
pub use view::{NoticeTone, StepNotice, WorkflowSnapshot};
