use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::domain::{FinancialFigures, RiskAnswers, RiskSignals};

/// External decision services the workflow talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collaborator {
    RiskScoring,
    CreditCalculation,
    Notification,
}

impl Collaborator {
    pub const fn label(self) -> &'static str {
        match self {
            Collaborator::RiskScoring => "risk scoring",
            Collaborator::CreditCalculation => "credit calculation",
            Collaborator::Notification => "notification",
        }
    }

    /// Text shown when the service fails without explaining why.
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Collaborator::RiskScoring => "Failed to process risk assessment. Please try again.",
            Collaborator::CreditCalculation => "Failed to calculate credit. Please try again.",
            Collaborator::Notification => "Failed to send email. Please try again.",
        }
    }
}

impl fmt::Display for Collaborator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskScoreResponse {
    pub points: i64,
    pub approved: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCalculationResponse {
    pub credit_amount: i64,
    pub net_monthly_income: i64,
    #[serde(default)]
    pub message: String,
}

/// Everything the workflow has accumulated, sent when the applicant asks for the PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalNotificationRequest {
    pub email: String,
    pub risk_assessment: RiskSignals,
    pub financial_info: FinancialFigures,
    pub credit_amount: i64,
}

/// Body shape collaborators use to explain a failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FailureBody {
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("{collaborator} service responded with status {status}")]
    Rejected {
        collaborator: Collaborator,
        status: u16,
        message: Option<String>,
    },
    #[error("{collaborator} service unreachable: {detail}")]
    Transport {
        collaborator: Collaborator,
        detail: String,
    },
    #[error("{collaborator} service sent an unreadable response: {detail}")]
    InvalidResponse {
        collaborator: Collaborator,
        detail: String,
    },
}

impl CollaboratorError {
    pub fn collaborator(&self) -> Collaborator {
        match self {
            CollaboratorError::Rejected { collaborator, .. }
            | CollaboratorError::Transport { collaborator, .. }
            | CollaboratorError::InvalidResponse { collaborator, .. } => *collaborator,
        }
    }

    /// The service's own explanation, when it sent a non-blank one.
    pub fn collaborator_message(&self) -> Option<&str> {
        match self {
            CollaboratorError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message.as_str()),
            _ => None,
        }
    }

    /// Applicant-facing text: the service's explanation, or the fixed fallback.
    pub fn display_message(&self) -> String {
        self.collaborator_message()
            .unwrap_or_else(|| self.collaborator().fallback_message())
            .to_string()
    }
}

/// Seam over the three external decision services.
#[async_trait]
pub trait DecisionServices: Send + Sync {
    async fn assess_risk(
        &self,
        answers: &RiskAnswers,
    ) -> Result<RiskScoreResponse, CollaboratorError>;

    async fn calculate_credit(
        &self,
        figures: &FinancialFigures,
    ) -> Result<CreditCalculationResponse, CollaboratorError>;

    async fn send_approval(
        &self,
        request: &ApprovalNotificationRequest,
    ) -> Result<(), CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_message_prefers_collaborator_text() {
        let error = CollaboratorError::Rejected {
            collaborator: Collaborator::CreditCalculation,
            status: 400,
            message: Some("Expenses exceed income".to_string()),
        };
        assert_eq!(error.display_message(), "Expenses exceed income");
    }

    #[test]
    fn display_message_falls_back_per_collaborator() {
        let blank = CollaboratorError::Rejected {
            collaborator: Collaborator::Notification,
            status: 500,
            message: Some("   ".to_string()),
        };
        assert_eq!(
            blank.display_message(),
            "Failed to send email. Please try again."
        );

        let transport = CollaboratorError::Transport {
            collaborator: Collaborator::RiskScoring,
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            transport.display_message(),
            "Failed to process risk assessment. Please try again."
        );
    }

    #[test]
    fn notification_request_matches_wire_contract() {
        let request = ApprovalNotificationRequest {
            email: "user@example.com".to_string(),
            risk_assessment: RiskSignals {
                has_job: true,
                consistent_job: true,
                owns_home: true,
                owns_car: false,
                additional_income: false,
                points: Some(8),
            },
            financial_info: FinancialFigures {
                monthly_income: 3000,
                monthly_expenses: 1000,
            },
            credit_amount: 5000,
        };

        let value = serde_json::to_value(&request).expect("serializes");
        assert_eq!(value["email"], "user@example.com");
        assert_eq!(value["risk_assessment"]["has_job"], true);
        assert_eq!(value["risk_assessment"]["points"], 8);
        assert_eq!(value["financial_info"]["monthly_income"], 3000);
        assert_eq!(value["financial_info"]["monthly_expenses"], 1000);
        assert_eq!(value["credit_amount"], 5000);
    }

    #[test]
    fn score_response_tolerates_missing_message() {
        let response: RiskScoreResponse =
            serde_json::from_str(r#"{"points": 3, "approved": false}"#).expect("parses");
        assert_eq!(response.points, 3);
        assert!(!response.approved);
        assert!(response.message.is_empty());
    }
}
