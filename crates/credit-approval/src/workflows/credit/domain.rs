use std::fmt;

use serde::{Deserialize, Serialize};

/// Points threshold quoted on the rejection screen. Informational only: the approve or
/// reject verdict always comes from the risk-scoring service.
pub const DISPLAYED_MINIMUM_POINTS: i64 = 7;

/// Ordered steps of the approval workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    RiskAssessment,
    FinancialInfo,
    EmailConfirmation,
    Rejected,
}

impl WorkflowStep {
    pub const fn label(self) -> &'static str {
        match self {
            WorkflowStep::RiskAssessment => "risk_assessment",
            WorkflowStep::FinancialInfo => "financial_info",
            WorkflowStep::EmailConfirmation => "email_confirmation",
            WorkflowStep::Rejected => "rejected",
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            WorkflowStep::RiskAssessment => "Risk Assessment",
            WorkflowStep::FinancialInfo => "Financial Information",
            WorkflowStep::EmailConfirmation => "Credit Approved!",
            WorkflowStep::Rejected => "Application Result",
        }
    }

    /// Step reached through the `back` trigger, if the step allows it.
    pub const fn predecessor(self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::FinancialInfo => Some(WorkflowStep::RiskAssessment),
            WorkflowStep::EmailConfirmation => Some(WorkflowStep::FinancialInfo),
            WorkflowStep::RiskAssessment | WorkflowStep::Rejected => None,
        }
    }
}

impl fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User-initiated triggers accepted by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Submit,
    Back,
    Restart,
    EditRiskSignals,
    EditFinancialInfo,
    EditEmail,
}

impl StepAction {
    pub const fn label(self) -> &'static str {
        match self {
            StepAction::Submit => "submit",
            StepAction::Back => "back",
            StepAction::Restart => "restart",
            StepAction::EditRiskSignals => "edit_risk_signals",
            StepAction::EditFinancialInfo => "edit_financial_info",
            StepAction::EditEmail => "edit_email",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Yes/no answers used as scoring input, plus the points awarded for them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskSignals {
    pub has_job: bool,
    pub consistent_job: bool,
    pub owns_home: bool,
    pub owns_car: bool,
    pub additional_income: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

impl RiskSignals {
    pub fn answers(&self) -> RiskAnswers {
        RiskAnswers {
            has_job: self.has_job,
            consistent_job: self.consistent_job,
            owns_home: self.owns_home,
            owns_car: self.owns_car,
            additional_income: self.additional_income,
        }
    }

    /// Replace the five answers, keeping any previously awarded points.
    pub fn apply_answers(&mut self, answers: RiskAnswers) {
        self.has_job = answers.has_job;
        self.consistent_job = answers.consistent_job;
        self.owns_home = answers.owns_home;
        self.owns_car = answers.owns_car;
        self.additional_income = answers.additional_income;
    }

    pub fn questions(&self) -> [(&'static str, bool); 5] {
        [
            ("Do you have a paying job?", self.has_job),
            (
                "Did you consistently have a paying job for past 12 months?",
                self.consistent_job,
            ),
            ("Do you own a home?", self.owns_home),
            ("Do you own a car?", self.owns_car),
            (
                "Do you have any additional source of income?",
                self.additional_income,
            ),
        ]
    }
}

/// The editable part of [`RiskSignals`]; the payload sent for scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAnswers {
    #[serde(default)]
    pub has_job: bool,
    #[serde(default)]
    pub consistent_job: bool,
    #[serde(default)]
    pub owns_home: bool,
    #[serde(default)]
    pub owns_car: bool,
    #[serde(default)]
    pub additional_income: bool,
}

/// Income and expenses as typed, before parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialDraft {
    #[serde(default)]
    pub monthly_income: String,
    #[serde(default)]
    pub monthly_expenses: String,
}

impl FinancialDraft {
    pub fn new(monthly_income: impl Into<String>, monthly_expenses: impl Into<String>) -> Self {
        Self {
            monthly_income: monthly_income.into(),
            monthly_expenses: monthly_expenses.into(),
        }
    }
}

/// Parsed, non-negative monthly figures in whole dollars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialFigures {
    pub monthly_income: i64,
    pub monthly_expenses: i64,
}

/// Figures returned by the credit-calculation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditResult {
    pub credit_amount: i64,
    pub net_monthly_income: i64,
}
