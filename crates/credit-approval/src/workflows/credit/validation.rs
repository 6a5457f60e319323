//! Input gating run before any collaborator call. Everything here is pure.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use super::domain::{FinancialDraft, FinancialFigures};

const EMAIL_PATTERN: &str = r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$";

/// Which financial field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinancialField {
    MonthlyIncome,
    MonthlyExpenses,
}

impl fmt::Display for FinancialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinancialField::MonthlyIncome => f.write_str("monthly income"),
            FinancialField::MonthlyExpenses => f.write_str("monthly expenses"),
        }
    }
}

/// Local validation failures. Display text is what the applicant sees.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Income and expenses must be non-negative numbers")]
    NegativeValue { field: FinancialField, value: i64 },
    #[error("Income and expenses must be whole-dollar numbers ({field} was '{raw}')")]
    NotANumber { field: FinancialField, raw: String },
    #[error("Please enter a valid email address")]
    InvalidFormat { raw: String },
}

impl ValidationError {
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::NegativeValue { .. } => "negative_value",
            ValidationError::NotANumber { .. } => "not_a_number",
            ValidationError::InvalidFormat { .. } => "invalid_format",
        }
    }
}

/// Parse both figures as whole numbers and reject negatives.
pub fn validate_financial_input(
    raw_income: &str,
    raw_expenses: &str,
) -> Result<FinancialFigures, ValidationError> {
    let monthly_income = parse_whole_dollars(FinancialField::MonthlyIncome, raw_income)?;
    let monthly_expenses = parse_whole_dollars(FinancialField::MonthlyExpenses, raw_expenses)?;

    if monthly_income < 0 {
        return Err(ValidationError::NegativeValue {
            field: FinancialField::MonthlyIncome,
            value: monthly_income,
        });
    }
    if monthly_expenses < 0 {
        return Err(ValidationError::NegativeValue {
            field: FinancialField::MonthlyExpenses,
            value: monthly_expenses,
        });
    }

    Ok(FinancialFigures {
        monthly_income,
        monthly_expenses,
    })
}

pub fn validate_financial_draft(draft: &FinancialDraft) -> Result<FinancialFigures, ValidationError> {
    validate_financial_input(&draft.monthly_income, &draft.monthly_expenses)
}

/// Returns the trimmed address when it matches standard email syntax.
pub fn validate_email(raw: &str) -> Result<String, ValidationError> {
    let candidate = raw.trim();
    if candidate.len() <= 254 && email_pattern().is_match(candidate) {
        Ok(candidate.to_string())
    } else {
        Err(ValidationError::InvalidFormat {
            raw: raw.to_string(),
        })
    }
}

fn parse_whole_dollars(field: FinancialField, raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::NotANumber {
            field,
            raw: raw.to_string(),
        })
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_non_negative_whole_numbers() {
        let figures = validate_financial_input("3000", " 1000 ").expect("valid figures");
        assert_eq!(figures.monthly_income, 3000);
        assert_eq!(figures.monthly_expenses, 1000);

        let zero = validate_financial_input("0", "0").expect("zero is allowed");
        assert_eq!(zero.monthly_income, 0);
    }

    #[test]
    fn negative_income_is_rejected() {
        let error = validate_financial_input("-5", "100").expect_err("negative income");
        assert_eq!(
            error,
            ValidationError::NegativeValue {
                field: FinancialField::MonthlyIncome,
                value: -5,
            }
        );
        assert_eq!(
            error.to_string(),
            "Income and expenses must be non-negative numbers"
        );
    }

    #[test]
    fn negative_expenses_are_rejected() {
        let error = validate_financial_input("100", "-1").expect_err("negative expenses");
        assert!(matches!(
            error,
            ValidationError::NegativeValue {
                field: FinancialField::MonthlyExpenses,
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_and_empty_text_are_their_own_error() {
        for (income, expenses, field) in [
            ("", "100", FinancialField::MonthlyIncome),
            ("12abc", "100", FinancialField::MonthlyIncome),
            ("3000", "10.5", FinancialField::MonthlyExpenses),
            ("3000", "   ", FinancialField::MonthlyExpenses),
        ] {
            match validate_financial_input(income, expenses) {
                Err(ValidationError::NotANumber { field: reported, .. }) => {
                    assert_eq!(reported, field, "input {income:?}/{expenses:?}")
                }
                other => panic!("expected NotANumber for {income:?}/{expenses:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn draft_validation_uses_both_fields() {
        let draft = FinancialDraft::new("4200", "1800");
        let figures = validate_financial_draft(&draft).expect("valid draft");
        assert_eq!(figures.monthly_expenses, 1800);
    }

    #[test]
    fn email_syntax() {
        assert_eq!(
            validate_email("  user@example.com ").expect("valid"),
            "user@example.com"
        );
        assert!(validate_email("first.last+tag@mail.example.co.uk").is_ok());

        for raw in ["", "user", "user@", "@example.com", "user@example", "a b@example.com"] {
            assert!(
                matches!(validate_email(raw), Err(ValidationError::InvalidFormat { .. })),
                "{raw:?} should be rejected"
            );
        }
    }
}
