use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Missing input for {stage}: {field} has not been provided")]
    MissingInput { stage: String, field: String },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Overdraw in {context}: requested {requested} units but only {available} available")]
    Overdraw {
        context: String,
        requested: Decimal,
        available: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl BudgetError {
    /// Re-anchor an error raised by a shared routine to the caller's context,
    /// e.g. an engine overdraw to the material that caused it.
    pub fn in_context(self, context: &str) -> Self {
        match self {
            BudgetError::InvalidInput { field, reason } => BudgetError::InvalidInput {
                field: format!("{context}.{field}"),
                reason,
            },
            BudgetError::Overdraw {
                requested,
                available,
                ..
            } => BudgetError::Overdraw {
                context: context.to_string(),
                requested,
                available,
            },
            BudgetError::DivisionByZero { .. } => BudgetError::DivisionByZero {
                context: context.to_string(),
            },
            other => other,
        }
    }
}

impl From<serde_json::Error> for BudgetError {
    fn from(e: serde_json::Error) -> Self {
        BudgetError::SerializationError(e.to_string())
    }
}
