use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::BudgetError;
use crate::BudgetResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Physical quantities: finished units, material pieces, labor hours.
pub type Units = Decimal;

/// Percentages expressed on a 0-100 scale (33.5 = 33.5%).
pub type Percent = Decimal;

/// A named amount in a budget schedule, e.g. "Rent" or "Advertising".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub name: String,
    pub amount: Money,
}

impl ExpenseLine {
    pub fn new(name: impl Into<String>, amount: Money) -> Self {
        Self {
            name: name.into(),
            amount,
        }
    }
}

/// Sum a schedule of expense lines, rejecting negative amounts.
pub fn total_expenses(field: &str, lines: &[ExpenseLine]) -> BudgetResult<Money> {
    for line in lines {
        if line.amount < Decimal::ZERO {
            return Err(BudgetError::InvalidInput {
                field: format!("{field}:{}", line.name),
                reason: format!("Amount must be non-negative, got {}", line.amount),
            });
        }
    }
    Ok(lines.iter().map(|l| l.amount).sum())
}

/// Reject negative values for fields that represent stock, prices or rates.
pub fn validate_non_negative(field: &str, value: Decimal) -> BudgetResult<()> {
    if value < Decimal::ZERO {
        return Err(BudgetError::InvalidInput {
            field: field.into(),
            reason: format!("Value must be non-negative, got {value}"),
        });
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_total_expenses_sums_lines() {
        let lines = vec![
            ExpenseLine::new("Rent", dec!(360_000)),
            ExpenseLine::new("Energy", dec!(464_000)),
        ];
        assert_eq!(total_expenses("overhead", &lines).unwrap(), dec!(824_000));
    }

    #[test]
    fn test_total_expenses_empty_is_zero() {
        assert_eq!(total_expenses("overhead", &[]).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_total_expenses_rejects_negative_line() {
        let lines = vec![ExpenseLine::new("Refund", dec!(-1))];
        let err = total_expenses("operating_expenses", &lines).unwrap_err();
        match err {
            BudgetError::InvalidInput { field, .. } => {
                assert_eq!(field, "operating_expenses:Refund")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }
}
