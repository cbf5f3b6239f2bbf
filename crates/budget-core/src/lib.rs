pub mod error;
pub mod types;

#[cfg(feature = "inventory")]
pub mod inventory;

#[cfg(feature = "budget")]
pub mod budget;

pub use error::BudgetError;
pub use types::*;

/// Standard result type for all budget operations
pub type BudgetResult<T> = Result<T, BudgetError>;
