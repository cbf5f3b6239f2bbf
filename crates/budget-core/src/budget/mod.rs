pub mod comparison;
pub mod inputs;
pub mod pipeline;
pub mod report;
pub mod stages;

pub use inputs::{BudgetInputs, MaterialInputs};
pub use pipeline::{build_master_budget, BudgetPipeline, BudgetSnapshot, IncompleteResult, Stage};
pub use report::export_summary;
