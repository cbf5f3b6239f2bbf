use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::debug;

use budget_core::budget::comparison::compare_costing_policies;
use budget_core::budget::{build_master_budget, export_summary, BudgetInputs, BudgetPipeline};
use budget_core::inventory::valuation::{value_inventory, ValuationInput};
use budget_core::inventory::CostingPolicy;

use crate::input;

/// Arguments shared by the budget, compare and summary commands
#[derive(Args)]
pub struct BudgetArgs {
    /// Path to a JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Costing policy: lifo, fifo or weighted_average
    #[arg(long)]
    pub policy: Option<CostingPolicy>,

    /// Override the forecast sales units
    #[arg(long)]
    pub sales_units: Option<Decimal>,

    /// Override the selling price per unit
    #[arg(long)]
    pub unit_price: Option<Decimal>,

    /// Start from the reference data set instead of an empty one
    #[arg(long)]
    pub reference: bool,
}

/// Arguments for a standalone inventory valuation
#[derive(Args)]
pub struct ValuateArgs {
    /// Path to a JSON or YAML input file
    #[arg(long)]
    pub input: Option<String>,

    /// Override the costing policy in the input
    #[arg(long)]
    pub policy: Option<CostingPolicy>,
}

/// File or stdin first, then flag overrides on top.
fn load_inputs(args: BudgetArgs) -> Result<BudgetInputs, Box<dyn std::error::Error>> {
    let loaded: Option<BudgetInputs> = if let Some(ref path) = args.input {
        Some(input::file::read_input(path)?)
    } else if let Some(data) = input::stdin::read_stdin()? {
        Some(serde_json::from_value(data)?)
    } else {
        None
    };

    if loaded.is_none() && !args.reference {
        return Err("--input <file>, --reference or stdin required for the budget".into());
    }

    let inputs = apply_overrides(loaded.unwrap_or_default(), &args);
    debug!(
        policy = ?inputs.policy,
        materials = inputs.materials.len(),
        "budget inputs loaded"
    );
    Ok(inputs)
}

fn apply_overrides(loaded: BudgetInputs, args: &BudgetArgs) -> BudgetInputs {
    let mut inputs = if args.reference {
        let mut base = BudgetInputs::reference();
        base.merge(loaded);
        base
    } else {
        loaded
    };
    inputs.merge(BudgetInputs {
        policy: args.policy,
        sales_units: args.sales_units,
        unit_price: args.unit_price,
        ..BudgetInputs::default()
    });
    inputs
}

pub fn run_budget(args: BudgetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = load_inputs(args)?;
    let result = build_master_budget(&inputs)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_compare(args: BudgetArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let inputs = load_inputs(args)?;
    let result = compare_costing_policies(&inputs)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_summary(args: BudgetArgs) -> Result<String, Box<dyn std::error::Error>> {
    let inputs = load_inputs(args)?;
    let snapshot = BudgetPipeline::new(inputs).recompute()?;
    Ok(export_summary(&snapshot))
}

pub fn run_valuate(args: ValuateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut val_input: ValuationInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--input <file> or stdin required for inventory valuation".into());
    };
    if let Some(policy) = args.policy {
        val_input.policy = policy;
    }
    let result = value_inventory(&val_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_demo() -> Result<Value, Box<dyn std::error::Error>> {
    Ok(serde_json::to_value(BudgetInputs::reference())?)
}
