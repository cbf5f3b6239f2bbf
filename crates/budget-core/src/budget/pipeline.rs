use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info_span, warn};

use crate::budget::inputs::{BudgetInputs, MaterialInputs};
use crate::budget::stages::{
    self, CostOfGoodsSold, IncomeStatement, LaborBudget, MaterialBudget, OverheadBudget,
    ProductionBudget, ProductionCost, SalesBudget,
};
use crate::error::BudgetError;
use crate::inventory::CostingPolicy;
use crate::types::{with_metadata, ComputationOutput, ExpenseLine};
use crate::BudgetResult;

/// Materials a budget can carry.
pub const MAX_MATERIALS: usize = 2;

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// A derived computation in the budget chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Sales,
    Production,
    MaterialRequirement,
    Purchases,
    MaterialValuation,
    Labor,
    Overhead,
    ProductionCost,
    CostOfGoodsSold,
    IncomeStatement,
}

impl Stage {
    /// Stages whose output this stage reads directly.
    pub fn dependencies(&self) -> &'static [Stage] {
        match self {
            Stage::Sales => &[],
            Stage::Production => &[Stage::Sales],
            Stage::MaterialRequirement => &[Stage::Production],
            Stage::Purchases => &[Stage::MaterialRequirement],
            Stage::MaterialValuation => &[Stage::MaterialRequirement, Stage::Purchases],
            Stage::Labor => &[Stage::Production],
            Stage::Overhead => &[],
            Stage::ProductionCost => &[
                Stage::Production,
                Stage::MaterialValuation,
                Stage::Labor,
                Stage::Overhead,
            ],
            Stage::CostOfGoodsSold => &[Stage::Sales, Stage::ProductionCost],
            Stage::IncomeStatement => &[Stage::Sales, Stage::CostOfGoodsSold],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::Sales => "sales",
            Stage::Production => "production",
            Stage::MaterialRequirement => "material requirement",
            Stage::Purchases => "purchases",
            Stage::MaterialValuation => "material valuation",
            Stage::Labor => "labor",
            Stage::Overhead => "overhead",
            Stage::ProductionCost => "production cost",
            Stage::CostOfGoodsSold => "cost of goods sold",
            Stage::IncomeStatement => "income statement",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Every stage's inputs and outputs for one recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub policy: CostingPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    pub sales: SalesBudget,
    pub production: ProductionBudget,
    pub materials: Vec<MaterialBudget>,
    pub labor: LaborBudget,
    pub overhead: OverheadBudget,
    pub production_cost: ProductionCost,
    pub cost_of_goods_sold: CostOfGoodsSold,
    pub income_statement: IncomeStatement,
    pub warnings: Vec<String>,
}

/// A recomputation that stopped before producing a snapshot.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("Budget incomplete at {stage}: {reason}")]
pub struct IncompleteResult {
    /// Stage that could not be evaluated
    pub stage: Stage,
    pub reason: BudgetError,
    /// Stages evaluated before the failure, in order
    pub completed: Vec<Stage>,
}

// ---------------------------------------------------------------------------
// Stage runner
// ---------------------------------------------------------------------------

/// Tracks which stages hold a value and refuses to evaluate a stage whose
/// dependencies have not completed.
#[derive(Debug, Default)]
struct StageRun {
    completed: Vec<Stage>,
}

impl StageRun {
    fn eval<T>(
        &mut self,
        stage: Stage,
        compute: impl FnOnce() -> BudgetResult<T>,
    ) -> Result<T, IncompleteResult> {
        if let Some(missing) = stage
            .dependencies()
            .iter()
            .find(|dep| !self.completed.contains(*dep))
        {
            return Err(self.incomplete(
                stage,
                BudgetError::MissingInput {
                    stage: stage.label().into(),
                    field: format!("{missing} stage output"),
                },
            ));
        }

        match compute() {
            Ok(value) => {
                debug!(stage = %stage, "stage evaluated");
                self.completed.push(stage);
                Ok(value)
            }
            Err(reason) => {
                warn!(stage = %stage, error = %reason, "stage could not be evaluated");
                Err(self.incomplete(stage, reason))
            }
        }
    }

    fn incomplete(&self, stage: Stage, reason: BudgetError) -> IncompleteResult {
        IncompleteResult {
            stage,
            reason,
            completed: self.completed.clone(),
        }
    }
}

fn require<T: Clone>(value: &Option<T>, stage: Stage, field: &str) -> BudgetResult<T> {
    value.clone().ok_or_else(|| BudgetError::MissingInput {
        stage: stage.label().into(),
        field: field.into(),
    })
}

fn validate_materials(materials: &[MaterialInputs]) -> BudgetResult<()> {
    if materials.is_empty() {
        return Err(BudgetError::MissingInput {
            stage: Stage::MaterialRequirement.label().into(),
            field: "materials".into(),
        });
    }
    if materials.len() > MAX_MATERIALS {
        return Err(BudgetError::InvalidInput {
            field: "materials".into(),
            reason: format!(
                "At most {MAX_MATERIALS} materials are supported, got {}",
                materials.len()
            ),
        });
    }
    let mut seen = HashSet::new();
    for m in materials {
        if m.name.trim().is_empty() {
            return Err(BudgetError::InvalidInput {
                field: "materials.name".into(),
                reason: "Material name must not be empty".into(),
            });
        }
        if !seen.insert(m.name.as_str()) {
            return Err(BudgetError::InvalidInput {
                field: "materials.name".into(),
                reason: format!("Duplicate material '{}'", m.name),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Holds the current budget inputs and evaluates the full stage chain on
/// demand. Nothing is cached between recomputations.
#[derive(Debug, Clone, Default)]
pub struct BudgetPipeline {
    inputs: BudgetInputs,
}

impl BudgetPipeline {
    pub fn new(inputs: BudgetInputs) -> Self {
        Self { inputs }
    }

    pub fn inputs(&self) -> &BudgetInputs {
        &self.inputs
    }

    /// Merge updated fields into the current inputs.
    pub fn set_inputs(&mut self, update: BudgetInputs) {
        self.inputs.merge(update);
    }

    /// Evaluate every stage from the current inputs.
    pub fn recompute(&self) -> Result<BudgetSnapshot, IncompleteResult> {
        let span = info_span!("recompute", policy = ?self.inputs.policy);
        let _guard = span.enter();

        let inputs = &self.inputs;
        let mut run = StageRun::default();
        let mut warnings: Vec<String> = Vec::new();

        let sales = run.eval(Stage::Sales, || {
            stages::sales_budget(
                require(&inputs.sales_units, Stage::Sales, "sales_units")?,
                require(&inputs.unit_price, Stage::Sales, "unit_price")?,
            )
        })?;

        let production = run.eval(Stage::Production, || {
            stages::production_budget(
                &sales,
                require(
                    &inputs.desired_ending_finished_goods,
                    Stage::Production,
                    "desired_ending_finished_goods",
                )?,
                require(
                    &inputs.opening_finished_goods,
                    Stage::Production,
                    "opening_finished_goods",
                )?,
            )
        })?;
        if production.units_to_produce < Decimal::ZERO {
            warn!(units = %production.units_to_produce, "production plan is negative");
            warnings.push(format!(
                "Units to produce is negative ({}): opening finished goods exceed sales plus desired ending stock",
                production.units_to_produce
            ));
        }

        let requirements = run.eval(Stage::MaterialRequirement, || {
            validate_materials(&inputs.materials)?;
            inputs
                .materials
                .iter()
                .map(|m| {
                    let usage = require(
                        &m.usage_per_unit,
                        Stage::MaterialRequirement,
                        &format!("{}.usage_per_unit", m.name),
                    )?;
                    stages::material_requirement(&m.name, &production, usage)
                })
                .collect::<BudgetResult<Vec<_>>>()
        })?;

        let purchases = run.eval(Stage::Purchases, || {
            inputs
                .materials
                .iter()
                .zip(&requirements)
                .map(|(m, req)| {
                    stages::material_purchases(
                        req,
                        require(
                            &m.desired_ending_quantity,
                            Stage::Purchases,
                            &format!("{}.desired_ending_quantity", m.name),
                        )?,
                        require(
                            &m.opening_quantity,
                            Stage::Purchases,
                            &format!("{}.opening_quantity", m.name),
                        )?,
                        require(
                            &m.purchase_unit_price,
                            Stage::Purchases,
                            &format!("{}.purchase_unit_price", m.name),
                        )?,
                    )
                })
                .collect::<BudgetResult<Vec<_>>>()
        })?;

        let valuations = run.eval(Stage::MaterialValuation, || {
            let policy = require(&inputs.policy, Stage::MaterialValuation, "policy")?;
            inputs
                .materials
                .iter()
                .zip(requirements.iter().zip(&purchases))
                .map(|(m, (req, pur))| {
                    let opening_unit_cost = require(
                        &m.opening_unit_cost,
                        Stage::MaterialValuation,
                        &format!("{}.opening_unit_cost", m.name),
                    )?;
                    stages::material_valuation(req, pur, opening_unit_cost, policy)
                })
                .collect::<BudgetResult<Vec<_>>>()
        })?;

        let labor = run.eval(Stage::Labor, || {
            stages::labor_budget(
                &production,
                require(&inputs.labor_hours_per_unit, Stage::Labor, "labor_hours_per_unit")?,
                require(&inputs.labor_rate_per_hour, Stage::Labor, "labor_rate_per_hour")?,
            )
        })?;

        let overhead = run.eval(Stage::Overhead, || {
            let lines: Vec<ExpenseLine> = require(&inputs.overhead, Stage::Overhead, "overhead")?;
            stages::overhead_budget(&lines)
        })?;

        let materials: Vec<MaterialBudget> = requirements
            .into_iter()
            .zip(purchases)
            .zip(valuations)
            .map(|((requirement, purchases), valuation)| MaterialBudget {
                name: requirement.name.clone(),
                requirement,
                purchases,
                valuation,
            })
            .collect();

        let production_cost = run.eval(Stage::ProductionCost, || {
            stages::production_cost(&materials, &labor, &overhead, &production)
        })?;

        let cost_of_goods_sold = run.eval(Stage::CostOfGoodsSold, || {
            stages::cost_of_goods_sold(
                &sales,
                &production_cost,
                require(
                    &inputs.opening_finished_goods,
                    Stage::CostOfGoodsSold,
                    "opening_finished_goods",
                )?,
                require(
                    &inputs.opening_finished_goods_unit_cost,
                    Stage::CostOfGoodsSold,
                    "opening_finished_goods_unit_cost",
                )?,
                require(&inputs.policy, Stage::CostOfGoodsSold, "policy")?,
            )
        })?;

        let income_statement = run.eval(Stage::IncomeStatement, || {
            let lines: Vec<ExpenseLine> = require(
                &inputs.operating_expenses,
                Stage::IncomeStatement,
                "operating_expenses",
            )?;
            stages::income_statement(&sales, &cost_of_goods_sold, &lines)
        })?;
        if income_statement.gross_margin_pct.is_none() {
            warn!("revenue is zero, margins undefined");
            warnings.push("Revenue is zero; gross and operating margins are undefined".into());
        }

        Ok(BudgetSnapshot {
            policy: cost_of_goods_sold.valuation.policy,
            company_name: inputs.company_name.clone(),
            sales,
            production,
            materials,
            labor,
            overhead,
            production_cost,
            cost_of_goods_sold,
            income_statement,
            warnings,
        })
    }
}

// ---------------------------------------------------------------------------
// One-shot entry point
// ---------------------------------------------------------------------------

/// Run the full budget chain once and wrap the snapshot in the standard
/// computation envelope.
pub fn build_master_budget(
    inputs: &BudgetInputs,
) -> Result<ComputationOutput<BudgetSnapshot>, IncompleteResult> {
    let start = Instant::now();
    let snapshot = BudgetPipeline::new(inputs.clone()).recompute()?;
    let warnings = snapshot.warnings.clone();
    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        &format!(
            "Manufacturing master budget with {} inventory costing",
            snapshot.policy.label()
        ),
        &serde_json::json!({
            "policy": snapshot.policy,
            "materials": snapshot.materials.len(),
            "overhead_lines": snapshot.overhead.lines.len(),
            "operating_expense_lines": snapshot.income_statement.operating_expenses.len(),
        }),
        warnings,
        elapsed,
        snapshot,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_stage_run_refuses_unready_stage() {
        let mut run = StageRun::default();
        let err = run
            .eval(Stage::CostOfGoodsSold, || Ok(dec!(1)))
            .unwrap_err();
        assert_eq!(err.stage, Stage::CostOfGoodsSold);
        assert!(matches!(err.reason, BudgetError::MissingInput { .. }));
        assert!(err.completed.is_empty());
    }

    #[test]
    fn test_stage_run_records_completion() {
        let mut run = StageRun::default();
        run.eval(Stage::Sales, || Ok(())).unwrap();
        run.eval(Stage::Production, || Ok(())).unwrap();
        assert_eq!(run.completed, vec![Stage::Sales, Stage::Production]);
    }

    #[test]
    fn test_validate_materials_limits() {
        let three = vec![
            MaterialInputs::named("A"),
            MaterialInputs::named("B"),
            MaterialInputs::named("C"),
        ];
        assert!(matches!(
            validate_materials(&three),
            Err(BudgetError::InvalidInput { .. })
        ));
        assert!(matches!(
            validate_materials(&[]),
            Err(BudgetError::MissingInput { .. })
        ));
        let dupes = vec![MaterialInputs::named("A"), MaterialInputs::named("A")];
        assert!(matches!(
            validate_materials(&dupes),
            Err(BudgetError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_empty_pipeline_reports_missing_sales() {
        let err = BudgetPipeline::default().recompute().unwrap_err();
        assert_eq!(err.stage, Stage::Sales);
        assert_eq!(
            err.reason,
            BudgetError::MissingInput {
                stage: "sales".into(),
                field: "sales_units".into()
            }
        );
    }

    #[test]
    fn test_reference_budget_lifo() {
        let snap = BudgetPipeline::new(BudgetInputs::reference())
            .recompute()
            .unwrap();
        assert_eq!(snap.policy, CostingPolicy::Lifo);
        assert_eq!(snap.production_cost.total_production_cost, dec!(17_920_000));
        assert_eq!(snap.production_cost.unit_production_cost, dec!(280));
        assert_eq!(snap.income_statement.operating_profit, dec!(1_800_000));
        assert!(snap.warnings.is_empty());
    }
}
