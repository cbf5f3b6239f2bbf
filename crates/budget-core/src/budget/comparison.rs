use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::budget::inputs::BudgetInputs;
use crate::budget::pipeline::{BudgetPipeline, BudgetSnapshot, Stage};
use crate::error::BudgetError;
use crate::inventory::CostingPolicy;
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::BudgetResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Headline figures of one budget run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyFigures {
    /// Consumed cost of all materials
    pub materials_cost: Money,
    /// Ending value of all materials
    pub materials_ending_value: Money,
    pub unit_production_cost: Money,
    pub cost_of_goods_sold: Money,
    pub ending_finished_goods_value: Money,
    pub gross_profit: Money,
    pub operating_profit: Money,
    pub operating_margin_pct: Option<Percent>,
}

/// Outcome of the budget under one costing policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PolicyOutcome {
    Complete(PolicyFigures),
    Incomplete { stage: Stage, reason: BudgetError },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyComparison {
    pub policy: CostingPolicy,
    pub outcome: PolicyOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutput {
    pub results: Vec<PolicyComparison>,
    /// Policy with the highest operating profit among complete runs.
    /// Ties go to the earlier policy in LIFO, FIFO, weighted average order.
    pub highest_operating_profit: Option<CostingPolicy>,
    /// Highest minus lowest operating profit among complete runs
    pub operating_profit_spread: Option<Money>,
}

impl PolicyFigures {
    fn from_snapshot(snapshot: &BudgetSnapshot) -> Self {
        Self {
            materials_cost: snapshot.production_cost.materials_cost,
            materials_ending_value: snapshot
                .materials
                .iter()
                .map(|m| m.valuation.ending_value)
                .sum(),
            unit_production_cost: snapshot.production_cost.unit_production_cost,
            cost_of_goods_sold: snapshot.cost_of_goods_sold.cost_of_goods_sold,
            ending_finished_goods_value: snapshot.cost_of_goods_sold.ending_value,
            gross_profit: snapshot.income_statement.gross_profit,
            operating_profit: snapshot.income_statement.operating_profit,
            operating_margin_pct: snapshot.income_statement.operating_margin_pct,
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Run the budget once per costing policy, overriding whatever policy the
/// inputs carry, and compare the headline figures side by side.
///
/// Fails only when no policy produces a complete budget; the first
/// policy's reason is returned in that case.
pub fn compare_costing_policies(
    inputs: &BudgetInputs,
) -> BudgetResult<ComputationOutput<ComparisonOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let results: Vec<PolicyComparison> = CostingPolicy::ALL
        .iter()
        .map(|&policy| {
            let pipeline = BudgetPipeline::new(inputs.clone().with_policy(policy));
            let outcome = match pipeline.recompute() {
                Ok(snapshot) => PolicyOutcome::Complete(PolicyFigures::from_snapshot(&snapshot)),
                Err(incomplete) => PolicyOutcome::Incomplete {
                    stage: incomplete.stage,
                    reason: incomplete.reason,
                },
            };
            PolicyComparison { policy, outcome }
        })
        .collect();

    let complete: Vec<(CostingPolicy, &PolicyFigures)> = results
        .iter()
        .filter_map(|r| match &r.outcome {
            PolicyOutcome::Complete(figures) => Some((r.policy, figures)),
            PolicyOutcome::Incomplete { .. } => None,
        })
        .collect();

    if complete.is_empty() {
        let first_reason = results.iter().find_map(|r| match &r.outcome {
            PolicyOutcome::Incomplete { reason, .. } => Some(reason.clone()),
            PolicyOutcome::Complete(_) => None,
        });
        return Err(first_reason.unwrap_or_else(|| BudgetError::MissingInput {
            stage: Stage::Sales.label().into(),
            field: "inputs".into(),
        }));
    }

    if complete.len() < results.len() {
        warnings.push(format!(
            "{} of {} costing policies produced an incomplete budget",
            results.len() - complete.len(),
            results.len()
        ));
    }

    let mut best: Option<(CostingPolicy, Money)> = None;
    let mut lowest: Option<Money> = None;
    for (policy, figures) in &complete {
        let profit = figures.operating_profit;
        if best.map_or(true, |(_, top)| profit > top) {
            best = Some((*policy, profit));
        }
        if lowest.map_or(true, |low| profit < low) {
            lowest = Some(profit);
        }
    }

    let output = ComparisonOutput {
        highest_operating_profit: best.map(|(policy, _)| policy),
        operating_profit_spread: best.zip(lowest).map(|((_, high), low)| high - low),
        results,
    };

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        "Master budget under LIFO, FIFO and weighted average costing",
        &serde_json::json!({
            "policies": CostingPolicy::ALL.len(),
            "materials": inputs.materials.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn figures(out: &ComparisonOutput, policy: CostingPolicy) -> &PolicyFigures {
        match &out.results.iter().find(|r| r.policy == policy).unwrap().outcome {
            PolicyOutcome::Complete(f) => f,
            other => panic!("Expected complete outcome, got {other:?}"),
        }
    }

    #[test]
    fn test_reference_comparison() {
        let out = compare_costing_policies(&BudgetInputs::reference()).unwrap();
        let result = &out.result;
        assert_eq!(result.results.len(), 3);

        let lifo = figures(result, CostingPolicy::Lifo);
        assert_eq!(lifo.operating_profit, dec!(1_800_000));

        let fifo = figures(result, CostingPolicy::Fifo);
        assert_eq!(fifo.unit_production_cost, dec!(279.265625));
        assert_eq!(fifo.cost_of_goods_sold, dec!(17_447_406.25));
        assert_eq!(fifo.operating_profit, dec!(1_992_593.75));

        // Rising prices: FIFO charges the older, cheaper layers
        assert_eq!(result.highest_operating_profit, Some(CostingPolicy::Fifo));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn test_comparison_with_missing_input_fails() {
        let err = compare_costing_policies(&BudgetInputs::default()).unwrap_err();
        assert!(matches!(err, BudgetError::MissingInput { .. }));
    }

    #[test]
    fn test_comparison_ignores_input_policy() {
        let inputs = BudgetInputs {
            policy: None,
            ..BudgetInputs::reference()
        };
        let out = compare_costing_policies(&inputs).unwrap();
        assert!(out
            .result
            .results
            .iter()
            .all(|r| matches!(r.outcome, PolicyOutcome::Complete(_))));
    }
}
