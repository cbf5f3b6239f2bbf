use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::debug;

use crate::error::BudgetError;
use crate::inventory::policy::{CostingPolicy, LotSource};
use crate::types::{validate_non_negative, with_metadata, ComputationOutput, Money, Units};
use crate::BudgetResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One cost layer: a quantity of stock carried at a single unit cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLot {
    pub quantity: Units,
    pub unit_cost: Money,
}

impl InventoryLot {
    pub fn new(quantity: Units, unit_cost: Money) -> Self {
        Self {
            quantity,
            unit_cost,
        }
    }

    /// quantity * unit_cost
    pub fn value(&self) -> Money {
        self.quantity * self.unit_cost
    }

    /// quantity * unit_cost, or `None` when the product is out of range.
    pub fn checked_value(&self) -> Option<Money> {
        self.quantity.checked_mul(self.unit_cost)
    }
}

/// A slice of one lot, either charged to consumption or left on hand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotDraw {
    pub source: LotSource,
    pub quantity: Units,
    pub unit_cost: Money,
    /// quantity * unit_cost
    pub cost: Money,
}

impl LotDraw {
    fn new(source: LotSource, quantity: Units, unit_cost: Money) -> Self {
        Self {
            source,
            quantity,
            unit_cost,
            cost: quantity * unit_cost,
        }
    }
}

/// Split of the available stock into cost of goods moved and ending inventory.
///
/// Units and value are conserved for every policy:
/// `consumed_quantity + ending_quantity` equals the units of both lots and
/// `consumed_cost + ending_value` equals their combined value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuationResult {
    pub policy: CostingPolicy,
    pub consumed_quantity: Units,
    pub consumed_cost: Money,
    pub ending_quantity: Units,
    pub ending_value: Money,
    /// Blended unit cost; only set under weighted average with stock available.
    pub average_unit_cost: Option<Money>,
    /// Layers charged to consumption, in draw order. Empty under weighted average.
    pub consumed_draws: Vec<LotDraw>,
    /// What is left of each layer. Empty under weighted average.
    pub ending_layers: Vec<LotDraw>,
}

/// Input for a standalone valuation of a two-lot movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    /// Free-form label, e.g. "Material A" or "Finished goods"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub opening: InventoryLot,
    pub incoming: InventoryLot,
    pub consumed_quantity: Units,
    pub policy: CostingPolicy,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Value a movement of stock out of an opening lot and an incoming lot.
///
/// Consumption beyond the combined quantity of both lots is an
/// [`BudgetError::Overdraw`]; negative quantities or costs are rejected, as
/// are lots whose combined value is out of `Decimal` range.
pub fn valuate(
    opening: &InventoryLot,
    incoming: &InventoryLot,
    consumed_quantity: Units,
    policy: CostingPolicy,
) -> BudgetResult<ValuationResult> {
    validate_lot("opening", opening)?;
    validate_lot("incoming", incoming)?;
    validate_non_negative("consumed_quantity", consumed_quantity)?;
    let total_value = total_lot_value(opening, incoming)?;

    let available = opening
        .quantity
        .checked_add(incoming.quantity)
        .ok_or_else(|| BudgetError::InvalidInput {
            field: "total_quantity".into(),
            reason: "opening plus incoming quantity exceeds the representable range".into(),
        })?;
    if consumed_quantity > available {
        return Err(BudgetError::Overdraw {
            context: format!("{} inventory valuation", policy.label()),
            requested: consumed_quantity,
            available,
        });
    }

    let result = match policy.consumption_order() {
        Some(order) => valuate_layered(opening, incoming, consumed_quantity, policy, order),
        None => valuate_weighted_average(opening, incoming, total_value, consumed_quantity),
    };

    debug!(
        policy = %policy,
        consumed_quantity = %result.consumed_quantity,
        consumed_cost = %result.consumed_cost,
        ending_quantity = %result.ending_quantity,
        ending_value = %result.ending_value,
        "valuated inventory movement"
    );

    Ok(result)
}

fn validate_lot(name: &str, lot: &InventoryLot) -> BudgetResult<()> {
    validate_non_negative(&format!("{name}.quantity"), lot.quantity)?;
    validate_non_negative(&format!("{name}.unit_cost"), lot.unit_cost)
}

fn total_lot_value(opening: &InventoryLot, incoming: &InventoryLot) -> BudgetResult<Money> {
    let out_of_range = |field: &str| BudgetError::InvalidInput {
        field: field.into(),
        reason: "quantity * unit_cost exceeds the representable range".into(),
    };
    let opening_value = opening
        .checked_value()
        .ok_or_else(|| out_of_range("opening.value"))?;
    let incoming_value = incoming
        .checked_value()
        .ok_or_else(|| out_of_range("incoming.value"))?;
    opening_value
        .checked_add(incoming_value)
        .ok_or_else(|| out_of_range("total_value"))
}

fn valuate_layered(
    opening: &InventoryLot,
    incoming: &InventoryLot,
    consumed_quantity: Units,
    policy: CostingPolicy,
    order: [LotSource; 2],
) -> ValuationResult {
    let mut remaining = consumed_quantity;
    let mut consumed_draws = Vec::with_capacity(2);
    let mut ending_layers = Vec::with_capacity(2);

    for source in order {
        let lot = match source {
            LotSource::Opening => opening,
            LotSource::Incoming => incoming,
        };
        let taken = remaining.min(lot.quantity);
        remaining -= taken;

        if !taken.is_zero() {
            consumed_draws.push(LotDraw::new(source, taken, lot.unit_cost));
        }
        let left = lot.quantity - taken;
        if !left.is_zero() {
            ending_layers.push(LotDraw::new(source, left, lot.unit_cost));
        }
    }

    ValuationResult {
        policy,
        consumed_quantity,
        consumed_cost: consumed_draws.iter().map(|d| d.cost).sum(),
        ending_quantity: ending_layers.iter().map(|d| d.quantity).sum(),
        ending_value: ending_layers.iter().map(|d| d.cost).sum(),
        average_unit_cost: None,
        consumed_draws,
        ending_layers,
    }
}

fn valuate_weighted_average(
    opening: &InventoryLot,
    incoming: &InventoryLot,
    total_value: Money,
    consumed_quantity: Units,
) -> ValuationResult {
    let total_quantity = opening.quantity + incoming.quantity;

    if total_quantity.is_zero() {
        // Nothing on hand and nothing consumed (overdraw is checked earlier).
        return ValuationResult {
            policy: CostingPolicy::WeightedAverage,
            consumed_quantity,
            consumed_cost: Decimal::ZERO,
            ending_quantity: Decimal::ZERO,
            ending_value: Decimal::ZERO,
            average_unit_cost: None,
            consumed_draws: Vec::new(),
            ending_layers: Vec::new(),
        };
    }

    let average_unit_cost = total_value / total_quantity;
    // Ending value is the residual so that value is conserved exactly even
    // when the blended rate is not representable.
    let consumed_cost = if consumed_quantity == total_quantity {
        total_value
    } else {
        match total_value.checked_mul(consumed_quantity) {
            Some(product) => product / total_quantity,
            // share of stock consumed is below one, so this stays in range
            None => total_value * (consumed_quantity / total_quantity),
        }
    };

    ValuationResult {
        policy: CostingPolicy::WeightedAverage,
        consumed_quantity,
        consumed_cost,
        ending_quantity: total_quantity - consumed_quantity,
        ending_value: total_value - consumed_cost,
        average_unit_cost: Some(average_unit_cost),
        consumed_draws: Vec::new(),
        ending_layers: Vec::new(),
    }
}

// ---------------------------------------------------------------------------
// Standalone valuation
// ---------------------------------------------------------------------------

/// Value a single two-lot movement and wrap it in the standard envelope.
pub fn value_inventory(
    input: &ValuationInput,
) -> BudgetResult<ComputationOutput<ValuationResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let context = input.label.as_deref().unwrap_or("inventory");
    let result = valuate(
        &input.opening,
        &input.incoming,
        input.consumed_quantity,
        input.policy,
    )
    .map_err(|e| e.in_context(context))?;

    if result.ending_quantity.is_zero() && !result.consumed_quantity.is_zero() {
        warnings.push(format!("{context}: stock fully depleted, no ending inventory"));
    }

    let elapsed = start.elapsed().as_micros() as u64;

    Ok(with_metadata(
        &format!("Two-layer inventory valuation ({})", input.policy.label()),
        &serde_json::json!({
            "label": context,
            "opening_quantity": input.opening.quantity.to_string(),
            "opening_unit_cost": input.opening.unit_cost.to_string(),
            "incoming_quantity": input.incoming.quantity.to_string(),
            "incoming_unit_cost": input.incoming.unit_cost.to_string(),
            "consumed_quantity": input.consumed_quantity.to_string(),
        }),
        warnings,
        elapsed,
        result,
    ))
}
