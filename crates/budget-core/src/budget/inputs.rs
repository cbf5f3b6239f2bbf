use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::inventory::CostingPolicy;
use crate::types::{ExpenseLine, Money, Units};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Standards, stock levels and prices for one raw material.
///
/// Every field except `name` is optional so that partial updates can be
/// merged into an existing set of inputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialInputs {
    /// Material name, e.g. "Material A". Updates are matched on this.
    pub name: String,
    /// Standard quantity of material per finished unit
    pub usage_per_unit: Option<Units>,
    /// Material on hand at the start of the period
    pub opening_quantity: Option<Units>,
    /// Unit cost of the opening stock
    pub opening_unit_cost: Option<Money>,
    /// Material to keep on hand at the end of the period
    pub desired_ending_quantity: Option<Units>,
    /// Current purchase price per unit
    pub purchase_unit_price: Option<Money>,
}

/// Raw inputs of a master budget. Fields left as `None` are reported as
/// missing by the stage that needs them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetInputs {
    /// Costing method applied to both the material and finished-goods passes
    pub policy: Option<CostingPolicy>,
    /// Units forecast to be sold
    pub sales_units: Option<Units>,
    /// Selling price per unit
    pub unit_price: Option<Money>,
    /// Finished goods on hand at the start of the period
    pub opening_finished_goods: Option<Units>,
    /// Unit cost of the opening finished goods
    pub opening_finished_goods_unit_cost: Option<Money>,
    /// Finished goods to keep on hand at the end of the period
    pub desired_ending_finished_goods: Option<Units>,
    /// At most two raw materials
    pub materials: Vec<MaterialInputs>,
    /// Direct labor hours per finished unit
    pub labor_hours_per_unit: Option<Units>,
    /// Direct labor cost per hour
    pub labor_rate_per_hour: Option<Money>,
    /// Manufacturing overhead line items
    pub overhead: Option<Vec<ExpenseLine>>,
    /// Selling and administrative expense line items
    pub operating_expenses: Option<Vec<ExpenseLine>>,
    /// Heading used by the plain-text summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Merging
// ---------------------------------------------------------------------------

fn merge_field<T>(slot: &mut Option<T>, update: Option<T>) {
    if update.is_some() {
        *slot = update;
    }
}

impl MaterialInputs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Overwrite every field the update provides.
    pub fn merge(&mut self, update: MaterialInputs) {
        merge_field(&mut self.usage_per_unit, update.usage_per_unit);
        merge_field(&mut self.opening_quantity, update.opening_quantity);
        merge_field(&mut self.opening_unit_cost, update.opening_unit_cost);
        merge_field(
            &mut self.desired_ending_quantity,
            update.desired_ending_quantity,
        );
        merge_field(&mut self.purchase_unit_price, update.purchase_unit_price);
    }
}

impl BudgetInputs {
    /// Overwrite every field the update provides. Materials are matched by
    /// name; unknown names are appended. Expense schedules are replaced as a
    /// whole.
    pub fn merge(&mut self, update: BudgetInputs) {
        merge_field(&mut self.policy, update.policy);
        merge_field(&mut self.sales_units, update.sales_units);
        merge_field(&mut self.unit_price, update.unit_price);
        merge_field(&mut self.opening_finished_goods, update.opening_finished_goods);
        merge_field(
            &mut self.opening_finished_goods_unit_cost,
            update.opening_finished_goods_unit_cost,
        );
        merge_field(
            &mut self.desired_ending_finished_goods,
            update.desired_ending_finished_goods,
        );
        merge_field(&mut self.labor_hours_per_unit, update.labor_hours_per_unit);
        merge_field(&mut self.labor_rate_per_hour, update.labor_rate_per_hour);
        merge_field(&mut self.overhead, update.overhead);
        merge_field(&mut self.operating_expenses, update.operating_expenses);
        merge_field(&mut self.company_name, update.company_name);

        for material in update.materials {
            match self.materials.iter_mut().find(|m| m.name == material.name) {
                Some(existing) => existing.merge(material),
                None => self.materials.push(material),
            }
        }
    }

    pub fn with_policy(mut self, policy: CostingPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Reference data set: two materials, one finished product, LIFO.
    pub fn reference() -> Self {
        Self {
            policy: Some(CostingPolicy::Lifo),
            sales_units: Some(dec!(63_000)),
            unit_price: Some(dec!(420)),
            opening_finished_goods: Some(dec!(5_000)),
            opening_finished_goods_unit_cost: Some(dec!(250)),
            desired_ending_finished_goods: Some(dec!(6_000)),
            materials: vec![
                MaterialInputs {
                    name: "Material A".into(),
                    usage_per_unit: Some(dec!(7)),
                    opening_quantity: Some(dec!(40_000)),
                    opening_unit_cost: Some(dec!(5)),
                    desired_ending_quantity: Some(dec!(35_000)),
                    purchase_unit_price: Some(dec!(6)),
                },
                MaterialInputs {
                    name: "Material B".into(),
                    usage_per_unit: Some(dec!(3)),
                    opening_quantity: Some(dec!(15_000)),
                    opening_unit_cost: Some(dec!(11)),
                    desired_ending_quantity: Some(dec!(12_000)),
                    purchase_unit_price: Some(dec!(12)),
                },
            ],
            labor_hours_per_unit: Some(dec!(13)),
            labor_rate_per_hour: Some(dec!(9)),
            overhead: Some(vec![
                ExpenseLine::new("Indirect material", dec!(1_320_000)),
                ExpenseLine::new("Indirect labor", dec!(2_130_000)),
                ExpenseLine::new("Plant rent", dec!(360_000)),
                ExpenseLine::new("Energy", dec!(464_000)),
                ExpenseLine::new("Maintenance", dec!(674_000)),
                ExpenseLine::new("Miscellaneous", dec!(500_000)),
            ]),
            operating_expenses: Some(vec![
                ExpenseLine::new("Sales commissions", dec!(2_750_000)),
                ExpenseLine::new("Administrative salaries", dec!(1_820_000)),
                ExpenseLine::new("Advertising", dec!(670_000)),
                ExpenseLine::new("Services", dec!(580_000)),
                ExpenseLine::new("Miscellaneous", dec!(1_200_000)),
            ]),
            company_name: Some("XZ Manufacturing".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_merge_overwrites_only_provided_fields() {
        let mut inputs = BudgetInputs::reference();
        inputs.merge(BudgetInputs {
            sales_units: Some(dec!(70_000)),
            ..BudgetInputs::default()
        });
        assert_eq!(inputs.sales_units, Some(dec!(70_000)));
        assert_eq!(inputs.unit_price, Some(dec!(420)));
        assert_eq!(inputs.materials.len(), 2);
    }

    #[test]
    fn test_merge_material_by_name() {
        let mut inputs = BudgetInputs::reference();
        inputs.merge(BudgetInputs {
            materials: vec![MaterialInputs {
                purchase_unit_price: Some(dec!(6.5)),
                ..MaterialInputs::named("Material A")
            }],
            ..BudgetInputs::default()
        });
        let a = &inputs.materials[0];
        assert_eq!(a.purchase_unit_price, Some(dec!(6.5)));
        assert_eq!(a.usage_per_unit, Some(dec!(7)));
        assert_eq!(inputs.materials.len(), 2);
    }

    #[test]
    fn test_merge_appends_unknown_material() {
        let mut inputs = BudgetInputs::default();
        inputs.merge(BudgetInputs {
            materials: vec![MaterialInputs::named("Resin")],
            ..BudgetInputs::default()
        });
        assert_eq!(inputs.materials, vec![MaterialInputs::named("Resin")]);
    }

    #[test]
    fn test_merge_replaces_expense_schedule() {
        let mut inputs = BudgetInputs::reference();
        let lines = vec![ExpenseLine::new("Rent", dec!(1))];
        inputs.merge(BudgetInputs {
            overhead: Some(lines.clone()),
            ..BudgetInputs::default()
        });
        assert_eq!(inputs.overhead, Some(lines));
    }

    #[test]
    fn test_deserialize_partial_json() {
        let inputs: BudgetInputs =
            serde_json::from_str(r#"{"policy": "fifo", "sales_units": 100}"#).unwrap();
        assert_eq!(inputs.policy, Some(CostingPolicy::Fifo));
        assert_eq!(inputs.sales_units, Some(dec!(100)));
        assert!(inputs.materials.is_empty());
        assert_eq!(inputs.overhead, None);
    }
}
