use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::BudgetError;
use crate::inventory::{valuate, CostingPolicy, InventoryLot, ValuationResult};
use crate::types::{total_expenses, validate_non_negative, ExpenseLine, Money, Percent, Units};
use crate::BudgetResult;

// ---------------------------------------------------------------------------
// Stage outputs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesBudget {
    pub units: Units,
    pub unit_price: Money,
    /// units * unit_price
    pub revenue: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionBudget {
    pub sales_units: Units,
    pub desired_ending_units: Units,
    /// sales_units + desired_ending_units
    pub total_required: Units,
    pub opening_units: Units,
    /// total_required - opening_units. May be negative; never clamped.
    pub units_to_produce: Units,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRequirement {
    pub name: String,
    pub units_to_produce: Units,
    pub usage_per_unit: Units,
    /// units_to_produce * usage_per_unit
    pub required_quantity: Units,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialPurchases {
    pub name: String,
    pub required_quantity: Units,
    pub desired_ending_quantity: Units,
    /// required_quantity + desired_ending_quantity
    pub total_needed: Units,
    pub opening_quantity: Units,
    /// total_needed - opening_quantity
    pub purchase_quantity: Units,
    pub unit_price: Money,
    /// purchase_quantity * unit_price
    pub purchase_cost: Money,
}

/// Requirement, purchases and valuation of one material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialBudget {
    pub name: String,
    pub requirement: MaterialRequirement,
    pub purchases: MaterialPurchases,
    pub valuation: ValuationResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaborBudget {
    pub units_to_produce: Units,
    pub hours_per_unit: Units,
    pub total_hours: Units,
    pub rate_per_hour: Money,
    /// total_hours * rate_per_hour
    pub labor_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverheadBudget {
    pub lines: Vec<ExpenseLine>,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionCost {
    /// Sum of the consumed cost of every material
    pub materials_cost: Money,
    pub labor_cost: Money,
    pub overhead_total: Money,
    pub total_production_cost: Money,
    pub units_produced: Units,
    /// total_production_cost / units_produced
    pub unit_production_cost: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostOfGoodsSold {
    pub opening_units: Units,
    pub opening_unit_cost: Money,
    pub units_produced: Units,
    pub unit_production_cost: Money,
    pub units_available: Units,
    pub value_available: Money,
    pub units_sold: Units,
    pub cost_of_goods_sold: Money,
    pub ending_units: Units,
    pub ending_value: Money,
    pub valuation: ValuationResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub revenue: Money,
    pub cost_of_goods_sold: Money,
    /// revenue - cost_of_goods_sold
    pub gross_profit: Money,
    pub operating_expenses: Vec<ExpenseLine>,
    pub total_operating_expenses: Money,
    /// gross_profit - total_operating_expenses
    pub operating_profit: Money,
    /// gross_profit / revenue * 100; `None` when revenue is zero
    pub gross_margin_pct: Option<Percent>,
    /// operating_profit / revenue * 100; `None` when revenue is zero
    pub operating_margin_pct: Option<Percent>,
}

// ---------------------------------------------------------------------------
// Stage functions
// ---------------------------------------------------------------------------

pub fn sales_budget(units: Units, unit_price: Money) -> BudgetResult<SalesBudget> {
    validate_non_negative("sales_units", units)?;
    validate_non_negative("unit_price", unit_price)?;
    Ok(SalesBudget {
        units,
        unit_price,
        revenue: units * unit_price,
    })
}

pub fn production_budget(
    sales: &SalesBudget,
    desired_ending_units: Units,
    opening_units: Units,
) -> BudgetResult<ProductionBudget> {
    validate_non_negative("desired_ending_finished_goods", desired_ending_units)?;
    validate_non_negative("opening_finished_goods", opening_units)?;
    let total_required = sales.units + desired_ending_units;
    Ok(ProductionBudget {
        sales_units: sales.units,
        desired_ending_units,
        total_required,
        opening_units,
        units_to_produce: total_required - opening_units,
    })
}

pub fn material_requirement(
    name: &str,
    production: &ProductionBudget,
    usage_per_unit: Units,
) -> BudgetResult<MaterialRequirement> {
    validate_non_negative(&format!("{name}.usage_per_unit"), usage_per_unit)?;
    Ok(MaterialRequirement {
        name: name.to_string(),
        units_to_produce: production.units_to_produce,
        usage_per_unit,
        required_quantity: production.units_to_produce * usage_per_unit,
    })
}

pub fn material_purchases(
    requirement: &MaterialRequirement,
    desired_ending_quantity: Units,
    opening_quantity: Units,
    unit_price: Money,
) -> BudgetResult<MaterialPurchases> {
    let name = &requirement.name;
    validate_non_negative(&format!("{name}.desired_ending_quantity"), desired_ending_quantity)?;
    validate_non_negative(&format!("{name}.opening_quantity"), opening_quantity)?;
    validate_non_negative(&format!("{name}.purchase_unit_price"), unit_price)?;

    let total_needed = requirement.required_quantity + desired_ending_quantity;
    let purchase_quantity = total_needed - opening_quantity;
    Ok(MaterialPurchases {
        name: name.clone(),
        required_quantity: requirement.required_quantity,
        desired_ending_quantity,
        total_needed,
        opening_quantity,
        purchase_quantity,
        unit_price,
        purchase_cost: purchase_quantity * unit_price,
    })
}

/// Value the consumption of one material: opening stock against the
/// period's purchases, consuming the production requirement.
pub fn material_valuation(
    requirement: &MaterialRequirement,
    purchases: &MaterialPurchases,
    opening_unit_cost: Money,
    policy: CostingPolicy,
) -> BudgetResult<ValuationResult> {
    let name = &requirement.name;
    if requirement.required_quantity < Decimal::ZERO {
        return Err(BudgetError::InvalidInput {
            field: format!("{name}.required_quantity"),
            reason: format!(
                "Negative production plan ({} units) cannot be valued as material consumption",
                requirement.units_to_produce
            ),
        });
    }
    if purchases.purchase_quantity < Decimal::ZERO {
        let mut reason = format!(
            "Opening stock exceeds requirement plus desired ending stock by {}; purchases would be negative",
            -purchases.purchase_quantity
        );
        if requirement.units_to_produce.is_zero() {
            reason.push_str(
                " (production plan is zero units, so unit production cost is undefined as well)",
            );
        }
        return Err(BudgetError::InvalidInput {
            field: format!("{name}.purchase_quantity"),
            reason,
        });
    }

    let opening = InventoryLot::new(purchases.opening_quantity, opening_unit_cost);
    let incoming = InventoryLot::new(purchases.purchase_quantity, purchases.unit_price);
    valuate(&opening, &incoming, requirement.required_quantity, policy)
        .map_err(|e| e.in_context(name))
}

pub fn labor_budget(
    production: &ProductionBudget,
    hours_per_unit: Units,
    rate_per_hour: Money,
) -> BudgetResult<LaborBudget> {
    validate_non_negative("labor_hours_per_unit", hours_per_unit)?;
    validate_non_negative("labor_rate_per_hour", rate_per_hour)?;
    let total_hours = production.units_to_produce * hours_per_unit;
    Ok(LaborBudget {
        units_to_produce: production.units_to_produce,
        hours_per_unit,
        total_hours,
        rate_per_hour,
        labor_cost: total_hours * rate_per_hour,
    })
}

pub fn overhead_budget(lines: &[ExpenseLine]) -> BudgetResult<OverheadBudget> {
    let total = total_expenses("overhead", lines)?;
    Ok(OverheadBudget {
        lines: lines.to_vec(),
        total,
    })
}

pub fn production_cost(
    materials: &[MaterialBudget],
    labor: &LaborBudget,
    overhead: &OverheadBudget,
    production: &ProductionBudget,
) -> BudgetResult<ProductionCost> {
    let materials_cost: Money = materials.iter().map(|m| m.valuation.consumed_cost).sum();
    let total_production_cost = materials_cost + labor.labor_cost + overhead.total;

    if production.units_to_produce.is_zero() {
        return Err(BudgetError::DivisionByZero {
            context: "unit production cost (units to produce is zero)".into(),
        });
    }

    Ok(ProductionCost {
        materials_cost,
        labor_cost: labor.labor_cost,
        overhead_total: overhead.total,
        total_production_cost,
        units_produced: production.units_to_produce,
        unit_production_cost: total_production_cost / production.units_to_produce,
    })
}

/// Value the finished goods sold: opening finished goods against the
/// period's production, consuming the units sold.
pub fn cost_of_goods_sold(
    sales: &SalesBudget,
    production_cost: &ProductionCost,
    opening_units: Units,
    opening_unit_cost: Money,
    policy: CostingPolicy,
) -> BudgetResult<CostOfGoodsSold> {
    let opening = InventoryLot::new(opening_units, opening_unit_cost);
    let incoming = InventoryLot::new(
        production_cost.units_produced,
        production_cost.unit_production_cost,
    );
    let valuation =
        valuate(&opening, &incoming, sales.units, policy).map_err(|e| e.in_context("finished goods"))?;

    Ok(CostOfGoodsSold {
        opening_units,
        opening_unit_cost,
        units_produced: incoming.quantity,
        unit_production_cost: incoming.unit_cost,
        units_available: opening.quantity + incoming.quantity,
        value_available: opening.value() + incoming.value(),
        units_sold: sales.units,
        cost_of_goods_sold: valuation.consumed_cost,
        ending_units: valuation.ending_quantity,
        ending_value: valuation.ending_value,
        valuation,
    })
}

pub fn income_statement(
    sales: &SalesBudget,
    cogs: &CostOfGoodsSold,
    operating_expenses: &[ExpenseLine],
) -> BudgetResult<IncomeStatement> {
    let total_operating_expenses = total_expenses("operating_expenses", operating_expenses)?;
    let gross_profit = sales.revenue - cogs.cost_of_goods_sold;
    let operating_profit = gross_profit - total_operating_expenses;

    Ok(IncomeStatement {
        revenue: sales.revenue,
        cost_of_goods_sold: cogs.cost_of_goods_sold,
        gross_profit,
        operating_expenses: operating_expenses.to_vec(),
        total_operating_expenses,
        operating_profit,
        gross_margin_pct: margin_pct(gross_profit, sales.revenue),
        operating_margin_pct: margin_pct(operating_profit, sales.revenue),
    })
}

/// profit / revenue * 100, undefined for zero revenue.
fn margin_pct(profit: Money, revenue: Money) -> Option<Percent> {
    if revenue.is_zero() {
        None
    } else {
        Some(profit / revenue * dec!(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::LotSource;

    fn reference_sales() -> SalesBudget {
        sales_budget(dec!(63_000), dec!(420)).unwrap()
    }

    fn reference_production() -> ProductionBudget {
        production_budget(&reference_sales(), dec!(6_000), dec!(5_000)).unwrap()
    }

    fn material_a() -> (MaterialRequirement, MaterialPurchases) {
        let req = material_requirement("Material A", &reference_production(), dec!(7)).unwrap();
        let pur = material_purchases(&req, dec!(35_000), dec!(40_000), dec!(6)).unwrap();
        (req, pur)
    }

    #[test]
    fn test_sales_revenue() {
        assert_eq!(reference_sales().revenue, dec!(26_460_000));
    }

    #[test]
    fn test_production_units() {
        let p = reference_production();
        assert_eq!(p.total_required, dec!(69_000));
        assert_eq!(p.units_to_produce, dec!(64_000));
    }

    #[test]
    fn test_production_may_be_negative() {
        let sales = sales_budget(dec!(1_000), dec!(10)).unwrap();
        let p = production_budget(&sales, dec!(0), dec!(3_000)).unwrap();
        assert_eq!(p.units_to_produce, dec!(-2_000));
    }

    #[test]
    fn test_material_requirement_and_purchases() {
        let (req, pur) = material_a();
        assert_eq!(req.required_quantity, dec!(448_000));
        assert_eq!(pur.total_needed, dec!(483_000));
        assert_eq!(pur.purchase_quantity, dec!(443_000));
        assert_eq!(pur.purchase_cost, dec!(2_658_000));
    }

    #[test]
    fn test_material_valuation_fifo() {
        let (req, pur) = material_a();
        let v = material_valuation(&req, &pur, dec!(5), CostingPolicy::Fifo).unwrap();
        assert_eq!(v.consumed_cost, dec!(2_648_000));
        assert_eq!(v.ending_quantity, dec!(35_000));
        assert_eq!(v.ending_value, dec!(210_000));
        assert_eq!(v.ending_layers[0].source, LotSource::Incoming);
    }

    #[test]
    fn test_material_valuation_rejects_negative_purchases() {
        let req = material_requirement("Material A", &reference_production(), dec!(1)).unwrap();
        // 64,000 + 0 - 100,000
        let pur = material_purchases(&req, dec!(0), dec!(100_000), dec!(6)).unwrap();
        assert_eq!(pur.purchase_quantity, dec!(-36_000));
        let err = material_valuation(&req, &pur, dec!(5), CostingPolicy::Lifo).unwrap_err();
        assert!(
            matches!(err, BudgetError::InvalidInput { ref field, .. } if field == "Material A.purchase_quantity")
        );
    }

    #[test]
    fn test_labor_budget() {
        let l = labor_budget(&reference_production(), dec!(13), dec!(9)).unwrap();
        assert_eq!(l.total_hours, dec!(832_000));
        assert_eq!(l.labor_cost, dec!(7_488_000));
    }

    #[test]
    fn test_production_cost_zero_units_is_undefined() {
        let sales = sales_budget(dec!(100), dec!(10)).unwrap();
        let production = production_budget(&sales, dec!(0), dec!(100)).unwrap();
        let labor = labor_budget(&production, dec!(1), dec!(1)).unwrap();
        let overhead = overhead_budget(&[ExpenseLine::new("Rent", dec!(500))]).unwrap();
        let err = production_cost(&[], &labor, &overhead, &production).unwrap_err();
        assert!(matches!(err, BudgetError::DivisionByZero { .. }));
    }

    #[test]
    fn test_income_statement_zero_revenue_margins_undefined() {
        let sales = sales_budget(dec!(0), dec!(420)).unwrap();
        let production_cost = ProductionCost {
            materials_cost: dec!(0),
            labor_cost: dec!(0),
            overhead_total: dec!(100),
            total_production_cost: dec!(100),
            units_produced: dec!(10),
            unit_production_cost: dec!(10),
        };
        let cogs = cost_of_goods_sold(
            &sales,
            &production_cost,
            dec!(0),
            dec!(0),
            CostingPolicy::Fifo,
        )
        .unwrap();
        let is = income_statement(&sales, &cogs, &[ExpenseLine::new("Rent", dec!(50))]).unwrap();
        assert_eq!(is.gross_profit, dec!(0));
        assert_eq!(is.operating_profit, dec!(-50));
        assert_eq!(is.gross_margin_pct, None);
        assert_eq!(is.operating_margin_pct, None);
    }
}
