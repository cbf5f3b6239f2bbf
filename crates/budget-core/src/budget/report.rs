use rust_decimal::{Decimal, RoundingStrategy};

use crate::budget::pipeline::BudgetSnapshot;
use crate::types::{Money, Percent};

const LABEL_WIDTH: usize = 33;
const AMOUNT_WIDTH: usize = 20;

/// Render the budgeted income statement and margins as plain text.
///
/// Output depends only on the snapshot, so equal snapshots render to
/// identical text.
pub fn export_summary(snapshot: &BudgetSnapshot) -> String {
    let is = &snapshot.income_statement;
    let rule = "=".repeat(60);
    let subtotal = format!("{:LABEL_WIDTH$}{}", "", "-".repeat(30));

    let mut lines = vec!["BUDGETED INCOME STATEMENT".to_string()];
    if let Some(company) = &snapshot.company_name {
        lines.push(company.to_uppercase());
    }
    lines.push(rule.clone());
    lines.push(format!("Inventory costing: {}", snapshot.policy.label()));
    lines.push(String::new());
    lines.push(amount_line("SALES", is.revenue));
    lines.push(amount_line("(-) COST OF GOODS SOLD", is.cost_of_goods_sold));
    lines.push(subtotal.clone());
    lines.push(amount_line("(=) GROSS PROFIT", is.gross_profit));
    lines.push(String::new());
    lines.push("(-) OPERATING EXPENSES:".to_string());
    lines.extend(
        is.operating_expenses
            .iter()
            .map(|line| amount_line(&format!("    {}", line.name), line.amount)),
    );
    lines.push(subtotal);
    lines.push(amount_line(
        "    Total operating expenses",
        is.total_operating_expenses,
    ));
    lines.push(String::new());
    lines.push(amount_line("(=) OPERATING PROFIT", is.operating_profit));
    lines.push(String::new());
    lines.push(rule);
    lines.push("INDICATORS:".to_string());
    lines.push(format!("Gross margin:       {}", format_percent(is.gross_margin_pct)));
    lines.push(format!("Operating margin:   {}", format_percent(is.operating_margin_pct)));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn amount_line(label: &str, amount: Money) -> String {
    format!(
        "{:<LABEL_WIDTH$}${:>AMOUNT_WIDTH$}",
        truncate(label, LABEL_WIDTH - 1),
        format_money(amount)
    )
}

fn truncate(label: &str, max: usize) -> &str {
    match label.char_indices().nth(max) {
        Some((idx, _)) => &label[..idx],
        None => label,
    }
}

/// Two decimals, thousands separators, leading minus for negatives.
pub fn format_money(value: Money) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded < Decimal::ZERO;
    let digits = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{grouped}.{frac_part}")
    } else {
        format!("{grouped}.{frac_part}")
    }
}

/// Right-aligned percentage with two decimals, or "n/a" when undefined.
pub fn format_percent(value: Option<Percent>) -> String {
    match value {
        Some(pct) => {
            let rounded = pct.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{:>6}%", format!("{rounded:.2}"))
        }
        None => format!("{:>7}", "n/a"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::inputs::BudgetInputs;
    use crate::budget::pipeline::BudgetPipeline;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money_groups_thousands() {
        assert_eq!(format_money(dec!(26_460_000)), "26,460,000.00");
        assert_eq!(format_money(dec!(999)), "999.00");
        assert_eq!(format_money(dec!(1_000)), "1,000.00");
        assert_eq!(format_money(dec!(0)), "0.00");
    }

    #[test]
    fn test_format_money_rounds_and_signs() {
        assert_eq!(format_money(dec!(17_447_406.255)), "17,447,406.26");
        assert_eq!(format_money(dec!(-1_234.5)), "-1,234.50");
        assert_eq!(format_money(dec!(-0.001)), "0.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(Some(dec!(6.8027))), "  6.80%");
        assert_eq!(format_percent(Some(dec!(33.3333))), " 33.33%");
        assert_eq!(format_percent(None), "    n/a");
    }

    #[test]
    fn test_summary_reference_budget() {
        let snap = BudgetPipeline::new(BudgetInputs::reference())
            .recompute()
            .unwrap();
        let text = export_summary(&snap);
        assert!(text.contains("XZ MANUFACTURING"));
        assert!(text.contains("Inventory costing: LIFO"));
        assert!(text.contains("26,460,000.00"));
        assert!(text.contains("17,640,000.00"));
        assert!(text.contains("7,020,000.00"));
        assert!(text.contains("1,800,000.00"));
        assert!(text.contains("Gross margin:        33.33%"));
        assert!(text.contains("Operating margin:     6.80%"));
    }

    #[test]
    fn test_summary_is_deterministic() {
        let snap = BudgetPipeline::new(BudgetInputs::reference())
            .recompute()
            .unwrap();
        assert_eq!(export_summary(&snap), export_summary(&snap.clone()));
    }

    #[test]
    fn test_summary_line_layout() {
        let mut snap = BudgetPipeline::new(BudgetInputs::reference())
            .recompute()
            .unwrap();
        snap.company_name = None;
        let text = export_summary(&snap);
        assert!(text.ends_with('\n'));

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "BUDGETED INCOME STATEMENT");
        assert_eq!(lines[1], "=".repeat(60));
        assert_eq!(lines[2], "Inventory costing: LIFO");
        assert_eq!(lines[4], format!("{:<33}${:>20}", "SALES", "26,460,000.00"));
        // five expense lines between the heading and its subtotal rule
        let heading = lines
            .iter()
            .position(|l| *l == "(-) OPERATING EXPENSES:")
            .unwrap();
        assert_eq!(
            lines[heading + 1],
            format!("{:<33}${:>20}", "    Sales commissions", "2,750,000.00")
        );
        assert!(lines[heading + 6].trim().chars().all(|c| c == '-'));
        assert_eq!(lines.last(), Some(&"Operating margin:     6.80%"));
    }
}
