use serde_json::Value;

use super::{flatten, format_value, result_of};

/// Key figure of each command, most specific first.
const PRIORITY_KEYS: [&str; 5] = [
    "highest_operating_profit",
    "income_statement.operating_profit",
    "consumed_cost",
    "cost_of_goods_sold",
    "operating_profit",
];

/// Print just the key answer value from the output, falling back to the
/// first field of the result.
pub fn print_minimal(value: &Value) {
    let rows = flatten(result_of(value));

    for key in PRIORITY_KEYS {
        if let Some((_, val)) = rows.iter().find(|(k, v)| k == key && !v.is_null()) {
            println!("{}", format_value(val));
            return;
        }
    }

    match rows.first() {
        Some((key, val)) if !key.is_empty() => println!("{}: {}", key, format_value(val)),
        Some((_, val)) => println!("{}", format_value(val)),
        None => println!("{}", format_value(value)),
    }
}
