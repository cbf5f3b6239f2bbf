pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` of a computation envelope, or the value itself.
pub fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// Flatten nested objects and arrays into dotted keys, e.g.
/// `income_statement.operating_profit` or `materials.0.name`.
/// Arrays of scalars are kept as a single joined entry.
pub fn flatten(value: &Value) -> Vec<(String, Value)> {
    let mut rows = Vec::new();
    match value {
        Value::Object(map) => flatten_object("", map, &mut rows),
        other => rows.push((String::new(), other.clone())),
    }
    rows
}

fn flatten_object(prefix: &str, map: &Map<String, Value>, rows: &mut Vec<(String, Value)>) {
    for (key, val) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        flatten_into(path, val, rows);
    }
}

fn flatten_into(path: String, value: &Value, rows: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) => flatten_object(&path, map, rows),
        Value::Array(items) if items.iter().any(|v| v.is_object() || v.is_array()) => {
            for (i, item) in items.iter().enumerate() {
                flatten_into(format!("{path}.{i}"), item, rows);
            }
        }
        other => rows.push((path, other.clone())),
    }
}

/// Render a scalar for table and CSV cells.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_nested_paths() {
        let v = json!({
            "income_statement": { "operating_profit": "1800000" },
            "materials": [{ "name": "Material A" }],
            "warnings": ["a", "b"]
        });
        let rows = flatten(&v);
        assert!(rows.contains(&(
            "income_statement.operating_profit".to_string(),
            json!("1800000")
        )));
        assert!(rows.contains(&("materials.0.name".to_string(), json!("Material A"))));
        assert!(rows.contains(&("warnings".to_string(), json!(["a", "b"]))));
    }

    #[test]
    fn test_result_of_envelope() {
        let v = json!({ "result": { "x": 1 }, "methodology": "m" });
        assert_eq!(result_of(&v), &json!({ "x": 1 }));
        let bare = json!({ "x": 1 });
        assert_eq!(result_of(&bare), &bare);
    }
}
