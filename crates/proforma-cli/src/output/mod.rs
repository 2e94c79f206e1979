pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Fields holding the row-per-period or row-per-scenario part of a result.
pub(crate) const TABULAR_KEYS: [&str; 4] = ["rows", "years", "schedule", "comparisons"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// First array-of-objects field of a result, if any.
pub(crate) fn tabular_rows(result: &serde_json::Map<String, Value>) -> Option<(&str, &[Value])> {
    TABULAR_KEYS.iter().find_map(|key| match result.get(*key) {
        Some(Value::Array(rows)) if rows.first().is_some_and(Value::is_object) => {
            Some((*key, rows.as_slice()))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tabular_rows_picks_projection_years() {
        let result = json!({
            "sale_price": "400000",
            "years": [{ "year": 1, "noi": "25000" }, { "year": 2, "noi": "25750" }]
        });
        let (key, rows) = tabular_rows(result.as_object().unwrap()).unwrap();
        assert_eq!(key, "years");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_tabular_rows_ignores_string_lists() {
        let result = json!({ "recommendations": ["Reduce leverage"], "rows": [] });
        assert!(tabular_rows(result.as_object().unwrap()).is_none());
    }
}
