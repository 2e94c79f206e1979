use serde_json::Value;

/// Print just the key answer value from the output.
///
/// Looks for the headline figure of each command in priority order, then
/// falls back to the first field in the result object.
pub fn print_minimal(value: &Value) {
    let result_obj = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let priority_keys = [
        "overall_risk_score",
        "monthly_savings",
        "cash_on_cash",
        "levered_irr",
        "break_even_occupancy",
        "total_tax_on_sale",
        "categories_above",
        "annual_noi",
        "monthly_income",
        "monthly_payment",
        "reason",
    ];

    if let Value::Object(map) = result_obj {
        // one-shot analysis and amortization nest their headline figures
        let nested = ["metrics", "debt_service"]
            .iter()
            .filter_map(|k| map.get(*k).and_then(Value::as_object));
        for scope in std::iter::once(map).chain(nested) {
            for key in &priority_keys {
                if let Some(val) = scope.get(*key) {
                    if !val.is_null() {
                        println!("{}", format_minimal(val));
                        return;
                    }
                }
            }
        }

        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, format_minimal(val));
            return;
        }
    }

    println!("{}", format_minimal(result_obj));
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
