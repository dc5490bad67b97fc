//! Identifier case conversion.
//!
//! Database columns are snake_case, JSON payload keys are camelCase.
//! These helpers convert between the two in both directions: rows on the
//! way out (`camelize_value`) and `sortBy` query parameters on the way in
//! (`camel_to_snake`).

use serde_json::Value;

/// Convert a snake_case identifier to camelCase.
///
/// Leading and trailing underscores are preserved so sentinel names like
/// `_method` survive a round trip.
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for (i, ch) in name.chars().enumerate() {
        if ch == '_' {
            // Keep edge underscores, fold interior ones into a case change
            if i == 0 || name[i + ch.len_utf8()..].is_empty() {
                out.push(ch);
            } else {
                upper_next = true;
            }
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }

    out
}

/// Convert a camelCase identifier to snake_case.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);

    for ch in name.chars() {
        if ch.is_uppercase() {
            out.push('_');
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }

    out
}

/// Recursively rename the keys of every JSON object from snake_case to
/// camelCase. Arrays are traversed, scalar values pass through untouched.
pub fn camelize_value(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (snake_to_camel(&key), camelize_value(value)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(camelize_value).collect()),
        other => other,
    }
}
