use serde_json::Value;

/// Result of reading a model reply as a list of page indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// The reply was a JSON array; elements that are not whole numbers were dropped.
    Indices(Vec<usize>),
    /// The reply was not a JSON array at all.
    Malformed(String),
}

/// Decode `body` as a JSON array of page indices.
///
/// A surrounding markdown code fence is tolerated. Elements that are not
/// non-negative whole numbers are skipped; the rest keep their order.
pub fn decode_indices(body: &str) -> Decoded {
    let value: Value = match serde_json::from_str(strip_fence(body)) {
        Ok(value) => value,
        Err(err) => return Decoded::Malformed(format!("not JSON: {err}")),
    };

    match value {
        Value::Array(items) => Decoded::Indices(
            items
                .iter()
                .filter_map(as_index)
                .collect(),
        ),
        other => Decoded::Malformed(format!("expected an array, got {}", kind(&other))),
    }
}

/// A non-negative whole number, whether written `2` or `2.0`.
fn as_index(value: &Value) -> Option<usize> {
    let n = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })?;
    usize::try_from(n).ok()
}

fn strip_fence(body: &str) -> &str {
    let trimmed = body.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
