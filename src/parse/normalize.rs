//! Cleanup of the model's structured output before deserialization.

use serde_json::{Map, Value};

const TYPE_KEY: &str = "type";
const ITEMS_KEY: &str = "serviceAndItems";

/// Normalize a raw structured payload into a predictable shape.
///
/// Anything that is not a JSON object collapses to an empty map. The
/// `type` field is trimmed, folded to uppercase and constrained to
/// `CLIENT` or `COMPANY` with null for everything else, and
/// `serviceAndItems` always ends up a list.
pub fn normalize_invoice_payload(raw: Value) -> Map<String, Value> {
    let Value::Object(mut payload) = raw else {
        return Map::new();
    };

    let client_type = match payload.get(TYPE_KEY) {
        Some(Value::String(kind)) => {
            let folded = kind.trim().to_uppercase();
            match folded.as_str() {
                "CLIENT" | "COMPANY" => Value::String(folded),
                _ => Value::Null,
            }
        }
        _ => Value::Null,
    };
    payload.insert(TYPE_KEY.to_string(), client_type);

    if !matches!(payload.get(ITEMS_KEY), Some(Value::Array(_))) {
        payload.insert(ITEMS_KEY.to_string(), Value::Array(Vec::new()));
    }

    payload
}
