//! Firestore typed-value codec
//!
//! Firestore's REST API wraps every field in a single-key object naming its
//! type (`{"stringValue": "Rex"}`, `{"integerValue": "3"}`, ...). These
//! helpers translate between that form and plain JSON documents.

use serde_json::{json, Map, Number, Value as JsonValue};

use crate::domain::result::{Error, Result};
use crate::domain::Document;

/// Encode a plain JSON value as a Firestore `Value`
pub fn encode(value: &JsonValue) -> JsonValue {
    match value {
        JsonValue::Null => json!({ "nullValue": null }),
        JsonValue::Bool(b) => json!({ "booleanValue": b }),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64() }),
        },
        JsonValue::String(s) => json!({ "stringValue": s }),
        JsonValue::Array(items) => {
            let values: Vec<JsonValue> = items.iter().map(encode).collect();
            if values.is_empty() {
                json!({ "arrayValue": {} })
            } else {
                json!({ "arrayValue": { "values": values } })
            }
        }
        JsonValue::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// Encode document fields as a Firestore `fields` map
pub fn encode_fields(doc: &Document) -> JsonValue {
    let fields: Map<String, JsonValue> = doc
        .iter()
        .map(|(name, value)| (name.clone(), encode(value)))
        .collect();
    JsonValue::Object(fields)
}

/// Decode a Firestore `Value` into plain JSON
///
/// Timestamps and references decode to their string form, geo points to
/// `{latitude, longitude}`.
pub fn decode(value: &JsonValue) -> Result<JsonValue> {
    let Some((kind, inner)) = value.as_object().and_then(|m| m.iter().next()) else {
        return Err(malformed(value));
    };

    match kind.as_str() {
        "nullValue" => Ok(JsonValue::Null),
        "booleanValue" => inner.as_bool().map(JsonValue::Bool).ok_or_else(|| malformed(value)),
        "integerValue" => {
            let parsed = match inner {
                JsonValue::String(s) => s.parse::<i64>().ok(),
                JsonValue::Number(n) => n.as_i64(),
                _ => None,
            };
            parsed.map(JsonValue::from).ok_or_else(|| malformed(value))
        }
        "doubleValue" => match inner {
            JsonValue::Number(n) => Ok(JsonValue::Number(n.clone())),
            JsonValue::String(s) => Ok(s
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map_or(JsonValue::Null, JsonValue::Number)),
            _ => Err(malformed(value)),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner
            .as_str()
            .map(|s| JsonValue::String(s.to_string()))
            .ok_or_else(|| malformed(value)),
        "geoPointValue" => Ok(inner.clone()),
        "arrayValue" => {
            let items = match inner.get("values") {
                Some(JsonValue::Array(values)) => values.iter().map(decode).collect::<Result<Vec<_>>>()?,
                Some(_) => return Err(malformed(value)),
                None => Vec::new(),
            };
            Ok(JsonValue::Array(items))
        }
        "mapValue" => {
            let fields = match inner.get("fields") {
                Some(JsonValue::Object(fields)) => decode_fields(fields)?,
                Some(_) => return Err(malformed(value)),
                None => Document::new(),
            };
            Ok(JsonValue::Object(fields))
        }
        _ => Err(malformed(value)),
    }
}

/// Decode a Firestore `fields` map into document fields
pub fn decode_fields(fields: &Map<String, JsonValue>) -> Result<Document> {
    fields
        .iter()
        .map(|(name, value)| Ok((name.clone(), decode(value)?)))
        .collect()
}

fn malformed(value: &JsonValue) -> Error {
    Error::store(format!("malformed Firestore value: {}", value))
}
