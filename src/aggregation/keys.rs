//! Deterministic identity keys for scopes and series
//!
//! Attribute sets are treated as maps: keys are sorted before rendering so
//! that two semantically identical sets produce the same string regardless
//! of wire order.

use opentelemetry_proto::tonic::common::v1::any_value::Value;
use opentelemetry_proto::tonic::common::v1::{AnyValue, InstrumentationScope, KeyValue};
use std::collections::BTreeMap;

/// Key identifying an output scope: `name|version|k1=v1,k2=v2`
pub fn scope_key(scope: &InstrumentationScope) -> String {
    format!(
        "{}|{}|{}",
        scope.name,
        scope.version,
        render_attributes(&scope.attributes)
    )
}

/// Key identifying a series inside a scope: `name@k1=v1,k2=v2`
pub fn series_key(metric_name: &str, attributes: &[KeyValue]) -> String {
    format!("{}@{}", metric_name, render_attributes(attributes))
}

fn render_attributes(attributes: &[KeyValue]) -> String {
    // Later duplicates overwrite earlier ones, matching OTLP map semantics
    let sorted: BTreeMap<&str, String> = attributes
        .iter()
        .map(|kv| {
            let value = kv
                .value
                .as_ref()
                .map(any_value_to_string)
                .unwrap_or_default();
            (kv.key.as_str(), value)
        })
        .collect();

    let mut out = String::new();
    for (i, (key, value)) in sorted.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Canonical string form of an attribute value
///
/// Scalars render as their plain text, bytes as lowercase hex, arrays and
/// key-value lists as JSON. Never fails; unrepresentable values render empty.
pub fn any_value_to_string(value: &AnyValue) -> String {
    match value.value.as_ref() {
        Some(Value::StringValue(s)) => s.clone(),
        Some(other) => match any_value_to_json(other) {
            serde_json::Value::String(s) => s,
            json => json.to_string(),
        },
        None => String::new(),
    }
}

fn any_value_to_json(value: &Value) -> serde_json::Value {
    #[allow(unreachable_patterns)]
    match value {
        Value::StringValue(s) => serde_json::Value::String(s.clone()),
        Value::BoolValue(b) => serde_json::Value::Bool(*b),
        Value::IntValue(i) => serde_json::Value::from(*i),
        // Non-finite doubles have no JSON number form
        Value::DoubleValue(d) => serde_json::Number::from_f64(*d)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(d.to_string())),
        Value::BytesValue(bytes) => serde_json::Value::String(hex::encode(bytes)),
        Value::ArrayValue(array) => serde_json::Value::Array(
            array
                .values
                .iter()
                .map(|v| {
                    v.value
                        .as_ref()
                        .map(any_value_to_json)
                        .unwrap_or(serde_json::Value::Null)
                })
                .collect(),
        ),
        Value::KvlistValue(list) => serde_json::Value::Object(
            list.values
                .iter()
                .map(|kv| {
                    let v = kv
                        .value
                        .as_ref()
                        .and_then(|v| v.value.as_ref())
                        .map(any_value_to_json)
                        .unwrap_or(serde_json::Value::Null);
                    (kv.key.clone(), v)
                })
                .collect(),
        ),
        _ => serde_json::Value::Null,
    }
}
