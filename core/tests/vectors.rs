//! Wire-format checks driven by JSON vectors stored in `test-vectors/`.
//!
//! The multipart boundary is random per builder, so expected bodies carry a
//! `{boundary}` placeholder that is substituted after construction. Query
//! vectors compare the final string byte for byte.

use std::collections::BTreeMap;

use session_core::multipart::{Builder, Item};
use session_core::Scalar;

fn scalar_from_json(value: &serde_json::Value) -> Scalar {
    match value {
        serde_json::Value::String(s) => Scalar::from(s.as_str()),
        serde_json::Value::Bool(b) => Scalar::from(*b),
        serde_json::Value::Number(n) if n.is_i64() => Scalar::from(n.as_i64().unwrap()),
        serde_json::Value::Number(n) => Scalar::from(n.as_f64().unwrap()),
        other => panic!("unsupported scalar in vector: {other}"),
    }
}

fn item_from_json(value: &serde_json::Value) -> Item {
    let key = value["key"].as_str().unwrap();
    let bytes = value["value"].as_str().unwrap().as_bytes().to_vec();
    Item {
        name: key.to_string(),
        value: bytes,
        mime_type: value
            .get("mime_type")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        file_name: value
            .get("file_name")
            .and_then(|v| v.as_str())
            .map(str::to_string),
    }
}

// ---------------------------------------------------------------------------
// Multipart framing
// ---------------------------------------------------------------------------

#[test]
fn multipart_vectors() {
    let raw = include_str!("../../test-vectors/multipart.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let items: Vec<Item> = case["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(item_from_json)
            .collect();

        let builder = Builder::from_items(items);
        let expected = case["expected"]
            .as_str()
            .unwrap()
            .replace("{boundary}", builder.boundary());
        let built = String::from_utf8(builder.build()).unwrap();
        assert_eq!(built, expected, "{name}: framed bytes");
    }
}

// ---------------------------------------------------------------------------
// Query strings
// ---------------------------------------------------------------------------

#[test]
fn query_vectors() {
    let raw = include_str!("../../test-vectors/query.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let query: BTreeMap<String, Scalar> = case["query"]
            .as_object()
            .unwrap()
            .iter()
            .map(|(key, value)| (key.clone(), scalar_from_json(value)))
            .collect();
        let expected = case["expected"].as_str().unwrap();

        assert_eq!(
            session_core::encode::query_string(&query),
            expected,
            "{name}: query string"
        );
    }
}
