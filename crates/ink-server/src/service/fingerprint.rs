//! Deterministic search-request fingerprinting.
//!
//! Every cacheable search request reduces to a canonical JSON document
//! (recursively sorted object keys) whose SHA-256 digest is the cache
//! fingerprint. Query vectors enter the canonical form as a quantised
//! signature so float jitter below the quantisation step cannot split
//! otherwise-identical requests.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Quantisation buckets per unit interval for vector signatures.
const QUANT_SCALE: f32 = 127.0;

/// Returns the fingerprint of a canonicalised parameter document.
pub fn fingerprint(params: &Value) -> String {
    let canonical = canonical_json(params);
    hex::encode(Sha256::digest(canonical.as_bytes()))
}

/// Renders JSON with recursively sorted object keys.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::to_string(key).expect("string serializes"));
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        leaf => out.push_str(&leaf.to_string()),
    }
}

/// Quantises a query vector into a compact signature string.
///
/// Components are clamped to [-1, 1] and mapped to signed bytes; the
/// signature is stable across float noise smaller than one bucket.
pub fn vector_signature(values: &[f32]) -> String {
    let quantised: Vec<i8> = values
        .iter()
        .map(|&v| (v.clamp(-1.0, 1.0) * QUANT_SCALE).round() as i8)
        .collect();

    let bytes: Vec<u8> = quantised.iter().map(|&v| v as u8).collect();
    hex::encode(Sha256::digest(&bytes))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn key_order_does_not_change_fingerprint() {
        let a = json!({"limit": 5, "query": "cats", "weights": {"text": 0.6, "image": 0.4}});
        let b = json!({"weights": {"image": 0.4, "text": 0.6}, "query": "cats", "limit": 5});

        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn different_params_differ() {
        let a = json!({"query": "cats", "limit": 5});
        let b = json!({"query": "cats", "limit": 6});

        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn array_order_matters() {
        let a = json!({"tags": ["a", "b"]});
        let b = json!({"tags": ["b", "a"]});

        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn vector_signature_absorbs_jitter() {
        let base = vec![0.25f32, -0.5, 0.75];
        let jittered = vec![0.2500001f32, -0.5000002, 0.7499999];

        assert_eq!(vector_signature(&base), vector_signature(&jittered));
    }

    #[test]
    fn vector_signature_separates_vectors() {
        assert_ne!(
            vector_signature(&[0.25, -0.5, 0.75]),
            vector_signature(&[0.25, 0.5, 0.75])
        );
    }
}
