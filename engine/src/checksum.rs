//! Deterministic checksums over records and record sets.
//!
//! All digests use 32-bit FNV-1a rendered as 8 lower-case hex digits. The
//! hash is not cryptographic; it only detects drift between two copies of
//! the dataset.

use crate::Record;
use serde_json::Value;

const FNV_OFFSET_BASIS: u32 = 2_166_136_261;
const FNV_PRIME: u32 = 16_777_619;

/// Separator between `id:contentChecksum` tuples in the dataset digest.
pub const TUPLE_SEPARATOR: &str = "|";

/// FNV-1a over raw bytes.
pub fn fnv1a(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

/// FNV-1a over a string, as 8 hex digits.
pub fn checksum_str(data: &str) -> String {
    format!("{:08x}", fnv1a(data.as_bytes()))
}

/// Serialize a JSON value with object keys sorted at every level.
///
/// The output does not depend on how the value was built, so two payloads
/// that compare equal always hash the same.
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
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
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
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Checksum of a single record payload.
pub fn content_checksum(payload: &Value) -> String {
    checksum_str(&canonical_json(payload))
}

/// Checksum over a whole record set.
///
/// Tuples of `id:contentChecksum` are sorted before hashing, so the result
/// is independent of the order in which records are enumerated.
pub fn dataset_checksum<'a, I>(records: I) -> String
where
    I: IntoIterator<Item = &'a Record>,
{
    checksum_of_pairs(
        records
            .into_iter()
            .map(|r| (r.id.as_str(), r.content_checksum.as_str())),
    )
}

/// Dataset checksum from `(id, contentChecksum)` pairs, for callers that
/// hold checksums without payloads.
pub fn checksum_of_pairs<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut tuples: Vec<String> = pairs
        .into_iter()
        .map(|(id, checksum)| format!("{}:{}", id, checksum))
        .collect();
    tuples.sort();
    checksum_str(&tuples.join(TUPLE_SEPARATOR))
}
