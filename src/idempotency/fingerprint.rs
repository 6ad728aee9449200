//! Request fingerprinting.
//!
//! SHA-256 over the request scope (client, method, path) followed by the body.
//! JSON bodies are hashed in canonical form (object keys sorted, insignificant
//! whitespace removed) so that two encodings of the same document share a
//! fingerprint. Scalars keep their exact source text: numbers never pass
//! through `f64`/`u64`, so `0.1` and `0.10000000000000001` stay distinct.
//! No process-local salt: fingerprints are stable across restarts and instances.

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::value::RawValue;
use sha2::{Digest, Sha256};
use std::fmt;

/// Who sent the request and where it was sent; part of every fingerprint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestScope<'a> {
    pub client_id: &'a str,
    pub method: &'a str,
    pub path: &'a str,
}

/// Content hash of a request (hex-encoded SHA-256)
pub fn fingerprint(scope: &RequestScope<'_>, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    for part in [scope.client_id, scope.method, scope.path] {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part.as_bytes());
    }
    match canonical_json(body) {
        Some(canonical) => hasher.update(&canonical),
        None => hasher.update(body),
    }
    hex::encode(hasher.finalize())
}

/// Canonical encoding of a JSON body, `None` if the body is not JSON.
fn canonical_json(body: &[u8]) -> Option<Vec<u8>> {
    let raw: &RawValue = serde_json::from_slice(body).ok()?;
    let mut out = Vec::with_capacity(body.len());
    write_canonical(raw, &mut out).ok()?;
    Some(out)
}

fn write_canonical(raw: &RawValue, out: &mut Vec<u8>) -> Result<(), serde_json::Error> {
    let text = raw.get();
    match text.as_bytes().first() {
        Some(b'{') => {
            let Entries(mut entries) = serde_json::from_str(text)?;
            // Stable: duplicate keys keep their relative order
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            out.push(b'{');
            for (i, (key, value)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                serde_json::to_writer(&mut *out, key)?;
                out.push(b':');
                write_canonical(value, out)?;
            }
            out.push(b'}');
        }
        Some(b'[') => {
            let items: Vec<&RawValue> = serde_json::from_str(text)?;
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_canonical(item, out)?;
            }
            out.push(b']');
        }
        Some(b'"') => {
            // Normalizes escapes (`"\u0041"` == `"A"`); strings are lossless
            let decoded: String = serde_json::from_str(text)?;
            serde_json::to_writer(&mut *out, &decoded)?;
        }
        // Numbers, booleans, null: exact token text
        _ => out.extend_from_slice(text.as_bytes()),
    }
    Ok(())
}

/// Object members in document order, duplicates preserved
struct Entries<'a>(Vec<(String, &'a RawValue)>);

impl<'de: 'a, 'a> Deserialize<'de> for Entries<'a> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<'a>(std::marker::PhantomData<&'a ()>);

        impl<'de: 'a, 'a> Visitor<'de> for EntriesVisitor<'a> {
            type Value = Entries<'a>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Self::Value, M::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, &'a RawValue>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(std::marker::PhantomData))
    }
}
