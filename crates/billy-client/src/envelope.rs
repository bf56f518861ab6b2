//! Unwrapping of the API's response envelopes.
//!
//! A single entity arrives as `{ "invoice": {...} }` on reads and as
//! `{ "invoices": [{...}] }` on writes; lists arrive as `{ "invoices": [...] }`.
//! Single-entity decoding fails loudly on a missing key. List decoding
//! degrades to an empty list and logs the anomaly.

use crate::error::BillyError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

/// Decodes the entity under `singular`, or the first element under `plural`.
pub(crate) fn entity<T: DeserializeOwned>(
    endpoint: &str,
    body: &Value,
    singular: &str,
    plural: &str,
) -> Result<T, BillyError> {
    let raw = body
        .get(singular)
        .filter(|value| value.is_object())
        .or_else(|| body.get(plural).and_then(Value::as_array).and_then(|items| items.first()))
        .ok_or_else(|| BillyError::InvalidResponse {
            endpoint: endpoint.to_string(),
            expected: singular.to_string(),
        })?;

    T::deserialize(raw).map_err(|err| BillyError::Decode {
        endpoint: endpoint.to_string(),
        entity: singular.to_string(),
        message: err.to_string(),
    })
}

/// Decodes the list under `plural`; any shape problem yields an empty list.
pub(crate) fn list<T: DeserializeOwned>(endpoint: &str, body: &Value, plural: &str) -> Vec<T> {
    let Some(items) = body.get(plural).and_then(Value::as_array) else {
        warn!(endpoint, expected = plural, "list response missing its collection key, returning empty list");
        return Vec::new();
    };

    match items.iter().map(T::deserialize).collect::<Result<Vec<T>, _>>() {
        Ok(items) => items,
        Err(err) => {
            warn!(endpoint, expected = plural, error = %err, "list response did not decode, returning empty list");
            Vec::new()
        }
    }
}
