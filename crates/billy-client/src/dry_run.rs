//! Locally synthesized responses for dry-run mode.
//!
//! Responses follow the envelopes the live API uses (`{ invoice }` for a
//! read, `{ invoices: [...] }` for a list or a write) so the same decoding
//! path runs in both modes. Ids are derived from a hash of method, endpoint
//! and payload: identical calls get identical ids.

use crate::request::{ApiRequest, ApiResponse, HttpMethod};
use serde_json::{json, Map, Value};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Answers [`ApiRequest`]s without touching the network.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunResponder;

impl DryRunResponder {
    pub fn new() -> Self {
        Self
    }

    pub fn respond(&self, request: &ApiRequest) -> ApiResponse {
        let digest = fingerprint(request);
        let path = request.endpoint.split('?').next().unwrap_or_default();
        let mut segments = path.trim_matches('/').split('/').filter(|s| !s.is_empty());
        let collection = segments.next().unwrap_or_default();
        let id = segments.next();

        let body = match (collection, request.method, id) {
            ("organization", _, _) => json!({ "organization": organization() }),
            ("user", _, _) => json!({ "user": { "id": "dry-run-user", "name": "Dry Run" } }),
            (_, HttpMethod::Delete, _) => json!({ "meta": { "success": true } }),
            (collection, HttpMethod::Get, None) => json!({ collection: [] }),
            (collection, HttpMethod::Get, Some(id)) => {
                let singular = singular(collection);
                json!({ singular: placeholder(collection, id, digest) })
            }
            (collection, HttpMethod::Post | HttpMethod::Put, id) => {
                let singular = singular(collection);
                let payload = request
                    .body
                    .as_ref()
                    .and_then(|body| body.get(&singular))
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                let id = id.map(str::to_owned).unwrap_or_else(|| format!("dry-{digest:016x}"));
                json!({ collection: [echo(collection, id, payload, digest)] })
            }
        };

        ApiResponse::ok(body)
    }
}

fn fingerprint(request: &ApiRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.method.as_str().hash(&mut hasher);
    request.endpoint.hash(&mut hasher);
    if let Some(body) = &request.body {
        body.to_string().hash(&mut hasher);
    }
    hasher.finish()
}

/// `invoices` -> `invoice`, `bankPayments` -> `bankPayment`.
fn singular(collection: &str) -> String {
    collection.strip_suffix('s').unwrap_or(collection).to_string()
}

fn organization() -> Value {
    json!({
        "id": "dry-run-organization",
        "name": "Dry Run Organization",
        "baseCurrencyId": "DKK",
        "countryId": "DK",
        "isLocked": false
    })
}

fn placeholder(collection: &str, id: &str, digest: u64) -> Value {
    match collection {
        "invoices" => json!({
            "id": id,
            "invoiceNo": invoice_no(digest),
            "contactId": "dry-run-contact",
            "state": "draft",
            "currencyId": "DKK",
            "amount": 0.0,
            "tax": 0.0,
            "grossAmount": 0.0,
            "balance": 0.0,
            "isPaid": false
        }),
        "contacts" => json!({
            "id": id,
            "name": "Dry Run Contact",
            "type": "company",
            "countryId": "DK"
        }),
        "products" => json!({
            "id": id,
            "name": "Dry Run Product",
            "prices": []
        }),
        _ => json!({ "id": id }),
    }
}

/// Echoes a write payload back with the fields the API would add.
fn echo(collection: &str, id: String, mut entity: Map<String, Value>, digest: u64) -> Value {
    entity.insert("id".to_string(), Value::String(id));

    if collection == "invoices" {
        entity
            .entry("invoiceNo")
            .or_insert_with(|| Value::String(invoice_no(digest)));
        entity.entry("state").or_insert_with(|| json!("draft"));
        entity.entry("currencyId").or_insert_with(|| json!("DKK"));
        entity.entry("isPaid").or_insert(Value::Bool(false));

        let amount: f64 = entity
            .get("lines")
            .and_then(Value::as_array)
            .map(|lines| {
                lines
                    .iter()
                    .map(|line| {
                        let quantity = line.get("quantity").and_then(Value::as_f64).unwrap_or(0.0);
                        let unit_price = line.get("unitPrice").and_then(Value::as_f64).unwrap_or(0.0);
                        quantity * unit_price
                    })
                    .sum()
            })
            .unwrap_or(0.0);
        entity.entry("amount").or_insert_with(|| json!(amount));
        entity.entry("grossAmount").or_insert_with(|| json!(amount));
        entity.entry("balance").or_insert_with(|| json!(amount));
    }

    Value::Object(entity)
}

fn invoice_no(digest: u64) -> String {
    format!("DRY-{}", digest % 100_000)
}
