use super::{config, endpoints, recording};
use billy_client::{
    ApiResponse, BillyClient, BillyError, ContactFilter, ContactType, ContactUpdate, ErrorKind, InvoiceFilter,
    InvoiceState, NewInvoice, NewInvoiceLine,
};
use chrono::NaiveDate;
use serde_json::{json, Value};

fn body(log: &super::RequestLog, index: usize) -> Value {
    log.lock()[index].body.clone().unwrap_or(Value::Null)
}

#[tokio::test(start_paused = true)]
async fn test_contact_update_splits_phone_and_email() {
    let (transport, log) = recording(|request| {
        let body = match request.method.as_str() {
            "GET" => json!({"contact": {"id": "c1", "name": "Acme ApS", "type": "company"}}),
            _ => {
                let mut contact = request.body.as_ref().map(|b| b["contact"].clone()).unwrap_or_default();
                contact["id"] = json!("c1");
                json!({"contacts": [contact]})
            }
        };
        Ok(ApiResponse::ok(body))
    });
    let client = BillyClient::with_transport(config(), transport);

    let contact = client
        .update_contact(
            "c1",
            &ContactUpdate {
                email: Some("billing@acme.dk".to_string()),
                phone: Some("+45 1234 5678".to_string()),
                ..ContactUpdate::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(endpoints(&log), vec!["GET /contacts/c1", "PUT /contacts/c1"]);
    let sent = body(&log, 1);
    assert_eq!(sent["contact"]["phone"], "+45 1234 5678");
    assert_eq!(
        sent["contact"]["contactPersons"],
        json!([{"name": "Acme ApS", "email": "billing@acme.dk"}])
    );
    assert_eq!(contact.phone.as_deref(), Some("+45 1234 5678"));
    assert_eq!(contact.contact_persons.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_invoice_create_payload() {
    let (transport, log) = recording(|request| {
        let mut invoice = request.body.as_ref().map(|b| b["invoice"].clone()).unwrap_or_default();
        invoice["id"] = json!("i1");
        if let Some(fields) = invoice.as_object_mut() {
            fields.remove("lines");
        }
        Ok(ApiResponse::ok(json!({"invoices": [invoice]})))
    });
    let client = BillyClient::with_transport(config(), transport);

    let created = client
        .create_invoice(&NewInvoice {
            contact_id: "c1".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            payment_terms_days: Some(30),
            currency_id: Some("EUR".to_string()),
            lines: vec![NewInvoiceLine {
                product_id: "p1".to_string(),
                description: "Consulting".to_string(),
                quantity: 3.0,
                unit_price: 1200.0,
            }],
        })
        .await
        .unwrap();

    let sent = body(&log, 0);
    let invoice = &sent["invoice"];
    assert_eq!(invoice["paymentTermsMode"], "net");
    assert_eq!(invoice["paymentTermsDays"], 30);
    assert_eq!(invoice["state"], "draft");
    assert_eq!(invoice["currencyId"], "EUR");
    let line = invoice["lines"][0].as_object().unwrap();
    assert_eq!(line.keys().next().map(String::as_str), Some("productId"));

    // Lines missing from the response are filled from the request.
    assert_eq!(created.id, "i1");
    assert_eq!(created.lines[0].unit_price, 1200.0);
}

#[tokio::test(start_paused = true)]
async fn test_get_invoice_merges_lines() {
    let (transport, log) = recording(|request| {
        let body = if request.endpoint.starts_with("/invoiceLines") {
            json!({"invoiceLines": [
                {"id": "l1", "invoiceId": "i 1", "productId": "p1", "quantity": 1, "unitPrice": 100},
                {"id": "l2", "invoiceId": "i 1", "productId": "p2", "quantity": 2, "unitPrice": 50}
            ]})
        } else {
            json!({"invoice": {"id": "i 1", "state": "approved"}})
        };
        Ok(ApiResponse::ok(body))
    });
    let client = BillyClient::with_transport(config(), transport);

    let invoice = client.get_invoice("i 1").await.unwrap();

    assert_eq!(
        endpoints(&log),
        vec!["GET /invoices/i%201", "GET /invoiceLines?invoiceId=i%201"]
    );
    assert_eq!(invoice.state, InvoiceState::Approved);
    assert_eq!(invoice.lines.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_lists_degrade_to_empty() {
    let (transport, _log) = recording(|request| {
        let body = match request.endpoint.as_str() {
            "/products" => json!({"unexpected": true}),
            _ => json!({"contacts": [{"name": "missing id"}]}),
        };
        Ok(ApiResponse::ok(body))
    });
    let client = BillyClient::with_transport(config(), transport);

    assert!(client.list_products().await.unwrap().is_empty());
    let filter = ContactFilter {
        name: Some("Acme".to_string()),
        contact_type: Some(ContactType::Company),
    };
    assert!(client.list_contacts(&filter).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_single_entities_fail_loud() {
    let (transport, _log) = recording(|_| Ok(ApiResponse::ok(json!({"meta": {}}))));
    let client = BillyClient::with_transport(config(), transport);

    let err = client.get_product("p1").await.unwrap_err();
    assert_eq!(
        err,
        BillyError::InvalidResponse {
            endpoint: "/products/p1".to_string(),
            expected: "product".to_string()
        }
    );
    assert!(matches!(client.get_organization().await, Err(BillyError::InvalidResponse { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_business_rejections_carry_billy_details() {
    let (transport, _log) = recording(|_| {
        Ok(ApiResponse {
            status: 422,
            body: json!({
                "errorCode": "VALIDATION_ERROR",
                "errorMessage": "contactId is invalid",
                "validationErrors": {"invoice": {"contactId": "invalid"}}
            }),
        })
    });
    let client = BillyClient::with_transport(config(), transport);

    let err = client.approve_invoice("i1").await.unwrap_err();
    let upstream = err.upstream().unwrap();
    assert_eq!(upstream.kind, ErrorKind::BusinessRejection);
    assert_eq!(upstream.status, Some(422));
    assert_eq!(upstream.billy_error_code.as_deref(), Some("VALIDATION_ERROR"));
    assert_eq!(upstream.method, "PUT");
    assert_eq!(upstream.endpoint, "/invoices/i1");
    assert!(!err.is_transient());
}

#[tokio::test(start_paused = true)]
async fn test_validate_auth_outcomes() {
    for (status, expected) in [(200, Some(true)), (401, Some(false)), (403, Some(false))] {
        let (transport, _log) = recording(move |_| {
            Ok(ApiResponse {
                status,
                body: json!({"user": {"id": "u1"}}),
            })
        });
        let client = BillyClient::with_transport(config(), transport);
        assert_eq!(client.validate_auth().await.ok(), expected, "status {status}");
    }

    let (transport, _log) = recording(|request| Err(super::server_error(request, 503)));
    let client = BillyClient::with_transport(config(), transport);
    assert_eq!(client.validate_auth().await.unwrap_err().status(), Some(503));
}

#[tokio::test(start_paused = true)]
async fn test_revenue_over_listed_invoices() {
    let (transport, log) = recording(|_| {
        Ok(ApiResponse::ok(json!({"invoices": [
            {"id": "a", "state": "approved", "entryDate": "2025-01-05", "dueDate": "2025-01-19",
             "grossAmount": 1000.0, "balance": 0.0, "isPaid": true, "currencyId": "DKK"},
            {"id": "b", "state": "approved", "entryDate": "2025-02-01", "dueDate": "2025-02-15",
             "grossAmount": 400.0, "balance": 400.0, "isPaid": false, "currencyId": "DKK"},
            {"id": "c", "state": "draft", "entryDate": "2025-02-03", "grossAmount": 999.0}
        ]})))
    });
    let client = BillyClient::with_transport(config(), transport);
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 3, 31).unwrap();

    let summary = client.get_revenue(start, end).await.unwrap();
    assert_eq!(
        endpoints(&log),
        vec!["GET /invoices?minEntryDate=2025-01-01&maxEntryDate=2025-03-31"]
    );
    assert_eq!((summary.start, summary.end), (start, end));
    assert_eq!(summary.invoice_count, 2);
    assert_eq!(summary.total_revenue, 1400.0);
    assert_eq!(summary.paid_amount, 1000.0);
    assert_eq!(summary.outstanding_amount, 400.0);
    assert_eq!(summary.overdue_count, 1);

    assert!(matches!(
        client.get_revenue(end, start).await,
        Err(BillyError::InvalidInput(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_invoice_filters_reach_the_query() {
    let (transport, log) = recording(|_| Ok(ApiResponse::ok(json!({"invoices": []}))));
    let client = BillyClient::with_transport(config(), transport);

    client
        .list_invoices(&InvoiceFilter {
            state: Some(InvoiceState::Approved),
            contact_id: Some("c&1".to_string()),
            is_paid: Some(false),
            ..InvoiceFilter::default()
        })
        .await
        .unwrap();

    assert_eq!(
        endpoints(&log),
        vec!["GET /invoices?state=approved&contactId=c%261&isPaid=false"]
    );
}
