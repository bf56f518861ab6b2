use super::{config, recording};
use billy_client::{
    ApiResponse, BillyClient, ContactUpdate, InvoiceFilter, InvoicePayment, InvoiceState, NewContact, NewInvoice,
    NewInvoiceLine, NewProduct, ProductPrice,
};
use chrono::NaiveDate;
use serde_json::json;

fn client() -> (BillyClient, super::RequestLog) {
    let (transport, log) = recording(|_| Ok(ApiResponse::ok(json!({}))));
    (BillyClient::with_transport(config().with_dry_run(true), transport), log)
}

fn new_invoice() -> NewInvoice {
    NewInvoice {
        contact_id: "c1".to_string(),
        entry_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
        payment_terms_days: None,
        currency_id: None,
        lines: vec![NewInvoiceLine {
            product_id: "p1".to_string(),
            description: "Window cleaning".to_string(),
            quantity: 2.0,
            unit_price: 500.0,
        }],
    }
}

#[tokio::test(start_paused = true)]
async fn test_invoice_round_trip() {
    let (client, log) = client();

    let created = client.create_invoice(&new_invoice()).await.unwrap();
    assert!(created.id.starts_with("dry-"));
    assert_eq!(created.state, InvoiceState::Draft);
    assert_eq!(created.amount, 1000.0);
    assert_eq!(created.lines.len(), 1);
    assert_eq!(created.lines[0].product_id, "p1");

    let read = client.get_invoice(&created.id).await.unwrap();
    assert_eq!(read.id, created.id);

    let approved = client.approve_invoice(&created.id).await.unwrap();
    assert_eq!(approved.state, InvoiceState::Approved);

    let voided = client.cancel_invoice(&created.id).await.unwrap();
    assert_eq!(voided.state, InvoiceState::Voided);

    let paid = client
        .mark_invoice_paid(
            &created.id,
            &InvoicePayment {
                entry_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
                amount: 1250.0,
                cash_account_id: "bank".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(paid.id, created.id);

    assert!(client.list_invoices(&InvoiceFilter::default()).await.unwrap().is_empty());
    assert!(log.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_contact_and_product_writes() {
    let (client, log) = client();

    let mut contact = NewContact::company("Acme ApS");
    contact.email = Some("billing@acme.dk".to_string());
    let created = client.create_contact(&contact).await.unwrap();
    assert!(created.id.starts_with("dry-"));
    assert_eq!(created.contact_persons[0].email.as_deref(), Some("billing@acme.dk"));
    assert_eq!(created.contact_persons[0].name, "Acme ApS");

    let updated = client
        .update_contact(
            &created.id,
            &ContactUpdate {
                phone: Some("+45 1234 5678".to_string()),
                ..ContactUpdate::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.phone.as_deref(), Some("+45 1234 5678"));

    let product = client
        .create_product(&NewProduct {
            name: "Window cleaning".to_string(),
            description: None,
            product_no: None,
            account_id: None,
            prices: vec![ProductPrice {
                unit_price: 500.0,
                currency_id: "DKK".to_string(),
            }],
        })
        .await
        .unwrap();
    assert_eq!(product.prices[0].unit_price, 500.0);

    assert!(log.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_organization_auth_and_health() {
    let (client, _log) = client();

    let org = client.get_organization().await.unwrap();
    assert_eq!(org.base_currency_id.as_deref(), Some("DKK"));
    assert!(client.validate_auth().await.unwrap());

    let health = client.health_status();
    assert!(health.dry_run);
    assert!(health.healthy);
    assert_eq!(health.rate_limiter.requests_in_window, 0);
    assert_eq!(health.fallback_cache_size, 0);
}

#[tokio::test(start_paused = true)]
async fn test_validation_runs_before_dispatch() {
    let (client, _log) = client();

    let mut invoice = new_invoice();
    invoice.lines.clear();
    assert!(matches!(
        client.create_invoice(&invoice).await,
        Err(billy_client::BillyError::InvalidInput(_))
    ));

    let payment = InvoicePayment {
        entry_date: NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
        amount: 0.0,
        cash_account_id: "bank".to_string(),
    };
    assert!(matches!(
        client.mark_invoice_paid("i1", &payment).await,
        Err(billy_client::BillyError::InvalidInput(_))
    ));

    assert!(matches!(
        client.update_contact("c1", &ContactUpdate::default()).await,
        Err(billy_client::BillyError::InvalidInput(_))
    ));
}
