use crate::envelope;
use crate::error::BillyError;
use crate::models::{Invoice, InvoiceFilter, InvoiceLine, InvoicePayment, InvoiceState, InvoiceUpdate, NewInvoice};
use crate::request::{with_query, ApiRequest};
use crate::BillyClient;
use serde_json::{json, Value};
use tracing::warn;

const DEFAULT_PAYMENT_TERMS_DAYS: u32 = 14;

impl BillyClient {
    /// Lists invoices matching `filter`. A malformed response yields an
    /// empty list.
    pub async fn list_invoices(&self, filter: &InvoiceFilter) -> Result<Vec<Invoice>, BillyError> {
        let endpoint = with_query("/invoices", &invoice_query(filter));
        let response = self.send(ApiRequest::get(&endpoint)).await?;
        Ok(envelope::list(&endpoint, &response.body, "invoices"))
    }

    /// Reads an invoice header and merges in its lines, which live in a
    /// separate collection.
    pub async fn get_invoice(&self, id: &str) -> Result<Invoice, BillyError> {
        let endpoint = format!("/invoices/{}", urlencoding::encode(id));
        let response = self.send(ApiRequest::get(&endpoint)).await?;
        let mut invoice: Invoice = envelope::entity(&endpoint, &response.body, "invoice", "invoices")?;
        invoice.lines = self.invoice_lines(id).await?;
        Ok(invoice)
    }

    async fn invoice_lines(&self, invoice_id: &str) -> Result<Vec<InvoiceLine>, BillyError> {
        let endpoint = with_query("/invoiceLines", &[("invoiceId", invoice_id.to_string())]);
        match self.send(ApiRequest::get(&endpoint)).await {
            Ok(response) => Ok(envelope::list(&endpoint, &response.body, "invoiceLines")),
            // The header may have come from the fallback cache while the
            // lines have not been cached yet.
            Err(BillyError::Unavailable { .. }) => {
                warn!(invoice_id, "invoice lines unavailable, returning header without lines");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }

    /// Creates a draft invoice.
    pub async fn create_invoice(&self, invoice: &NewInvoice) -> Result<Invoice, BillyError> {
        if invoice.lines.is_empty() {
            return Err(BillyError::InvalidInput("an invoice needs at least one line".to_string()));
        }
        if invoice.contact_id.trim().is_empty() {
            return Err(BillyError::InvalidInput("an invoice needs a contact".to_string()));
        }

        let endpoint = "/invoices";
        let response = self.send(ApiRequest::post(endpoint, invoice_payload(invoice))).await?;
        let mut created: Invoice = envelope::entity(endpoint, &response.body, "invoice", "invoices")?;
        if created.lines.is_empty() {
            created.lines = invoice.lines.iter().map(InvoiceLine::from).collect();
        }
        Ok(created)
    }

    pub async fn update_invoice(&self, id: &str, update: &InvoiceUpdate) -> Result<Invoice, BillyError> {
        let payload = serde_json::to_value(update).map_err(|err| BillyError::InvalidInput(err.to_string()))?;
        self.put_invoice(id, payload).await
    }

    pub async fn approve_invoice(&self, id: &str) -> Result<Invoice, BillyError> {
        self.put_invoice(id, json!({ "state": InvoiceState::Approved.as_str() })).await
    }

    /// Voids an invoice. Billy has no hard delete for approved invoices.
    pub async fn cancel_invoice(&self, id: &str) -> Result<Invoice, BillyError> {
        self.put_invoice(id, json!({ "state": InvoiceState::Voided.as_str() })).await
    }

    async fn put_invoice(&self, id: &str, fields: Value) -> Result<Invoice, BillyError> {
        let endpoint = format!("/invoices/{}", urlencoding::encode(id));
        let response = self.send(ApiRequest::put(&endpoint, json!({ "invoice": fields }))).await?;
        envelope::entity(&endpoint, &response.body, "invoice", "invoices")
    }

    /// Records a bank payment against the invoice and returns the invoice as
    /// it reads afterwards.
    pub async fn mark_invoice_paid(&self, id: &str, payment: &InvoicePayment) -> Result<Invoice, BillyError> {
        if payment.amount.is_nan() || payment.amount <= 0.0 {
            return Err(BillyError::InvalidInput(format!(
                "payment amount must be positive, got {}",
                payment.amount
            )));
        }

        let payload = json!({
            "bankPayment": {
                "entryDate": payment.entry_date,
                "cashAmount": payment.amount,
                "cashSide": "debit",
                "cashAccountId": payment.cash_account_id,
                "associations": [{ "subjectReference": format!("invoice:{id}") }]
            }
        });
        self.send(ApiRequest::post("/bankPayments", payload)).await?;
        self.get_invoice(id).await
    }
}

/// The create payload: net payment terms, draft state, and lines with
/// `productId` first.
pub fn invoice_payload(invoice: &NewInvoice) -> Value {
    let mut fields = json!({
        "contactId": invoice.contact_id,
        "entryDate": invoice.entry_date,
        "paymentTermsMode": "net",
        "paymentTermsDays": invoice.payment_terms_days.unwrap_or(DEFAULT_PAYMENT_TERMS_DAYS),
        "state": InvoiceState::Draft.as_str(),
        "lines": invoice.lines,
    });
    if let (Some(currency), Some(object)) = (&invoice.currency_id, fields.as_object_mut()) {
        object.insert("currencyId".to_string(), Value::String(currency.clone()));
    }
    json!({ "invoice": fields })
}

fn invoice_query(filter: &InvoiceFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(state) = filter.state {
        query.push(("state", state.as_str().to_string()));
    }
    if let Some(contact_id) = &filter.contact_id {
        query.push(("contactId", contact_id.clone()));
    }
    if let Some(min) = filter.min_entry_date {
        query.push(("minEntryDate", min.to_string()));
    }
    if let Some(max) = filter.max_entry_date {
        query.push(("maxEntryDate", max.to_string()));
    }
    if let Some(is_paid) = filter.is_paid {
        query.push(("isPaid", is_paid.to_string()));
    }
    query
}
