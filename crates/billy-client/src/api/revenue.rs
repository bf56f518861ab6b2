use crate::error::BillyError;
use crate::models::{Invoice, InvoiceFilter, InvoiceState};
use crate::BillyClient;
use chrono::{NaiveDate, Utc};
use serde::Serialize;

/// Revenue figures over approved invoices in an entry-date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub invoice_count: usize,
    /// Gross amount of approved invoices.
    pub total_revenue: f64,
    pub paid_amount: f64,
    pub outstanding_amount: f64,
    pub overdue_amount: f64,
    pub overdue_count: usize,
    pub currency: String,
}

impl BillyClient {
    pub async fn get_revenue(&self, start: NaiveDate, end: NaiveDate) -> Result<RevenueSummary, BillyError> {
        if start > end {
            return Err(BillyError::InvalidInput(format!(
                "revenue range starts after it ends: {start} > {end}"
            )));
        }

        let filter = InvoiceFilter {
            min_entry_date: Some(start),
            max_entry_date: Some(end),
            ..InvoiceFilter::default()
        };
        let invoices = self.list_invoices(&filter).await?;
        Ok(summarize_revenue(&invoices, start, end, Utc::now().date_naive()))
    }
}

/// Aggregates `invoices` listed for `start..=end` as of `today`.
///
/// Only approved invoices count. An invoice is overdue when it is unpaid and
/// its due date is before `today`.
pub fn summarize_revenue(invoices: &[Invoice], start: NaiveDate, end: NaiveDate, today: NaiveDate) -> RevenueSummary {
    let approved: Vec<&Invoice> = invoices
        .iter()
        .filter(|invoice| invoice.state == InvoiceState::Approved)
        .collect();

    let mut summary = RevenueSummary {
        start,
        end,
        invoice_count: approved.len(),
        total_revenue: 0.0,
        paid_amount: 0.0,
        outstanding_amount: 0.0,
        overdue_amount: 0.0,
        overdue_count: 0,
        currency: approved
            .iter()
            .find_map(|invoice| invoice.currency_id.clone())
            .unwrap_or_else(|| "DKK".to_string()),
    };

    for invoice in approved {
        summary.total_revenue += invoice.gross_amount;
        if invoice.is_paid {
            summary.paid_amount += invoice.gross_amount;
            continue;
        }
        summary.outstanding_amount += invoice.balance;
        if invoice.due_date.is_some_and(|due| due < today) {
            summary.overdue_amount += invoice.balance;
            summary.overdue_count += 1;
        }
    }
    summary
}
