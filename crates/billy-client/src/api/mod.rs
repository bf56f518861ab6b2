//! Endpoint methods on [`BillyClient`](crate::BillyClient), one module per
//! Billy resource.

mod contacts;
mod invoices;
mod organization;
mod products;
mod revenue;

pub use contacts::contact_update_payload;
pub use invoices::invoice_payload;
pub use revenue::{summarize_revenue, RevenueSummary};
