//! Typed Billy entities and the inputs used to create or change them.
//!
//! Entities mirror the API's camelCase JSON. Fields the API may omit are
//! optional or defaulted so that a partial entity still decodes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    #[default]
    Draft,
    Approved,
    Voided,
}

impl InvoiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceState::Draft => "draft",
            InvoiceState::Approved => "approved",
            InvoiceState::Voided => "voided",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    #[serde(default)]
    pub invoice_no: Option<String>,
    #[serde(default)]
    pub contact_id: String,
    #[serde(default)]
    pub entry_date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub state: InvoiceState,
    #[serde(default)]
    pub currency_id: Option<String>,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub tax: f64,
    #[serde(default)]
    pub gross_amount: f64,
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub is_paid: bool,
    /// Filled from the separate `invoiceLines` collection on reads.
    #[serde(default)]
    pub lines: Vec<InvoiceLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub invoice_id: Option<String>,
    pub product_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub quantity: f64,
    #[serde(default)]
    pub unit_price: f64,
}

/// A line on a new invoice.
///
/// Field order is the wire order: the API requires `productId` first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoiceLine {
    pub product_id: String,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
}

impl From<&NewInvoiceLine> for InvoiceLine {
    fn from(line: &NewInvoiceLine) -> Self {
        Self {
            id: None,
            invoice_id: None,
            product_id: line.product_id.clone(),
            description: line.description.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewInvoice {
    pub contact_id: String,
    pub entry_date: NaiveDate,
    /// Net payment terms; 14 days when `None`.
    #[serde(default)]
    pub payment_terms_days: Option<u32>,
    #[serde(default)]
    pub currency_id: Option<String>,
    pub lines: Vec<NewInvoiceLine>,
}

/// Fields of a draft invoice that may be changed. `None` leaves a field as
/// it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_terms_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<Vec<NewInvoiceLine>>,
}

/// Query filters for listing invoices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvoiceFilter {
    pub state: Option<InvoiceState>,
    pub contact_id: Option<String>,
    pub min_entry_date: Option<NaiveDate>,
    pub max_entry_date: Option<NaiveDate>,
    pub is_paid: Option<bool>,
}

/// A bank payment settling an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePayment {
    pub entry_date: NaiveDate,
    pub amount: f64,
    pub cash_account_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactType {
    #[default]
    Company,
    Person,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub contact_type: ContactType,
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub zipcode: Option<String>,
    #[serde(default)]
    pub city_text: Option<String>,
    #[serde(default)]
    pub contact_persons: Vec<ContactPerson>,
}

/// A person attached to a contact. There is deliberately no phone field:
/// the API only accepts a phone number on the contact itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPerson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContact {
    pub name: String,
    pub contact_type: ContactType,
    /// Defaults to `DK` when `None`.
    pub country_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl NewContact {
    pub fn company(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact_type: ContactType::Company,
            country_id: None,
            email: None,
            phone: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country_id: Option<String>,
    pub street: Option<String>,
    pub zipcode: Option<String>,
    pub city_text: Option<String>,
}

impl ContactUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFilter {
    pub name: Option<String>,
    pub contact_type: Option<ContactType>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductPrice {
    pub unit_price: f64,
    pub currency_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub product_no: Option<String>,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub prices: Vec<ProductPrice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub prices: Vec<ProductPrice>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prices: Option<Vec<ProductPrice>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub base_currency_id: Option<String>,
    #[serde(default)]
    pub country_id: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
}
