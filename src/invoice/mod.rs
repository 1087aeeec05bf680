//! Invoice data model
//!
//! Wire names follow the upstream consumers of this API exactly, including
//! the historically capitalized `AddressAndContactInfo` and the `userID`
//! envelope key. Every invoice field is independently optional; absent data
//! stays `null` on the wire and is never guessed.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether the invoice counterparty is a client or a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceClientType {
    Client,
    Company,
}

/// One billed line item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServiceAndItem {
    pub name: Option<String>,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    /// Extended schema variant only.
    pub unit_price_currency: Option<String>,
    pub total: Option<f64>,
    /// Extended schema variant only.
    pub total_currency: Option<String>,
}

/// The structured invoice record extracted from an uploaded document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Invoice {
    pub invoice_no: Option<String>,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    #[serde(rename = "type")]
    pub client_type: Option<InvoiceClientType>,

    pub company_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "AddressAndContactInfo")]
    pub address_and_contact_info: Option<String>,

    pub project_information: Option<String>,
    pub project_description: Option<String>,

    pub service_and_items: Option<Vec<ServiceAndItem>>,

    pub vat: Option<f64>,
    /// Extended schema variant only.
    pub vat_currency: Option<String>,
    pub sub_total: Option<f64>,
    /// Extended schema variant only.
    pub sub_total_currency: Option<String>,
    pub total_amount: Option<f64>,
    /// Extended schema variant only.
    pub total_amount_currency: Option<String>,

    pub is_paid: Option<bool>,
    pub paid_at: Option<String>,

    pub additional_note: Option<String>,

    pub have_attachment: Option<bool>,
    pub attachment_url: Option<String>,
}

impl Invoice {
    /// Build an invoice from a normalized payload mapping.
    ///
    /// Keys absent from the mapping become absent fields; a value that does
    /// not fit its field's type is an error, reported to the caller rather
    /// than silently dropped.
    pub fn from_payload(payload: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(payload))
    }
}

/// Response envelope for `POST /extract`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractResponse {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub invoice: Invoice,
}
