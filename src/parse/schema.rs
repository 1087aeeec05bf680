//! JSON schemas handed to the structured parsing call.

use crate::config::SchemaVariant;
use serde_json::{Value, json};

/// Currency fields the extended variant adds at the invoice level.
const INVOICE_CURRENCY_FIELDS: [&str; 3] = ["vatCurrency", "subTotalCurrency", "totalAmountCurrency"];

/// Currency fields the extended variant adds on each line item.
const ITEM_CURRENCY_FIELDS: [&str; 2] = ["unitPriceCurrency", "totalCurrency"];

/// Build the invoice schema for the configured variant.
///
/// Every property is required and nullable, so the model must emit the
/// full shape with explicit nulls instead of omitting fields it cannot
/// find. The extended variant layers per-amount currency fields on top
/// of the simple shape.
pub fn invoice_schema(variant: SchemaVariant) -> Value {
    let mut schema = base_schema();
    if variant == SchemaVariant::Extended {
        append_nullable_strings(&mut schema, &INVOICE_CURRENCY_FIELDS);
        append_nullable_strings(
            &mut schema["properties"]["serviceAndItems"]["items"],
            &ITEM_CURRENCY_FIELDS,
        );
    }
    schema
}

fn base_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": [
            "invoiceNo",
            "issueDate",
            "dueDate",
            "type",
            "companyName",
            "email",
            "AddressAndContactInfo",
            "projectInformation",
            "projectDescription",
            "serviceAndItems",
            "vat",
            "subTotal",
            "totalAmount",
            "isPaid",
            "paidAt",
            "additionalNote",
            "haveAttachment",
            "attachmentUrl",
        ],
        "properties": {
            "invoiceNo": {"type": ["string", "null"]},
            "issueDate": {"type": ["string", "null"]},
            "dueDate": {"type": ["string", "null"]},
            "type": {
                "type": ["string", "null"],
                "enum": ["CLIENT", "COMPANY", null],
            },
            "companyName": {"type": ["string", "null"]},
            "email": {"type": ["string", "null"]},
            "AddressAndContactInfo": {"type": ["string", "null"]},
            "projectInformation": {"type": ["string", "null"]},
            "projectDescription": {"type": ["string", "null"]},
            "serviceAndItems": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["name", "quantity", "unitPrice", "total"],
                    "properties": {
                        "name": {"type": ["string", "null"]},
                        "quantity": {"type": ["number", "null"]},
                        "unitPrice": {"type": ["number", "null"]},
                        "total": {"type": ["number", "null"]},
                    },
                },
            },
            "vat": {"type": ["number", "null"]},
            "subTotal": {"type": ["number", "null"]},
            "totalAmount": {"type": ["number", "null"]},
            "isPaid": {"type": ["boolean", "null"]},
            "paidAt": {"type": ["string", "null"]},
            "additionalNote": {"type": ["string", "null"]},
            "haveAttachment": {"type": ["boolean", "null"]},
            "attachmentUrl": {"type": ["string", "null"]},
        },
    })
}

/// Add `{"type": ["string", "null"]}` properties to an object schema and
/// mark them required.
fn append_nullable_strings(object_schema: &mut Value, fields: &[&str]) {
    for field in fields {
        object_schema["properties"][*field] = json!({"type": ["string", "null"]});
        if let Some(required) = object_schema["required"].as_array_mut() {
            required.push(json!(field));
        }
    }
}
