//! Maps inbound events onto Dub's lead and sale request bodies.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::client::EventClient;
use crate::config::CookieNames;
use crate::event::{non_empty, non_zero, McEvent};
use crate::identity::{resolve_click_id, resolve_customer_id};

pub const DEFAULT_LEAD_EVENT: &str = "Lead";
pub const DEFAULT_SALE_EVENT: &str = "Sale";

/// Body of `POST /track/lead`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadRecord {
    /// Empty when the visitor has no click cookie.
    pub click_id: String,
    pub event_name: String,
    pub customer_external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_quantity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
}

/// Body of `POST /track/sale`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub customer_external_id: String,
    /// Smallest currency unit.
    pub amount: i64,
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_processor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_event_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_avatar: Option<String>,
}

fn owned(value: &Option<String>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

fn event_name(event: &McEvent, default: &str) -> String {
    non_empty(&event.payload.event_name)
        .or_else(|| event.name())
        .unwrap_or(default)
        .to_string()
}

pub fn build_lead_record<C: EventClient + ?Sized>(
    event: &McEvent,
    client: &mut C,
    names: &CookieNames,
) -> LeadRecord {
    let click_id = resolve_click_id(client, names);
    let customer_external_id = resolve_customer_id(event, client, names);
    let payload = &event.payload;

    LeadRecord {
        click_id: click_id.unwrap_or_default(),
        event_name: event_name(event, DEFAULT_LEAD_EVENT),
        customer_external_id,
        customer_name: owned(&payload.customer_name),
        customer_email: owned(&payload.customer_email),
        customer_avatar: owned(&payload.customer_avatar),
        event_quantity: non_zero(payload.event_quantity),
        metadata: payload.metadata().cloned(),
    }
}

pub fn build_sale_record<C: EventClient + ?Sized>(
    event: &McEvent,
    client: &mut C,
    names: &CookieNames,
) -> SaleRecord {
    let click_id = resolve_click_id(client, names);
    let customer_external_id = resolve_customer_id(event, client, names);
    let payload = &event.payload;

    SaleRecord {
        customer_external_id,
        amount: payload.monetary_value().map(|value| value.round() as i64).unwrap_or(0),
        event_name: event_name(event, DEFAULT_SALE_EVENT),
        currency: owned(&payload.currency),
        payment_processor: owned(&payload.payment_processor),
        invoice_id: owned(&payload.invoice_id).or_else(|| owned(&payload.transaction_id)),
        metadata: payload.metadata().cloned(),
        lead_event_name: owned(&payload.lead_event_name),
        click_id: click_id.filter(|id| !id.is_empty()),
        customer_name: owned(&payload.customer_name),
        customer_email: owned(&payload.customer_email),
        customer_avatar: owned(&payload.customer_avatar),
    }
}
