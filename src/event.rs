use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// The site-interaction hooks this component listens on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Pageview,
    Event,
    Track,
    Ecommerce,
    Identify,
}

impl EventKind {
    /// Hook name as emitted by the host runtime
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Pageview => "pageview",
            EventKind::Event => "event",
            EventKind::Track => "track",
            EventKind::Ecommerce => "ecommerce",
            EventKind::Identify => "identify",
        }
    }

    pub fn all() -> &'static [EventKind] {
        &[
            EventKind::Pageview,
            EventKind::Event,
            EventKind::Track,
            EventKind::Ecommerce,
            EventKind::Identify,
        ]
    }

    pub fn from_name(name: &str) -> Option<EventKind> {
        match name {
            "pageview" => Some(EventKind::Pageview),
            "event" => Some(EventKind::Event),
            "track" => Some(EventKind::Track),
            "ecommerce" => Some(EventKind::Ecommerce),
            "identify" => Some(EventKind::Identify),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inbound event: optional name plus a loosely-typed payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct McEvent {
    #[serde(default, deserialize_with = "loose_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "nullable_payload")]
    pub payload: EventPayload,
}

impl McEvent {
    pub fn new(name: Option<&str>, payload: EventPayload) -> Self {
        Self {
            name: name.map(str::to_string),
            payload,
        }
    }

    /// Event name, treating an empty string as absent.
    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    /// Parse an HTTP request body; a blank body is an event with no name or payload.
    pub fn from_json_body(body: &[u8]) -> Result<Self, String> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| format!("invalid event body: {}", e))
    }
}

/// Recognized payload keys. Unknown keys are ignored and values of the wrong
/// JSON type are treated as absent, so deserialization only fails when the
/// payload is not an object.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(deserialize_with = "loose_string")]
    pub event_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub customer_id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub customer_external_id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub customer_email: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub customer_name: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub customer_avatar: Option<String>,
    #[serde(deserialize_with = "loose_number")]
    pub amount: Option<f64>,
    #[serde(deserialize_with = "loose_number")]
    pub revenue: Option<f64>,
    #[serde(deserialize_with = "loose_string")]
    pub currency: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub invoice_id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub transaction_id: Option<String>,
    #[serde(deserialize_with = "loose_string")]
    pub payment_processor: Option<String>,
    pub metadata: Option<JsonValue>,
    #[serde(deserialize_with = "loose_string")]
    pub lead_event_name: Option<String>,
    #[serde(deserialize_with = "loose_int")]
    pub event_quantity: Option<i64>,
}

impl EventPayload {
    /// Externally supplied customer identifier, `customerId` first.
    pub fn supplied_customer_id(&self) -> Option<&str> {
        non_empty(&self.customer_id).or_else(|| non_empty(&self.customer_external_id))
    }

    /// Whether the payload carries a monetary value, which makes it a sale.
    pub fn has_revenue(&self) -> bool {
        truthy_number(self.amount).is_some() || truthy_number(self.revenue).is_some()
    }

    /// First truthy of `amount` and `revenue`, unrounded.
    pub fn monetary_value(&self) -> Option<f64> {
        truthy_number(self.amount).or_else(|| truthy_number(self.revenue))
    }

    /// Metadata if it is truthy.
    pub fn metadata(&self) -> Option<&JsonValue> {
        self.metadata.as_ref().filter(|value| is_truthy(value))
    }
}

pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

pub(crate) fn non_zero(value: Option<i64>) -> Option<i64> {
    value.filter(|n| *n != 0)
}

fn truthy_number(value: Option<f64>) -> Option<f64> {
    value.filter(|n| *n != 0.0)
}

/// Truthiness as the browser runtime sees it.
pub(crate) fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        JsonValue::String(s) => !s.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

fn nullable_payload<'de, D>(deserializer: D) -> Result<EventPayload, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<EventPayload>::deserialize(deserializer)?.unwrap_or_default())
}

pub(crate) fn loose_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(JsonValue::String(s)) => Some(s),
        Some(JsonValue::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Numbers and numeric strings, kept as the host's double-precision value.
fn loose_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<JsonValue>::deserialize(deserializer)?;
    let number = match value {
        Some(JsonValue::Number(n)) => n.as_f64(),
        Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|f| f.is_finite()))
}

fn loose_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(loose_number(deserializer)?.map(|f| f.round() as i64))
}
