//! Payment order request/response bodies for the HTTP boundary.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Currency used when a create-order request does not name one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Body of `POST /api/paypal/create-order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    /// Decimal amount; accepted as a JSON string or number.
    #[serde(default)]
    pub amount: Option<Value>,
    #[serde(default)]
    pub currency: Option<String>,
}

impl CreateOrderRequest {
    pub fn new(amount: impl Into<String>) -> Self {
        Self {
            amount: Some(Value::String(amount.into())),
            currency: None,
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    /// Amount as provider-ready decimal text; `None` when absent or blank.
    pub fn amount_text(&self) -> Option<String> {
        match self.amount.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn currency_or_default(&self) -> String {
        self.currency
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string()
    }
}

/// Body of `POST /api/paypal/capture-order`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureOrderRequest {
    #[serde(rename = "orderID", default)]
    pub order_id: Option<String>,
}

/// Validated order to hand to the payment client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub amount: String,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedOrder {
    pub id: String,
}

/// Capture result, passed through from the provider unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedOrder {
    pub status: Option<String>,
    pub id: Option<String>,
    pub payer: Option<Value>,
}
