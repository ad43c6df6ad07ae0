//! PayPal Orders v2 client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::PaymentClient;
use crate::config::{DeploymentMode, PayPalCredentials};
use crate::credentials::{parse_token_response, TokenCache};
use crate::logging::Redacted;
use crate::transport::{send_json, TransportError};
use crate::types::{CapturedOrder, CreatedOrder, OrderDraft};
use crate::{Error, Result};

pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const LIVE_BASE_URL: &str = "https://api-m.paypal.com";

const PROVIDER: &str = "paypal";

pub struct PayPalClient {
    base_url: String,
    client_id: String,
    client_secret: SecretString,
    http: Client,
    tokens: TokenCache,
}

impl PayPalClient {
    pub fn new(credentials: PayPalCredentials, mode: DeploymentMode, http: Client) -> Self {
        let base_url = match mode {
            DeploymentMode::Live => LIVE_BASE_URL,
            DeploymentMode::Sandbox => SANDBOX_BASE_URL,
        };
        Self {
            base_url: base_url.to_string(),
            client_id: credentials.client_id,
            client_secret: credentials.client_secret,
            http,
            tokens: TokenCache::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Provider request for a single-unit, capture-intent order.
    pub fn order_body(draft: &OrderDraft) -> Value {
        json!({
            "intent": "CAPTURE",
            "purchase_units": [{
                "amount": {
                    "currency_code": draft.currency,
                    "value": draft.amount,
                },
            }],
        })
    }

    async fn access_token(&self) -> Result<String> {
        self.tokens
            .get_or_fetch(|| async {
                let request = self
                    .http
                    .post(format!("{}/v1/oauth2/token", self.base_url))
                    .basic_auth(&self.client_id, Some(self.client_secret.expose_secret()))
                    .form(&[("grant_type", "client_credentials")]);
                let body = send_json(PROVIDER, request).await?;
                parse_token_response(&body, PROVIDER)
            })
            .await
    }

    /// Send an authenticated orders request; a 401 drops the cached token.
    async fn send_authorized(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let result = send_json(PROVIDER, request).await;
        if let Err(Error::Provider { status: Some(401), .. }) = &result {
            warn!("PayPal rejected the access token; dropping it");
            self.tokens.clear().await;
        }
        result
    }

    fn orders_url(&self, tail: &[&str]) -> Result<url::Url> {
        let mut url = url::Url::parse(&self.base_url)
            .map_err(|e| TransportError::Other(format!("invalid PayPal base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| TransportError::Other("PayPal base URL cannot be a base".into()))?
            .pop_if_empty()
            .extend(["v2", "checkout", "orders"])
            .extend(tail);
        Ok(url)
    }
}

fn str_field(body: &Value, name: &str) -> Option<String> {
    body.get(name).and_then(|v| v.as_str()).map(String::from)
}

#[async_trait]
impl PaymentClient for PayPalClient {
    async fn create_order(&self, draft: &OrderDraft) -> Result<CreatedOrder> {
        let token = self.access_token().await?;
        let body = Self::order_body(draft);
        debug!(payload = %Redacted(&body), "creating PayPal order");

        let response = self
            .send_authorized(
                self.http
                    .post(self.orders_url(&[])?)
                    .bearer_auth(token)
                    .header("Prefer", "return=representation")
                    .json(&body),
            )
            .await?;

        let id = str_field(&response, "id")
            .ok_or_else(|| Error::provider(PROVIDER, None, "order response has no id"))?;
        Ok(CreatedOrder { id })
    }

    async fn capture_order(&self, order_id: &str) -> Result<CapturedOrder> {
        let token = self.access_token().await?;
        let response = self
            .send_authorized(
                self.http
                    .post(self.orders_url(&[order_id, "capture"])?)
                    .bearer_auth(token)
                    .json(&json!({})),
            )
            .await?;

        Ok(CapturedOrder {
            status: str_field(&response, "status"),
            id: str_field(&response, "id"),
            payer: response.get("payer").cloned(),
        })
    }

    fn name(&self) -> &'static str {
        PROVIDER
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_selection() {
        let creds = PayPalCredentials {
            client_id: "id".into(),
            client_secret: SecretString::new("secret".into()),
        };
        let sandbox = PayPalClient::new(creds.clone(), DeploymentMode::Sandbox, Client::new());
        assert_eq!(sandbox.base_url(), SANDBOX_BASE_URL);
        let live = PayPalClient::new(creds, DeploymentMode::Live, Client::new());
        assert_eq!(live.base_url(), LIVE_BASE_URL);
    }

    #[test]
    fn test_order_body_shape() {
        let body = PayPalClient::order_body(&OrderDraft {
            amount: "10.00".into(),
            currency: "USD".into(),
        });
        assert_eq!(body["intent"], "CAPTURE");
        assert_eq!(body["purchase_units"].as_array().unwrap().len(), 1);
        assert_eq!(body["purchase_units"][0]["amount"]["currency_code"], "USD");
        assert_eq!(body["purchase_units"][0]["amount"]["value"], "10.00");
    }

    #[test]
    fn test_orders_url_escapes_order_id() {
        let creds = PayPalCredentials {
            client_id: "id".into(),
            client_secret: SecretString::new("secret".into()),
        };
        let client = PayPalClient::new(creds, DeploymentMode::Sandbox, Client::new());
        let url = client.orders_url(&["A/B", "capture"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api-m.sandbox.paypal.com/v2/checkout/orders/A%2FB/capture"
        );
    }
}
