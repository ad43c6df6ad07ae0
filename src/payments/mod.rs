//! Payment order proxying.
//!
//! [`PaymentService`] validates caller input and hands a provider-neutral
//! [`OrderDraft`] to a [`PaymentClient`]. The provider is the system of record:
//! nothing is persisted locally and duplicate captures are left to the
//! provider's own idempotency handling.

mod paypal;

pub use paypal::{PayPalClient, LIVE_BASE_URL, SANDBOX_BASE_URL};

use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

use crate::types::{CaptureOrderRequest, CapturedOrder, CreateOrderRequest, CreatedOrder, OrderDraft};
use crate::{Error, Result};

#[async_trait]
pub trait PaymentClient: Send + Sync {
    async fn create_order(&self, draft: &OrderDraft) -> Result<CreatedOrder>;

    async fn capture_order(&self, order_id: &str) -> Result<CapturedOrder>;

    fn name(&self) -> &'static str;
}

pub struct PaymentService {
    client: Option<Arc<dyn PaymentClient>>,
}

impl PaymentService {
    /// `client` is `None` when no provider credentials were configured.
    pub fn new(client: Option<Arc<dyn PaymentClient>>) -> Self {
        Self { client }
    }

    fn client(&self) -> Result<&Arc<dyn PaymentClient>> {
        self.client
            .as_ref()
            .ok_or_else(|| Error::Unavailable("payment client".to_string()))
    }

    pub async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreatedOrder> {
        let amount = request
            .amount_text()
            .ok_or_else(|| Error::invalid_request("Amount is required", "amount"))?;
        let draft = OrderDraft {
            amount,
            currency: request.currency_or_default(),
        };

        let client = self.client()?;
        let order = client.create_order(&draft).await?;
        info!(
            order_id = %order.id,
            amount = %draft.amount,
            currency = %draft.currency,
            provider = client.name(),
            "payment order created"
        );
        Ok(order)
    }

    pub async fn capture_order(&self, request: &CaptureOrderRequest) -> Result<CapturedOrder> {
        let order_id = request
            .order_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid_request("Order ID is required", "orderID"))?;

        let client = self.client()?;
        let captured = client.capture_order(order_id).await?;
        info!(
            order_id,
            status = captured.status.as_deref().unwrap_or("unknown"),
            provider = client.name(),
            "payment order captured"
        );
        Ok(captured)
    }
}
