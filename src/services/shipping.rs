//! Carrier shipping endpoints
//!
//! Creates shipping labels through the backend's carrier integration and
//! reports shipped orders back. The carrier logic itself lives server
//! side; this client only owns the request/response contract.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::models::labels::LabelResponse;
use crate::models::shipment::{LabelRequest, ShipmentMetadata};

#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("shipping endpoint returned HTTP {0}")]
    Api(StatusCode),
}

/// Transport seam for the shipping endpoints.
#[async_trait]
pub trait ShippingApi: Send + Sync {
    /// Ask the backend to create carrier label(s) for a packed order.
    async fn create_labels(&self, request: &LabelRequest) -> Result<LabelResponse, ShipError>;

    /// Record the order as shipped with its carrier linkage.
    async fn mark_shipped(
        &self,
        order_id: i64,
        shipment: &ShipmentMetadata,
    ) -> Result<(), ShipError>;
}

/// REST client for the backend's order shipping endpoints.
pub struct ShippingClient {
    http: reqwest::Client,
    base_url: String,
    store_id: String,
    api_token: Option<String>,
}

impl ShippingClient {
    pub fn new(base_url: &str, store_id: &str, api_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            store_id: store_id.to_string(),
            api_token,
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ShippingApi for ShippingClient {
    async fn create_labels(&self, request: &LabelRequest) -> Result<LabelResponse, ShipError> {
        let url = format!("{}/orders/sendcloud/ship-order", self.base_url);
        let resp = self
            .authorize(self.http.post(&url).query(&[("store_id", &self.store_id)]))
            .json(request)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ShipError::Api(resp.status()));
        }
        Ok(resp.json().await?)
    }

    async fn mark_shipped(
        &self,
        order_id: i64,
        shipment: &ShipmentMetadata,
    ) -> Result<(), ShipError> {
        let url = format!("{}/orders/{}/ship", self.base_url, order_id);
        let resp = self
            .authorize(self.http.post(&url).query(&[("store_id", &self.store_id)]))
            .json(shipment)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ShipError::Api(resp.status()));
        }
        Ok(())
    }
}
