//! Pack queue claim client
//!
//! Thin client of the server-side lock protocol: claim the next order,
//! renew the lease, release it on skip/abandonment, or complete it.
//! Mutual exclusion lives entirely on the server; this side only has to
//! present the lease token on every follow-up call.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::models::order::ClaimedOrder;
use crate::models::shipment::ShipmentMetadata;

/// Server-issued opaque credential for one claimed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseToken(String);

impl LeaseToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a claim request. An empty pool is a normal answer, not an
/// error, and must not trigger retries.
#[derive(Debug)]
pub enum ClaimOutcome {
    Claimed { order: ClaimedOrder, lease: LeaseToken },
    Empty,
}

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("pack queue endpoint returned HTTP {0}")]
    Api(StatusCode),

    #[error("no active lease for this operation")]
    NoActiveLease,
}

/// Transport seam for the claim protocol, so workflow code can be
/// exercised against a fake queue.
#[async_trait]
pub trait PackQueue: Send + Sync {
    async fn claim_next(
        &self,
        operator_id: &str,
        previous_order_id: Option<i64>,
    ) -> Result<ClaimOutcome, ClaimError>;

    async fn heartbeat(&self, order_id: i64, lease: &LeaseToken) -> Result<(), ClaimError>;

    async fn unlock(&self, order_id: i64, lease: &LeaseToken, is_skip: bool)
        -> Result<(), ClaimError>;

    async fn complete(
        &self,
        order_id: i64,
        lease: &LeaseToken,
        shipment: &ShipmentMetadata,
    ) -> Result<(), ClaimError>;
}

/// REST client for the packgo lock endpoints.
pub struct PackQueueClient {
    http: reqwest::Client,
    base_url: String,
    store_id: String,
    api_token: Option<String>,
}

#[derive(Deserialize)]
struct ClaimResponse {
    #[serde(default)]
    order: Option<ClaimedOrder>,
    #[serde(default, rename = "lockToken")]
    lock_token: Option<String>,
}

impl PackQueueClient {
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

    async fn post_lease_op(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(), ClaimError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorize(self.http.post(&url).query(&[("store_id", &self.store_id)]))
            .json(&body)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClaimError::Api(resp.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl PackQueue for PackQueueClient {
    async fn claim_next(
        &self,
        operator_id: &str,
        previous_order_id: Option<i64>,
    ) -> Result<ClaimOutcome, ClaimError> {
        let url = format!("{}/orders/packgo/next", self.base_url);
        let mut req = self
            .http
            .get(&url)
            .query(&[("store_id", self.store_id.as_str()), ("userId", operator_id)]);
        if let Some(previous) = previous_order_id {
            req = req.query(&[("currentId", previous.to_string())]);
        }

        let resp = self.authorize(req).send().await?;
        match resp.status() {
            StatusCode::NO_CONTENT => Ok(ClaimOutcome::Empty),
            status if status.is_success() => {
                let body: ClaimResponse = resp.json().await?;
                match (body.order, body.lock_token) {
                    (Some(order), Some(token)) => Ok(ClaimOutcome::Claimed {
                        order,
                        lease: LeaseToken::new(token),
                    }),
                    _ => Ok(ClaimOutcome::Empty),
                }
            }
            status => Err(ClaimError::Api(status)),
        }
    }

    async fn heartbeat(&self, order_id: i64, lease: &LeaseToken) -> Result<(), ClaimError> {
        self.post_lease_op(
            "/orders/packgo/heartbeat",
            serde_json::json!({ "orderId": order_id, "lockToken": lease.as_str() }),
        )
        .await
    }

    async fn unlock(
        &self,
        order_id: i64,
        lease: &LeaseToken,
        is_skip: bool,
    ) -> Result<(), ClaimError> {
        self.post_lease_op(
            "/orders/packgo/unlock",
            serde_json::json!({
                "orderId": order_id,
                "lockToken": lease.as_str(),
                "isSkip": is_skip,
            }),
        )
        .await
    }

    async fn complete(
        &self,
        order_id: i64,
        lease: &LeaseToken,
        shipment: &ShipmentMetadata,
    ) -> Result<(), ClaimError> {
        self.post_lease_op(
            "/orders/packgo/complete",
            serde_json::json!({
                "orderId": order_id,
                "lockToken": lease.as_str(),
                "parcelId": shipment.parcel_id,
                "tracking_number": shipment.tracking_number,
                "boxes": shipment.boxes,
            }),
        )
        .await
    }
}
