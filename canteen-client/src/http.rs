//! HTTP client for network calls to the canteen server

use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use shared::models::{Canteen, Order};
use shared::order::{CreateOrderRequest, OrderStatus, UpdateStatusRequest};

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Error envelope returned by the server on failure
#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Outcome of an order submission
///
/// The three-way split matters: a timed-out request may have committed on
/// the server, so it must NOT be treated as a failure. The optimistic
/// entry stays in place and the caller resolves the truth later via
/// [`CanteenApi::resolve_request`] with the same request id.
#[derive(Debug)]
pub enum CreateOutcome {
    /// Server confirmed; replace the optimistic entry with this record
    Confirmed(Order),
    /// Definitive rejection; remove the optimistic entry
    Rejected(ClientError),
    /// No response before the deadline; outcome unknown
    Unknown,
}

/// HTTP client for the canteen server API
#[derive(Debug, Clone)]
pub struct CanteenApi {
    client: Client,
    base_url: String,
}

impl CanteenApi {
    /// Create a new client from configuration
    pub fn new(config: &ClientConfig) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========== Orders ==========

    /// Submit an order
    ///
    /// Reuses `req.request_id` as the idempotency key, so calling this
    /// again with the same request after an `Unknown` outcome is safe.
    pub async fn create_order(&self, req: &CreateOrderRequest) -> CreateOutcome {
        let result = self
            .client
            .post(self.url("/api/orders"))
            .json(req)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                tracing::warn!(request_id = %req.request_id, "Create timed out, outcome unknown");
                return CreateOutcome::Unknown;
            }
            Err(e) => return CreateOutcome::Rejected(e.into()),
        };

        match Self::handle_response::<Order>(response).await {
            Ok(order) => CreateOutcome::Confirmed(order),
            // The response arrived but could not be read; the order may
            // have committed, so fall back to reconciliation
            Err(ClientError::Http(e)) if e.is_timeout() => CreateOutcome::Unknown,
            Err(e) => CreateOutcome::Rejected(e),
        }
    }

    /// Look up the order a request id produced, if any
    ///
    /// `Ok(None)` means the request never reached the store: the original
    /// submission definitively failed and the optimistic entry can go.
    pub async fn resolve_request(&self, request_id: &str) -> ClientResult<Option<Order>> {
        let response = self
            .client
            .get(self.url(&format!("/api/orders/by-request/{request_id}")))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Self::handle_response(response).await.map(Some)
    }

    /// Get an order by id
    pub async fn get_order(&self, order_id: &str) -> ClientResult<Order> {
        let response = self
            .client
            .get(self.url(&format!("/api/orders/{order_id}")))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// Record a status transition
    pub async fn update_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<Order> {
        let response = self
            .client
            .put(self.url(&format!("/api/orders/{order_id}/status")))
            .json(&UpdateStatusRequest { status })
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// List a canteen's orders for today (resync source for dashboards)
    pub async fn list_canteen(&self, canteen_id: &str) -> ClientResult<Vec<Order>> {
        let response = self
            .client
            .get(self.url("/api/orders"))
            .query(&[("canteen_id", canteen_id)])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    /// List a customer's orders for today (resync source for the app)
    pub async fn list_user(&self, user_id: &str) -> ClientResult<Vec<Order>> {
        let response = self
            .client
            .get(self.url("/api/orders"))
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ========== Canteens ==========

    /// Get a canteen by id
    pub async fn get_canteen(&self, canteen_id: &str) -> ClientResult<Canteen> {
        let response = self
            .client
            .get(self.url(&format!("/api/canteens/{canteen_id}")))
            .send()
            .await?;
        Self::handle_response(response).await
    }

    // ========== Internal ==========

    async fn handle_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let status = response.status();
        if status.is_success() {
            return response.json().await.map_err(Into::into);
        }

        let text = response.text().await.unwrap_or_default();
        let body: Option<ErrorBody> = serde_json::from_str(&text).ok();
        Err(match body {
            Some(body) => match body.code.as_str() {
                "E0002" => ClientError::Validation(body.message),
                "E0003" => ClientError::NotFound(body.message),
                "E0004" => ClientError::InvalidTransition(body.message),
                "E0005" => ClientError::CanteenUnavailable(body.message),
                "E9003" => ClientError::Busy(body.message),
                _ => ClientError::Internal(body.message),
            },
            None => match status {
                StatusCode::NOT_FOUND => ClientError::NotFound(text),
                StatusCode::BAD_REQUEST => ClientError::Validation(text),
                _ => ClientError::Internal(text),
            },
        })
    }
}
