//! Gateway to a remote inventory service.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::{debug, instrument, warn};

use stockline_core::ProductId;
use stockline_inventory::{DeductionRequest, ProductStock, StockLookup};

use super::wire::ErrorBody;
use super::{GatewayError, InventoryGateway};

/// Talks to `GET /inventory/{productId}` and `POST /inventory/update` on
/// another instance of this service.
#[derive(Debug, Clone)]
pub struct HttpInventoryGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpInventoryGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Upstream(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn describe_failure(resp: reqwest::Response) -> (StatusCode, Option<ErrorBody>) {
        let status = resp.status();
        let body = resp.json::<ErrorBody>().await.ok();
        (status, body)
    }
}

fn unreachable(err: reqwest::Error) -> GatewayError {
    GatewayError::Upstream(format!("inventory service unreachable: {err}"))
}

fn unexpected(status: StatusCode, body: Option<&ErrorBody>) -> GatewayError {
    let detail = body.map(|b| b.message.as_str()).unwrap_or("no details");
    GatewayError::Upstream(format!("inventory service returned {status}: {detail}"))
}

#[async_trait::async_trait]
impl InventoryGateway for HttpInventoryGateway {
    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn fetch_stock(&self, product_id: ProductId) -> Result<StockLookup, GatewayError> {
        let url = format!("{}/inventory/{}", self.base_url, product_id);
        let resp = self.client.get(&url).send().await.map_err(unreachable)?;

        match resp.status() {
            StatusCode::OK => {
                let stock: ProductStock = resp
                    .json()
                    .await
                    .map_err(|e| GatewayError::Upstream(format!("invalid inventory response: {e}")))?;
                debug!(batches = stock.batches.len(), "inventory read");
                Ok(StockLookup::Found(stock))
            }
            StatusCode::NOT_FOUND => Ok(StockLookup::NotFound),
            _ => {
                let (status, body) = Self::describe_failure(resp).await;
                warn!(%status, "inventory read failed");
                Err(unexpected(status, body.as_ref()))
            }
        }
    }

    #[instrument(
        skip(self, request),
        fields(product_id = %request.product_id, entries = request.batch_updates.len())
    )]
    async fn apply_deductions(&self, request: &DeductionRequest) -> Result<(), GatewayError> {
        let url = format!("{}/inventory/update", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(unreachable)?;

        if resp.status().is_success() {
            return Ok(());
        }

        let (status, body) = Self::describe_failure(resp).await;
        if let Some(err) = body.as_ref().and_then(ErrorBody::to_deduction_error) {
            return Err(GatewayError::Deduction(err));
        }
        warn!(%status, "inventory write failed");
        Err(unexpected(status, body.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let gateway = HttpInventoryGateway::new("http://inventory:8081/", Duration::from_secs(1)).unwrap();
        assert_eq!(gateway.base_url(), "http://inventory:8081");
    }

    #[tokio::test]
    async fn unreachable_service_is_an_upstream_error() {
        let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
        // Listener is dropped here, so nothing accepts on `addr`.
        let gateway = HttpInventoryGateway::new(format!("http://{addr}"), Duration::from_millis(500)).unwrap();

        let err = gateway.fetch_stock(ProductId::new(1005)).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }
}
