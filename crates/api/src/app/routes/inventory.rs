use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::info;

use stockline_core::ProductId;
use stockline_infra::inventory_gateway::wire::codes;
use stockline_inventory::StockLookup;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/update", post(update_inventory))
        .route("/:product_id", get(get_inventory))
}

/// Batches of one product, expiry ascending.
pub async fn get_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_id): Path<String>,
) -> Response {
    let product_id: ProductId = match product_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().stock_by_expiry(product_id).await {
        Ok(StockLookup::Found(stock)) => (StatusCode::OK, Json(stock)).into_response(),
        Ok(StockLookup::NotFound) => errors::json_error(
            StatusCode::NOT_FOUND,
            codes::PRODUCT_NOT_FOUND,
            format!("No inventory found for productId: {product_id}"),
        ),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Apply batch deductions.
pub async fn update_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UpdateInventoryRequest>, JsonRejection>,
) -> Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    let request = match body.into_deduction_request() {
        Ok(request) => request,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.inventory().apply_deductions(&request).await {
        Ok(outcome) => {
            info!(
                product_id = %request.product_id,
                applied = outcome.applied,
                replayed = outcome.replayed,
                "inventory updated"
            );
            (
                StatusCode::OK,
                Json(dto::UpdateInventoryResponse::new(request.product_id, outcome)),
            )
                .into_response()
        }
        Err(e) => errors::store_error_to_response(e),
    }
}
