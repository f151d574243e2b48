use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use stockline_core::OrderId;
use stockline_infra::inventory_gateway::wire::codes;
use stockline_orders::PlaceOrder;

use crate::app::errors;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/order", post(place_order))
        .route("/order/:order_id", get(get_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<PlaceOrder>, JsonRejection>,
) -> Response {
    let Json(command) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::rejection_to_response(rejection),
    };

    match services.placement().place_order(&command).await {
        Ok(confirmation) => (StatusCode::CREATED, Json(confirmation)).into_response(),
        Err(e) => errors::placement_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(order_id): Path<String>,
) -> Response {
    let order_id: OrderId = match order_id.parse() {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.placement().find_order(order_id).await {
        Ok(Some(order)) => (StatusCode::OK, Json(order)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            codes::ORDER_NOT_FOUND,
            format!("Order not found: {order_id}"),
        ),
        Err(e) => errors::placement_error_to_response(e),
    }
}
