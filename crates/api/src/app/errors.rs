use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use stockline_core::DomainError;
use stockline_infra::inventory_gateway::wire::{codes, ErrorBody};
use stockline_infra::StoreError;
use stockline_inventory::DeductionError;
use stockline_orders::PlacementError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    error_body(status, ErrorBody::new(code, message))
}

pub fn error_body(status: StatusCode, body: ErrorBody) -> Response {
    (status, Json(body)).into_response()
}

pub fn placement_error_to_response(err: PlacementError) -> Response {
    let body = ErrorBody::new(err.code(), err.to_string());
    match err {
        PlacementError::InvalidRequest(_) => error_body(StatusCode::BAD_REQUEST, body),
        PlacementError::ProductNotFound(_) => error_body(StatusCode::NOT_FOUND, body),
        PlacementError::InsufficientInventory {
            requested, available, ..
        } => error_body(
            StatusCode::UNPROCESSABLE_ENTITY,
            body.with_quantities(requested, available),
        ),
        PlacementError::BatchNotFound(batch_id) => error_body(StatusCode::CONFLICT, body.with_batch(batch_id)),
        PlacementError::InsufficientBatchQuantity {
            batch_id,
            requested,
            available,
        } => error_body(
            StatusCode::CONFLICT,
            body.with_batch(batch_id).with_quantities(requested, available),
        ),
        PlacementError::Upstream(_) => error_body(StatusCode::BAD_GATEWAY, body),
        PlacementError::Store(_) => error_body(StatusCode::INTERNAL_SERVER_ERROR, body),
    }
}

/// Inventory write failures. A missing batch is a 404 here; on the order path
/// the same failure is a conflict with the plan.
pub fn deduction_error_to_response(err: &DeductionError) -> Response {
    let status = match err {
        DeductionError::BatchNotFound(_) => StatusCode::NOT_FOUND,
        DeductionError::InsufficientBatchQuantity { .. } => StatusCode::CONFLICT,
    };
    error_body(status, ErrorBody::from(err))
}

pub fn store_error_to_response(err: StoreError) -> Response {
    match err {
        StoreError::Deduction(e) => deduction_error_to_response(&e),
        StoreError::Storage(msg) => {
            error!(error = %msg, "inventory store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, codes::STORE_ERROR, msg)
        }
    }
}

pub fn domain_error_to_response(err: DomainError) -> Response {
    let message = match err {
        DomainError::Validation(msg)
        | DomainError::InvalidId(msg)
        | DomainError::InvariantViolation(msg) => msg,
    };
    json_error(StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, message)
}

pub fn rejection_to_response(rejection: JsonRejection) -> Response {
    json_error(StatusCode::BAD_REQUEST, codes::INVALID_REQUEST, rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockline_core::{BatchId, ProductId};

    #[test]
    fn placement_errors_map_to_documented_statuses() {
        let cases = [
            (PlacementError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
            (PlacementError::ProductNotFound(ProductId::new(1)), StatusCode::NOT_FOUND),
            (
                PlacementError::InsufficientInventory {
                    product_id: ProductId::new(1),
                    requested: 10,
                    available: 3,
                },
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (PlacementError::BatchNotFound(BatchId::new(2)), StatusCode::CONFLICT),
            (
                PlacementError::InsufficientBatchQuantity {
                    batch_id: BatchId::new(2),
                    requested: 5,
                    available: 1,
                },
                StatusCode::CONFLICT,
            ),
            (PlacementError::Upstream("down".into()), StatusCode::BAD_GATEWAY),
            (PlacementError::Store("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(placement_error_to_response(err).status(), status);
        }
    }

    #[test]
    fn missing_batch_on_inventory_write_is_not_found() {
        let response = deduction_error_to_response(&DeductionError::BatchNotFound(BatchId::new(9)));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
