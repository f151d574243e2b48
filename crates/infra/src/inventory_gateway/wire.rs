//! JSON error body shared by the HTTP service and the HTTP gateway.

use serde::{Deserialize, Serialize};

use stockline_core::BatchId;
use stockline_inventory::DeductionError;

/// Stable error codes carried in the `error` field.
pub mod codes {
    pub const INVALID_REQUEST: &str = "invalid_request";
    pub const PRODUCT_NOT_FOUND: &str = "product_not_found";
    pub const ORDER_NOT_FOUND: &str = "order_not_found";
    pub const INSUFFICIENT_INVENTORY: &str = "insufficient_inventory";
    pub const BATCH_NOT_FOUND: &str = "batch_not_found";
    pub const INSUFFICIENT_BATCH_QUANTITY: &str = "insufficient_batch_quantity";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const STORE_ERROR: &str = "store_error";
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requested: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available: Option<i64>,
}

impl ErrorBody {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            error: code.to_string(),
            message: message.into(),
            batch_id: None,
            requested: None,
            available: None,
        }
    }

    pub fn with_batch(mut self, batch_id: BatchId) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    pub fn with_quantities(mut self, requested: i64, available: i64) -> Self {
        self.requested = Some(requested);
        self.available = Some(available);
        self
    }

    /// Rebuild the typed deduction failure, if the body describes one.
    pub fn to_deduction_error(&self) -> Option<DeductionError> {
        let batch_id = self.batch_id?;
        match self.error.as_str() {
            codes::BATCH_NOT_FOUND => Some(DeductionError::BatchNotFound(batch_id)),
            codes::INSUFFICIENT_BATCH_QUANTITY => Some(DeductionError::InsufficientBatchQuantity {
                batch_id,
                requested: self.requested?,
                available: self.available?,
            }),
            _ => None,
        }
    }
}

impl From<&DeductionError> for ErrorBody {
    fn from(err: &DeductionError) -> Self {
        match err {
            DeductionError::BatchNotFound(batch_id) => {
                ErrorBody::new(codes::BATCH_NOT_FOUND, format!("Batch not found: {batch_id}")).with_batch(*batch_id)
            }
            DeductionError::InsufficientBatchQuantity {
                batch_id,
                requested,
                available,
            } => ErrorBody::new(
                codes::INSUFFICIENT_BATCH_QUANTITY,
                format!("Insufficient quantity in batch: {batch_id}. Requested: {requested}, Available: {available}"),
            )
            .with_batch(*batch_id)
            .with_quantities(*requested, *available),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduction_errors_survive_the_wire() {
        let errors = [
            DeductionError::BatchNotFound(BatchId::new(9)),
            DeductionError::InsufficientBatchQuantity {
                batch_id: BatchId::new(7),
                requested: 11,
                available: 4,
            },
        ];

        for err in errors {
            let json = serde_json::to_string(&ErrorBody::from(&err)).unwrap();
            let body: ErrorBody = serde_json::from_str(&json).unwrap();
            assert_eq!(body.to_deduction_error(), Some(err));
        }
    }

    #[test]
    fn batch_fields_are_camel_case() {
        let body = ErrorBody::from(&DeductionError::InsufficientBatchQuantity {
            batch_id: BatchId::new(7),
            requested: 41,
            available: 40,
        });
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["batchId"], 7);
        assert_eq!(json["requested"], 41);
        assert_eq!(json["available"], 40);
        assert!(json.get("batch_id").is_none());
    }

    #[test]
    fn plain_errors_have_no_batch_fields() {
        let body = ErrorBody::new(codes::INVALID_REQUEST, "batchUpdates is required.");
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json, serde_json::json!({"error": "invalid_request", "message": "batchUpdates is required."}));
        assert_eq!(body.to_deduction_error(), None);
    }

    #[test]
    fn incomplete_batch_error_is_not_decoded() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"error": "insufficient_batch_quantity", "message": "x", "batchId": 7}"#).unwrap();
        assert_eq!(body.to_deduction_error(), None);
    }
}
