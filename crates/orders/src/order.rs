use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use stockline_core::{BatchId, DomainError, OrderId, ProductId};
use stockline_inventory::AllocationPolicy;

/// Fixed message returned with every successful placement.
pub const CONFIRMATION_MESSAGE: &str = "Order placed. Inventory reserved.";

/// Order status. Placement is the only transition this service performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
        }
    }
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLACED" => Ok(OrderStatus::Placed),
            other => Err(DomainError::invariant(format!("unknown order status: {other}"))),
        }
    }
}

/// Command: place an order for one product.
///
/// Fields are optional so that missing input is reported as a validation
/// failure rather than a decoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrder {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<AllocationPolicy>,
}

/// A placement request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedOrder {
    pub product_id: ProductId,
    pub quantity: i64,
    pub policy: Option<AllocationPolicy>,
}

impl PlaceOrder {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self {
            product_id: Some(product_id),
            quantity: Some(quantity),
            policy: None,
        }
    }

    pub fn with_policy(mut self, policy: AllocationPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn validate(&self) -> Result<ValidatedOrder, DomainError> {
        let quantity = match self.quantity {
            Some(q) if q > 0 => q,
            _ => {
                return Err(DomainError::validation(
                    "Order quantity must be greater than zero.",
                ))
            }
        };

        let product_id = self
            .product_id
            .ok_or_else(|| DomainError::validation("productId is required."))?;

        Ok(ValidatedOrder {
            product_id,
            quantity,
            policy: self.policy,
        })
    }
}

/// An order ready to be persisted; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub reserved_batch_ids: Vec<BatchId>,
}

impl NewOrder {
    pub fn placed(
        product_id: ProductId,
        product_name: impl Into<String>,
        quantity: i64,
        reserved_batch_ids: Vec<BatchId>,
        order_date: NaiveDate,
    ) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
            status: OrderStatus::Placed,
            order_date,
            reserved_batch_ids,
        }
    }

    pub fn into_order(self, order_id: OrderId) -> Order {
        Order {
            order_id,
            product_id: self.product_id,
            product_name: self.product_name,
            quantity: self.quantity,
            status: self.status,
            order_date: self.order_date,
            reserved_batch_ids: self.reserved_batch_ids,
        }
    }
}

/// A persisted order. Written once at placement and never changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Product name as it was when the order was placed.
    pub product_name: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    /// Batches the order drew from, in allocation order.
    pub reserved_batch_ids: Vec<BatchId>,
}

/// Response to a successful placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderConfirmation {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
    pub status: OrderStatus,
    pub reserved_from_batch_ids: Vec<BatchId>,
    pub message: String,
}

impl From<&Order> for OrderConfirmation {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            product_id: order.product_id,
            product_name: order.product_name.clone(),
            quantity: order.quantity,
            status: order.status,
            reserved_from_batch_ids: order.reserved_batch_ids.clone(),
            message: CONFIRMATION_MESSAGE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn validate_accepts_positive_quantity() {
        let cmd = PlaceOrder::new(ProductId::new(1005), 50).with_policy(AllocationPolicy::Lifo);
        let valid = cmd.validate().unwrap();
        assert_eq!(valid.product_id, ProductId::new(1005));
        assert_eq!(valid.quantity, 50);
        assert_eq!(valid.policy, Some(AllocationPolicy::Lifo));
    }

    #[test]
    fn validate_rejects_zero_negative_and_missing_quantity() {
        for quantity in [Some(0), Some(-5), None] {
            let cmd = PlaceOrder {
                product_id: Some(ProductId::new(1001)),
                quantity,
                policy: None,
            };
            match cmd.validate() {
                Err(DomainError::Validation(msg)) => assert!(msg.contains("greater than zero")),
                other => panic!("expected validation error for {quantity:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn validate_rejects_missing_product() {
        let cmd = PlaceOrder {
            product_id: None,
            quantity: Some(3),
            policy: None,
        };
        match cmd.validate() {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("productId")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn new_order_is_placed() {
        let draft = NewOrder::placed(
            ProductId::new(1005),
            "Smartwatch",
            50,
            vec![BatchId::new(5), BatchId::new(7)],
            test_date(),
        );
        assert_eq!(draft.status, OrderStatus::Placed);

        let order = draft.into_order(OrderId::new(11));
        assert_eq!(order.order_id, OrderId::new(11));
        assert_eq!(order.reserved_batch_ids, vec![BatchId::new(5), BatchId::new(7)]);
    }

    #[test]
    fn confirmation_echoes_order() {
        let order = NewOrder::placed(ProductId::new(1001), "Laptop", 10, vec![BatchId::new(1)], test_date())
            .into_order(OrderId::new(3));
        let confirmation = OrderConfirmation::from(&order);

        assert_eq!(confirmation.order_id, OrderId::new(3));
        assert_eq!(confirmation.product_name, "Laptop");
        assert_eq!(confirmation.reserved_from_batch_ids, vec![BatchId::new(1)]);
        assert_eq!(confirmation.message, CONFIRMATION_MESSAGE);

        let json = serde_json::to_value(&confirmation).unwrap();
        assert_eq!(json["status"], "PLACED");
        assert_eq!(json["reservedFromBatchIds"][0], 1);
        assert_eq!(json["message"], "Order placed. Inventory reserved.");
    }

    #[test]
    fn place_order_decodes_wire_shape() {
        let cmd: PlaceOrder =
            serde_json::from_str(r#"{"productId": 1005, "quantity": 50, "policy": "fifo"}"#).unwrap();
        assert_eq!(cmd.product_id, Some(ProductId::new(1005)));
        assert_eq!(cmd.policy, Some(AllocationPolicy::Fifo));

        let missing: PlaceOrder = serde_json::from_str(r#"{"productId": 1005}"#).unwrap();
        assert_eq!(missing.quantity, None);

        assert!(serde_json::from_str::<PlaceOrder>(r#"{"productId": 1, "quantity": 1, "policy": "random"}"#).is_err());
    }
}
