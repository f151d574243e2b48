//! Order placement pipeline.
//!
//! ```text
//! PlaceOrder
//!   ↓
//! 1. Validate (quantity > 0, product present)
//!   ↓
//! 2. Read the product's batches through the gateway (expiry ascending)
//!   ↓
//! 3. Allocate under the request's policy (or the default)
//!   ↓
//! 4. Apply the plan as one deduction request, tagged with a fresh reservation id
//!   ↓
//! 5. Persist the order (status PLACED, today's date, batch ids in draw order)
//! ```
//!
//! A failure at any step ends the attempt; later steps never run. A failure at
//! step 4 may leave earlier entries deducted when the store runs in per-batch
//! mode. A failure at step 5 leaves the deduction in place.

use chrono::Utc;
use tracing::{error, info, instrument, warn};

use stockline_core::{OrderId, ReservationId};
use stockline_inventory::{allocate, AllocationPolicy, StockLookup};
use stockline_orders::{NewOrder, Order, OrderConfirmation, PlaceOrder, PlacementError};

use crate::inventory_gateway::InventoryGateway;
use crate::order_store::OrderRepository;

pub struct OrderPlacement<G, R> {
    gateway: G,
    orders: R,
    default_policy: AllocationPolicy,
}

impl<G, R> OrderPlacement<G, R> {
    pub fn new(gateway: G, orders: R) -> Self {
        Self {
            gateway,
            orders,
            default_policy: AllocationPolicy::default(),
        }
    }

    /// Policy used when a request does not name one.
    pub fn with_default_policy(mut self, policy: AllocationPolicy) -> Self {
        self.default_policy = policy;
        self
    }
}

impl<G, R> OrderPlacement<G, R>
where
    G: InventoryGateway,
    R: OrderRepository,
{
    #[instrument(
        skip(self, command),
        fields(product_id = ?command.product_id, quantity = ?command.quantity)
    )]
    pub async fn place_order(&self, command: &PlaceOrder) -> Result<OrderConfirmation, PlacementError> {
        let result = self.try_place(command).await;
        match &result {
            Ok(confirmation) => info!(
                order_id = %confirmation.order_id,
                product_name = %confirmation.product_name,
                reserved = ?confirmation.reserved_from_batch_ids,
                "order placed"
            ),
            Err(PlacementError::Store(_)) => {}
            Err(err) => warn!(code = err.code(), "order rejected: {err}"),
        }
        result
    }

    async fn try_place(&self, command: &PlaceOrder) -> Result<OrderConfirmation, PlacementError> {
        let order = command.validate()?;
        let policy = order.policy.unwrap_or(self.default_policy);

        let stock = match self.gateway.fetch_stock(order.product_id).await? {
            StockLookup::Found(stock) => stock,
            StockLookup::NotFound => return Err(PlacementError::ProductNotFound(order.product_id)),
        };

        let plan = allocate(order.product_id, &stock.batches, order.quantity, policy)?;

        let reservation_id = ReservationId::new();
        self.gateway
            .apply_deductions(&plan.to_deduction_request(reservation_id))
            .await?;

        let draft = NewOrder::placed(
            order.product_id,
            stock.product_name,
            order.quantity,
            plan.batch_ids(),
            Utc::now().date_naive(),
        );
        let saved = self.orders.save(draft).await.map_err(|e| {
            error!(
                %reservation_id,
                product_id = %order.product_id,
                "inventory deducted but order was not recorded: {e}"
            );
            PlacementError::Store(e.to_string())
        })?;

        Ok(OrderConfirmation::from(&saved))
    }

    pub async fn find_order(&self, order_id: OrderId) -> Result<Option<Order>, PlacementError> {
        self.orders
            .get(order_id)
            .await
            .map_err(|e| PlacementError::Store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use chrono::NaiveDate;

    use stockline_core::{BatchId, ProductId};
    use stockline_inventory::{Batch, BatchDeduction, DeductionMode, DeductionRequest};
    use stockline_orders::{OrderStatus, CONFIRMATION_MESSAGE};

    use crate::inventory_gateway::{GatewayError, LocalInventoryGateway};
    use crate::inventory_store::{InMemoryInventoryStore, InventoryStore};
    use crate::order_store::InMemoryOrderRepository;
    use crate::StoreError;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Local gateway that records every call. `interleaved` is applied to the
    /// store just before each write, standing in for a concurrent order.
    struct RecordingGateway {
        inner: LocalInventoryGateway<Arc<InMemoryInventoryStore>>,
        reads: AtomicUsize,
        writes: Mutex<Vec<DeductionRequest>>,
        interleaved: Option<DeductionRequest>,
    }

    impl RecordingGateway {
        fn new(store: Arc<InMemoryInventoryStore>) -> Self {
            Self {
                inner: LocalInventoryGateway::new(store),
                reads: AtomicUsize::new(0),
                writes: Mutex::new(Vec::new()),
                interleaved: None,
            }
        }

        fn with_interleaved(mut self, request: DeductionRequest) -> Self {
            self.interleaved = Some(request);
            self
        }

        fn read_count(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }

        fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl InventoryGateway for RecordingGateway {
        async fn fetch_stock(&self, product_id: ProductId) -> Result<StockLookup, GatewayError> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.fetch_stock(product_id).await
        }

        async fn apply_deductions(&self, request: &DeductionRequest) -> Result<(), GatewayError> {
            self.writes.lock().unwrap().push(request.clone());
            if let Some(other) = &self.interleaved {
                self.inner.store().apply_deductions(other).await?;
            }
            self.inner.apply_deductions(request).await
        }
    }

    struct FailingOrders;

    #[async_trait::async_trait]
    impl OrderRepository for FailingOrders {
        async fn save(&self, _order: NewOrder) -> Result<Order, StoreError> {
            Err(StoreError::storage("disk full"))
        }

        async fn get(&self, _order_id: OrderId) -> Result<Option<Order>, StoreError> {
            Ok(None)
        }
    }

    fn seeded_store(mode: DeductionMode) -> Arc<InMemoryInventoryStore> {
        let store = InMemoryInventoryStore::new().with_mode(mode);
        let watch = ProductId::new(1005);
        store.add_product(watch, "Smartwatch").unwrap();
        store.add_batch(watch, Batch::new(BatchId::new(5), 39, date(2026, 3, 31))).unwrap();
        store.add_batch(watch, Batch::new(BatchId::new(7), 40, date(2026, 4, 24))).unwrap();
        store.add_batch(watch, Batch::new(BatchId::new(2), 52, date(2026, 5, 30))).unwrap();

        let laptop = ProductId::new(1001);
        store.add_product(laptop, "Laptop").unwrap();
        store.add_batch(laptop, Batch::new(BatchId::new(1), 68, date(2026, 6, 25))).unwrap();

        store.add_product(ProductId::new(1009), "Tablet").unwrap();
        Arc::new(store)
    }

    fn drain_batch_7() -> DeductionRequest {
        DeductionRequest::new(ProductId::new(1005), vec![BatchDeduction::new(BatchId::new(7), 35)])
    }

    fn quantity(store: &InMemoryInventoryStore, id: i64) -> i64 {
        store.batch(BatchId::new(id)).unwrap().unwrap().quantity
    }

    type Placement = OrderPlacement<Arc<RecordingGateway>, Arc<InMemoryOrderRepository>>;

    fn placement(store: Arc<InMemoryInventoryStore>) -> (Placement, Arc<RecordingGateway>, Arc<InMemoryOrderRepository>) {
        let gateway = Arc::new(RecordingGateway::new(store));
        let orders = Arc::new(InMemoryOrderRepository::new());
        (OrderPlacement::new(gateway.clone(), orders.clone()), gateway, orders)
    }

    #[tokio::test]
    async fn spans_two_batches_in_expiry_order() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, gateway, orders) = placement(store.clone());

        let confirmation = placement
            .place_order(&PlaceOrder::new(ProductId::new(1005), 50))
            .await
            .unwrap();

        assert_eq!(confirmation.reserved_from_batch_ids, vec![BatchId::new(5), BatchId::new(7)]);
        assert_eq!(confirmation.product_name, "Smartwatch");
        assert_eq!(confirmation.status, OrderStatus::Placed);
        assert_eq!(confirmation.message, CONFIRMATION_MESSAGE);
        assert_eq!(quantity(&store, 5), 0);
        assert_eq!(quantity(&store, 7), 29);
        assert_eq!(quantity(&store, 2), 52);

        let writes = gateway.writes.lock().unwrap().clone();
        assert_eq!(writes.len(), 1);
        let lines: Vec<(i64, i64)> = writes[0]
            .batch_updates
            .iter()
            .map(|l| (l.batch_id.get(), l.quantity_to_deduct))
            .collect();
        assert_eq!(lines, vec![(5, 39), (7, 11)]);
        assert!(writes[0].reservation_id.is_some());

        let stored = orders.get(confirmation.order_id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 50);
        assert_eq!(stored.reserved_batch_ids, confirmation.reserved_from_batch_ids);
        assert_eq!(stored.order_date, Utc::now().date_naive());
    }

    #[tokio::test]
    async fn single_batch_fully_covers_order() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, _, _) = placement(store.clone());

        let confirmation = placement
            .place_order(&PlaceOrder::new(ProductId::new(1001), 10))
            .await
            .unwrap();

        assert_eq!(confirmation.reserved_from_batch_ids, vec![BatchId::new(1)]);
        assert_eq!(quantity(&store, 1), 58);
    }

    #[tokio::test]
    async fn shortfall_writes_nothing_and_records_nothing() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, gateway, orders) = placement(store.clone());

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(1005), 200))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PlacementError::InsufficientInventory {
                product_id: ProductId::new(1005),
                requested: 200,
                available: 131,
            }
        );
        assert_eq!(gateway.write_count(), 0);
        assert!(orders.all().unwrap().is_empty());
        assert_eq!(quantity(&store, 5), 39);
    }

    #[tokio::test]
    async fn invalid_quantity_never_reaches_inventory() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, gateway, orders) = placement(store);

        for quantity in [Some(0), Some(-3), None] {
            let command = PlaceOrder {
                product_id: Some(ProductId::new(1005)),
                quantity,
                policy: None,
            };
            let err = placement.place_order(&command).await.unwrap_err();
            assert_eq!(err.code(), "invalid_request");
        }

        assert_eq!(gateway.read_count(), 0);
        assert_eq!(gateway.write_count(), 0);
        assert!(orders.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, gateway, _) = placement(store);

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(4242), 1))
            .await
            .unwrap_err();

        assert_eq!(err, PlacementError::ProductNotFound(ProductId::new(4242)));
        assert_eq!(gateway.write_count(), 0);
    }

    #[tokio::test]
    async fn product_without_batches_is_not_found() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, gateway, orders) = placement(store);

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(1009), 1))
            .await
            .unwrap_err();

        assert_eq!(err, PlacementError::ProductNotFound(ProductId::new(1009)));
        assert_eq!(gateway.read_count(), 1);
        assert_eq!(gateway.write_count(), 0);
        assert!(orders.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn drained_product_is_a_shortfall() {
        let store = seeded_store(DeductionMode::PerBatch);
        store
            .apply_deductions(&DeductionRequest::new(
                ProductId::new(1001),
                vec![BatchDeduction::new(BatchId::new(1), 68)],
            ))
            .await
            .unwrap();
        let (placement, _, _) = placement(store);

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(1001), 1))
            .await
            .unwrap_err();

        assert!(matches!(err, PlacementError::InsufficientInventory { available: 0, .. }));
    }

    #[tokio::test]
    async fn stale_plan_surfaces_batch_error_and_keeps_earlier_deductions() {
        let store = seeded_store(DeductionMode::PerBatch);
        // A concurrent order drains batch 7 between read and write.
        let gateway = RecordingGateway::new(store.clone()).with_interleaved(drain_batch_7());
        let orders = Arc::new(InMemoryOrderRepository::new());
        let placement = OrderPlacement::new(Arc::new(gateway), orders.clone());

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(1005), 50))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PlacementError::InsufficientBatchQuantity {
                batch_id: BatchId::new(7),
                requested: 11,
                available: 5,
            }
        );
        assert_eq!(quantity(&store, 5), 0);
        assert_eq!(quantity(&store, 7), 5);
        assert!(orders.all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_plan_in_all_or_nothing_mode_changes_nothing() {
        let store = seeded_store(DeductionMode::AllOrNothing);
        let gateway = RecordingGateway::new(store.clone()).with_interleaved(drain_batch_7());
        let placement = OrderPlacement::new(Arc::new(gateway), Arc::new(InMemoryOrderRepository::new()));

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(1005), 50))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "insufficient_batch_quantity");
        assert_eq!(quantity(&store, 5), 39);
        assert_eq!(quantity(&store, 7), 5);
    }

    #[tokio::test]
    async fn request_policy_overrides_default() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, _, _) = placement(store.clone());
        let placement = placement.with_default_policy(AllocationPolicy::Lifo);

        let lifo = placement
            .place_order(&PlaceOrder::new(ProductId::new(1005), 10))
            .await
            .unwrap();
        assert_eq!(lifo.reserved_from_batch_ids, vec![BatchId::new(7)]);

        let fifo = placement
            .place_order(&PlaceOrder::new(ProductId::new(1005), 10).with_policy(AllocationPolicy::Fifo))
            .await
            .unwrap();
        assert_eq!(fifo.reserved_from_batch_ids, vec![BatchId::new(2)]);

        assert_eq!(quantity(&store, 7), 30);
        assert_eq!(quantity(&store, 2), 42);
        assert_eq!(quantity(&store, 5), 39);
    }

    #[tokio::test]
    async fn failed_order_save_is_a_store_error() {
        let store = seeded_store(DeductionMode::PerBatch);
        let placement = OrderPlacement::new(LocalInventoryGateway::new(store.clone()), FailingOrders);

        let err = placement
            .place_order(&PlaceOrder::new(ProductId::new(1001), 5))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "store_error");
        assert_eq!(quantity(&store, 1), 63);
    }

    #[tokio::test]
    async fn find_order_returns_placed_order() {
        let store = seeded_store(DeductionMode::PerBatch);
        let (placement, _, _) = placement(store);

        let confirmation = placement
            .place_order(&PlaceOrder::new(ProductId::new(1001), 2))
            .await
            .unwrap();

        let order = placement.find_order(confirmation.order_id).await.unwrap().unwrap();
        assert_eq!(order.product_name, "Laptop");
        assert!(placement.find_order(OrderId::new(999)).await.unwrap().is_none());
    }
}
