use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, warn};

use super::views;
use crate::domain::{Order, OrderStatus, Role, SessionIdentity};
use crate::error::StoreError;

pub type ServiceResult<T> = std::result::Result<T, StoreError>;
pub type ServiceResponse<T> = oneshot::Sender<ServiceResult<T>>;

/// What happened to one incoming snapshot during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// New visible order, inserted.
    Inserted,
    /// Known order, newer snapshot applied.
    Updated,
    /// Known order whose new snapshot fell outside this session's
    /// visibility window (e.g. another rider claimed it); evicted.
    Evicted,
    /// Incoming `updatedAt` was older or equal to the held record;
    /// discarded. Store-internal consistency guard, never user-facing.
    StaleDiscarded,
    /// Unknown order that this session cannot see; ignored.
    NotVisible,
}

/// Tally for a batch snapshot merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotReport {
    pub inserted: usize,
    pub updated: usize,
    pub evicted: usize,
    pub stale_discarded: usize,
    pub not_visible: usize,
}

#[derive(Debug)]
enum StoreRequest {
    LoadSnapshot {
        orders: Vec<Order>,
        respond_to: ServiceResponse<SnapshotReport>,
    },
    ApplyUpdate {
        order: Box<Order>,
        respond_to: ServiceResponse<MergeOutcome>,
    },
    Remove {
        id: String,
        respond_to: ServiceResponse<bool>,
    },
    ActiveOrders {
        respond_to: ServiceResponse<Vec<Order>>,
    },
    PendingCount {
        respond_to: ServiceResponse<usize>,
    },
    History {
        respond_to: ServiceResponse<Vec<Order>>,
    },
    StatusCounts {
        respond_to: ServiceResponse<HashMap<OrderStatus, usize>>,
    },
    TotalEarnings {
        respond_to: ServiceResponse<i64>,
    },
    Shutdown,
    #[cfg(test)]
    OrderCount {
        respond_to: ServiceResponse<usize>,
    },
}

/// The actor owning the order map. All mutations funnel through its mailbox;
/// no shared-memory locking anywhere.
pub struct OrderStoreService {
    receiver: mpsc::Receiver<StoreRequest>,
    orders: HashMap<String, Order>,
    identity: SessionIdentity,
}

impl OrderStoreService {
    pub fn new(buffer_size: usize, identity: SessionIdentity) -> (Self, OrderStoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let service = Self {
            receiver,
            orders: HashMap::new(),
            identity,
        };
        let client = OrderStoreClient { sender };
        (service, client)
    }

    #[instrument(name = "order_store", skip(self), fields(role = %self.identity.role))]
    pub async fn run(mut self) {
        info!("OrderStoreService starting");

        while let Some(request) = self.receiver.recv().await {
            match request {
                StoreRequest::LoadSnapshot { orders, respond_to } => {
                    let report = self.handle_load_snapshot(orders);
                    let _ = respond_to.send(Ok(report));
                }
                StoreRequest::ApplyUpdate { order, respond_to } => {
                    let outcome = self.merge(*order);
                    let _ = respond_to.send(Ok(outcome));
                }
                StoreRequest::Remove { id, respond_to } => {
                    let removed = self.orders.remove(&id).is_some();
                    debug!(order_id = %id, removed, "explicit eviction");
                    let _ = respond_to.send(Ok(removed));
                }
                StoreRequest::ActiveOrders { respond_to } => {
                    let _ = respond_to.send(Ok(views::active_orders(&self.orders, &self.identity)));
                }
                StoreRequest::PendingCount { respond_to } => {
                    let _ = respond_to.send(Ok(views::pending_count(&self.orders, &self.identity)));
                }
                StoreRequest::History { respond_to } => {
                    let _ = respond_to.send(Ok(views::history(&self.orders, &self.identity)));
                }
                StoreRequest::StatusCounts { respond_to } => {
                    let _ = respond_to.send(Ok(views::status_counts(&self.orders, &self.identity)));
                }
                StoreRequest::TotalEarnings { respond_to } => {
                    let _ = respond_to.send(Ok(views::total_earnings(
                        &self.orders,
                        &self.identity.user_id,
                    )));
                }
                StoreRequest::Shutdown => {
                    info!("OrderStoreService shutting down");
                    break;
                }
                #[cfg(test)]
                StoreRequest::OrderCount { respond_to } => {
                    let _ = respond_to.send(Ok(self.orders.len()));
                }
            }
        }

        info!("OrderStoreService stopped");
    }

    #[instrument(skip(self, orders), fields(batch = orders.len()))]
    fn handle_load_snapshot(&mut self, orders: Vec<Order>) -> SnapshotReport {
        let mut report = SnapshotReport::default();
        for order in orders {
            match self.merge(order) {
                MergeOutcome::Inserted => report.inserted += 1,
                MergeOutcome::Updated => report.updated += 1,
                MergeOutcome::Evicted => report.evicted += 1,
                MergeOutcome::StaleDiscarded => report.stale_discarded += 1,
                MergeOutcome::NotVisible => report.not_visible += 1,
            }
        }
        info!(?report, "snapshot merged");
        report
    }

    /// Last-writer-wins by `updatedAt`; protects against out-of-order REST
    /// responses racing push events.
    fn merge(&mut self, order: Order) -> MergeOutcome {
        // Orders only target existing restaurants, so a restaurant session
        // without owned restaurants should never receive one. Make the
        // violation loud instead of silently filtering.
        if self.identity.role == Role::Restaurant && self.identity.owned_restaurant_ids.is_empty() {
            error!(
                order_id = %order.id,
                "restaurant session owns no restaurants but received an order"
            );
            return MergeOutcome::NotVisible;
        }

        if !order.is_consistent() {
            warn!(
                order_id = %order.id,
                status = %order.status,
                "inconsistent order snapshot from backend"
            );
        }

        match self.orders.get(&order.id) {
            Some(held) if order.updated_at <= held.updated_at => {
                debug!(
                    order_id = %order.id,
                    held = %held.updated_at,
                    incoming = %order.updated_at,
                    "stale snapshot discarded"
                );
                MergeOutcome::StaleDiscarded
            }
            Some(_) => {
                if views::is_visible(&order, &self.identity) {
                    debug!(order_id = %order.id, status = %order.status, "order updated");
                    self.orders.insert(order.id.clone(), order);
                    MergeOutcome::Updated
                } else {
                    debug!(order_id = %order.id, "order left visibility window, evicting");
                    self.orders.remove(&order.id);
                    MergeOutcome::Evicted
                }
            }
            None => {
                if views::is_visible(&order, &self.identity) {
                    debug!(order_id = %order.id, status = %order.status, "order inserted");
                    self.orders.insert(order.id.clone(), order);
                    MergeOutcome::Inserted
                } else {
                    MergeOutcome::NotVisible
                }
            }
        }
    }
}

/// Generate client methods with the oneshot boilerplate and automatic
/// tracing.
macro_rules! store_method {
    (fn $method:ident($($param:ident: $param_type:ty),*) -> $return_type:ty as $variant:ident) => {
        impl OrderStoreClient {
            #[instrument(skip_all)]
            pub async fn $method(&self, $($param: $param_type),*) -> ServiceResult<$return_type> {
                debug!("Sending request");
                let (respond_to, response) = oneshot::channel();
                self.sender
                    .send(StoreRequest::$variant { $($param,)* respond_to })
                    .await
                    .map_err(|e| StoreError::ActorUnavailable(e.to_string()))?;
                response
                    .await
                    .map_err(|e| StoreError::ActorUnavailable(e.to_string()))?
            }
        }
    };
}

/// Cloneable handle to the store actor.
#[derive(Clone)]
pub struct OrderStoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl OrderStoreClient {
    /// Merges one pushed (or REST-confirmed) full snapshot.
    pub async fn apply_update(&self, order: Order) -> ServiceResult<MergeOutcome> {
        self.apply_boxed(Box::new(order)).await
    }

    pub async fn shutdown(&self) -> ServiceResult<()> {
        self.sender
            .send(StoreRequest::Shutdown)
            .await
            .map_err(|e| StoreError::ActorUnavailable(e.to_string()))
    }
}

store_method!(fn load_snapshot(orders: Vec<Order>) -> SnapshotReport as LoadSnapshot);
store_method!(fn apply_boxed(order: Box<Order>) -> MergeOutcome as ApplyUpdate);
store_method!(fn remove(id: String) -> bool as Remove);
store_method!(fn active_orders() -> Vec<Order> as ActiveOrders);
store_method!(fn pending_count() -> usize as PendingCount);
store_method!(fn history() -> Vec<Order> as History);
store_method!(fn status_counts() -> HashMap<OrderStatus, usize> as StatusCounts);
store_method!(fn total_earnings() -> i64 as TotalEarnings);

#[cfg(test)]
store_method!(fn order_count() -> usize as OrderCount);
