//! The logged-in session facade. Owns the handles to the store and channel
//! actors plus the REST client, and exposes the operations a UI layer calls:
//! refresh, cart edits, transition requests, logout.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

use crate::api::{CreateOrderRequest, NotificationApi, OrderApi};
use crate::cart::{CartRepository, CartState};
use crate::channel::EventChannelClient;
use crate::domain::{FoodItem, Notification, Order, OrderStatus, Role, SessionIdentity};
use crate::error::{ApiError, CartError, GateError, SystemError};
use crate::gate::ActionGate;
use crate::store::{OrderStoreClient, SnapshotReport};

/// Everything a signed-in user interacts with. Cheap handles throughout;
/// cloning is not supported because `logout` consumes the session.
pub struct SessionContext {
    identity: SessionIdentity,
    orders_api: Arc<dyn OrderApi>,
    notifications_api: Arc<dyn NotificationApi>,
    channel: EventChannelClient,
    store: OrderStoreClient,
    gate: ActionGate,
    cart: Mutex<CartState>,
    cart_repo: Arc<dyn CartRepository>,
    background: Vec<JoinHandle<()>>,
}

impl SessionContext {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        identity: SessionIdentity,
        orders_api: Arc<dyn OrderApi>,
        notifications_api: Arc<dyn NotificationApi>,
        channel: EventChannelClient,
        store: OrderStoreClient,
        cart: CartState,
        cart_repo: Arc<dyn CartRepository>,
        background: Vec<JoinHandle<()>>,
    ) -> Self {
        let gate = ActionGate::new(orders_api.clone(), store.clone(), identity.clone());
        Self {
            identity,
            orders_api,
            notifications_api,
            channel,
            store,
            gate,
            cart: Mutex::new(cart),
            cart_repo,
            background,
        }
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn store(&self) -> &OrderStoreClient {
        &self.store
    }

    pub fn channel(&self) -> &EventChannelClient {
        &self.channel
    }

    pub fn gate(&self) -> &ActionGate {
        &self.gate
    }

    /// Fetches the role-appropriate order list over REST and merges it into
    /// the store. On REST failure the store keeps its current contents and
    /// the error is surfaced.
    #[instrument(skip(self), fields(role = %self.identity.role))]
    pub async fn refresh(&self) -> Result<SnapshotReport, SystemError> {
        let orders = crate::api::role_snapshot(self.orders_api.as_ref(), &self.identity).await?;
        Ok(self.store.load_snapshot(orders).await?)
    }

    /// Requests `order.status -> target` as the session's own identity.
    pub async fn request_transition(
        &self,
        order: &Order,
        target: OrderStatus,
    ) -> Result<Order, GateError> {
        self.gate
            .request_transition(order, target, self.identity.role, &self.identity.user_id)
            .await
    }

    /// Asks for point-to-point push updates on one order.
    pub async fn track_order(&self, order_id: &str) -> Result<(), SystemError> {
        Ok(self.channel.subscribe(order_id).await?)
    }

    pub async fn untrack_order(&self, order_id: &str) -> Result<(), SystemError> {
        Ok(self.channel.unsubscribe(order_id).await?)
    }

    // Cart operations. Customer-only; every mutation persists through the
    // repository so the cart survives process restarts.

    fn require_customer(&self) -> Result<(), CartError> {
        if self.identity.role == Role::Customer {
            Ok(())
        } else {
            Err(CartError::RoleNotAllowed(self.identity.role))
        }
    }

    pub async fn cart(&self) -> Result<CartState, CartError> {
        self.require_customer()?;
        Ok(self.cart.lock().await.clone())
    }

    pub async fn add_to_cart(&self, item: &FoodItem) -> Result<CartState, CartError> {
        self.require_customer()?;
        let mut cart = self.cart.lock().await;
        cart.add_item(item);
        self.cart_repo.save(&self.identity.user_id, &cart)?;
        Ok(cart.clone())
    }

    pub async fn set_cart_quantity(
        &self,
        food_item_id: &str,
        quantity: u32,
    ) -> Result<CartState, CartError> {
        self.require_customer()?;
        let mut cart = self.cart.lock().await;
        cart.update_quantity(food_item_id, quantity);
        self.cart_repo.save(&self.identity.user_id, &cart)?;
        Ok(cart.clone())
    }

    pub async fn clear_cart(&self) -> Result<(), CartError> {
        self.require_customer()?;
        let mut cart = self.cart.lock().await;
        cart.clear();
        self.cart_repo.clear(&self.identity.user_id)
    }

    /// Places the cart as an order: REST create, merge the confirmed order,
    /// subscribe to its updates, then clear the cart. `None` when the cart
    /// is empty.
    #[instrument(skip(self, delivery_address))]
    pub async fn checkout(&self, delivery_address: &str) -> Result<Option<Order>, SystemError> {
        self.require_customer()?;
        let request: Option<CreateOrderRequest> = {
            let cart = self.cart.lock().await;
            cart.to_order_request(delivery_address)
        };
        let Some(request) = request else {
            return Ok(None);
        };

        let order = self.orders_api.create_order(&request).await?;
        self.store.apply_update(order.clone()).await?;
        if let Err(e) = self.channel.subscribe(order.id.clone()).await {
            warn!(order_id = %order.id, error = %e, "subscribe after checkout failed");
        }

        let mut cart = self.cart.lock().await;
        cart.clear();
        self.cart_repo.clear(&self.identity.user_id)?;
        info!(order_id = %order.id, total = order.total_amount, "order placed");
        Ok(Some(order))
    }

    pub async fn notifications(&self) -> Result<Vec<Notification>, ApiError> {
        self.notifications_api.notifications().await
    }

    pub async fn mark_notification_read(&self, id: &str) -> Result<(), ApiError> {
        self.notifications_api.mark_read(id).await
    }

    pub async fn mark_all_notifications_read(&self) -> Result<(), ApiError> {
        self.notifications_api.mark_all_read().await
    }

    /// Tears the session down: disconnect the push channel, stop both
    /// actors, and wait for the background pumps to finish. The persisted
    /// cart is left intact for the next login.
    #[instrument(skip(self), fields(user_id = %self.identity.user_id))]
    pub async fn logout(self) -> Result<(), SystemError> {
        info!("logging out");
        self.channel.disconnect().await?;
        self.channel.shutdown().await?;
        self.store.shutdown().await?;
        for handle in self.background {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        Ok(())
    }
}
