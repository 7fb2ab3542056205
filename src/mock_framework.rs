//! Test doubles shared by unit and integration tests: canned order
//! fixtures, a scriptable backend, and a scriptable push transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::api::{
    ApiResult, AuthSession, Credentials, CreateOrderRequest, RegisterRequest, RestaurantUpsert,
    RiderOrderFilter,
};
use crate::api::{AuthApi, NotificationApi, OrderApi, RestaurantApi};
use crate::channel::{ClientMessage, EventTransport, ServerMessage};
use crate::domain::{
    order_total, FoodItem, Notification, Order, OrderItem, OrderStatus, Restaurant, Role,
    UserProfile,
};
use crate::error::{ApiError, ChannelError};

pub mod fixtures {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use crate::domain::{Order, OrderItem, OrderStatus};

    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    pub fn placed_order(id: &str, customer: &str, restaurant: &str, total: i64) -> Order {
        order_with_status(id, customer, restaurant, OrderStatus::Placed, None, total, 0)
    }

    /// One-line order in any lifecycle position. `updated_offset_secs` is
    /// added to the fixed base time so tests control last-writer-wins
    /// ordering explicitly.
    pub fn order_with_status(
        id: &str,
        customer: &str,
        restaurant: &str,
        status: OrderStatus,
        rider: Option<&str>,
        total: i64,
        updated_offset_secs: i64,
    ) -> Order {
        let order = Order {
            id: id.to_string(),
            status,
            customer_id: customer.to_string(),
            restaurant_id: restaurant.to_string(),
            rider_id: rider.map(str::to_string),
            items: vec![OrderItem {
                food_item_id: "f1".to_string(),
                quantity: 1,
                unit_price_snapshot: total,
            }],
            total_amount: total,
            delivery_address: "12 Baker St".to_string(),
            created_at: base_time(),
            updated_at: base_time() + Duration::seconds(updated_offset_secs),
        };
        debug_assert!(order.is_consistent(), "fixture must be self-consistent");
        order
    }
}

/// Every backend call a test can assert on.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Login { email: String },
    Register { email: String },
    CreateOrder { restaurant_id: String },
    MyOrders,
    RestaurantOrders,
    RiderOrders(RiderOrderFilter),
    GetOrder { id: String },
    UpdateStatus { id: String, status: OrderStatus },
    AssignRider { id: String },
    Restaurants,
    MarkRead { id: String },
    MarkAllRead,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap()
}

/// Scriptable backend. Calls are recorded in order; responses are consumed
/// from per-endpoint queues. Unscripted order lists come back empty,
/// unscripted mutations fail loudly.
pub struct MockBackend {
    customer_id: String,
    calls: Mutex<Vec<ApiCall>>,
    login_responses: Mutex<VecDeque<ApiResult<AuthSession>>>,
    list_responses: Mutex<VecDeque<ApiResult<Vec<Order>>>>,
    get_responses: Mutex<VecDeque<ApiResult<Order>>>,
    status_responses: Mutex<VecDeque<ApiResult<Order>>>,
    assign_responses: Mutex<VecDeque<ApiResult<Order>>>,
    restaurants: Mutex<Vec<Restaurant>>,
    notifications: Mutex<Vec<Notification>>,
    next_order_id: AtomicU64,
}

impl MockBackend {
    pub fn new(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            calls: Mutex::new(Vec::new()),
            login_responses: Mutex::new(VecDeque::new()),
            list_responses: Mutex::new(VecDeque::new()),
            get_responses: Mutex::new(VecDeque::new()),
            status_responses: Mutex::new(VecDeque::new()),
            assign_responses: Mutex::new(VecDeque::new()),
            restaurants: Mutex::new(Vec::new()),
            notifications: Mutex::new(Vec::new()),
            next_order_id: AtomicU64::new(1),
        }
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: ApiCall) {
        lock(&self.calls).push(call);
    }

    pub fn login_as(&self, user_id: &str, name: &str, role: Role) {
        lock(&self.login_responses).push_back(Ok(AuthSession {
            token: format!("token-{user_id}"),
            user: UserProfile {
                id: user_id.to_string(),
                name: name.to_string(),
                email: format!("{user_id}@example.com"),
                role,
            },
        }));
    }

    pub fn push_login_response(&self, response: ApiResult<AuthSession>) {
        lock(&self.login_responses).push_back(response);
    }

    pub fn push_list_response(&self, response: ApiResult<Vec<Order>>) {
        lock(&self.list_responses).push_back(response);
    }

    pub fn push_get_response(&self, response: ApiResult<Order>) {
        lock(&self.get_responses).push_back(response);
    }

    pub fn push_status_response(&self, response: ApiResult<Order>) {
        lock(&self.status_responses).push_back(response);
    }

    pub fn push_assign_response(&self, response: ApiResult<Order>) {
        lock(&self.assign_responses).push_back(response);
    }

    pub fn set_restaurants(&self, restaurants: Vec<Restaurant>) {
        *lock(&self.restaurants) = restaurants;
    }

    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        *lock(&self.notifications) = notifications;
    }

    fn unscripted<T>(endpoint: &str) -> ApiResult<T> {
        Err(ApiError::NetworkUnavailable(format!(
            "no scripted response for {endpoint}"
        )))
    }
}

#[async_trait]
impl AuthApi for MockBackend {
    async fn login(&self, credentials: &Credentials) -> ApiResult<AuthSession> {
        self.record(ApiCall::Login {
            email: credentials.email.clone(),
        });
        lock(&self.login_responses)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("login"))
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession> {
        self.record(ApiCall::Register {
            email: request.email.clone(),
        });
        lock(&self.login_responses)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("register"))
    }
}

#[async_trait]
impl OrderApi for MockBackend {
    async fn create_order(&self, request: &CreateOrderRequest) -> ApiResult<Order> {
        self.record(ApiCall::CreateOrder {
            restaurant_id: request.restaurant_id.clone(),
        });
        let items: Vec<OrderItem> = request
            .items
            .iter()
            .map(|item| OrderItem {
                food_item_id: item.food_item_id.clone(),
                quantity: item.quantity,
                unit_price_snapshot: item.unit_price_snapshot,
            })
            .collect();
        let n = self.next_order_id.fetch_add(1, Ordering::Relaxed);
        Ok(Order {
            id: format!("order-{n}"),
            status: OrderStatus::Placed,
            customer_id: self.customer_id.clone(),
            restaurant_id: request.restaurant_id.clone(),
            rider_id: None,
            total_amount: order_total(&items),
            items,
            delivery_address: request.delivery_address.clone(),
            created_at: fixtures::base_time(),
            updated_at: fixtures::base_time(),
        })
    }

    async fn my_orders(&self) -> ApiResult<Vec<Order>> {
        self.record(ApiCall::MyOrders);
        lock(&self.list_responses)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn restaurant_orders(&self) -> ApiResult<Vec<Order>> {
        self.record(ApiCall::RestaurantOrders);
        lock(&self.list_responses)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn rider_orders(&self, filter: RiderOrderFilter) -> ApiResult<Vec<Order>> {
        self.record(ApiCall::RiderOrders(filter));
        lock(&self.list_responses)
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn order(&self, id: &str) -> ApiResult<Order> {
        self.record(ApiCall::GetOrder { id: id.to_string() });
        lock(&self.get_responses)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("order"))
    }

    async fn update_status(&self, id: &str, status: OrderStatus) -> ApiResult<Order> {
        self.record(ApiCall::UpdateStatus {
            id: id.to_string(),
            status,
        });
        lock(&self.status_responses)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("update_status"))
    }

    async fn assign_rider(&self, id: &str) -> ApiResult<Order> {
        self.record(ApiCall::AssignRider { id: id.to_string() });
        lock(&self.assign_responses)
            .pop_front()
            .unwrap_or_else(|| Self::unscripted("assign_rider"))
    }
}

#[async_trait]
impl RestaurantApi for MockBackend {
    async fn restaurants(&self) -> ApiResult<Vec<Restaurant>> {
        self.record(ApiCall::Restaurants);
        Ok(lock(&self.restaurants).clone())
    }

    async fn restaurant(&self, id: &str) -> ApiResult<Restaurant> {
        lock(&self.restaurants)
            .iter()
            .find(|restaurant| restaurant.id == id)
            .cloned()
            .ok_or_else(|| ApiError::NetworkUnavailable(format!("unknown restaurant {id}")))
    }

    async fn food_items(&self, _restaurant_id: &str) -> ApiResult<Vec<FoodItem>> {
        Ok(Vec::new())
    }

    async fn create_restaurant(&self, _request: &RestaurantUpsert) -> ApiResult<Restaurant> {
        Self::unscripted("create_restaurant")
    }

    async fn update_restaurant(
        &self,
        _id: &str,
        _request: &RestaurantUpsert,
    ) -> ApiResult<Restaurant> {
        Self::unscripted("update_restaurant")
    }

    async fn delete_restaurant(&self, _id: &str) -> ApiResult<()> {
        Self::unscripted("delete_restaurant")
    }
}

#[async_trait]
impl NotificationApi for MockBackend {
    async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        Ok(lock(&self.notifications).clone())
    }

    async fn mark_read(&self, id: &str) -> ApiResult<()> {
        self.record(ApiCall::MarkRead { id: id.to_string() });
        for notification in lock(&self.notifications).iter_mut() {
            if notification.id == id {
                notification.read = true;
            }
        }
        Ok(())
    }

    async fn mark_all_read(&self) -> ApiResult<()> {
        self.record(ApiCall::MarkAllRead);
        for notification in lock(&self.notifications).iter_mut() {
            notification.read = true;
        }
        Ok(())
    }
}

struct ScriptShared {
    /// Each queued receiver is one successful connection's event feed.
    /// `open` consumes one; an empty queue makes the dial fail.
    connections: Mutex<VecDeque<mpsc::Receiver<ServerMessage>>>,
    sent: Mutex<Vec<ClientMessage>>,
    opens: AtomicUsize,
}

/// Scriptable [`EventTransport`]. The paired [`ScriptHandle`] stays with the
/// test and drives connections and events.
pub struct ScriptedTransport {
    shared: Arc<ScriptShared>,
    events: Option<mpsc::Receiver<ServerMessage>>,
}

#[derive(Clone)]
pub struct ScriptHandle {
    shared: Arc<ScriptShared>,
}

impl ScriptedTransport {
    pub fn new() -> (Self, ScriptHandle) {
        let shared = Arc::new(ScriptShared {
            connections: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            opens: AtomicUsize::new(0),
        });
        (
            Self {
                shared: shared.clone(),
                events: None,
            },
            ScriptHandle { shared },
        )
    }
}

impl ScriptHandle {
    /// Queues one acceptable connection; the returned sender emits its
    /// events. Dropping the sender simulates the connection dying.
    pub fn add_connection(&self) -> mpsc::Sender<ServerMessage> {
        let (tx, rx) = mpsc::channel(32);
        lock(&self.shared.connections).push_back(rx);
        tx
    }

    /// Every control frame sent so far, across all connections.
    pub fn sent(&self) -> Vec<ClientMessage> {
        lock(&self.shared.sent).clone()
    }

    pub fn open_attempts(&self) -> usize {
        self.shared.opens.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&mut self, token: &str) -> Result<(), ChannelError> {
        self.shared.opens.fetch_add(1, Ordering::Relaxed);
        let connection = lock(&self.shared.connections).pop_front();
        match connection {
            Some(rx) => {
                self.events = Some(rx);
                lock(&self.shared.sent).push(ClientMessage::Auth {
                    token: token.to_string(),
                });
                Ok(())
            }
            None => Err(ChannelError::Transport(
                "no scripted connection available".to_string(),
            )),
        }
    }

    async fn next_event(&mut self) -> Option<ServerMessage> {
        match self.events.as_mut() {
            Some(rx) => {
                let event = rx.recv().await;
                if event.is_none() {
                    self.events = None;
                }
                event
            }
            // Only polled while connected; park forever if not.
            None => std::future::pending().await,
        }
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), ChannelError> {
        if self.events.is_none() {
            return Err(ChannelError::Transport("not connected".to_string()));
        }
        lock(&self.shared.sent).push(message);
        Ok(())
    }

    async fn close(&mut self) {
        self.events = None;
    }
}
