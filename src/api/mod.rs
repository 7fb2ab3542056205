//! REST API surface. Traits keep the network seam mockable; the production
//! implementation is [`RestClient`].

mod rest;

pub use rest::RestClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{FoodItem, Notification, Order, OrderStatus, Restaurant, Role, UserProfile};
use crate::error::ApiError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// Login/register response: the bearer token plus the user profile. The same
/// token authenticates the push channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderItem {
    pub food_item_id: String,
    pub quantity: u32,
    pub unit_price_snapshot: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub restaurant_id: String,
    pub items: Vec<CreateOrderItem>,
    pub delivery_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantUpsert {
    pub name: String,
    pub address: String,
}

/// `GET /orders/rider?status=...` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiderOrderFilter {
    /// Open pool: READY orders with no rider assigned.
    Available,
    /// Orders assigned to the requesting rider.
    Assigned,
}

impl RiderOrderFilter {
    pub fn as_query(&self) -> &'static str {
        match self {
            RiderOrderFilter::Available => "available",
            RiderOrderFilter::Assigned => "assigned",
        }
    }
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> ApiResult<AuthSession>;
    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession>;
}

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> ApiResult<Order>;
    /// The logged-in customer's own orders.
    async fn my_orders(&self) -> ApiResult<Vec<Order>>;
    /// Orders targeting the logged-in owner's restaurants.
    async fn restaurant_orders(&self) -> ApiResult<Vec<Order>>;
    async fn rider_orders(&self, filter: RiderOrderFilter) -> ApiResult<Vec<Order>>;
    async fn order(&self, id: &str) -> ApiResult<Order>;
    /// Commits a status transition: `PUT /orders/{id}/status`.
    async fn update_status(&self, id: &str, status: OrderStatus) -> ApiResult<Order>;
    /// Rider self-claim: `PATCH /orders/{id}/assign`. The backend is the
    /// final arbiter of the claim race.
    async fn assign_rider(&self, id: &str) -> ApiResult<Order>;
}

#[async_trait]
pub trait RestaurantApi: Send + Sync {
    async fn restaurants(&self) -> ApiResult<Vec<Restaurant>>;
    async fn restaurant(&self, id: &str) -> ApiResult<Restaurant>;
    async fn food_items(&self, restaurant_id: &str) -> ApiResult<Vec<FoodItem>>;
    async fn create_restaurant(&self, request: &RestaurantUpsert) -> ApiResult<Restaurant>;
    async fn update_restaurant(&self, id: &str, request: &RestaurantUpsert)
        -> ApiResult<Restaurant>;
    async fn delete_restaurant(&self, id: &str) -> ApiResult<()>;
}

#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn notifications(&self) -> ApiResult<Vec<Notification>>;
    async fn mark_read(&self, id: &str) -> ApiResult<()>;
    async fn mark_all_read(&self) -> ApiResult<()>;
}

/// The full backend surface a session needs.
pub trait BackendApi: AuthApi + OrderApi + RestaurantApi + NotificationApi {}

impl<T: AuthApi + OrderApi + RestaurantApi + NotificationApi> BackendApi for T {}

/// The order list this identity's role refreshes from. Riders pull the open
/// pool and their own assignments in one go.
pub async fn role_snapshot(
    api: &dyn OrderApi,
    identity: &crate::domain::SessionIdentity,
) -> ApiResult<Vec<Order>> {
    match identity.role {
        Role::Customer => api.my_orders().await,
        Role::Restaurant => api.restaurant_orders().await,
        Role::Rider => {
            let mut orders = api.rider_orders(RiderOrderFilter::Available).await?;
            orders.extend(api.rider_orders(RiderOrderFilter::Assigned).await?);
            Ok(orders)
        }
    }
}
