use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{
    ApiResult, AuthApi, AuthSession, CreateOrderRequest, Credentials, NotificationApi, OrderApi,
    RegisterRequest, RestaurantApi, RestaurantUpsert, RiderOrderFilter,
};
use crate::config::EngineConfig;
use crate::domain::{FoodItem, Notification, Order, OrderStatus, Restaurant};
use crate::error::ApiError;

/// reqwest-backed API client. Attaches the bearer token to every request and
/// enforces the configured per-request timeout so a hung backend surfaces as
/// `RequestTimedOut` instead of blocking the caller forever.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    token: RwLock<Option<String>>,
}

/// Error payload shape the backend uses for non-2xx responses. On transition
/// conflicts it includes the order's current authoritative state.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    order: Option<Order>,
}

impl RestClient {
    pub fn new(config: &EngineConfig) -> Result<Self, ApiError> {
        let timeout = config.request_timeout();
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::NetworkUnavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout,
            token: RwLock::new(None),
        })
    }

    pub fn set_token(&self, token: Option<String>) {
        let mut guard = self.token.write().unwrap_or_else(|e| e.into_inner());
        *guard = token;
    }

    fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(token) = self.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn map_transport(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::RequestTimedOut(self.timeout)
        } else {
            ApiError::NetworkUnavailable(error.to_string())
        }
    }

    async fn rejection(&self, status: StatusCode, response: reqwest::Response) -> ApiError {
        // Mirror the original client: a 401 invalidates the stored token.
        if status == StatusCode::UNAUTHORIZED {
            warn!("received 401, clearing session token");
            self.set_token(None);
        }
        let body = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        ApiError::ServerRejected {
            code: status.as_u16(),
            message: parsed
                .error
                .or(parsed.message)
                .unwrap_or_else(|| status.to_string()),
            current: parsed.order.map(Box::new),
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> ApiResult<T> {
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        if status.is_success() {
            response
                .json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            Err(self.rejection(status, response).await)
        }
    }

    async fn execute_empty(&self, builder: reqwest::RequestBuilder) -> ApiResult<()> {
        let response = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(self.rejection(status, response).await)
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        debug!(path, "GET");
        self.execute(self.request(Method::GET, path)).await
    }

    async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        debug!(%method, path, "request with body");
        self.execute(self.request(method, path).json(body)).await
    }
}

#[async_trait]
impl AuthApi for RestClient {
    async fn login(&self, credentials: &Credentials) -> ApiResult<AuthSession> {
        let session: AuthSession = self
            .send_json(Method::POST, "/auth/login", credentials)
            .await?;
        self.set_token(Some(session.token.clone()));
        Ok(session)
    }

    async fn register(&self, request: &RegisterRequest) -> ApiResult<AuthSession> {
        let session: AuthSession = self
            .send_json(Method::POST, "/auth/register", request)
            .await?;
        self.set_token(Some(session.token.clone()));
        Ok(session)
    }
}

#[async_trait]
impl OrderApi for RestClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> ApiResult<Order> {
        self.send_json(Method::POST, "/orders", request).await
    }

    async fn my_orders(&self) -> ApiResult<Vec<Order>> {
        self.get_json("/orders").await
    }

    async fn restaurant_orders(&self) -> ApiResult<Vec<Order>> {
        self.get_json("/orders/restaurant").await
    }

    async fn rider_orders(&self, filter: RiderOrderFilter) -> ApiResult<Vec<Order>> {
        self.get_json(&format!("/orders/rider?status={}", filter.as_query()))
            .await
    }

    async fn order(&self, id: &str) -> ApiResult<Order> {
        self.get_json(&format!("/orders/{id}")).await
    }

    async fn update_status(&self, id: &str, status: OrderStatus) -> ApiResult<Order> {
        #[derive(Serialize)]
        struct StatusBody {
            status: OrderStatus,
        }
        self.send_json(
            Method::PUT,
            &format!("/orders/{id}/status"),
            &StatusBody { status },
        )
        .await
    }

    async fn assign_rider(&self, id: &str) -> ApiResult<Order> {
        self.execute(self.request(Method::PATCH, &format!("/orders/{id}/assign")))
            .await
    }
}

#[async_trait]
impl RestaurantApi for RestClient {
    async fn restaurants(&self) -> ApiResult<Vec<Restaurant>> {
        self.get_json("/restaurants").await
    }

    async fn restaurant(&self, id: &str) -> ApiResult<Restaurant> {
        self.get_json(&format!("/restaurants/{id}")).await
    }

    async fn food_items(&self, restaurant_id: &str) -> ApiResult<Vec<FoodItem>> {
        self.get_json(&format!("/restaurants/{restaurant_id}/food-items"))
            .await
    }

    async fn create_restaurant(&self, request: &RestaurantUpsert) -> ApiResult<Restaurant> {
        self.send_json(Method::POST, "/restaurants", request).await
    }

    async fn update_restaurant(
        &self,
        id: &str,
        request: &RestaurantUpsert,
    ) -> ApiResult<Restaurant> {
        self.send_json(Method::PUT, &format!("/restaurants/{id}"), request)
            .await
    }

    async fn delete_restaurant(&self, id: &str) -> ApiResult<()> {
        self.execute_empty(self.request(Method::DELETE, &format!("/restaurants/{id}")))
            .await
    }
}

#[async_trait]
impl NotificationApi for RestClient {
    async fn notifications(&self) -> ApiResult<Vec<Notification>> {
        self.get_json("/notifications").await
    }

    async fn mark_read(&self, id: &str) -> ApiResult<()> {
        self.execute_empty(self.request(Method::PUT, &format!("/notifications/{id}/read")))
            .await
    }

    async fn mark_all_read(&self) -> ApiResult<()> {
        self.execute_empty(self.request(Method::PUT, "/notifications/read-all"))
            .await
    }
}
