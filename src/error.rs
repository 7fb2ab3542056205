use std::time::Duration;

use thiserror::Error;

use crate::domain::{Order, OrderStatus, Role};

/// Gate-local rejections. Resolved synchronously, before any network call is
/// made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransitionError {
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
    #[error("role {role} is not authorized for {from} -> {to}")]
    UnauthorizedActor {
        role: Role,
        from: OrderStatus,
        to: OrderStatus,
    },
    #[error("order {0} already has a rider assigned")]
    AlreadyAssigned(String),
}

/// Network-layer errors from the REST client. `ServerRejected` may carry the
/// backend's current order snapshot, which is authoritative (claim races).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(String),
    #[error("request timed out after {0:?}")]
    RequestTimedOut(Duration),
    #[error("server rejected request ({code}): {message}")]
    ServerRejected {
        code: u16,
        message: String,
        current: Option<Box<Order>>,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Event channel errors. Transport failures never reach `connect` callers;
/// they put the channel into a retrying state instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChannelError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("event channel service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Order store errors. The store itself cannot fail a merge; this only
/// surfaces when the owning actor task is gone.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("order store unavailable: {0}")]
    ActorUnavailable(String),
}

/// Everything `ActionGate::request_transition` can return.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Cart persistence and usage errors.
#[derive(Debug, Error)]
pub enum CartError {
    #[error("cart is only available to the customer role, not {0}")]
    RoleNotAllowed(Role),
    #[error("cart storage error: {0}")]
    Storage(#[from] std::io::Error),
    #[error("cart serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Session startup/teardown errors.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Channel(#[from] ChannelError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Cart(#[from] CartError),
}
