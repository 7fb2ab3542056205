//! # delivery-engine
//!
//! Order lifecycle engine for a food-delivery marketplace client. The backend
//! is the system of record; this crate keeps a per-session projection of the
//! orders a user cares about and enforces which lifecycle transitions each
//! role may request.
//!
//! The engine is built as a small set of tokio actors ("services") with
//! cloneable client handles, so every piece of mutable state has exactly one
//! owning task:
//!
//! - [`domain::status`]: the order status state machine and the
//!   role-authorization table for transitions.
//! - [`channel`]: the push channel client. One connection per session,
//!   automatic reconnect with backoff, full-snapshot `order:update` events
//!   fanned out to registered listeners in arrival order.
//! - [`store`]: the in-memory order projection, merged from REST snapshots
//!   and push events with last-writer-wins on `updatedAt`. Derived views
//!   (active lists, pending counts, history, rider earnings) are pure
//!   functions over the map.
//! - [`gate`]: the only path through which a UI requests a status
//!   transition. Validates locally before spending a round-trip and never
//!   mutates the store optimistically.
//! - [`session`]: ties it together. Login/logout lifecycle, update pump,
//!   snapshot refresh after reconnect, per-user cart.

pub mod api;
pub mod app_system;
pub mod cart;
pub mod channel;
pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod session;
pub mod store;

#[cfg(test)]
mod mock_framework;


pub use app_system::{setup_tracing, DeliverySystem};
pub use session::SessionContext;
