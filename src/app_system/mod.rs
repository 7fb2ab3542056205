//! Session bootstrap: logs in, spawns the actors, wires the push channel to
//! the store, and hands back a ready [`SessionContext`](crate::SessionContext).

mod delivery_system;
mod tracing;

pub use delivery_system::DeliverySystem;
pub use tracing::setup_tracing;
