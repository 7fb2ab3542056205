//! Push channel client. One connection per session, authenticated once with
//! the REST bearer token; inbound `order:update` events carry full order
//! snapshots and are fanned out to registered listeners in arrival order.
//!
//! Events emitted while disconnected are not replayed. The session layer
//! reconciles by refetching a REST snapshot whenever the connection state
//! returns to `Connected`.

mod backoff;
mod service;
mod transport;

pub use backoff::Backoff;
pub use service::{ConnectionState, EventChannelClient, EventChannelService, ListenerId};
pub use transport::{ClientMessage, EventTransport, ServerMessage, WsTransport};
