use std::collections::HashSet;

use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, instrument, warn};

use super::backoff::Backoff;
use super::transport::{ClientMessage, EventTransport, ServerMessage};
use crate::config::EngineConfig;
use crate::domain::Order;
use crate::error::ChannelError;

pub type ListenerId = u64;

/// Observable connection state. `Connecting` covers both the initial dial and
/// the retry loop after an unexpected drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
enum ChannelRequest {
    Connect {
        token: String,
        respond_to: oneshot::Sender<()>,
    },
    RegisterListener {
        respond_to: oneshot::Sender<(ListenerId, mpsc::Receiver<Order>)>,
    },
    DeregisterListener {
        id: ListenerId,
        respond_to: oneshot::Sender<()>,
    },
    Subscribe {
        order_id: String,
    },
    Unsubscribe {
        order_id: String,
    },
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },
    Shutdown,
}

/// The actor owning the push connection. Single task, single reader: events
/// for one connection are dispatched to listeners strictly in arrival order.
pub struct EventChannelService {
    receiver: mpsc::Receiver<ChannelRequest>,
    transport: Box<dyn EventTransport>,
    listeners: Vec<(ListenerId, mpsc::Sender<Order>)>,
    next_listener_id: ListenerId,
    subscriptions: HashSet<String>,
    token: Option<String>,
    state_tx: watch::Sender<ConnectionState>,
    backoff: Backoff,
    buffer: usize,
}

impl EventChannelService {
    pub fn new(config: &EngineConfig, transport: Box<dyn EventTransport>) -> (Self, EventChannelClient) {
        let (sender, receiver) = mpsc::channel(config.channel_buffer);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let service = Self {
            receiver,
            transport,
            listeners: Vec::new(),
            next_listener_id: 1,
            subscriptions: HashSet::new(),
            token: None,
            state_tx,
            backoff: Backoff::new(config.reconnect_base(), config.reconnect_max()),
            buffer: config.channel_buffer,
        };
        let client = EventChannelClient { sender, state_rx };
        (service, client)
    }

    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    #[instrument(name = "event_channel", skip(self))]
    pub async fn run(mut self) {
        info!("EventChannelService starting");

        loop {
            match self.state() {
                ConnectionState::Connected => {
                    tokio::select! {
                        msg = self.receiver.recv() => match msg {
                            Some(request) => {
                                if self.handle_request(request).await {
                                    break;
                                }
                            }
                            None => break,
                        },
                        event = self.transport.next_event() => match event {
                            Some(ServerMessage::OrderUpdate(order)) => {
                                self.dispatch(order).await;
                            }
                            None => {
                                warn!("push channel lost, entering retry loop");
                                self.transport.close().await;
                                let _ = self.state_tx.send(ConnectionState::Connecting);
                            }
                        },
                    }
                }
                ConnectionState::Connecting => {
                    let delay = self.backoff.delay();
                    tokio::select! {
                        msg = self.receiver.recv() => match msg {
                            Some(request) => {
                                if self.handle_request(request).await {
                                    break;
                                }
                            }
                            None => break,
                        },
                        _ = tokio::time::sleep(delay) => {
                            self.try_open().await;
                        }
                    }
                }
                ConnectionState::Disconnected => match self.receiver.recv().await {
                    Some(request) => {
                        if self.handle_request(request).await {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        self.transport.close().await;
        let _ = self.state_tx.send(ConnectionState::Disconnected);
        info!("EventChannelService stopped");
    }

    /// Returns true when the service should stop.
    async fn handle_request(&mut self, request: ChannelRequest) -> bool {
        match request {
            ChannelRequest::Connect { token, respond_to } => {
                // Idempotent: connecting while a connection exists (or is
                // being retried) for the same session is a no-op.
                if self.token.is_some() {
                    debug!("connect called while already connected, ignoring");
                } else {
                    self.token = Some(token);
                    let _ = self.state_tx.send(ConnectionState::Connecting);
                    self.try_open().await;
                }
                let _ = respond_to.send(());
            }
            ChannelRequest::RegisterListener { respond_to } => {
                let (tx, rx) = mpsc::channel(self.buffer);
                let id = self.next_listener_id;
                self.next_listener_id += 1;
                self.listeners.push((id, tx));
                debug!(listener_id = id, "listener registered");
                let _ = respond_to.send((id, rx));
            }
            ChannelRequest::DeregisterListener { id, respond_to } => {
                self.listeners.retain(|(listener_id, _)| *listener_id != id);
                debug!(listener_id = id, "listener deregistered");
                let _ = respond_to.send(());
            }
            ChannelRequest::Subscribe { order_id } => {
                if self.subscriptions.insert(order_id.clone())
                    && self.state() == ConnectionState::Connected
                {
                    if let Err(e) = self
                        .transport
                        .send(ClientMessage::Subscribe(order_id.clone()))
                        .await
                    {
                        warn!(order_id = %order_id, error = %e, "subscribe send failed");
                    }
                }
            }
            ChannelRequest::Unsubscribe { order_id } => {
                if self.subscriptions.remove(&order_id)
                    && self.state() == ConnectionState::Connected
                {
                    if let Err(e) = self
                        .transport
                        .send(ClientMessage::Unsubscribe(order_id.clone()))
                        .await
                    {
                        warn!(order_id = %order_id, error = %e, "unsubscribe send failed");
                    }
                }
            }
            ChannelRequest::Disconnect { respond_to } => {
                info!("disconnecting push channel");
                self.transport.close().await;
                self.token = None;
                self.listeners.clear();
                self.subscriptions.clear();
                self.backoff.reset();
                let _ = self.state_tx.send(ConnectionState::Disconnected);
                let _ = respond_to.send(());
            }
            ChannelRequest::Shutdown => {
                info!("EventChannelService shutting down");
                return true;
            }
        }
        false
    }

    async fn try_open(&mut self) {
        let Some(token) = self.token.clone() else {
            return;
        };
        match self.transport.open(&token).await {
            Ok(()) => {
                self.backoff.reset();
                // Point-to-point subscriptions are not retained server-side
                // across connections; replay them.
                for order_id in self.subscriptions.clone() {
                    if let Err(e) = self
                        .transport
                        .send(ClientMessage::Subscribe(order_id.clone()))
                        .await
                    {
                        warn!(order_id = %order_id, error = %e, "subscription replay failed");
                    }
                }
                let _ = self.state_tx.send(ConnectionState::Connected);
                info!("push channel connected");
            }
            Err(e) => {
                debug!(error = %e, delay = ?self.backoff.delay(), "connect attempt failed");
                self.backoff.advance();
            }
        }
    }

    async fn dispatch(&mut self, order: Order) {
        debug!(order_id = %order.id, status = %order.status, "order update received");
        let mut stale = Vec::new();
        for (id, tx) in &self.listeners {
            if tx.send(order.clone()).await.is_err() {
                stale.push(*id);
            }
        }
        if !stale.is_empty() {
            self.listeners.retain(|(id, _)| !stale.contains(id));
        }
    }
}

/// Cloneable handle to the channel actor.
#[derive(Clone)]
pub struct EventChannelClient {
    sender: mpsc::Sender<ChannelRequest>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl EventChannelClient {
    /// Opens the session connection. Never surfaces transport errors; a
    /// failed dial leaves the channel retrying in the background, observable
    /// through [`connection_state`](Self::connection_state).
    #[instrument(skip(self, token))]
    pub async fn connect(&self, token: impl Into<String>) -> Result<(), ChannelError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ChannelRequest::Connect {
                token: token.into(),
                respond_to,
            })
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))?;
        response
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    /// Registers an update listener. Events arrive as full order snapshots,
    /// in the order the server emitted them.
    pub async fn register_listener(
        &self,
    ) -> Result<(ListenerId, mpsc::Receiver<Order>), ChannelError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ChannelRequest::RegisterListener { respond_to })
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))?;
        response
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    /// After this resolves, no later event reaches the listener. The ack is
    /// sent only once the actor has removed the registration, so callers
    /// cannot race a concurrently dispatched event.
    pub async fn deregister_listener(&self, id: ListenerId) -> Result<(), ChannelError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ChannelRequest::DeregisterListener { id, respond_to })
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))?;
        response
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    /// Hints to the server that this session wants point-to-point updates
    /// for one order. Broad role-scoped broadcasts arrive regardless.
    pub async fn subscribe(&self, order_id: impl Into<String>) -> Result<(), ChannelError> {
        self.sender
            .send(ChannelRequest::Subscribe {
                order_id: order_id.into(),
            })
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    pub async fn unsubscribe(&self, order_id: impl Into<String>) -> Result<(), ChannelError> {
        self.sender
            .send(ChannelRequest::Unsubscribe {
                order_id: order_id.into(),
            })
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    /// Tears down the connection and clears every registered listener.
    /// Idempotent; called on logout.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) -> Result<(), ChannelError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(ChannelRequest::Disconnect { respond_to })
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))?;
        response
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    pub async fn shutdown(&self) -> Result<(), ChannelError> {
        self.sender
            .send(ChannelRequest::Shutdown)
            .await
            .map_err(|e| ChannelError::ServiceUnavailable(e.to_string()))
    }

    pub fn connection_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    pub fn is_connected(&self) -> bool {
        *self.state_rx.borrow() == ConnectionState::Connected
    }
}
