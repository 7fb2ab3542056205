use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::api::{self, BackendApi, Credentials, OrderApi};
use crate::cart::{CartRepository, CartState};
use crate::channel::{ConnectionState, EventChannelService, EventTransport};
use crate::config::EngineConfig;
use crate::domain::{Role, SessionIdentity};
use crate::error::SystemError;
use crate::session::SessionContext;
use crate::store::OrderStoreService;

/// Builds a running session from credentials: one store actor, one channel
/// actor, an update pump from the channel into the store, and a refresh task
/// that reconciles missed events after every reconnect.
pub struct DeliverySystem;

impl DeliverySystem {
    #[instrument(skip_all)]
    pub async fn start<A: BackendApi + 'static>(
        config: &EngineConfig,
        backend: Arc<A>,
        transport: Box<dyn EventTransport>,
        cart_repo: Arc<dyn CartRepository>,
        credentials: &Credentials,
    ) -> Result<SessionContext, SystemError> {
        let auth = backend.login(credentials).await?;
        info!(user_id = %auth.user.id, role = %auth.user.role, "logged in");

        let identity = match auth.user.role {
            Role::Customer => SessionIdentity::customer(&auth.user.id),
            Role::Rider => SessionIdentity::rider(&auth.user.id),
            Role::Restaurant => {
                let owned = backend
                    .restaurants()
                    .await?
                    .into_iter()
                    .filter(|restaurant| restaurant.owner_id == auth.user.id)
                    .map(|restaurant| restaurant.id)
                    .collect();
                SessionIdentity::restaurant_owner(&auth.user.id, owned)
            }
        };

        let (store_service, store) =
            OrderStoreService::new(config.channel_buffer, identity.clone());
        let store_handle = tokio::spawn(store_service.run());

        let (channel_service, channel) = EventChannelService::new(config, transport);
        let channel_handle = tokio::spawn(channel_service.run());

        // The pump must exist before the connection opens so no event can
        // arrive without a listener.
        let (_listener_id, mut events) = channel.register_listener().await?;
        let pump_store = store.clone();
        let pump_handle = tokio::spawn(async move {
            while let Some(order) = events.recv().await {
                if let Err(e) = pump_store.apply_update(order).await {
                    warn!(error = %e, "order store gone, stopping update pump");
                    break;
                }
            }
            debug!("update pump finished");
        });

        channel.connect(auth.token.clone()).await?;

        // Events emitted while disconnected are never replayed by the
        // server. Whenever the channel comes back, pull a fresh REST
        // snapshot; last-writer-wins makes the overlap harmless.
        let refresh_api: Arc<dyn OrderApi> = backend.clone();
        let refresh_store = store.clone();
        let refresh_identity = identity.clone();
        let mut state_rx = channel.connection_state();
        let mut seen_disconnect = *state_rx.borrow() != ConnectionState::Connected;
        let refresh_handle = tokio::spawn(async move {
            while state_rx.changed().await.is_ok() {
                let state = *state_rx.borrow_and_update();
                match state {
                    ConnectionState::Connected if seen_disconnect => {
                        seen_disconnect = false;
                        info!("push channel restored, refreshing snapshot");
                        match api::role_snapshot(refresh_api.as_ref(), &refresh_identity).await {
                            Ok(orders) => {
                                if refresh_store.load_snapshot(orders).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "post-reconnect refresh failed");
                            }
                        }
                    }
                    ConnectionState::Connected => {}
                    ConnectionState::Connecting | ConnectionState::Disconnected => {
                        seen_disconnect = true;
                    }
                }
            }
            debug!("reconnect refresher finished");
        });

        let cart = if identity.role == Role::Customer {
            cart_repo.load(&identity.user_id)?
        } else {
            CartState::default()
        };

        let session = SessionContext::new(
            identity,
            backend.clone(),
            backend,
            channel,
            store,
            cart,
            cart_repo,
            vec![store_handle, channel_handle, pump_handle, refresh_handle],
        );
        session.refresh().await?;
        Ok(session)
    }
}
