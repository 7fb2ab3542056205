//! Demo binary: logs in with credentials from the environment, prints the
//! session's active orders and counters, then logs out cleanly.
//!
//! ```text
//! DELIVERY_ENGINE_CONFIG=engine.toml \
//! DELIVERY_ENGINE_EMAIL=user@example.com \
//! DELIVERY_ENGINE_PASSWORD=secret \
//! cargo run
//! ```

use std::sync::Arc;

use tracing::{error, info};

use delivery_engine::api::{Credentials, RestClient};
use delivery_engine::cart::InMemoryCartRepository;
use delivery_engine::channel::WsTransport;
use delivery_engine::config::EngineConfig;
use delivery_engine::domain::Role;
use delivery_engine::{setup_tracing, DeliverySystem};

#[tokio::main]
async fn main() {
    setup_tracing();
    if let Err(e) = run().await {
        error!(error = %e, "session failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var("DELIVERY_ENGINE_CONFIG") {
        Ok(path) => EngineConfig::from_file(path)?,
        Err(_) => EngineConfig::default(),
    };
    let credentials = Credentials {
        email: std::env::var("DELIVERY_ENGINE_EMAIL")?,
        password: std::env::var("DELIVERY_ENGINE_PASSWORD")?,
    };

    let backend = Arc::new(RestClient::new(&config)?);
    let transport = Box::new(WsTransport::new(config.ws_url.clone()));
    let cart_repo = Arc::new(InMemoryCartRepository::new());

    let session = DeliverySystem::start(&config, backend, transport, cart_repo, &credentials).await?;
    let identity = session.identity().clone();
    info!(user_id = %identity.user_id, role = %identity.role, "session ready");

    for order in session.store().active_orders().await? {
        info!(
            order_id = %order.id,
            status = %order.status.display_label(),
            total = order.total_amount,
            "active order"
        );
    }
    info!(pending = session.store().pending_count().await?, "pending actions");
    if identity.role == Role::Rider {
        info!(earnings = session.store().total_earnings().await?, "delivered earnings");
    }

    session.logout().await?;
    Ok(())
}
