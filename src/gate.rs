//! The only path through which a UI requests a status transition. Local
//! validation first (no round-trip wasted on a front-end bug), then the REST
//! commit; the store is never mutated optimistically, only confirmed
//! snapshots are merged.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::api::OrderApi;
use crate::domain::{authorized_actor, Order, OrderStatus, Role, SessionIdentity};
use crate::error::{ApiError, GateError, TransitionError};
use crate::store::OrderStoreClient;

/// Validates a requested transition against the status table and the acting
/// identity. Pure; used by the gate before any network call.
pub fn validate_transition(
    order: &Order,
    target: OrderStatus,
    acting_role: Role,
    acting_user: &str,
    owned_restaurants: &[String],
) -> Result<(), TransitionError> {
    let actor = authorized_actor(order.status, target).ok_or(TransitionError::InvalidTransition {
        from: order.status,
        to: target,
    })?;

    let unauthorized = || TransitionError::UnauthorizedActor {
        role: acting_role,
        from: order.status,
        to: target,
    };

    if acting_role != actor {
        return Err(unauthorized());
    }

    match acting_role {
        Role::Restaurant => {
            // Only the owner of the order's restaurant may act on it.
            if !owned_restaurants.iter().any(|id| *id == order.restaurant_id) {
                return Err(unauthorized());
            }
        }
        Role::Rider => {
            if target == OrderStatus::PickedByRider && order.rider_id.is_some() {
                return Err(TransitionError::AlreadyAssigned(order.id.clone()));
            }
            if target == OrderStatus::Delivered
                && order.rider_id.as_deref() != Some(acting_user)
            {
                return Err(unauthorized());
            }
        }
        Role::Customer => {}
    }

    Ok(())
}

/// Session-scoped gate wired to the REST client and the order store.
#[derive(Clone)]
pub struct ActionGate {
    api: Arc<dyn OrderApi>,
    store: OrderStoreClient,
    identity: SessionIdentity,
}

impl ActionGate {
    pub fn new(api: Arc<dyn OrderApi>, store: OrderStoreClient, identity: SessionIdentity) -> Self {
        Self {
            api,
            store,
            identity,
        }
    }

    /// Requests `order.status -> target` on behalf of the acting user.
    ///
    /// Local rejections come back synchronously without touching the
    /// network. On success the backend's confirmed snapshot is merged into
    /// the store and returned; the later push event for the same change is a
    /// no-op under last-writer-wins.
    ///
    /// The local `rider_id` null-check on a claim is a UX filter only: if
    /// the backend rejects the commit with the order's current state, that
    /// state is authoritative and gets merged (the order shows as claimed by
    /// whoever won), and the rejection is returned without a retry.
    #[instrument(
        skip(self, order),
        fields(order_id = %order.id, from = %order.status, to = %target, role = %acting_role)
    )]
    pub async fn request_transition(
        &self,
        order: &Order,
        target: OrderStatus,
        acting_role: Role,
        acting_user: &str,
    ) -> Result<Order, GateError> {
        validate_transition(
            order,
            target,
            acting_role,
            acting_user,
            &self.identity.owned_restaurant_ids,
        )?;

        let result = if target == OrderStatus::PickedByRider {
            self.api.assign_rider(&order.id).await
        } else {
            self.api.update_status(&order.id, target).await
        };

        match result {
            Ok(confirmed) => {
                self.store.apply_update(confirmed.clone()).await?;
                info!(status = %confirmed.status, "transition committed");
                Ok(confirmed)
            }
            Err(ApiError::ServerRejected {
                code,
                message,
                current: Some(current),
            }) => {
                warn!(code, %message, "backend rejected transition; merging authoritative state");
                self.store.apply_update((*current).clone()).await?;
                Err(GateError::Api(ApiError::ServerRejected {
                    code,
                    message,
                    current: Some(current),
                }))
            }
            Err(e) => {
                warn!(error = %e, "transition commit failed");
                Err(GateError::Api(e))
            }
        }
    }
}
