//! The order status state machine.
//!
//! `authorized_actor` is the single source of truth for which transitions
//! exist and which role may trigger each of them. The gate consults it before
//! spending a round-trip; the backend re-validates independently, so the
//! client-side check is a UX guard, not a security boundary.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an order, serialized as the backend's wire strings
/// (`PLACED`, `ACCEPTED_BY_RESTAURANT`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    AcceptedByRestaurant,
    RejectedByRestaurant,
    Preparing,
    Ready,
    PickedByRider,
    Delivered,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Placed,
        OrderStatus::AcceptedByRestaurant,
        OrderStatus::RejectedByRestaurant,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::PickedByRider,
        OrderStatus::Delivered,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "PLACED",
            OrderStatus::AcceptedByRestaurant => "ACCEPTED_BY_RESTAURANT",
            OrderStatus::RejectedByRestaurant => "REJECTED_BY_RESTAURANT",
            OrderStatus::Preparing => "PREPARING",
            OrderStatus::Ready => "READY",
            OrderStatus::PickedByRider => "PICKED_BY_RIDER",
            OrderStatus::Delivered => "DELIVERED",
        }
    }

    /// Human-readable label for status badges.
    pub fn display_label(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::AcceptedByRestaurant => "Accepted",
            OrderStatus::RejectedByRestaurant => "Rejected",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::PickedByRider => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
        }
    }

    /// Terminal states have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::RejectedByRestaurant | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The three user roles. The backend calls the customer role `USER` on the
/// wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "USER", alias = "CUSTOMER")]
    Customer,
    #[serde(rename = "RESTAURANT")]
    Restaurant,
    #[serde(rename = "RIDER")]
    Rider,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Customer, Role::Restaurant, Role::Rider];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "USER",
            Role::Restaurant => "RESTAURANT",
            Role::Rider => "RIDER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns the role authorized to trigger the `from -> to` transition, or
/// `None` when no such edge exists. Six edges total; no backward moves, no
/// skipped states.
pub fn authorized_actor(from: OrderStatus, to: OrderStatus) -> Option<Role> {
    use OrderStatus::*;
    match (from, to) {
        (Placed, AcceptedByRestaurant) => Some(Role::Restaurant),
        (Placed, RejectedByRestaurant) => Some(Role::Restaurant),
        (AcceptedByRestaurant, Preparing) => Some(Role::Restaurant),
        (Preparing, Ready) => Some(Role::Restaurant),
        (Ready, PickedByRider) => Some(Role::Rider),
        (PickedByRider, Delivered) => Some(Role::Rider),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exactly_six_authorized_edges_in_full_cross_product() {
        let mut accepted = Vec::new();
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                for role in Role::ALL {
                    if authorized_actor(from, to) == Some(role) {
                        accepted.push((from, to, role));
                    }
                }
            }
        }
        assert_eq!(accepted.len(), 6);
        assert!(accepted.contains(&(
            OrderStatus::Placed,
            OrderStatus::AcceptedByRestaurant,
            Role::Restaurant
        )));
        assert!(accepted.contains(&(
            OrderStatus::Placed,
            OrderStatus::RejectedByRestaurant,
            Role::Restaurant
        )));
        assert!(accepted.contains(&(
            OrderStatus::AcceptedByRestaurant,
            OrderStatus::Preparing,
            Role::Restaurant
        )));
        assert!(accepted.contains(&(OrderStatus::Preparing, OrderStatus::Ready, Role::Restaurant)));
        assert!(accepted.contains(&(OrderStatus::Ready, OrderStatus::PickedByRider, Role::Rider)));
        assert!(accepted.contains(&(
            OrderStatus::PickedByRider,
            OrderStatus::Delivered,
            Role::Rider
        )));
    }

    #[test]
    fn terminal_states_have_no_outgoing_edges() {
        for from in OrderStatus::ALL.into_iter().filter(OrderStatus::is_terminal) {
            for to in OrderStatus::ALL {
                assert_eq!(authorized_actor(from, to), None);
            }
        }
    }

    #[test]
    fn wire_names_round_trip() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            let back: OrderStatus = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
        assert_eq!(serde_json::to_string(&Role::Customer).unwrap(), "\"USER\"");
        let customer: Role = serde_json::from_str("\"CUSTOMER\"").unwrap();
        assert_eq!(customer, Role::Customer);
    }
}
