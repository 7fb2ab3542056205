//! Derived, role-appropriate projections over the order map. All pure
//! functions, re-evaluated on every query; the store never caches results
//! because these drive badges and notification triggers.

use std::collections::HashMap;

use crate::domain::{Order, OrderStatus, Role, SessionIdentity};

/// Flat rider payout share, in percent. Confirm against backend truth before
/// presenting as money owed.
pub const RIDER_PAYOUT_PERCENT: i64 = 10;

/// Whether an order belongs in this session's view at all.
///
/// - Customers always see their own orders.
/// - Restaurant owners see orders targeting a restaurant they own.
/// - Riders see the open pool (READY, unassigned) plus anything assigned to
///   them.
pub fn is_visible(order: &Order, identity: &SessionIdentity) -> bool {
    match identity.role {
        Role::Customer => order.customer_id == identity.user_id,
        Role::Restaurant => identity.owns_restaurant(&order.restaurant_id),
        Role::Rider => {
            (order.status == OrderStatus::Ready && order.rider_id.is_none())
                || order.rider_id.as_deref() == Some(identity.user_id.as_str())
        }
    }
}

/// Orders the role is currently working with, newest first.
pub fn active_orders(orders: &HashMap<String, Order>, identity: &SessionIdentity) -> Vec<Order> {
    let mut active: Vec<Order> = orders
        .values()
        .filter(|order| is_visible(order, identity))
        .filter(|order| match identity.role {
            Role::Customer | Role::Restaurant => !order.status.is_terminal(),
            Role::Rider => order.status != OrderStatus::Delivered,
        })
        .cloned()
        .collect();
    active.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    active
}

/// Count feeding the role's attention badge: orders awaiting this role's
/// next move.
pub fn pending_count(orders: &HashMap<String, Order>, identity: &SessionIdentity) -> usize {
    orders
        .values()
        .filter(|order| is_visible(order, identity))
        .filter(|order| match identity.role {
            Role::Customer => !order.status.is_terminal(),
            Role::Restaurant => order.status == OrderStatus::Placed,
            Role::Rider => order.status == OrderStatus::Ready && order.rider_id.is_none(),
        })
        .count()
}

/// Terminal orders, most recently settled first.
pub fn history(orders: &HashMap<String, Order>, identity: &SessionIdentity) -> Vec<Order> {
    let mut settled: Vec<Order> = orders
        .values()
        .filter(|order| is_visible(order, identity) && order.status.is_terminal())
        .cloned()
        .collect();
    settled.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    settled
}

/// Per-status order counts for the visible set (dashboard buckets).
pub fn status_counts(
    orders: &HashMap<String, Order>,
    identity: &SessionIdentity,
) -> HashMap<OrderStatus, usize> {
    let mut counts = HashMap::new();
    for order in orders.values().filter(|order| is_visible(order, identity)) {
        *counts.entry(order.status).or_insert(0) += 1;
    }
    counts
}

/// Rider payout for one order: flat percentage of the stored total, rounded
/// half-up on minor currency units. Computed here and nowhere else.
pub fn rider_payout(order: &Order) -> i64 {
    (order.total_amount * RIDER_PAYOUT_PERCENT + 50) / 100
}

/// Sum of payouts over this rider's delivered orders.
pub fn total_earnings(orders: &HashMap<String, Order>, rider_id: &str) -> i64 {
    orders
        .values()
        .filter(|order| {
            order.status == OrderStatus::Delivered
                && order.rider_id.as_deref() == Some(rider_id)
        })
        .map(rider_payout)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_framework::fixtures;

    fn keyed(orders: Vec<Order>) -> HashMap<String, Order> {
        orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect()
    }

    #[test]
    fn restaurant_only_sees_owned_restaurants() {
        let order = fixtures::placed_order("o1", "u1", "r1", 200);
        let owner_of_r1 = SessionIdentity::restaurant_owner("owner1", vec!["r1".to_string()]);
        let owner_of_r2 = SessionIdentity::restaurant_owner("owner2", vec!["r2".to_string()]);
        let map = keyed(vec![order]);

        assert_eq!(active_orders(&map, &owner_of_r1).len(), 1);
        assert!(active_orders(&map, &owner_of_r2).is_empty());
    }

    #[test]
    fn rider_sees_open_pool_and_own_assignments_only() {
        let open = fixtures::order_with_status("o1", "u1", "r1", OrderStatus::Ready, None, 100, 0);
        let mine = fixtures::order_with_status(
            "o2",
            "u1",
            "r1",
            OrderStatus::PickedByRider,
            Some("rider_a"),
            100,
            0,
        );
        let theirs = fixtures::order_with_status(
            "o3",
            "u1",
            "r1",
            OrderStatus::PickedByRider,
            Some("rider_b"),
            100,
            0,
        );
        let rider_a = SessionIdentity::rider("rider_a");
        let map = keyed(vec![open, mine, theirs]);

        let active = active_orders(&map, &rider_a);
        let ids: Vec<&str> = active.iter().map(|o| o.id.as_str()).collect();
        assert!(ids.contains(&"o1"));
        assert!(ids.contains(&"o2"));
        assert!(!ids.contains(&"o3"));
        assert_eq!(pending_count(&map, &rider_a), 1);
    }

    #[test]
    fn restaurant_pending_counts_placed_only() {
        let placed = fixtures::placed_order("o1", "u1", "r1", 200);
        let accepted = fixtures::order_with_status(
            "o2",
            "u1",
            "r1",
            OrderStatus::AcceptedByRestaurant,
            None,
            100,
            0,
        );
        let identity = SessionIdentity::restaurant_owner("owner1", vec!["r1".to_string()]);
        let map = keyed(vec![placed, accepted]);

        assert_eq!(pending_count(&map, &identity), 1);
        let counts = status_counts(&map, &identity);
        assert_eq!(counts.get(&OrderStatus::Placed), Some(&1));
        assert_eq!(counts.get(&OrderStatus::AcceptedByRestaurant), Some(&1));
    }

    #[test]
    fn history_is_terminal_orders_newest_first() {
        let delivered = fixtures::order_with_status(
            "o1",
            "u1",
            "r1",
            OrderStatus::Delivered,
            Some("rider_a"),
            100,
            10,
        );
        let rejected = fixtures::order_with_status(
            "o2",
            "u1",
            "r1",
            OrderStatus::RejectedByRestaurant,
            None,
            100,
            20,
        );
        let identity = SessionIdentity::customer("u1");
        let map = keyed(vec![delivered, rejected]);

        let history = history(&map, &identity);
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id, "o2");
    }

    #[test]
    fn payout_rounds_half_up_on_minor_units() {
        let order = fixtures::order_with_status(
            "o1",
            "u1",
            "r1",
            OrderStatus::Delivered,
            Some("rider_a"),
            105,
            0,
        );
        // 10% of 105 = 10.5, rounds up to 11.
        assert_eq!(rider_payout(&order), 11);

        let map = keyed(vec![order]);
        assert_eq!(total_earnings(&map, "rider_a"), 11);
        assert_eq!(total_earnings(&map, "rider_b"), 0);
    }
}
